/// Addressing modes of the 6502 core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// A - operate on the accumulator
    Accumulator,
    /// i - no operand
    Implied,
    /// # - operand follows the opcode
    Immediate,
    /// a - 16-bit address
    Absolute,
    /// (a) - 16-bit pointer, only used by JMP
    AbsoluteIndirect,
    /// a,x
    AbsoluteX,
    /// a,y
    AbsoluteY,
    /// r - signed 8-bit branch offset
    Relative,
    /// zp
    ZeroPage,
    /// zp,x
    ZeroPageX,
    /// zp,y
    ZeroPageY,
    /// (zp),y - post-indexed
    IndirectY,
    /// (zp,x) - pre-indexed
    IndirectX,
}

/// Every operation the core can dispatch to, documented and undocumented.
///
/// Unstable opcodes whose behavior depends on the exact processor revision
/// (the KIL group, XAA, SHA/SHX/SHY/SHS, LAS, LXA) all decode to `Trap` and
/// are offered to the externally installed trap handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny,
    Jmp, Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, Ror, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty,
    Tax, Tay, Tsx, Txa, Txs, Tya,
    // Undocumented instructions with stable combined-operation semantics.
    Slo, Rla, Sre, Rra, Sax, Lax, Dcp, Isb, Anc, Alr, Arr, Sbx,
    // Unstable opcodes, dispatched to the trap hook.
    Trap,
}

/// One decoded table entry: operation, addressing mode, base cycle cost, and
/// whether a page crossing during indexed addressing costs one extra cycle
/// (true only for read-class operations).
#[derive(Debug, Clone, Copy)]
pub struct Opcode {
    pub op: Op,
    pub mode: AddrMode,
    pub cycles: u8,
    pub page_penalty: bool,
}

impl Opcode {
    const fn new(op: Op, mode: AddrMode, cycles: u8) -> Self {
        Self { op, mode, cycles, page_penalty: false }
    }

    /// Entry that pays one extra cycle when indexing crosses a page.
    const fn cross(op: Op, mode: AddrMode, cycles: u8) -> Self {
        Self { op, mode, cycles, page_penalty: true }
    }
}

use AddrMode::*;
use Op::*;

/// The full 256-entry decode table. Indexed directly by the opcode byte, so
/// no opcode can ever be silently unhandled.
pub const TABLE: [Opcode; 256] = [
    Opcode::new(Brk, Implied, 7),           // 00
    Opcode::new(Ora, IndirectX, 6),         // 01
    Opcode::new(Trap, Implied, 2),          // 02 KIL
    Opcode::new(Slo, IndirectX, 8),         // 03
    Opcode::new(Nop, ZeroPage, 3),          // 04
    Opcode::new(Ora, ZeroPage, 3),          // 05
    Opcode::new(Asl, ZeroPage, 5),          // 06
    Opcode::new(Slo, ZeroPage, 5),          // 07
    Opcode::new(Php, Implied, 3),           // 08
    Opcode::new(Ora, Immediate, 2),         // 09
    Opcode::new(Asl, Accumulator, 2),       // 0A
    Opcode::new(Anc, Immediate, 2),         // 0B
    Opcode::new(Nop, Absolute, 4),          // 0C
    Opcode::new(Ora, Absolute, 4),          // 0D
    Opcode::new(Asl, Absolute, 6),          // 0E
    Opcode::new(Slo, Absolute, 6),          // 0F
    Opcode::new(Bpl, Relative, 2),          // 10
    Opcode::cross(Ora, IndirectY, 5),       // 11
    Opcode::new(Trap, Implied, 2),          // 12 KIL
    Opcode::new(Slo, IndirectY, 8),         // 13
    Opcode::new(Nop, ZeroPageX, 4),         // 14
    Opcode::new(Ora, ZeroPageX, 4),         // 15
    Opcode::new(Asl, ZeroPageX, 6),         // 16
    Opcode::new(Slo, ZeroPageX, 6),         // 17
    Opcode::new(Clc, Implied, 2),           // 18
    Opcode::cross(Ora, AbsoluteY, 4),       // 19
    Opcode::new(Nop, Implied, 2),           // 1A
    Opcode::new(Slo, AbsoluteY, 7),         // 1B
    Opcode::cross(Nop, AbsoluteX, 4),       // 1C
    Opcode::cross(Ora, AbsoluteX, 4),       // 1D
    Opcode::new(Asl, AbsoluteX, 7),         // 1E
    Opcode::new(Slo, AbsoluteX, 7),         // 1F
    Opcode::new(Jsr, Absolute, 6),          // 20
    Opcode::new(And, IndirectX, 6),         // 21
    Opcode::new(Trap, Implied, 2),          // 22 KIL
    Opcode::new(Rla, IndirectX, 8),         // 23
    Opcode::new(Bit, ZeroPage, 3),          // 24
    Opcode::new(And, ZeroPage, 3),          // 25
    Opcode::new(Rol, ZeroPage, 5),          // 26
    Opcode::new(Rla, ZeroPage, 5),          // 27
    Opcode::new(Plp, Implied, 4),           // 28
    Opcode::new(And, Immediate, 2),         // 29
    Opcode::new(Rol, Accumulator, 2),       // 2A
    Opcode::new(Anc, Immediate, 2),         // 2B
    Opcode::new(Bit, Absolute, 4),          // 2C
    Opcode::new(And, Absolute, 4),          // 2D
    Opcode::new(Rol, Absolute, 6),          // 2E
    Opcode::new(Rla, Absolute, 6),          // 2F
    Opcode::new(Bmi, Relative, 2),          // 30
    Opcode::cross(And, IndirectY, 5),       // 31
    Opcode::new(Trap, Implied, 2),          // 32 KIL
    Opcode::new(Rla, IndirectY, 8),         // 33
    Opcode::new(Nop, ZeroPageX, 4),         // 34
    Opcode::new(And, ZeroPageX, 4),         // 35
    Opcode::new(Rol, ZeroPageX, 6),         // 36
    Opcode::new(Rla, ZeroPageX, 6),         // 37
    Opcode::new(Sec, Implied, 2),           // 38
    Opcode::cross(And, AbsoluteY, 4),       // 39
    Opcode::new(Nop, Implied, 2),           // 3A
    Opcode::new(Rla, AbsoluteY, 7),         // 3B
    Opcode::cross(Nop, AbsoluteX, 4),       // 3C
    Opcode::cross(And, AbsoluteX, 4),       // 3D
    Opcode::new(Rol, AbsoluteX, 7),         // 3E
    Opcode::new(Rla, AbsoluteX, 7),         // 3F
    Opcode::new(Rti, Implied, 6),           // 40
    Opcode::new(Eor, IndirectX, 6),         // 41
    Opcode::new(Trap, Implied, 2),          // 42 KIL
    Opcode::new(Sre, IndirectX, 8),         // 43
    Opcode::new(Nop, ZeroPage, 3),          // 44
    Opcode::new(Eor, ZeroPage, 3),          // 45
    Opcode::new(Lsr, ZeroPage, 5),          // 46
    Opcode::new(Sre, ZeroPage, 5),          // 47
    Opcode::new(Pha, Implied, 3),           // 48
    Opcode::new(Eor, Immediate, 2),         // 49
    Opcode::new(Lsr, Accumulator, 2),       // 4A
    Opcode::new(Alr, Immediate, 2),         // 4B
    Opcode::new(Jmp, Absolute, 3),          // 4C
    Opcode::new(Eor, Absolute, 4),          // 4D
    Opcode::new(Lsr, Absolute, 6),          // 4E
    Opcode::new(Sre, Absolute, 6),          // 4F
    Opcode::new(Bvc, Relative, 2),          // 50
    Opcode::cross(Eor, IndirectY, 5),       // 51
    Opcode::new(Trap, Implied, 2),          // 52 KIL
    Opcode::new(Sre, IndirectY, 8),         // 53
    Opcode::new(Nop, ZeroPageX, 4),         // 54
    Opcode::new(Eor, ZeroPageX, 4),         // 55
    Opcode::new(Lsr, ZeroPageX, 6),         // 56
    Opcode::new(Sre, ZeroPageX, 6),         // 57
    Opcode::new(Cli, Implied, 2),           // 58
    Opcode::cross(Eor, AbsoluteY, 4),       // 59
    Opcode::new(Nop, Implied, 2),           // 5A
    Opcode::new(Sre, AbsoluteY, 7),         // 5B
    Opcode::cross(Nop, AbsoluteX, 4),       // 5C
    Opcode::cross(Eor, AbsoluteX, 4),       // 5D
    Opcode::new(Lsr, AbsoluteX, 7),         // 5E
    Opcode::new(Sre, AbsoluteX, 7),         // 5F
    Opcode::new(Rts, Implied, 6),           // 60
    Opcode::new(Adc, IndirectX, 6),         // 61
    Opcode::new(Trap, Implied, 2),          // 62 KIL
    Opcode::new(Rra, IndirectX, 8),         // 63
    Opcode::new(Nop, ZeroPage, 3),          // 64
    Opcode::new(Adc, ZeroPage, 3),          // 65
    Opcode::new(Ror, ZeroPage, 5),          // 66
    Opcode::new(Rra, ZeroPage, 5),          // 67
    Opcode::new(Pla, Implied, 4),           // 68
    Opcode::new(Adc, Immediate, 2),         // 69
    Opcode::new(Ror, Accumulator, 2),       // 6A
    Opcode::new(Arr, Immediate, 2),         // 6B
    Opcode::new(Jmp, AbsoluteIndirect, 5),  // 6C
    Opcode::new(Adc, Absolute, 4),          // 6D
    Opcode::new(Ror, Absolute, 6),          // 6E
    Opcode::new(Rra, Absolute, 6),          // 6F
    Opcode::new(Bvs, Relative, 2),          // 70
    Opcode::cross(Adc, IndirectY, 5),       // 71
    Opcode::new(Trap, Implied, 2),          // 72 KIL
    Opcode::new(Rra, IndirectY, 8),         // 73
    Opcode::new(Nop, ZeroPageX, 4),         // 74
    Opcode::new(Adc, ZeroPageX, 4),         // 75
    Opcode::new(Ror, ZeroPageX, 6),         // 76
    Opcode::new(Rra, ZeroPageX, 6),         // 77
    Opcode::new(Sei, Implied, 2),           // 78
    Opcode::cross(Adc, AbsoluteY, 4),       // 79
    Opcode::new(Nop, Implied, 2),           // 7A
    Opcode::new(Rra, AbsoluteY, 7),         // 7B
    Opcode::cross(Nop, AbsoluteX, 4),       // 7C
    Opcode::cross(Adc, AbsoluteX, 4),       // 7D
    Opcode::new(Ror, AbsoluteX, 7),         // 7E
    Opcode::new(Rra, AbsoluteX, 7),         // 7F
    Opcode::new(Nop, Immediate, 2),         // 80
    Opcode::new(Sta, IndirectX, 6),         // 81
    Opcode::new(Nop, Immediate, 2),         // 82
    Opcode::new(Sax, IndirectX, 6),         // 83
    Opcode::new(Sty, ZeroPage, 3),          // 84
    Opcode::new(Sta, ZeroPage, 3),          // 85
    Opcode::new(Stx, ZeroPage, 3),          // 86
    Opcode::new(Sax, ZeroPage, 3),          // 87
    Opcode::new(Dey, Implied, 2),           // 88
    Opcode::new(Nop, Immediate, 2),         // 89
    Opcode::new(Txa, Implied, 2),           // 8A
    Opcode::new(Trap, Immediate, 2),        // 8B XAA
    Opcode::new(Sty, Absolute, 4),          // 8C
    Opcode::new(Sta, Absolute, 4),          // 8D
    Opcode::new(Stx, Absolute, 4),          // 8E
    Opcode::new(Sax, Absolute, 4),          // 8F
    Opcode::new(Bcc, Relative, 2),          // 90
    Opcode::new(Sta, IndirectY, 6),         // 91
    Opcode::new(Trap, Implied, 2),          // 92 KIL
    Opcode::new(Trap, IndirectY, 6),        // 93 SHA
    Opcode::new(Sty, ZeroPageX, 4),         // 94
    Opcode::new(Sta, ZeroPageX, 4),         // 95
    Opcode::new(Stx, ZeroPageY, 4),         // 96
    Opcode::new(Sax, ZeroPageY, 4),         // 97
    Opcode::new(Tya, Implied, 2),           // 98
    Opcode::new(Sta, AbsoluteY, 5),         // 99
    Opcode::new(Txs, Implied, 2),           // 9A
    Opcode::new(Trap, AbsoluteY, 5),        // 9B SHS
    Opcode::new(Trap, AbsoluteX, 5),        // 9C SHY
    Opcode::new(Sta, AbsoluteX, 5),         // 9D
    Opcode::new(Trap, AbsoluteY, 5),        // 9E SHX
    Opcode::new(Trap, AbsoluteY, 5),        // 9F SHA
    Opcode::new(Ldy, Immediate, 2),         // A0
    Opcode::new(Lda, IndirectX, 6),         // A1
    Opcode::new(Ldx, Immediate, 2),         // A2
    Opcode::new(Lax, IndirectX, 6),         // A3
    Opcode::new(Ldy, ZeroPage, 3),          // A4
    Opcode::new(Lda, ZeroPage, 3),          // A5
    Opcode::new(Ldx, ZeroPage, 3),          // A6
    Opcode::new(Lax, ZeroPage, 3),          // A7
    Opcode::new(Tay, Implied, 2),           // A8
    Opcode::new(Lda, Immediate, 2),         // A9
    Opcode::new(Tax, Implied, 2),           // AA
    Opcode::new(Trap, Immediate, 2),        // AB LXA
    Opcode::new(Ldy, Absolute, 4),          // AC
    Opcode::new(Lda, Absolute, 4),          // AD
    Opcode::new(Ldx, Absolute, 4),          // AE
    Opcode::new(Lax, Absolute, 4),          // AF
    Opcode::new(Bcs, Relative, 2),          // B0
    Opcode::cross(Lda, IndirectY, 5),       // B1
    Opcode::new(Trap, Implied, 2),          // B2 KIL
    Opcode::cross(Lax, IndirectY, 5),       // B3
    Opcode::new(Ldy, ZeroPageX, 4),         // B4
    Opcode::new(Lda, ZeroPageX, 4),         // B5
    Opcode::new(Ldx, ZeroPageY, 4),         // B6
    Opcode::new(Lax, ZeroPageY, 4),         // B7
    Opcode::new(Clv, Implied, 2),           // B8
    Opcode::cross(Lda, AbsoluteY, 4),       // B9
    Opcode::new(Tsx, Implied, 2),           // BA
    Opcode::cross(Trap, AbsoluteY, 4),      // BB LAS
    Opcode::cross(Ldy, AbsoluteX, 4),       // BC
    Opcode::cross(Lda, AbsoluteX, 4),       // BD
    Opcode::cross(Ldx, AbsoluteY, 4),       // BE
    Opcode::cross(Lax, AbsoluteY, 4),       // BF
    Opcode::new(Cpy, Immediate, 2),         // C0
    Opcode::new(Cmp, IndirectX, 6),         // C1
    Opcode::new(Nop, Immediate, 2),         // C2
    Opcode::new(Dcp, IndirectX, 8),         // C3
    Opcode::new(Cpy, ZeroPage, 3),          // C4
    Opcode::new(Cmp, ZeroPage, 3),          // C5
    Opcode::new(Dec, ZeroPage, 5),          // C6
    Opcode::new(Dcp, ZeroPage, 5),          // C7
    Opcode::new(Iny, Implied, 2),           // C8
    Opcode::new(Cmp, Immediate, 2),         // C9
    Opcode::new(Dex, Implied, 2),           // CA
    Opcode::new(Sbx, Immediate, 2),         // CB
    Opcode::new(Cpy, Absolute, 4),          // CC
    Opcode::new(Cmp, Absolute, 4),          // CD
    Opcode::new(Dec, Absolute, 6),          // CE
    Opcode::new(Dcp, Absolute, 6),          // CF
    Opcode::new(Bne, Relative, 2),          // D0
    Opcode::cross(Cmp, IndirectY, 5),       // D1
    Opcode::new(Trap, Implied, 2),          // D2 KIL
    Opcode::new(Dcp, IndirectY, 8),         // D3
    Opcode::new(Nop, ZeroPageX, 4),         // D4
    Opcode::new(Cmp, ZeroPageX, 4),         // D5
    Opcode::new(Dec, ZeroPageX, 6),         // D6
    Opcode::new(Dcp, ZeroPageX, 6),         // D7
    Opcode::new(Cld, Implied, 2),           // D8
    Opcode::cross(Cmp, AbsoluteY, 4),       // D9
    Opcode::new(Nop, Implied, 2),           // DA
    Opcode::new(Dcp, AbsoluteY, 7),         // DB
    Opcode::cross(Nop, AbsoluteX, 4),       // DC
    Opcode::cross(Cmp, AbsoluteX, 4),       // DD
    Opcode::new(Dec, AbsoluteX, 7),         // DE
    Opcode::new(Dcp, AbsoluteX, 7),         // DF
    Opcode::new(Cpx, Immediate, 2),         // E0
    Opcode::new(Sbc, IndirectX, 6),         // E1
    Opcode::new(Nop, Immediate, 2),         // E2
    Opcode::new(Isb, IndirectX, 8),         // E3
    Opcode::new(Cpx, ZeroPage, 3),          // E4
    Opcode::new(Sbc, ZeroPage, 3),          // E5
    Opcode::new(Inc, ZeroPage, 5),          // E6
    Opcode::new(Isb, ZeroPage, 5),          // E7
    Opcode::new(Inx, Implied, 2),           // E8
    Opcode::new(Sbc, Immediate, 2),         // E9
    Opcode::new(Nop, Implied, 2),           // EA
    Opcode::new(Sbc, Immediate, 2),         // EB undocumented alias
    Opcode::new(Cpx, Absolute, 4),          // EC
    Opcode::new(Sbc, Absolute, 4),          // ED
    Opcode::new(Inc, Absolute, 6),          // EE
    Opcode::new(Isb, Absolute, 6),          // EF
    Opcode::new(Beq, Relative, 2),          // F0
    Opcode::cross(Sbc, IndirectY, 5),       // F1
    Opcode::new(Trap, Implied, 2),          // F2 KIL
    Opcode::new(Isb, IndirectY, 8),         // F3
    Opcode::new(Nop, ZeroPageX, 4),         // F4
    Opcode::new(Sbc, ZeroPageX, 4),         // F5
    Opcode::new(Inc, ZeroPageX, 6),         // F6
    Opcode::new(Isb, ZeroPageX, 6),         // F7
    Opcode::new(Sed, Implied, 2),           // F8
    Opcode::cross(Sbc, AbsoluteY, 4),       // F9
    Opcode::new(Nop, Implied, 2),           // FA
    Opcode::new(Isb, AbsoluteY, 7),         // FB
    Opcode::cross(Nop, AbsoluteX, 4),       // FC
    Opcode::cross(Sbc, AbsoluteX, 4),       // FD
    Opcode::new(Inc, AbsoluteX, 7),         // FE
    Opcode::new(Isb, AbsoluteX, 7),         // FF
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_opcode() {
        assert_eq!(TABLE.len(), 256);
    }

    #[test]
    fn test_documented_entries() {
        assert_eq!(TABLE[0xA9].op, Op::Lda);
        assert_eq!(TABLE[0xA9].mode, AddrMode::Immediate);
        assert_eq!(TABLE[0xA9].cycles, 2);

        assert_eq!(TABLE[0x6C].op, Op::Jmp);
        assert_eq!(TABLE[0x6C].mode, AddrMode::AbsoluteIndirect);
        assert_eq!(TABLE[0x6C].cycles, 5);
    }

    #[test]
    fn test_read_class_indexing_pays_page_penalty() {
        assert!(TABLE[0xBD].page_penalty); // LDA abs,X
        assert!(TABLE[0xB1].page_penalty); // LDA (zp),Y
        assert!(!TABLE[0x9D].page_penalty); // STA abs,X
        assert!(!TABLE[0xFE].page_penalty); // INC abs,X
    }

    #[test]
    fn test_kil_group_routes_to_trap() {
        for code in [0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2] {
            assert_eq!(TABLE[code].op, Op::Trap);
        }
    }
}
