use crate::bus::Bus;
use crate::cpu::opcode::{AddrMode, Op, Opcode, TABLE};

// Status register flags
pub const FLAG_CARRY: u8 = 0b0000_0001;
pub const FLAG_ZERO: u8 = 0b0000_0010;
pub const FLAG_INTERRUPT: u8 = 0b0000_0100;
pub const FLAG_DECIMAL: u8 = 0b0000_1000;
pub const FLAG_BREAK: u8 = 0b0001_0000;
pub const FLAG_UNUSED: u8 = 0b0010_0000;
pub const FLAG_OVERFLOW: u8 = 0b0100_0000;
pub const FLAG_NEGATIVE: u8 = 0b1000_0000;

const STACK_PAGE: u16 = 0x0100;

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

/// Handler offered any opcode that decodes to `Op::Trap`. Returning `false`
/// declines the opcode, which is an unrecoverable condition.
pub type TrapHandler = fn(opcode: u8, cpu: &mut Cpu, bus: &mut dyn Bus) -> bool;

/// 6502 CPU core.
///
/// Binary-only model: the decimal flag is stored and restored like any other
/// status bit but never changes ADC/SBC arithmetic. Cycle accounting uses the
/// tabulated base cost plus page-crossing and branch penalties.
#[derive(Clone)]
pub struct Cpu {
    /// Program counter
    pub pc: u16,
    /// Accumulator
    pub a: u8,
    /// X register
    pub x: u8,
    /// Y register
    pub y: u8,
    /// Stack pointer, based at $0100
    pub sp: u8,
    /// Status register (NV-BDIZC); bits 4 and 5 only exist on pushed copies
    pub p: u8,
    /// Total cycles executed since reset
    pub cycles: u64,
    trap: Option<TrapHandler>,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: 0,
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            p: FLAG_INTERRUPT,
            cycles: 0,
            trap: None,
        }
    }

    /// Install a handler for opcodes the core leaves unimplemented.
    pub fn set_trap_handler(&mut self, handler: TrapHandler) {
        self.trap = Some(handler);
    }

    /// Load PC from the reset vector and restore the power-on register pattern.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.pc = self.read_word(bus, RESET_VECTOR);
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.p = FLAG_INTERRUPT;
        self.cycles = 0;
    }

    /// Execute one instruction and return the cycles it consumed.
    pub fn step<B: Bus>(&mut self, bus: &mut B) -> u32 {
        let code = self.fetch_byte(bus);
        let entry = TABLE[code as usize];
        let mut cycles = entry.cycles as u32;

        match entry.op {
            Op::Adc => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.adc(value);
            }
            Op::And => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.and(value);
            }
            Op::Asl => self.modify(bus, entry.mode, Cpu::asl),
            Op::Bcc => self.branch_if(bus, self.p & FLAG_CARRY == 0, &mut cycles),
            Op::Bcs => self.branch_if(bus, self.p & FLAG_CARRY != 0, &mut cycles),
            Op::Beq => self.branch_if(bus, self.p & FLAG_ZERO != 0, &mut cycles),
            Op::Bit => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.bit(value);
            }
            Op::Bmi => self.branch_if(bus, self.p & FLAG_NEGATIVE != 0, &mut cycles),
            Op::Bne => self.branch_if(bus, self.p & FLAG_ZERO == 0, &mut cycles),
            Op::Bpl => self.branch_if(bus, self.p & FLAG_NEGATIVE == 0, &mut cycles),
            Op::Brk => {
                self.push_word(bus, self.pc.wrapping_add(1));
                self.push_byte(bus, self.status_byte(true));
                self.p |= FLAG_INTERRUPT;
                self.pc = self.read_word(bus, IRQ_VECTOR);
            }
            Op::Bvc => self.branch_if(bus, self.p & FLAG_OVERFLOW == 0, &mut cycles),
            Op::Bvs => self.branch_if(bus, self.p & FLAG_OVERFLOW != 0, &mut cycles),
            Op::Clc => self.p &= !FLAG_CARRY,
            Op::Cld => self.p &= !FLAG_DECIMAL,
            Op::Cli => self.p &= !FLAG_INTERRUPT,
            Op::Clv => self.p &= !FLAG_OVERFLOW,
            Op::Cmp => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.compare(self.a, value);
            }
            Op::Cpx => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.compare(self.x, value);
            }
            Op::Cpy => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.compare(self.y, value);
            }
            Op::Dec => self.modify(bus, entry.mode, Cpu::dec),
            Op::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative(self.x);
            }
            Op::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative(self.y);
            }
            Op::Eor => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.eor(value);
            }
            Op::Inc => self.modify(bus, entry.mode, Cpu::inc),
            Op::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative(self.x);
            }
            Op::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative(self.y);
            }
            Op::Jmp => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                self.pc = addr;
            }
            Op::Jsr => {
                let target = self.fetch_word(bus);
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
            }
            Op::Lda => {
                self.a = self.load_operand(bus, entry, &mut cycles);
                self.update_zero_and_negative(self.a);
            }
            Op::Ldx => {
                self.x = self.load_operand(bus, entry, &mut cycles);
                self.update_zero_and_negative(self.x);
            }
            Op::Ldy => {
                self.y = self.load_operand(bus, entry, &mut cycles);
                self.update_zero_and_negative(self.y);
            }
            Op::Lsr => self.modify(bus, entry.mode, Cpu::lsr),
            Op::Nop => {
                if entry.mode != AddrMode::Implied {
                    // Consume the operand and the page-cross penalty without
                    // the dummy read; reading could tickle an I/O register.
                    let (_, crossed) = self.operand_address(bus, entry.mode);
                    if crossed && entry.page_penalty {
                        cycles += 1;
                    }
                }
            }
            Op::Ora => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.ora(value);
            }
            Op::Pha => self.push_byte(bus, self.a),
            Op::Php => {
                let status = self.status_byte(true);
                self.push_byte(bus, status);
            }
            Op::Pla => {
                self.a = self.pop_byte(bus);
                self.update_zero_and_negative(self.a);
            }
            Op::Plp => {
                let status = self.pop_byte(bus);
                self.set_status(status);
            }
            Op::Rol => self.modify(bus, entry.mode, Cpu::rol),
            Op::Ror => self.modify(bus, entry.mode, Cpu::ror),
            Op::Rti => {
                let status = self.pop_byte(bus);
                self.set_status(status);
                self.pc = self.pop_word(bus);
            }
            Op::Rts => {
                self.pc = self.pop_word(bus).wrapping_add(1);
            }
            Op::Sbc => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.sbc(value);
            }
            Op::Sec => self.p |= FLAG_CARRY,
            Op::Sed => self.p |= FLAG_DECIMAL,
            Op::Sei => self.p |= FLAG_INTERRUPT,
            Op::Sta => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                bus.write(addr, self.a);
            }
            Op::Stx => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                bus.write(addr, self.x);
            }
            Op::Sty => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                bus.write(addr, self.y);
            }
            Op::Tax => {
                self.x = self.a;
                self.update_zero_and_negative(self.x);
            }
            Op::Tay => {
                self.y = self.a;
                self.update_zero_and_negative(self.y);
            }
            Op::Tsx => {
                self.x = self.sp;
                self.update_zero_and_negative(self.x);
            }
            Op::Txa => {
                self.a = self.x;
                self.update_zero_and_negative(self.a);
            }
            Op::Txs => self.sp = self.x,
            Op::Tya => {
                self.a = self.y;
                self.update_zero_and_negative(self.a);
            }

            // Undocumented: shift/rotate memory, then combine with the accumulator
            Op::Slo => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.asl(bus.read(addr));
                bus.write(addr, result);
                self.ora(result);
            }
            Op::Rla => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.rol(bus.read(addr));
                bus.write(addr, result);
                self.and(result);
            }
            Op::Sre => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.lsr(bus.read(addr));
                bus.write(addr, result);
                self.eor(result);
            }
            Op::Rra => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.ror(bus.read(addr));
                bus.write(addr, result);
                self.adc(result);
            }
            // Undocumented: store A AND X without touching flags
            Op::Sax => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                bus.write(addr, self.a & self.x);
            }
            // Undocumented: load A and X together
            Op::Lax => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.a = value;
                self.x = value;
                self.update_zero_and_negative(value);
            }
            // Undocumented: decrement memory, then compare
            Op::Dcp => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.dec(bus.read(addr));
                bus.write(addr, result);
                self.compare(self.a, result);
            }
            // Undocumented: increment memory, then subtract
            Op::Isb => {
                let (addr, _) = self.operand_address(bus, entry.mode);
                let result = self.inc(bus.read(addr));
                bus.write(addr, result);
                self.sbc(result);
            }
            // Undocumented: AND immediate, carry mirrors the sign bit
            Op::Anc => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.and(value);
                self.set_flag(FLAG_CARRY, self.a & 0x80 != 0);
            }
            // Undocumented: AND immediate, then LSR the accumulator
            Op::Alr => {
                let value = self.load_operand(bus, entry, &mut cycles);
                self.a &= value;
                self.a = self.lsr(self.a);
            }
            // Undocumented: AND immediate, ROR the accumulator, V/C from bits 6/5
            Op::Arr => {
                let value = self.load_operand(bus, entry, &mut cycles);
                let carry_in = self.p & FLAG_CARRY != 0;
                let result = ((self.a & value) >> 1) | if carry_in { 0x80 } else { 0 };
                self.a = result;
                self.update_zero_and_negative(result);
                self.set_flag(FLAG_CARRY, result & 0x40 != 0);
                self.set_flag(FLAG_OVERFLOW, ((result >> 6) ^ (result >> 5)) & 0x1 != 0);
            }
            // Undocumented: X = (A AND X) - immediate
            Op::Sbx => {
                let value = self.load_operand(bus, entry, &mut cycles);
                let base = self.a & self.x;
                self.set_flag(FLAG_CARRY, base >= value);
                self.x = base.wrapping_sub(value);
                self.update_zero_and_negative(self.x);
            }

            Op::Trap => {
                match self.trap {
                    Some(handler) => {
                        if !handler(code, self, bus) {
                            panic!("Unhandled opcode: {:02X}", code);
                        }
                    }
                    None => panic!("Unhandled opcode: {:02X}", code),
                }
            }
        }

        self.cycles += cycles as u64;
        cycles
    }

    /// Non-maskable interrupt entry sequence.
    pub fn nmi(&mut self, bus: &mut impl Bus) {
        self.push_word(bus, self.pc);
        let status = self.status_byte(false);
        self.push_byte(bus, status);
        self.p |= FLAG_INTERRUPT;
        self.pc = self.read_word(bus, NMI_VECTOR);
        self.cycles += 7;
    }

    /// Maskable interrupt entry sequence. The caller checks the I flag.
    pub fn irq(&mut self, bus: &mut impl Bus) {
        self.push_word(bus, self.pc);
        let status = self.status_byte(false);
        self.push_byte(bus, status);
        self.p |= FLAG_INTERRUPT;
        self.pc = self.read_word(bus, IRQ_VECTOR);
        self.cycles += 7;
    }

    fn page_crossed(a: u16, b: u16) -> bool {
        (a & 0xFF00) != (b & 0xFF00)
    }

    fn fetch_byte(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.fetch_byte(bus) as u16;
        let hi = self.fetch_byte(bus) as u16;
        (hi << 8) | lo
    }

    fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Read a pointer from zero page; the high byte wraps within the page.
    fn read_word_zp(&self, bus: &mut impl Bus, ptr: u8) -> u16 {
        let lo = bus.read(ptr as u16) as u16;
        let hi = bus.read(ptr.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Read a JMP (a) pointer with the hardware page-boundary bug: a pointer
    /// at $xxFF takes its high byte from $xx00.
    fn read_word_bug(&self, bus: &mut impl Bus, ptr: u16) -> u16 {
        let lo = bus.read(ptr) as u16;
        let hi_addr = if ptr & 0x00FF == 0x00FF {
            ptr & 0xFF00
        } else {
            ptr + 1
        };
        let hi = bus.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    /// Resolve the effective address of an addressed operand.
    /// Returns the address and whether indexing crossed a page.
    fn operand_address<B: Bus>(&mut self, bus: &mut B, mode: AddrMode) -> (u16, bool) {
        match mode {
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc = self.pc.wrapping_add(1);
                (addr, false)
            }
            AddrMode::Absolute => (self.fetch_word(bus), false),
            AddrMode::AbsoluteIndirect => {
                let ptr = self.fetch_word(bus);
                (self.read_word_bug(bus, ptr), false)
            }
            AddrMode::AbsoluteX => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(self.x as u16);
                (addr, Self::page_crossed(base, addr))
            }
            AddrMode::AbsoluteY => {
                let base = self.fetch_word(bus);
                let addr = base.wrapping_add(self.y as u16);
                (addr, Self::page_crossed(base, addr))
            }
            AddrMode::ZeroPage => (self.fetch_byte(bus) as u16, false),
            AddrMode::ZeroPageX => {
                let addr = self.fetch_byte(bus).wrapping_add(self.x);
                (addr as u16, false)
            }
            AddrMode::ZeroPageY => {
                let addr = self.fetch_byte(bus).wrapping_add(self.y);
                (addr as u16, false)
            }
            AddrMode::IndirectX => {
                let ptr = self.fetch_byte(bus).wrapping_add(self.x);
                (self.read_word_zp(bus, ptr), false)
            }
            AddrMode::IndirectY => {
                let ptr = self.fetch_byte(bus);
                let base = self.read_word_zp(bus, ptr);
                let addr = base.wrapping_add(self.y as u16);
                (addr, Self::page_crossed(base, addr))
            }
            AddrMode::Accumulator | AddrMode::Implied | AddrMode::Relative => {
                panic!("Addressing mode has no effective address")
            }
        }
    }

    /// Fetch the operand value for a read-class operation, charging the
    /// page-cross penalty where the table says so.
    fn load_operand<B: Bus>(&mut self, bus: &mut B, entry: Opcode, cycles: &mut u32) -> u8 {
        if entry.mode == AddrMode::Accumulator {
            return self.a;
        }
        let (addr, crossed) = self.operand_address(bus, entry.mode);
        if crossed && entry.page_penalty {
            *cycles += 1;
        }
        bus.read(addr)
    }

    /// Read-modify-write on either the accumulator or an addressed byte.
    fn modify<B: Bus>(&mut self, bus: &mut B, mode: AddrMode, f: fn(&mut Cpu, u8) -> u8) {
        if mode == AddrMode::Accumulator {
            self.a = f(self, self.a);
        } else {
            let (addr, _) = self.operand_address(bus, mode);
            let value = bus.read(addr);
            let result = f(self, value);
            bus.write(addr, result);
        }
    }

    fn branch_if<B: Bus>(&mut self, bus: &mut B, condition: bool, cycles: &mut u32) {
        let offset = self.fetch_byte(bus) as i8;
        if condition {
            *cycles += 1;
            let target = self.pc.wrapping_add(offset as i16 as u16);
            if Self::page_crossed(self.pc, target) {
                *cycles += 1;
            }
            self.pc = target;
        }
    }

    fn push_byte(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(STACK_PAGE | self.sp as u16, value);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push_byte(bus, (value >> 8) as u8);
        self.push_byte(bus, value as u8);
    }

    fn pop_byte(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_PAGE | self.sp as u16)
    }

    fn pop_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        (hi << 8) | lo
    }

    /// Status byte as pushed on the stack. Bit 5 is always set; the break
    /// bit is set only for BRK and PHP pushes.
    fn status_byte(&self, break_set: bool) -> u8 {
        let mut status = self.p | FLAG_UNUSED;
        if break_set {
            status |= FLAG_BREAK;
        } else {
            status &= !FLAG_BREAK;
        }
        status
    }

    /// Restore the status register from a pulled byte; bits 4 and 5 are
    /// discarded.
    fn set_status(&mut self, value: u8) {
        self.p = value & !(FLAG_BREAK | FLAG_UNUSED);
    }

    fn set_flag(&mut self, flag: u8, value: bool) {
        if value {
            self.p |= flag;
        } else {
            self.p &= !flag;
        }
    }

    fn update_zero_and_negative(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    fn adc(&mut self, value: u8) {
        let carry = (self.p & FLAG_CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry;
        let result = sum as u8;
        self.set_flag(FLAG_CARRY, sum > 0xFF);
        self.set_flag(FLAG_OVERFLOW, (self.a ^ result) & (value ^ result) & 0x80 != 0);
        self.a = result;
        self.update_zero_and_negative(result);
    }

    fn sbc(&mut self, value: u8) {
        // Binary subtraction is addition of the one's complement.
        self.adc(value ^ 0xFF);
    }

    fn and(&mut self, value: u8) {
        self.a &= value;
        self.update_zero_and_negative(self.a);
    }

    fn ora(&mut self, value: u8) {
        self.a |= value;
        self.update_zero_and_negative(self.a);
    }

    fn eor(&mut self, value: u8) {
        self.a ^= value;
        self.update_zero_and_negative(self.a);
    }

    fn bit(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, self.a & value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
        self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.set_flag(FLAG_CARRY, register >= value);
        self.set_flag(FLAG_ZERO, register == value);
        self.set_flag(FLAG_NEGATIVE, result & 0x80 != 0);
    }

    fn asl(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.p & FLAG_CARRY;
        let result = (value << 1) | carry_in;
        self.set_flag(FLAG_CARRY, value & 0x80 != 0);
        self.update_zero_and_negative(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.p & FLAG_CARRY != 0 { 0x80 } else { 0 };
        let result = (value >> 1) | carry_in;
        self.set_flag(FLAG_CARRY, value & 0x01 != 0);
        self.update_zero_and_negative(result);
        result
    }

    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_zero_and_negative(result);
        result
    }

    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_zero_and_negative(result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat 64 KiB test bus.
    struct RamBus {
        mem: Vec<u8>,
    }

    impl RamBus {
        fn new() -> Self {
            Self { mem: vec![0; 0x10000] }
        }
    }

    impl Bus for RamBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.mem[addr as usize]
        }

        fn write(&mut self, addr: u16, value: u8) {
            self.mem[addr as usize] = value;
        }
    }

    /// Load a program at $8000, point the reset vector at it and reset.
    fn setup(program: &[u8]) -> (Cpu, RamBus) {
        let mut bus = RamBus::new();
        for (i, byte) in program.iter().enumerate() {
            bus.mem[0x8000 + i] = *byte;
        }
        bus.mem[0xFFFC] = 0x00;
        bus.mem[0xFFFD] = 0x80;
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        (cpu, bus)
    }

    #[test]
    fn test_reset_state() {
        let (cpu, _) = setup(&[0xEA]);
        assert_eq!(cpu.pc, 0x8000);
        assert_eq!(cpu.a, 0);
        assert_eq!(cpu.x, 0);
        assert_eq!(cpu.y, 0);
        assert_eq!(cpu.sp, 0xFD);
        assert_eq!(cpu.p, FLAG_INTERRUPT);
        assert_eq!(cpu.cycles, 0);
    }

    #[test]
    fn test_lda_immediate() {
        let (mut cpu, mut bus) = setup(&[0xA9, 0x42]);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x42);
        assert_eq!(cpu.p & FLAG_ZERO, 0);
        assert_eq!(cpu.p & FLAG_NEGATIVE, 0);
        assert_eq!(cycles, 2);
    }

    #[test]
    fn test_lda_zero_sets_zero_flag() {
        let (mut cpu, mut bus) = setup(&[0xA9, 0x00]);
        cpu.step(&mut bus);
        assert_ne!(cpu.p & FLAG_ZERO, 0);
    }

    #[test]
    fn test_lda_negative_sets_negative_flag() {
        let (mut cpu, mut bus) = setup(&[0xA9, 0x80]);
        cpu.step(&mut bus);
        assert_ne!(cpu.p & FLAG_NEGATIVE, 0);
    }

    #[test]
    fn test_adc_wraps_to_zero_with_carry() {
        // LDA #$01; ADC #$FF
        let (mut cpu, mut bus) = setup(&[0xA9, 0x01, 0x69, 0xFF]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x00);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
        assert_ne!(cpu.p & FLAG_ZERO, 0);
    }

    #[test]
    fn test_adc_overflow() {
        // LDA #$50; ADC #$50 -> 0xA0, signed overflow
        let (mut cpu, mut bus) = setup(&[0xA9, 0x50, 0x69, 0x50]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0xA0);
        assert_ne!(cpu.p & FLAG_OVERFLOW, 0);
        assert_ne!(cpu.p & FLAG_NEGATIVE, 0);
        assert_eq!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_adc_ignores_decimal_flag() {
        // SED; SEC; LDA #$09; ADC #$01 -> binary 0x0B, not BCD 0x11
        let (mut cpu, mut bus) = setup(&[0xF8, 0x38, 0xA9, 0x09, 0x69, 0x01]);
        for _ in 0..4 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.a, 0x0B);
        assert_ne!(cpu.p & FLAG_DECIMAL, 0);
    }

    #[test]
    fn test_sbc_with_borrow() {
        // SEC; LDA #$10; SBC #$08
        let (mut cpu, mut bus) = setup(&[0x38, 0xA9, 0x10, 0xE9, 0x08]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.a, 0x08);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_sbc_underflow_clears_carry() {
        // SEC; LDA #$05; SBC #$10 -> 0xF5 with borrow
        let (mut cpu, mut bus) = setup(&[0x38, 0xA9, 0x05, 0xE9, 0x10]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.a, 0xF5);
        assert_eq!(cpu.p & FLAG_CARRY, 0);
        assert_ne!(cpu.p & FLAG_NEGATIVE, 0);
    }

    #[test]
    fn test_asl_accumulator_carry_out() {
        // LDA #$81; ASL A
        let (mut cpu, mut bus) = setup(&[0xA9, 0x81, 0x0A]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x02);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_ror_through_carry() {
        // SEC; LDA #$02; ROR A -> 0x81, carry clear
        let (mut cpu, mut bus) = setup(&[0x38, 0xA9, 0x02, 0x6A]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.a, 0x81);
        assert_eq!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_inc_memory() {
        // INC $10
        let (mut cpu, mut bus) = setup(&[0xE6, 0x10]);
        bus.mem[0x10] = 0xFF;
        let cycles = cpu.step(&mut bus);
        assert_eq!(bus.mem[0x10], 0x00);
        assert_ne!(cpu.p & FLAG_ZERO, 0);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn test_sta_absolute() {
        // LDA #$77; STA $0234
        let (mut cpu, mut bus) = setup(&[0xA9, 0x77, 0x8D, 0x34, 0x02]);
        cpu.step(&mut bus);
        let cycles = cpu.step(&mut bus);
        assert_eq!(bus.mem[0x0234], 0x77);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn test_branch_not_taken_costs_two() {
        // Carry clear, BCS not taken
        let (mut cpu, mut bus) = setup(&[0xB0, 0x10]);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 2);
        assert_eq!(cpu.pc, 0x8002);
    }

    #[test]
    fn test_branch_taken_costs_three() {
        // BCC forward, carry is clear after reset
        let (mut cpu, mut bus) = setup(&[0x90, 0x10]);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 3);
        assert_eq!(cpu.pc, 0x8012);
    }

    #[test]
    fn test_branch_page_cross_costs_four() {
        // Place BCC near the top of the page so the target crosses it.
        let mut bus = RamBus::new();
        bus.mem[0x80F0] = 0x90; // BCC +$20
        bus.mem[0x80F1] = 0x20;
        bus.mem[0xFFFC] = 0xF0;
        bus.mem[0xFFFD] = 0x80;
        let mut cpu = Cpu::new();
        cpu.reset(&mut bus);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 4);
        assert_eq!(cpu.pc, 0x8112);
    }

    #[test]
    fn test_lda_absolute_x_page_cross_penalty() {
        // LDX #$01; LDA $80FF,X
        let (mut cpu, mut bus) = setup(&[0xA2, 0x01, 0xBD, 0xFF, 0x80]);
        bus.mem[0x8100] = 0x55;
        cpu.step(&mut bus);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x55);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn test_lda_absolute_x_same_page_no_penalty() {
        // LDX #$01; LDA $8010,X
        let (mut cpu, mut bus) = setup(&[0xA2, 0x01, 0xBD, 0x10, 0x80]);
        bus.mem[0x8011] = 0x66;
        cpu.step(&mut bus);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x66);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn test_sta_absolute_x_never_pays_penalty() {
        // LDX #$01; STA $80FF,X
        let (mut cpu, mut bus) = setup(&[0xA2, 0x01, 0x9D, 0xFF, 0x80]);
        cpu.step(&mut bus);
        let cycles = cpu.step(&mut bus);
        assert_eq!(cycles, 5);
    }

    #[test]
    fn test_indirect_y_load() {
        // LDY #$04; LDA ($10),Y
        let (mut cpu, mut bus) = setup(&[0xA0, 0x04, 0xB1, 0x10]);
        bus.mem[0x10] = 0x00;
        bus.mem[0x11] = 0x02;
        bus.mem[0x0204] = 0x99;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x99);
    }

    #[test]
    fn test_indirect_x_pointer_wraps_in_zero_page() {
        // LDX #$05; LDA ($FE,X) -> pointer at $03/$04
        let (mut cpu, mut bus) = setup(&[0xA2, 0x05, 0xA1, 0xFE]);
        bus.mem[0x03] = 0x34;
        bus.mem[0x04] = 0x12;
        bus.mem[0x1234] = 0xAB;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0xAB);
    }

    #[test]
    fn test_jmp_indirect_page_boundary_bug() {
        // JMP ($10FF): high byte comes from $1000, not $1100
        let (mut cpu, mut bus) = setup(&[0x6C, 0xFF, 0x10]);
        bus.mem[0x10FF] = 0x00;
        bus.mem[0x1000] = 0x40;
        bus.mem[0x1100] = 0x50;
        cpu.step(&mut bus);
        assert_eq!(cpu.pc, 0x4000);
    }

    #[test]
    fn test_jsr_rts_round_trip() {
        // JSR $8005; ... $8005: RTS
        let (mut cpu, mut bus) = setup(&[0x20, 0x05, 0x80, 0xEA, 0xEA, 0x60]);
        cpu.step(&mut bus);
        assert_eq!(cpu.pc, 0x8005);
        cpu.step(&mut bus);
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(cpu.sp, 0xFD);
    }

    #[test]
    fn test_brk_pushes_status_with_break_set() {
        let (mut cpu, mut bus) = setup(&[0x00]);
        bus.mem[0xFFFE] = 0x00;
        bus.mem[0xFFFF] = 0x90;
        cpu.step(&mut bus);
        assert_eq!(cpu.pc, 0x9000);
        assert_ne!(cpu.p & FLAG_INTERRUPT, 0);
        let pushed = bus.mem[0x0100 + 0xFB];
        assert_ne!(pushed & FLAG_BREAK, 0);
        assert_ne!(pushed & FLAG_UNUSED, 0);
    }

    #[test]
    fn test_php_plp_discards_break_bit() {
        // PHP; PLP
        let (mut cpu, mut bus) = setup(&[0x08, 0x28]);
        cpu.step(&mut bus);
        let pushed = bus.mem[0x0100 + 0xFD];
        assert_ne!(pushed & FLAG_BREAK, 0);
        cpu.step(&mut bus);
        assert_eq!(cpu.p & FLAG_BREAK, 0);
        assert_eq!(cpu.p & FLAG_UNUSED, 0);
    }

    #[test]
    fn test_nmi_sequence() {
        let (mut cpu, mut bus) = setup(&[0xEA]);
        bus.mem[0xFFFA] = 0x00;
        bus.mem[0xFFFB] = 0xA0;
        cpu.nmi(&mut bus);
        assert_eq!(cpu.pc, 0xA000);
        assert_ne!(cpu.p & FLAG_INTERRUPT, 0);
        // Pushed status has break clear, bit 5 set
        let pushed = bus.mem[0x0100 + 0xFB];
        assert_eq!(pushed & FLAG_BREAK, 0);
        assert_ne!(pushed & FLAG_UNUSED, 0);
        // Return address on the stack
        assert_eq!(bus.mem[0x0100 + 0xFD], 0x80);
        assert_eq!(bus.mem[0x0100 + 0xFC], 0x00);
    }

    #[test]
    fn test_rti_restores_state() {
        let (mut cpu, mut bus) = setup(&[0x40]);
        bus.mem[0xFFFA] = 0x00;
        bus.mem[0xFFFB] = 0xA0;
        let saved_pc = cpu.pc;
        cpu.nmi(&mut bus);
        cpu.pc = 0x8000; // RTI is the first program byte
        cpu.step(&mut bus);
        assert_eq!(cpu.pc, saved_pc);
    }

    #[test]
    fn test_irq_uses_irq_vector() {
        let (mut cpu, mut bus) = setup(&[0xEA]);
        bus.mem[0xFFFE] = 0x34;
        bus.mem[0xFFFF] = 0x12;
        cpu.irq(&mut bus);
        assert_eq!(cpu.pc, 0x1234);
    }

    #[test]
    fn test_compare_sets_carry_and_zero() {
        // LDA #$40; CMP #$40
        let (mut cpu, mut bus) = setup(&[0xA9, 0x40, 0xC9, 0x40]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
        assert_ne!(cpu.p & FLAG_ZERO, 0);
    }

    #[test]
    fn test_bit_copies_bits_six_and_seven() {
        // LDA #$FF; BIT $10
        let (mut cpu, mut bus) = setup(&[0xA9, 0xFF, 0x24, 0x10]);
        bus.mem[0x10] = 0xC0;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_ne!(cpu.p & FLAG_NEGATIVE, 0);
        assert_ne!(cpu.p & FLAG_OVERFLOW, 0);
        assert_eq!(cpu.p & FLAG_ZERO, 0);
    }

    #[test]
    fn test_lax_loads_both_registers() {
        // LAX $10
        let (mut cpu, mut bus) = setup(&[0xA7, 0x10]);
        bus.mem[0x10] = 0x5A;
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x5A);
        assert_eq!(cpu.x, 0x5A);
    }

    #[test]
    fn test_sax_stores_a_and_x() {
        // LDA #$F0; LDX #$0F; ... SAX stores A AND X; load fresh values first
        let (mut cpu, mut bus) = setup(&[0xA9, 0xCC, 0xA2, 0xAA, 0x87, 0x10]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(bus.mem[0x10], 0xCC & 0xAA);
    }

    #[test]
    fn test_dcp_decrements_then_compares() {
        // LDA #$10; DCP $20 where $20 holds $11 -> memory $10, Z set
        let (mut cpu, mut bus) = setup(&[0xA9, 0x10, 0xC7, 0x20]);
        bus.mem[0x20] = 0x11;
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(bus.mem[0x20], 0x10);
        assert_ne!(cpu.p & FLAG_ZERO, 0);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_isb_increments_then_subtracts() {
        // SEC; LDA #$10; ISB $20 where $20 holds $04 -> memory $05, A $0B
        let (mut cpu, mut bus) = setup(&[0x38, 0xA9, 0x10, 0xE7, 0x20]);
        bus.mem[0x20] = 0x04;
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(bus.mem[0x20], 0x05);
        assert_eq!(cpu.a, 0x0B);
    }

    #[test]
    fn test_slo_shifts_then_ors() {
        // SLO $20 where $20 holds $81 -> memory $02, A |= $02, carry set
        let (mut cpu, mut bus) = setup(&[0x07, 0x20]);
        bus.mem[0x20] = 0x81;
        cpu.step(&mut bus);
        assert_eq!(bus.mem[0x20], 0x02);
        assert_eq!(cpu.a, 0x02);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_sbx_subtracts_from_a_and_x() {
        // LDA #$F0; LDX #$0F; SBX #$05 -> X = ($F0 & $0F) - $05 = wrap
        let (mut cpu, mut bus) = setup(&[0xA9, 0xF0, 0xA2, 0x0F, 0xCB, 0x05]);
        for _ in 0..3 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.x, 0x0B);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
    }

    #[test]
    fn test_anc_copies_sign_to_carry() {
        // LDA #$FF; ANC #$80
        let (mut cpu, mut bus) = setup(&[0xA9, 0xFF, 0x0B, 0x80]);
        cpu.step(&mut bus);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x80);
        assert_ne!(cpu.p & FLAG_CARRY, 0);
        assert_ne!(cpu.p & FLAG_NEGATIVE, 0);
    }

    #[test]
    fn test_trap_handler_claims_opcode() {
        fn claim(opcode: u8, cpu: &mut Cpu, _bus: &mut dyn Bus) -> bool {
            assert_eq!(opcode, 0x02);
            cpu.a = 0x77;
            true
        }
        let (mut cpu, mut bus) = setup(&[0x02]);
        cpu.set_trap_handler(claim);
        cpu.step(&mut bus);
        assert_eq!(cpu.a, 0x77);
    }

    #[test]
    #[should_panic(expected = "Unhandled opcode")]
    fn test_unclaimed_trap_opcode_is_fatal() {
        let (mut cpu, mut bus) = setup(&[0x02]);
        cpu.step(&mut bus);
    }

    #[test]
    #[should_panic(expected = "Unhandled opcode")]
    fn test_declined_trap_opcode_is_fatal() {
        fn decline(_opcode: u8, _cpu: &mut Cpu, _bus: &mut dyn Bus) -> bool {
            false
        }
        let (mut cpu, mut bus) = setup(&[0x02]);
        cpu.set_trap_handler(decline);
        cpu.step(&mut bus);
    }

    #[test]
    fn test_cycle_counter_accumulates() {
        // LDA #$01 (2) + STA $0200 (4) + NOP (2)
        let (mut cpu, mut bus) = setup(&[0xA9, 0x01, 0x8D, 0x00, 0x02, 0xEA]);
        let mut total = 0;
        for _ in 0..3 {
            total += cpu.step(&mut bus) as u64;
        }
        assert_eq!(total, 8);
        assert_eq!(cpu.cycles, 8);
    }

    #[test]
    fn test_stack_transfers() {
        // LDX #$50; TXS; TSX moves it back
        let (mut cpu, mut bus) = setup(&[0xA2, 0x50, 0x9A, 0xA2, 0x00, 0xBA]);
        for _ in 0..4 {
            cpu.step(&mut bus);
        }
        assert_eq!(cpu.sp, 0x50);
        assert_eq!(cpu.x, 0x50);
    }
}
