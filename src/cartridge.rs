use std::io;

use log::info;

/// First address of cartridge space on the bus.
pub const CART_BASE: u16 = 0x4020;
const CART_SIZE: usize = 0xBFE0;

/// Cartridge space: a flat writable array covering $4020-$FFFF, the
/// fixed-bank (mapper 0) layout. Disk-system bootstrap code is loaded into
/// the same space, so the whole region stays writable.
#[derive(Clone)]
pub struct Cartridge {
    storage: Vec<u8>,
}

impl Default for Cartridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Cartridge {
    /// Fresh cartridge space. Filled with 0xFF, since 0x00 is the opcode
    /// for BRK.
    pub fn new() -> Self {
        Self {
            storage: vec![0xFF; CART_SIZE],
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.storage[(addr - CART_BASE) as usize]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.storage[(addr - CART_BASE) as usize] = value;
    }
}

/// A parsed iNES-format ROM image, ready to be mapped into the machine.
pub struct RomImage {
    pub prg: Vec<u8>,
    pub chr: Vec<u8>,
    pub vertical_mirroring: bool,
}

impl RomImage {
    /// Parse an iNES v1 image. Only mapper 0 without a trainer is accepted.
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        if data.len() < 16 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "ROM image shorter than the 16-byte header",
            ));
        }
        if &data[0..3] != b"NES" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Missing 'NES' ROM signature",
            ));
        }

        let prg_size = data[4] as usize * 0x4000;
        let chr_size = data[5] as usize * 0x2000;
        let flags6 = data[6];
        let flags7 = data[7];

        let vertical_mirroring = flags6 & 0x01 != 0;
        let trainer = flags6 & 0x04 != 0;
        let mapper = (flags6 >> 4) | (flags7 & 0xF0);

        info!("PRG ROM size: 0x{:04x}", prg_size);
        info!("CHR ROM size: 0x{:04x}", chr_size);
        info!(
            "Mirroring: {}",
            if vertical_mirroring { "Vertical" } else { "Horizontal" }
        );
        info!("Mapper: {}", mapper);

        if mapper != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Only mapper #0 is supported, got {}", mapper),
            ));
        }
        if trainer {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Trainers are not supported",
            ));
        }
        if data.len() < 16 + prg_size + chr_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "File too small for the ROM sizes in its header",
            ));
        }

        Ok(Self {
            prg: data[16..16 + prg_size].to_vec(),
            chr: data[16 + prg_size..16 + prg_size + chr_size].to_vec(),
            vertical_mirroring,
        })
    }
}
