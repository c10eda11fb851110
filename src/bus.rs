use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::controller::{Joypad, Keyboard};
use crate::disk::DiskSystem;
use crate::ppu::Ppu;

/// Memory-mapped I/O and bus access as seen by the CPU.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

const RAM_SIZE: usize = 0x800;
const OAM_DMA: u16 = 0x4014;

/// The system bus: 2 KiB of RAM with three mirrors, the pixel-processor
/// register window, the audio/controller window, the optional disk-system
/// windows, and flat cartridge space for everything else.
///
/// The bus owns every peripheral, so no register window can exist without a
/// handler behind it.
#[derive(Clone)]
pub struct SystemBus {
    ram: Vec<u8>,
    pub cart: Cartridge,
    pub ppu: Ppu,
    pub apu: Apu,
    pub joypad1: Joypad,
    pub joypad2: Joypad,
    pub keyboard: Keyboard,
    pub disk: Option<DiskSystem>,
}

impl Default for SystemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBus {
    /// Fresh bus with all peripherals wired. RAM is filled with 0xFF, since
    /// 0x00 is the opcode for BRK.
    pub fn new() -> Self {
        Self {
            ram: vec![0xFF; RAM_SIZE],
            cart: Cartridge::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            joypad1: Joypad::new(),
            joypad2: Joypad::new(),
            keyboard: Keyboard::new(),
            disk: None,
        }
    }

    pub fn attach_disk(&mut self, disk: DiskSystem) {
        self.disk = Some(disk);
    }

    /// 256-byte bulk copy from a page into sprite memory, the bus's only
    /// multi-byte side effect. Source bytes come through the normal read
    /// path.
    fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for i in 0..256u16 {
            let byte = self.read(base + i);
            self.ppu.write_oam(i as u8, byte);
        }
    }
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            // RAM and its three mirrors: low 13 bits wrapped to 11
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            // Pixel-processor window, 8-byte periodic
            0x2000..=0x3FFF => self.ppu.read_register(addr % 8),

            0x4015 => self.apu.read_status(),

            // Controller ports; the keyboard takes them over when enabled
            0x4016 => {
                if self.keyboard.enabled {
                    self.keyboard.read_cassette()
                } else {
                    self.joypad1.read()
                }
            }
            0x4017 => {
                if self.keyboard.enabled {
                    self.keyboard.read_port()
                } else {
                    self.joypad2.read()
                }
            }

            // The rest of the audio window is write-only
            0x4000..=0x401F => 0,

            // Disk register window, cartridge space when no disk is attached
            0x4020..=0x40FF => match self.disk.as_mut() {
                Some(disk) => disk.read_register(addr),
                None => self.cart.read(addr),
            },

            // Disk private RAM window
            0x4800..=0x5FFF => match self.disk.as_ref() {
                Some(disk) => disk.read_ram(addr),
                None => self.cart.read(addr),
            },

            _ => self.cart.read(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,

            0x2000..=0x3FFF => self.ppu.write_register(addr % 8, value),

            OAM_DMA => self.oam_dma(value),

            // Strobe latch for both controllers plus the keyboard scan
            0x4016 => {
                self.joypad1.write_strobe(value);
                self.joypad2.write_strobe(value);
                self.keyboard.write_control(value);
            }

            0x4000..=0x401F => self.apu.write_register(addr, value),

            0x4020..=0x40FF => match self.disk.as_mut() {
                Some(disk) => {
                    disk.write_register(addr, value);
                    if addr == 0x4025 {
                        // The disk control register overrides cartridge
                        // mirroring at runtime.
                        let vertical = !disk.mirroring_horizontal();
                        self.ppu.set_mirroring(vertical);
                    }
                }
                None => self.cart.write(addr, value),
            },

            0x4800..=0x5FFF => match self.disk.as_mut() {
                Some(disk) => disk.write_ram(addr, value),
                None => self.cart.write(addr, value),
            },

            _ => self.cart.write(addr, value),
        }
    }
}
