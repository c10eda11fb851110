use crate::apu::AudioSink;
use crate::bus::SystemBus;
use crate::cartridge::RomImage;
use crate::controller::{Button, CassetteDeck, Key};
use crate::cpu::{Cpu, FLAG_INTERRUPT};
use crate::disk::{DiskImage, DiskSystem};
use crate::ppu::VideoSink;

/// Address where disk-system bootstrap code is loaded.
const BOOTSTRAP_BASE: u16 = 0xE000;

/// Atomic whole-state copy of the machine, taken and restored only between
/// driver iterations.
#[derive(Clone)]
pub struct Snapshot {
    cpu: Cpu,
    bus: SystemBus,
}

/// The execution driver: owns the CPU and the bus and enforces the fixed
/// tick ratio — per instruction, three pixel-processor dots plus one disk
/// and one cassette tick for every elapsed CPU cycle, then one audio step.
pub struct Machine {
    pub cpu: Cpu,
    pub bus: SystemBus,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: SystemBus::new(),
        }
    }

    /// Map a parsed ROM image: program at $8000 (duplicated at $C000 when
    /// exactly 16 KiB), pattern data into the pixel processor, mirroring
    /// flag from the header.
    pub fn insert_rom(&mut self, image: &RomImage) {
        for (i, byte) in image.prg.iter().enumerate() {
            self.bus.cart.write(0x8000 + i as u16, *byte);
        }
        if image.prg.len() == 0x4000 {
            for (i, byte) in image.prg.iter().enumerate() {
                self.bus.cart.write(0xC000 + i as u16, *byte);
            }
        }
        if image.chr.len() == 0x2000 {
            self.bus.ppu.load_pattern_tables(&image.chr);
        }
        self.bus.ppu.set_mirroring(image.vertical_mirroring);
    }

    /// Attach the disk system: bootstrap code lands at $E000 in cartridge
    /// space, the image goes into the drive.
    pub fn attach_disk_system(&mut self, bootstrap: &[u8], image: DiskImage) {
        for (i, byte) in bootstrap.iter().enumerate() {
            let addr = BOOTSTRAP_BASE.wrapping_add(i as u16);
            if addr < BOOTSTRAP_BASE {
                break; // past the top of the address space
            }
            self.bus.cart.write(addr, *byte);
        }
        self.bus.attach_disk(DiskSystem::new(image));
    }

    pub fn reset(&mut self) {
        self.cpu.reset(&mut self.bus);
    }

    /// One driver iteration. Returns true when a frame-end interrupt was
    /// serviced, which is the injection point for per-frame input.
    pub fn step<V, A, C>(&mut self, video: &mut V, audio: &mut A, cassette: &mut C) -> bool
    where
        V: VideoSink,
        A: AudioSink,
        C: CassetteDeck,
    {
        // The pixel processor free-runs for two frames before the CPU starts.
        let cycles = if self.bus.ppu.frame() < 2 {
            self.bus.ppu.tick(video);
            0
        } else {
            self.cpu.step(&mut self.bus)
        };

        for _ in 0..cycles {
            self.bus.ppu.tick(video);
            self.bus.ppu.tick(video);
            self.bus.ppu.tick(video);
            if let Some(disk) = self.bus.disk.as_mut() {
                disk.tick();
            }
            let dac = self.bus.keyboard.cassette_dac;
            if let Some(adc) = cassette.tick(dac) {
                self.bus.keyboard.cassette_adc = adc;
            }
        }

        self.bus.apu.tick(audio);

        // Pending disk interrupt, once the CPU is ready to take it.
        let disk_irq = self.bus.disk.as_ref().is_some_and(|d| d.irq_pending());
        if disk_irq && self.cpu.p & FLAG_INTERRUPT == 0 {
            self.cpu.irq(&mut self.bus);
            if let Some(disk) = self.bus.disk.as_mut() {
                disk.clear_irq();
            }
        }

        // Frame-end interrupt from the pixel processor.
        if self.bus.ppu.take_nmi() {
            self.cpu.nmi(&mut self.bus);
            self.bus.keyboard.clear_key();
            return true;
        }
        false
    }

    /// Drive the machine until the frame counter advances.
    pub fn run_frame<V, A, C>(&mut self, video: &mut V, audio: &mut A, cassette: &mut C)
    where
        V: VideoSink,
        A: AudioSink,
        C: CassetteDeck,
    {
        let frame = self.bus.ppu.frame();
        while self.bus.ppu.frame() == frame {
            self.step(video, audio, cassette);
        }
    }

    pub fn frame(&self) -> u32 {
        self.bus.ppu.frame()
    }

    /// Inject a whole controller byte for the coming frame.
    pub fn set_controller_state(&mut self, player: u8, state: u8) {
        match player {
            1 => self.bus.joypad1.set_state(state),
            2 => self.bus.joypad2.set_state(state),
            _ => {}
        }
    }

    pub fn set_button(&mut self, player: u8, button: Button, pressed: bool) {
        match player {
            1 => self.bus.joypad1.set_button(button, pressed),
            2 => self.bus.joypad2.set_button(button, pressed),
            _ => {}
        }
    }

    pub fn press_key(&mut self, key: Key, shift: bool, ctrl: bool) {
        self.bus.keyboard.set_key(key, shift, ctrl);
    }

    /// Atomic copy of the complete machine state.
    pub fn save_state(&self) -> Snapshot {
        Snapshot {
            cpu: self.cpu.clone(),
            bus: self.bus.clone(),
        }
    }

    /// Restore a previously saved state in full.
    pub fn load_state(&mut self, snapshot: &Snapshot) {
        self.cpu = snapshot.cpu.clone();
        self.bus = snapshot.bus.clone();
    }
}
