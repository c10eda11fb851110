use crate::ppu::Ppu;
use crate::ppu::ppu::{CTRL_BACKGROUND_TABLE, CTRL_NAMETABLE, CTRL_SPRITE_TABLE};

const NAMETABLE_SIZE: u16 = 0x400;
const ATTRIBUTE_OFFSET: u16 = 0x3C0;

impl Ppu {
    /// Render the current visible scanline into a 256-entry line of palette
    /// colors: background first, then sprites composited on top.
    pub(crate) fn render_scanline(&mut self) -> [u8; 256] {
        let mut pixels = [0u8; 256];
        let mut opaque = [false; 256];
        self.draw_background(&mut pixels, &mut opaque);
        self.draw_sprites(&mut pixels, &opaque);
        pixels
    }

    fn draw_background(&self, pixels: &mut [u8; 256], opaque: &mut [bool; 256]) {
        let vtile = (self.scanline / 8) as u16;
        let row_in_tile = (self.scanline % 8) as u16;
        let table = ((self.ctrl & CTRL_BACKGROUND_TABLE) != 0) as usize;
        let nametable_sel = (self.ctrl & CTRL_NAMETABLE) as u16;

        for base_htile in 0..32u16 {
            let mut htile = base_htile + (self.scroll_x / 8) as u16;
            // Crossing the 32-tile boundary wraps into the adjacent table.
            let nt_offset = if htile >= 32 {
                if nametable_sel == 0 { NAMETABLE_SIZE } else { 0 }
            } else {
                nametable_sel * NAMETABLE_SIZE
            };
            htile %= 32;

            let tile = self.nametable(nt_offset + htile + vtile * 32);
            let attribute =
                self.nametable(nt_offset + ATTRIBUTE_OFFSET + htile / 4 + (vtile / 4) * 8);

            // 2x2-tile quadrant within the attribute byte
            let palette_group = match (htile % 4 <= 1, vtile % 4 <= 1) {
                (true, true) => attribute & 0x3,
                (false, true) => (attribute >> 2) & 0x3,
                (true, false) => (attribute >> 4) & 0x3,
                (false, false) => (attribute >> 6) & 0x3,
            };

            let plane_base = ((tile as usize) << 4) + row_in_tile as usize;
            let plane1 = self.pattern_tables[table][plane_base];
            let plane2 = self.pattern_tables[table][plane_base + 8];

            for pixel_no in 0..8u8 {
                let palette_index = ((plane1 >> pixel_no) & 1) + ((plane2 >> pixel_no) & 1) * 2;
                let color = if palette_index == 0 {
                    // Index 0 always resolves to the universal background color.
                    self.palette_ram[0]
                } else {
                    self.palette_ram[(palette_group * 4 + palette_index) as usize]
                };
                let x = ((base_htile as u8) * 8 + (7 - pixel_no)).wrapping_sub(self.scroll_x % 8);
                pixels[x as usize] = color;
                opaque[x as usize] = palette_index != 0;
            }
        }
    }

    fn draw_sprites(&mut self, pixels: &mut [u8; 256], background_opaque: &[bool; 256]) {
        let table = ((self.ctrl & CTRL_SPRITE_TABLE) != 0) as usize;

        for sprite in (0..self.oam.len()).step_by(4) {
            let sprite_y = self.oam[sprite] as i16;
            if self.scanline < sprite_y + 1 || self.scanline > sprite_y + 8 {
                continue;
            }

            let tile = self.oam[sprite + 1];
            let attribute = self.oam[sprite + 2];
            let sprite_x = self.oam[sprite + 3] as u16;

            let row = (self.scanline - sprite_y - 1) as u8;
            let y_offset = if attribute & 0x80 != 0 { 7 - row } else { row };
            let palette_group = (attribute & 0x3) + 4;

            let plane_base = ((tile as usize) << 4) + (y_offset % 8) as usize;
            let plane1 = self.pattern_tables[table][plane_base];
            let plane2 = self.pattern_tables[table][plane_base + 8];

            for pixel_no in 0..8u16 {
                let palette_index =
                    ((plane1 >> pixel_no) & 1) + ((plane2 >> pixel_no) & 1) * 2;
                if palette_index == 0 {
                    continue; // transparent
                }

                let x = if attribute & 0x40 != 0 {
                    sprite_x + pixel_no
                } else {
                    sprite_x + (7 - pixel_no)
                };
                if x > 0xFF {
                    continue; // off-screen, dropped
                }

                if sprite == 0 && background_opaque[x as usize] {
                    self.sprite_zero_hit = true;
                }
                pixels[x as usize] =
                    self.palette_ram[(palette_group * 4 + palette_index) as usize];
            }
        }
    }
}
