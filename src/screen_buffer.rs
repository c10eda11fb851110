use crate::ppu::VideoSink;

pub const WIDTH: usize = 256;
pub const HEIGHT: usize = 240;
const BYTES_PER_PIXEL: usize = 3;

/// Composite palette: RGB for each of the 64 hardware colors.
const PALETTE: [(u8, u8, u8); 64] = [
    (0x66, 0x66, 0x66), (0x00, 0x2A, 0x88), (0x14, 0x12, 0xA7), (0x3B, 0x00, 0xA4),
    (0x5C, 0x00, 0x7E), (0x6E, 0x00, 0x40), (0x6C, 0x06, 0x00), (0x56, 0x1D, 0x00),
    (0x33, 0x35, 0x00), (0x0B, 0x48, 0x00), (0x00, 0x52, 0x00), (0x00, 0x4F, 0x08),
    (0x00, 0x40, 0x4D), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xAD, 0xAD, 0xAD), (0x15, 0x5F, 0xD9), (0x42, 0x40, 0xFF), (0x75, 0x27, 0xFE),
    (0xA0, 0x1A, 0xCC), (0xB7, 0x1E, 0x7B), (0xB5, 0x31, 0x20), (0x99, 0x4E, 0x00),
    (0x6B, 0x6D, 0x00), (0x38, 0x87, 0x00), (0x0C, 0x93, 0x00), (0x00, 0x8F, 0x32),
    (0x00, 0x7C, 0x8D), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFE, 0xFF), (0x64, 0xB0, 0xFF), (0x92, 0x90, 0xFF), (0xC6, 0x76, 0xFF),
    (0xF3, 0x6A, 0xFF), (0xFE, 0x6E, 0xCC), (0xFE, 0x81, 0x70), (0xEA, 0x9E, 0x22),
    (0xBC, 0xBE, 0x00), (0x88, 0xD8, 0x00), (0x5C, 0xE4, 0x30), (0x45, 0xE0, 0x82),
    (0x48, 0xCD, 0xDE), (0x4F, 0x4F, 0x4F), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
    (0xFF, 0xFE, 0xFF), (0xC0, 0xDF, 0xFF), (0xD3, 0xD2, 0xFF), (0xE8, 0xC8, 0xFF),
    (0xFB, 0xC2, 0xFF), (0xFE, 0xC4, 0xEA), (0xFE, 0xCC, 0xC5), (0xF7, 0xD8, 0xA5),
    (0xE4, 0xE5, 0x94), (0xCF, 0xEF, 0x96), (0xBD, 0xF4, 0xAB), (0xB3, 0xF3, 0xCC),
    (0xB5, 0xEB, 0xF2), (0xB8, 0xB8, 0xB8), (0x00, 0x00, 0x00), (0x00, 0x00, 0x00),
];

/// RGB framebuffer fed one indexed-color scanline at a time.
#[derive(Clone)]
pub struct ScreenBuffer {
    buffer: Vec<u8>,
}

impl Default for ScreenBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenBuffer {
    pub fn new() -> Self {
        Self {
            buffer: vec![0; WIDTH * HEIGHT * BYTES_PER_PIXEL],
        }
    }

    /// Raw RGB24 data, row-major, for texture upload.
    pub fn rgb_data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> (u8, u8, u8) {
        let offset = (y * WIDTH + x) * BYTES_PER_PIXEL;
        (
            self.buffer[offset],
            self.buffer[offset + 1],
            self.buffer[offset + 2],
        )
    }
}

impl VideoSink for ScreenBuffer {
    fn draw_scanline(&mut self, scanline: u16, colors: &[u8; 256]) {
        if scanline as usize >= HEIGHT {
            return;
        }
        let row = scanline as usize * WIDTH * BYTES_PER_PIXEL;
        for (x, color) in colors.iter().enumerate() {
            let (r, g, b) = PALETTE[(color & 0x3F) as usize];
            let offset = row + x * BYTES_PER_PIXEL;
            self.buffer[offset] = r;
            self.buffer[offset + 1] = g;
            self.buffer[offset + 2] = b;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_starts_black() {
        let screen = ScreenBuffer::new();
        assert_eq!(screen.get_pixel(0, 0), (0, 0, 0));
        assert_eq!(screen.get_pixel(255, 239), (0, 0, 0));
    }

    #[test]
    fn test_scanline_lands_on_its_row() {
        let mut screen = ScreenBuffer::new();
        let mut colors = [0u8; 256];
        colors[0] = 0x16;
        colors[255] = 0x2A;
        screen.draw_scanline(10, &colors);
        assert_eq!(screen.get_pixel(0, 10), PALETTE[0x16]);
        assert_eq!(screen.get_pixel(255, 10), PALETTE[0x2A]);
        assert_eq!(screen.get_pixel(0, 11), (0, 0, 0));
    }

    #[test]
    fn test_color_index_is_masked() {
        let mut screen = ScreenBuffer::new();
        let colors = [0xFFu8; 256];
        screen.draw_scanline(0, &colors);
        assert_eq!(screen.get_pixel(0, 0), PALETTE[0x3F]);
    }

    #[test]
    fn test_out_of_range_scanline_is_ignored() {
        let mut screen = ScreenBuffer::new();
        let colors = [0x20u8; 256];
        screen.draw_scanline(240, &colors);
        assert_eq!(screen.get_pixel(0, 239), (0, 0, 0));
    }
}
