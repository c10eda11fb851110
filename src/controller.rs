/// Standard controller button, by shift-register bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

/// Standard controller: an 8-bit state latched by the strobe line and read
/// out one bit at a time through a shift register.
#[derive(Clone)]
pub struct Joypad {
    state: u8,
    strobe: bool,
    shift: u8,
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            state: 0,
            strobe: false,
            shift: 0,
        }
    }

    /// Replace the whole button byte (scripted input, frame injection).
    pub fn set_state(&mut self, state: u8) {
        self.state = state;
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        let mask = 1 << button as u8;
        if pressed {
            self.state |= mask;
        } else {
            self.state &= !mask;
        }
    }

    /// Strobe line write. While high the shift position stays at zero.
    pub fn write_strobe(&mut self, value: u8) {
        self.strobe = value & 0x01 != 0;
        if self.strobe {
            self.shift = 0;
        }
    }

    /// Serial read. While strobed, always the A button; afterwards one bit
    /// per read, and zero once all eight bits have been shifted out.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.state & 0x01;
        }
        let bit = if self.shift < 8 {
            (self.state >> self.shift) & 0x01
        } else {
            0
        };
        self.shift = self.shift.saturating_add(1);
        bit
    }
}

/// Keys of the 72-key data-keyboard matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    None,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    F1, F2, F3, F4, F5, F6, F7, F8,
    Minus, Caret, Yen, Stop, Esc, At, LeftBracket, RightBracket,
    Return, Ctr, Semicolon, Colon, Kana, LeftShift, RightShift,
    Comma, Period, Slash, Underscore, Grph, Space, ClrHome, Ins, Del,
    Up, Down, Left, Right,
}

/// Key layout as a (row, column half) -> four keys table. Within a nibble the
/// keys map to bits 0x10, 0x08, 0x04 and 0x02, active low on the port.
const MATRIX: [[[Key; 4]; 2]; 9] = [
    [
        [Key::RightBracket, Key::LeftBracket, Key::Return, Key::F8],
        [Key::Stop, Key::Yen, Key::RightShift, Key::Kana],
    ],
    [
        [Key::Semicolon, Key::Colon, Key::At, Key::F7],
        [Key::Caret, Key::Minus, Key::Slash, Key::Underscore],
    ],
    [
        [Key::K, Key::L, Key::O, Key::F6],
        [Key::Num0, Key::P, Key::Comma, Key::Period],
    ],
    [
        [Key::J, Key::U, Key::I, Key::F5],
        [Key::Num8, Key::Num9, Key::N, Key::M],
    ],
    [
        [Key::H, Key::G, Key::Y, Key::F4],
        [Key::Num6, Key::Num7, Key::V, Key::B],
    ],
    [
        [Key::D, Key::R, Key::T, Key::F3],
        [Key::Num4, Key::Num5, Key::C, Key::F],
    ],
    [
        [Key::A, Key::S, Key::W, Key::F2],
        [Key::Num3, Key::E, Key::Z, Key::X],
    ],
    [
        [Key::Ctr, Key::Q, Key::Esc, Key::F1],
        [Key::Num2, Key::Num1, Key::Grph, Key::LeftShift],
    ],
    [
        [Key::Left, Key::Right, Key::Up, Key::ClrHome],
        [Key::Ins, Key::Del, Key::Space, Key::Down],
    ],
];

const MATRIX_BITS: [u8; 4] = [0x10, 0x08, 0x04, 0x02];

/// Keyboard half of the expansion port: a row counter stepped by writes to
/// the strobe register and a column select line, returning active-low key
/// levels on the second controller port.
#[derive(Clone)]
pub struct Keyboard {
    pub enabled: bool,
    col_select: bool,
    row_counter: u8,
    port: u8,
    key: Key,
    shift: bool,
    ctrl: bool,
    persist: u8,
    pub cassette_dac: bool,
    pub cassette_adc: bool,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            enabled: false,
            col_select: false,
            row_counter: 0,
            port: 0xFF,
            key: Key::None,
            shift: false,
            ctrl: false,
            persist: 0,
            cassette_dac: false,
            cassette_adc: false,
        }
    }

    /// Latch a pressed key. The key persists for two frames so the matrix
    /// scan running once per frame cannot miss it.
    pub fn set_key(&mut self, key: Key, shift: bool, ctrl: bool) {
        self.key = key;
        self.shift = shift;
        self.ctrl = ctrl;
        self.persist = 2;
    }

    /// Frame-boundary decay of the latched key.
    pub fn clear_key(&mut self) {
        if self.persist > 0 {
            self.persist -= 1;
        } else {
            self.key = Key::None;
            self.shift = false;
            self.ctrl = false;
        }
    }

    /// Strobe-register write: bit 2 enables the keyboard, bit 1 selects the
    /// column half (advancing the row counter on its falling edge), bit 0
    /// resets the scan and doubles as the cassette output level.
    pub fn write_control(&mut self, value: u8) {
        self.enabled = value & 0x04 != 0;
        if self.enabled {
            if self.col_select && value & 0x02 == 0 {
                self.row_counter = self.row_counter.wrapping_add(1);
            }
            self.col_select = value & 0x02 != 0;
        }
        if value & 0x01 != 0 {
            self.row_counter = 0;
            self.cassette_dac = true;
        } else {
            self.cassette_dac = false;
        }
        self.port = self.port_level(self.row_counter, self.col_select);
    }

    /// Current matrix levels on the keyboard port.
    pub fn read_port(&self) -> u8 {
        self.port
    }

    /// Cassette input level as seen on the first controller port.
    pub fn read_cassette(&self) -> u8 {
        (self.cassette_adc as u8) << 1
    }

    fn port_level(&self, row: u8, col_select: bool) -> u8 {
        let mut port = 0xFF;
        if row as usize >= MATRIX.len() {
            return port;
        }
        let keys = &MATRIX[row as usize][col_select as usize];
        for (key, mask) in keys.iter().zip(MATRIX_BITS) {
            if self.key == *key {
                port &= !mask;
            }
        }
        // Modifier keys are held, not typed; honor them on their own slots.
        if row == 0 && col_select && self.shift {
            port &= !0x04;
        }
        if row == 7 && !col_select && self.ctrl {
            port &= !0x10;
        }
        port
    }
}

/// Data-recorder line at the interface boundary: the core feeds it the DAC
/// level every tick and takes back an ADC level when one is available.
pub trait CassetteDeck {
    fn tick(&mut self, dac: bool) -> Option<bool>;
}

/// Deck with no tape inserted.
pub struct NullCassette;

impl CassetteDeck for NullCassette {
    fn tick(&mut self, _dac: bool) -> Option<bool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joypad_strobe_returns_a_button() {
        let mut joypad = Joypad::new();
        joypad.set_button(Button::A, true);
        joypad.write_strobe(1);
        assert_eq!(joypad.read(), 1);
        assert_eq!(joypad.read(), 1);
    }

    #[test]
    fn test_joypad_shift_sequence() {
        let mut joypad = Joypad::new();
        joypad.set_button(Button::A, true);
        joypad.set_button(Button::Start, true);
        joypad.write_strobe(1);
        joypad.write_strobe(0);
        let bits: Vec<u8> = (0..8).map(|_| joypad.read()).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_joypad_reads_past_eight_return_zero() {
        let mut joypad = Joypad::new();
        joypad.set_state(0xFF);
        joypad.write_strobe(1);
        joypad.write_strobe(0);
        for _ in 0..8 {
            assert_eq!(joypad.read(), 1);
        }
        assert_eq!(joypad.read(), 0);
    }

    #[test]
    fn test_joypad_strobe_resets_shift() {
        let mut joypad = Joypad::new();
        joypad.set_state(0b0000_0001);
        joypad.write_strobe(1);
        joypad.write_strobe(0);
        joypad.read();
        joypad.read();
        joypad.write_strobe(1);
        joypad.write_strobe(0);
        assert_eq!(joypad.read(), 1);
    }

    #[test]
    fn test_keyboard_row_advances_on_falling_column_edge() {
        let mut keyboard = Keyboard::new();
        keyboard.write_control(0x04 | 0x02); // enable, column high
        keyboard.write_control(0x04); // falling edge
        keyboard.set_key(Key::Semicolon, false, false);
        keyboard.write_control(0x04);
        // Row 1, column 0: semicolon pulls bit 0x10 low
        assert_eq!(keyboard.read_port() & 0x10, 0);
    }

    #[test]
    fn test_keyboard_reset_returns_to_row_zero() {
        let mut keyboard = Keyboard::new();
        keyboard.write_control(0x04 | 0x02);
        keyboard.write_control(0x04);
        keyboard.write_control(0x04 | 0x01); // reset scan
        keyboard.set_key(Key::Return, false, false);
        keyboard.write_control(0x04);
        assert_eq!(keyboard.read_port() & 0x04, 0);
    }

    #[test]
    fn test_keyboard_idle_port_is_high() {
        let mut keyboard = Keyboard::new();
        keyboard.write_control(0x04);
        assert_eq!(keyboard.read_port(), 0xFF);
    }

    #[test]
    fn test_keyboard_shift_modifier() {
        let mut keyboard = Keyboard::new();
        keyboard.set_key(Key::A, true, false);
        keyboard.write_control(0x04 | 0x02); // row 0, column 1
        assert_eq!(keyboard.read_port() & 0x04, 0);
    }

    #[test]
    fn test_key_persists_for_two_frames() {
        let mut keyboard = Keyboard::new();
        keyboard.set_key(Key::Q, false, false);
        keyboard.clear_key();
        keyboard.clear_key();
        assert_eq!(keyboard.key, Key::Q);
        keyboard.clear_key();
        assert_eq!(keyboard.key, Key::None);
    }

    #[test]
    fn test_cassette_dac_follows_strobe_bit() {
        let mut keyboard = Keyboard::new();
        keyboard.write_control(0x05);
        assert!(keyboard.cassette_dac);
        keyboard.write_control(0x04);
        assert!(!keyboard.cassette_dac);
    }
}
