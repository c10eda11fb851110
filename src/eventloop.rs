use std::time::{Duration, Instant};

use sdl2::event::Event;
use sdl2::keyboard::{Keycode, Mod};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::Canvas;
use sdl2::video::Window;

use crate::apu::AudioSink;
use crate::controller::{Button, CassetteDeck, Key};
use crate::machine::{Machine, Snapshot};
use crate::screen_buffer::{self, ScreenBuffer};
use crate::tas::InputMovie;

/// SDL2 event loop: window, input mapping and frame pacing around the
/// machine driver.
pub struct EventLoop {
    sdl_context: sdl2::Sdl,
    canvas: Option<Canvas<Window>>,
    event_pump: sdl2::EventPump,
    basic_mode: bool,
}

impl EventLoop {
    const MIN_SCALE: f32 = 1.0;
    const MAX_SCALE: f32 = 5.0;
    /// NTSC frame period.
    const FRAME_DURATION: Duration = Duration::from_micros(16_639);

    /// Create the event loop.
    ///
    /// * `headless` - run without a window (machine still paced and driven).
    /// * `video_scale` - window scaling factor, clamped to [1.0, 5.0].
    /// * `basic_mode` - route the host keyboard to the keyboard matrix
    ///   instead of the first controller.
    pub fn new(headless: bool, video_scale: f32, basic_mode: bool) -> Result<Self, String> {
        let sdl_context = sdl2::init()?;
        let event_pump = sdl_context.event_pump()?;

        let canvas = if headless {
            None
        } else {
            Some(Self::create_window_and_canvas(
                &sdl_context,
                Self::clamp_scale(video_scale),
            )?)
        };

        Ok(Self {
            sdl_context,
            canvas,
            event_pump,
            basic_mode,
        })
    }

    /// SDL context, for wiring up the audio device.
    pub fn sdl(&self) -> &sdl2::Sdl {
        &self.sdl_context
    }

    fn clamp_scale(scale: f32) -> f32 {
        if scale < Self::MIN_SCALE {
            log::warn!("Video scale {} below minimum, clamping", scale);
            Self::MIN_SCALE
        } else if scale > Self::MAX_SCALE {
            log::warn!("Video scale {} above maximum, clamping", scale);
            Self::MAX_SCALE
        } else {
            scale
        }
    }

    fn create_window_and_canvas(
        sdl_context: &sdl2::Sdl,
        scale: f32,
    ) -> Result<Canvas<Window>, String> {
        let width = (screen_buffer::WIDTH as f32 * scale) as u32;
        let height = (screen_buffer::HEIGHT as f32 * scale) as u32;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window("famicore", width, height)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        canvas.set_draw_color(sdl2::pixels::Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();
        Ok(canvas)
    }

    /// Drive the machine frame by frame until the window is closed or
    /// Escape is pressed.
    pub fn run<A, C>(
        &mut self,
        machine: &mut Machine,
        audio: &mut A,
        cassette: &mut C,
        mut movie: Option<&mut InputMovie>,
    ) -> Result<(), String>
    where
        A: AudioSink,
        C: CassetteDeck,
    {
        let mut screen = ScreenBuffer::new();
        let mut saved_state: Option<Snapshot> = None;

        let texture_creator = self.canvas.as_ref().map(|c| c.texture_creator());
        let mut texture = match texture_creator.as_ref() {
            Some(creator) => Some(
                creator
                    .create_texture_streaming(
                        PixelFormatEnum::RGB24,
                        screen_buffer::WIDTH as u32,
                        screen_buffer::HEIGHT as u32,
                    )
                    .map_err(|e| e.to_string())?,
            ),
            None => None,
        };

        'running: loop {
            let frame_start = Instant::now();

            for event in self.event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => break 'running,

                    Event::KeyDown {
                        keycode: Some(Keycode::F5),
                        ..
                    } => saved_state = Some(machine.save_state()),

                    Event::KeyDown {
                        keycode: Some(Keycode::F7),
                        ..
                    } => {
                        if let Some(ref snapshot) = saved_state {
                            machine.load_state(snapshot);
                        }
                    }

                    Event::KeyDown {
                        keycode: Some(keycode),
                        keymod,
                        ..
                    } => {
                        if self.basic_mode {
                            if let Some(key) = map_matrix_key(keycode) {
                                let shift =
                                    keymod.intersects(Mod::LSHIFTMOD | Mod::RSHIFTMOD);
                                let ctrl = keymod.intersects(Mod::LCTRLMOD | Mod::RCTRLMOD);
                                machine.press_key(key, shift, ctrl);
                            }
                        } else if let Some(button) = map_button(keycode) {
                            machine.set_button(1, button, true);
                        }
                    }

                    Event::KeyUp {
                        keycode: Some(keycode),
                        ..
                    } => {
                        if !self.basic_mode {
                            if let Some(button) = map_button(keycode) {
                                machine.set_button(1, button, false);
                            }
                        }
                    }

                    _ => {}
                }
            }

            if let Some(ref mut movie) = movie {
                if movie.is_active() {
                    let state = movie.state(machine.frame());
                    machine.set_controller_state(1, state);
                }
            }

            machine.run_frame(&mut screen, audio, cassette);

            if let (Some(canvas), Some(texture)) = (self.canvas.as_mut(), texture.as_mut()) {
                texture
                    .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                        let data = screen.rgb_data();
                        let row_bytes = screen_buffer::WIDTH * 3;
                        if pitch == row_bytes {
                            buffer[..data.len()].copy_from_slice(data);
                        } else {
                            for y in 0..screen_buffer::HEIGHT {
                                let src = &data[y * row_bytes..(y + 1) * row_bytes];
                                buffer[y * pitch..y * pitch + row_bytes].copy_from_slice(src);
                            }
                        }
                    })
                    .map_err(|e| e.to_string())?;
                canvas.clear();
                canvas.copy(texture, None, None)?;
                canvas.present();
            }

            // Hold to the display rate; the core itself runs as fast as driven.
            let elapsed = frame_start.elapsed();
            if elapsed < Self::FRAME_DURATION {
                std::thread::sleep(Self::FRAME_DURATION - elapsed);
            }
        }

        Ok(())
    }
}

/// Host keys for the first controller.
fn map_button(keycode: Keycode) -> Option<Button> {
    match keycode {
        Keycode::X => Some(Button::A),
        Keycode::Z => Some(Button::B),
        Keycode::RShift => Some(Button::Select),
        Keycode::Return => Some(Button::Start),
        Keycode::Up => Some(Button::Up),
        Keycode::Down => Some(Button::Down),
        Keycode::Left => Some(Button::Left),
        Keycode::Right => Some(Button::Right),
        _ => None,
    }
}

/// Host keys for the keyboard matrix.
fn map_matrix_key(keycode: Keycode) -> Option<Key> {
    let key = match keycode {
        Keycode::Num0 => Key::Num0,
        Keycode::Num1 => Key::Num1,
        Keycode::Num2 => Key::Num2,
        Keycode::Num3 => Key::Num3,
        Keycode::Num4 => Key::Num4,
        Keycode::Num5 => Key::Num5,
        Keycode::Num6 => Key::Num6,
        Keycode::Num7 => Key::Num7,
        Keycode::Num8 => Key::Num8,
        Keycode::Num9 => Key::Num9,
        Keycode::A => Key::A,
        Keycode::B => Key::B,
        Keycode::C => Key::C,
        Keycode::D => Key::D,
        Keycode::E => Key::E,
        Keycode::F => Key::F,
        Keycode::G => Key::G,
        Keycode::H => Key::H,
        Keycode::I => Key::I,
        Keycode::J => Key::J,
        Keycode::K => Key::K,
        Keycode::L => Key::L,
        Keycode::M => Key::M,
        Keycode::N => Key::N,
        Keycode::O => Key::O,
        Keycode::P => Key::P,
        Keycode::Q => Key::Q,
        Keycode::R => Key::R,
        Keycode::S => Key::S,
        Keycode::T => Key::T,
        Keycode::U => Key::U,
        Keycode::V => Key::V,
        Keycode::W => Key::W,
        Keycode::X => Key::X,
        Keycode::Y => Key::Y,
        Keycode::Z => Key::Z,
        Keycode::F1 => Key::F1,
        Keycode::F2 => Key::F2,
        Keycode::F3 => Key::F3,
        Keycode::F4 => Key::F4,
        Keycode::F6 => Key::F6,
        Keycode::F8 => Key::F8,
        Keycode::Minus => Key::Minus,
        Keycode::Caret => Key::Caret,
        Keycode::At => Key::At,
        Keycode::LeftBracket => Key::LeftBracket,
        Keycode::RightBracket => Key::RightBracket,
        Keycode::Return => Key::Return,
        Keycode::Semicolon => Key::Semicolon,
        Keycode::Colon => Key::Colon,
        Keycode::Comma => Key::Comma,
        Keycode::Period => Key::Period,
        Keycode::Slash => Key::Slash,
        Keycode::Underscore => Key::Underscore,
        Keycode::Space => Key::Space,
        Keycode::Home => Key::ClrHome,
        Keycode::Insert => Key::Ins,
        Keycode::Delete => Key::Del,
        Keycode::Backspace => Key::Del,
        Keycode::Up => Key::Up,
        Keycode::Down => Key::Down,
        Keycode::Left => Key::Left,
        Keycode::Right => Key::Right,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_headless_event_loop_creation() {
        // SDL may be unavailable entirely in some environments; that is not
        // a failure of the event loop itself.
        match EventLoop::new(true, 1.0, false) {
            Ok(event_loop) => assert!(event_loop.canvas.is_none()),
            Err(_) => {}
        }
    }

    #[test]
    fn test_button_mapping_covers_all_eight() {
        let mapped = [
            Keycode::X,
            Keycode::Z,
            Keycode::RShift,
            Keycode::Return,
            Keycode::Up,
            Keycode::Down,
            Keycode::Left,
            Keycode::Right,
        ];
        for keycode in mapped {
            assert!(map_button(keycode).is_some());
        }
        assert!(map_button(Keycode::Q).is_none());
    }

    #[test]
    fn test_matrix_mapping() {
        assert_eq!(map_matrix_key(Keycode::A), Some(Key::A));
        assert_eq!(map_matrix_key(Keycode::Return), Some(Key::Return));
        assert_eq!(map_matrix_key(Keycode::F7), None);
    }
}
