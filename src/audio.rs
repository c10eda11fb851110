//! SDL2 audio output: a four-voice synthesizer driven by the
//! frequency/volume pairs the audio channel processor emits.

use std::sync::{Arc, Mutex};

use sdl2::audio::{AudioCallback, AudioDevice, AudioSpecDesired};

use crate::apu::AudioSink;

#[derive(Clone, Copy, Default)]
struct Voice {
    frequency: f32,
    volume: f32,
}

#[derive(Clone, Copy, Default)]
struct Channels {
    pulses: [Voice; 2],
    triangle: Voice,
    noise: Voice,
}

/// Audio output handler owning the SDL2 device and the shared channel state.
pub struct AudioOutput {
    device: AudioDevice<Synth>,
    channels: Arc<Mutex<Channels>>,
}

impl AudioOutput {
    /// Open the default playback device at the given sample rate.
    pub fn new(sdl_context: &sdl2::Sdl, sample_rate: i32) -> Result<Self, String> {
        let audio_subsystem = sdl_context.audio()?;
        let channels = Arc::new(Mutex::new(Channels::default()));

        let desired_spec = AudioSpecDesired {
            freq: Some(sample_rate),
            channels: Some(1),
            samples: None,
        };

        let callback_channels = channels.clone();
        let device = audio_subsystem.open_playback(None, &desired_spec, |spec| Synth {
            channels: callback_channels,
            sample_rate: spec.freq as f32,
            phases: [0.0; 4],
            lfsr: 0x0001,
            noise_timer: 0.0,
            noise_level: 1.0,
        })?;

        Ok(Self { device, channels })
    }

    pub fn resume(&self) {
        self.device.resume();
    }

    pub fn pause(&self) {
        self.device.pause();
    }
}

impl AudioSink for AudioOutput {
    fn pulse_update(&mut self, channel: usize, frequency: u32, volume: u8) {
        let mut channels = self.channels.lock().unwrap();
        channels.pulses[channel] = Voice {
            frequency: frequency as f32,
            volume: volume as f32 / 255.0,
        };
    }

    fn triangle_update(&mut self, frequency: u32) {
        let mut channels = self.channels.lock().unwrap();
        channels.triangle = Voice {
            frequency: frequency as f32,
            volume: if frequency > 0 { 1.0 } else { 0.0 },
        };
    }

    fn noise_update(&mut self, frequency: u32, volume: u8) {
        let mut channels = self.channels.lock().unwrap();
        channels.noise = Voice {
            frequency: frequency as f32,
            volume: volume as f32 / 255.0,
        };
    }
}

/// Callback-side synthesizer: two squares, a triangle and a shift-register
/// noise voice.
struct Synth {
    channels: Arc<Mutex<Channels>>,
    sample_rate: f32,
    phases: [f32; 4],
    lfsr: u16,
    noise_timer: f32,
    noise_level: f32,
}

impl Synth {
    fn square(&mut self, voice: Voice, index: usize) -> f32 {
        if voice.volume == 0.0 || voice.frequency == 0.0 {
            return 0.0;
        }
        self.phases[index] = (self.phases[index] + voice.frequency / self.sample_rate).fract();
        if self.phases[index] < 0.5 {
            voice.volume
        } else {
            -voice.volume
        }
    }

    fn triangle(&mut self, voice: Voice) -> f32 {
        if voice.volume == 0.0 || voice.frequency == 0.0 {
            return 0.0;
        }
        self.phases[2] = (self.phases[2] + voice.frequency / self.sample_rate).fract();
        (4.0 * (self.phases[2] - 0.5).abs() - 1.0) * voice.volume
    }

    fn noise(&mut self, voice: Voice) -> f32 {
        if voice.volume == 0.0 || voice.frequency == 0.0 {
            return 0.0;
        }
        self.noise_timer += voice.frequency / self.sample_rate;
        while self.noise_timer >= 1.0 {
            self.noise_timer -= 1.0;
            // 15-bit feedback shift register
            let feedback = (self.lfsr ^ (self.lfsr >> 1)) & 0x1;
            self.lfsr = (self.lfsr >> 1) | (feedback << 14);
            self.noise_level = if self.lfsr & 0x1 != 0 { 1.0 } else { -1.0 };
        }
        self.noise_level * voice.volume
    }
}

impl AudioCallback for Synth {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        let channels = *self.channels.lock().unwrap();
        for sample in out.iter_mut() {
            let mut mixed = 0.0;
            mixed += self.square(channels.pulses[0], 0);
            mixed += self.square(channels.pulses[1], 1);
            mixed += self.triangle(channels.triangle);
            mixed += self.noise(channels.noise);
            *sample = mixed * 0.25;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_audio_creation_and_control() {
        // No audio device in a headless environment is not a failure of ours.
        let Ok(sdl_context) = sdl2::init() else {
            return;
        };
        let Ok(audio) = AudioOutput::new(&sdl_context, 44100) else {
            return;
        };
        audio.resume();
        audio.pause();
    }

    #[test]
    #[serial]
    fn test_sink_updates_shared_state() {
        let Ok(sdl_context) = sdl2::init() else {
            return;
        };
        let Ok(mut audio) = AudioOutput::new(&sdl_context, 44100) else {
            return;
        };
        audio.pulse_update(0, 440, 240);
        audio.triangle_update(220);
        audio.noise_update(1000, 120);
        let channels = audio.channels.lock().unwrap();
        assert_eq!(channels.pulses[0].frequency, 440.0);
        assert_eq!(channels.triangle.frequency, 220.0);
        assert_eq!(channels.noise.frequency, 1000.0);
    }
}
