//! Data-recorder deck backed by 8-bit mono WAV files.

use std::fs;
use std::io;
use std::path::Path;

use log::info;

use crate::controller::CassetteDeck;

/// CPU clock, the internal sample rate of the cassette line.
const INTERNAL_SAMPLE_RATE: u32 = 1_789_773;
/// Sample rate of the WAV files read and written.
const WAV_SAMPLE_RATE: u32 = 44100;
/// Cassette line ticks per WAV sample.
const TICKS_PER_SAMPLE: u32 = INTERNAL_SAMPLE_RATE / WAV_SAMPLE_RATE;

const HEADER_SIZE: usize = 44;

/// WAV-file cassette deck. Playback feeds the ADC line; recording samples
/// the DAC line. Both run at the fixed tick ratio of the driver.
#[derive(Default)]
pub struct WavCassette {
    cycle: u32,
    playback: Option<(Vec<u8>, usize)>,
    recording: Option<(String, Vec<u8>)>,
}

impl WavCassette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start playback of a WAV file. The file must be 8-bit mono PCM at the
    /// supported sample rate.
    pub fn load_file(&mut self, path: &Path) -> io::Result<()> {
        if self.playback.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "Cassette playback already in progress",
            ));
        }
        let data = fs::read(path)?;
        if data.len() < HEADER_SIZE || &data[0..4] != b"RIFF" {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Not a WAV file"));
        }
        let sample_rate = u32::from_le_bytes([data[24], data[25], data[26], data[27]]);
        let channels = u16::from_le_bytes([data[22], data[23]]);
        let bits_per_sample = u16::from_le_bytes([data[34], data[35]]);
        if sample_rate != WAV_SAMPLE_RATE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported sample rate: {}", sample_rate),
            ));
        }
        if channels != 1 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported channel count: {}", channels),
            ));
        }
        if bits_per_sample != 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported bits per sample: {}", bits_per_sample),
            ));
        }
        info!("Cassette playback started: {}", path.display());
        self.playback = Some((data[HEADER_SIZE..].to_vec(), 0));
        Ok(())
    }

    /// Start recording the DAC line into a sample buffer written on stop.
    pub fn record_start(&mut self, path: &str) -> io::Result<()> {
        if self.recording.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "Cassette recording already in progress",
            ));
        }
        self.recording = Some((path.to_string(), Vec::new()));
        Ok(())
    }

    /// Finish recording and write the WAV file.
    pub fn record_stop(&mut self) -> io::Result<()> {
        let (path, samples) = self.recording.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "No cassette recording in progress")
        })?;
        let mut out = Vec::with_capacity(HEADER_SIZE + samples.len());
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&WAV_SAMPLE_RATE.to_le_bytes());
        out.extend_from_slice(&WAV_SAMPLE_RATE.to_le_bytes()); // byte rate
        out.extend_from_slice(&1u16.to_le_bytes()); // block align
        out.extend_from_slice(&8u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(samples.len() as u32).to_le_bytes());
        out.extend_from_slice(&samples);
        fs::write(&path, out)?;
        info!("Cassette recording written: {}", path);
        Ok(())
    }
}

impl CassetteDeck for WavCassette {
    fn tick(&mut self, dac: bool) -> Option<bool> {
        self.cycle = self.cycle.wrapping_add(1);
        if self.cycle % TICKS_PER_SAMPLE != 0 {
            return None;
        }

        if let Some((_, samples)) = self.recording.as_mut() {
            samples.push(if dac { u8::MAX } else { 0 });
        }

        let mut level = None;
        let mut exhausted = false;
        if let Some((samples, position)) = self.playback.as_mut() {
            match samples.get(*position) {
                Some(&sample) => {
                    *position += 1;
                    level = Some(sample > 128);
                }
                None => exhausted = true, // tape ran out
            }
        }
        if exhausted {
            self.playback = None;
        }
        level
    }
}
