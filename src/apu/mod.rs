mod apu;
mod noise;
mod pulse;
mod triangle;

pub use apu::{Apu, AudioSink, NullAudio, LENGTH_TABLE};
pub use noise::Noise;
pub use pulse::Pulse;
pub use triangle::Triangle;
