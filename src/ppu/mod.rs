mod memory;
mod ppu;
mod render;

pub use ppu::{NullVideo, Ppu, VideoSink};
