mod disk;
mod image;

pub use disk::DiskSystem;
pub use image::{BlockState, DiskImage, FileInfo, IMAGE_SIZE};
