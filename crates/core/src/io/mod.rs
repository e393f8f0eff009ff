//! I/O operations for reading and writing volumes

mod nifti;

pub use nifti::{read_volume, read_volume_info, write_volume, DataType, VolumeInfo};
