//! Marker-controlled watershed labeling.
//!
//! A priority flood over a scalar relief: seeded voxels expand into
//! unlabeled territory in order of increasing relief value, so every
//! voxel ends up with the label of the marker that reaches it along the
//! lowest path. No watershed line is produced; every voxel gets a label.

mod flood;

pub use flood::{watershed, Watershed, WatershedParams};
