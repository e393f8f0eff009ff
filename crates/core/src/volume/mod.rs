//! Volume data structures and operations

mod element;
mod grid;
mod neighborhood;
mod spacing;

pub use element::VoxelElement;
pub use grid::{check_same_geometry, Volume, VolumeStatistics};
pub use neighborhood::Connectivity;
pub use spacing::Spacing;
