//! # VoxSurf Core
//!
//! Core types and I/O for the VoxSurf surface segmentation library.
//!
//! This crate provides:
//! - `Volume<T>`: Generic 3D voxel grid with physical spacing
//! - `Spacing`: Per-axis voxel size in millimetres
//! - `Connectivity`: 6/18/26 voxel neighborhoods
//! - Label constants shared by masks and marker volumes
//! - Algorithm trait for a consistent API
//! - Native NIfTI-1 volume I/O

pub mod error;
pub mod io;
pub mod volume;

pub use error::{Error, Result};
pub use volume::{Connectivity, Spacing, Volume, VoxelElement};

/// Label alphabet used by mask and marker volumes.
///
/// `FOREGROUND` is deliberately the lowest non-zero value; marker
/// combination prefers it explicitly rather than relying on numeric order.
pub mod labels {
    /// Voxel not yet claimed by any marker region
    pub const UNLABELED: u8 = 0;
    /// Confident object marker / selected output value
    pub const FOREGROUND: u8 = 1;
    /// Confident background marker
    pub const BACKGROUND: u8 = 2;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::labels;
    pub use crate::volume::{Connectivity, Spacing, Volume, VoxelElement};
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in VoxSurf.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
