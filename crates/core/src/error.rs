//! Error types for VoxSurf

use thiserror::Error;

/// Main error type for VoxSurf operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid volume dimensions: expected {expected} voxels, got {actual}")]
    InvalidDimensions { expected: usize, actual: usize },

    #[error("Index out of bounds: ({z}, {y}, {x}) in volume of size ({nz}, {ny}, {nx})")]
    IndexOutOfBounds {
        z: usize,
        y: usize,
        x: usize,
        nz: usize,
        ny: usize,
        nx: usize,
    },

    #[error("Volume geometry mismatch: expected {expected}, got {actual}")]
    GeometryMismatch { expected: String, actual: String },

    #[error("{path} is not a 3D volume (got {ndim} dimensions)")]
    NotVolume { path: String, ndim: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Watershed left {unlabeled} voxels unlabeled; marker set does not cover the volume")]
    WatershedConsistency { unlabeled: usize },

    #[error("Malformed volume file: {0}")]
    Format(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for VoxSurf operations
pub type Result<T> = std::result::Result<T, Error>;
