//! # VoxSurf Algorithms
//!
//! Segmentation algorithms for the VoxSurf surface extraction library.
//!
//! ## Modules
//!
//! - **morphology**: physically-scaled binary erosion, dilation and hole filling
//! - **distance**: chamfer distance transforms used to orient gradients
//! - **gradient**: directional gradient computation and Gaussian smoothing
//! - **markers**: marker construction and fiducial injection
//! - **watershed**: marker-controlled priority-flood labeling
//! - **segmentation**: the two-stage surface extraction pipeline

pub mod distance;
pub mod gradient;
pub mod markers;
pub(crate) mod maybe_rayon;
pub mod morphology;
pub mod segmentation;
pub mod watershed;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::gradient::{
        directional_gradient, gaussian_smooth, DirectionalGradientParams, EdgePolarity,
    };
    pub use crate::markers::{
        build_markers, combine_prefer_foreground, inject_fiducials, select_label, MarkerParams,
        MarkerSet,
    };
    pub use crate::morphology::{dilate, erode, fill_holes};
    pub use crate::segmentation::{
        run_segmentation, DebugSink, NullSink, SegmentationParams,
    };
    pub use crate::watershed::{watershed, Watershed, WatershedParams};
    pub use voxsurf_core::prelude::*;
}
