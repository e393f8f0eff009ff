//! Directional edge response and Gaussian smoothing.
//!
//! The watershed floods a scalar relief. That relief is built here: a
//! sign-aware projection of the image gradient onto the inward surface
//! normal of a reference mask, then smoothed with a physically-sized
//! Gaussian so single-voxel noise does not carve spurious basins.

mod directional;
mod smooth;

pub use directional::{
    directional_gradient, DirectionalGradient, DirectionalGradientParams, EdgePolarity,
};
pub use smooth::{gaussian_smooth, GaussianSmooth, GaussianSmoothParams};
