//! Binary erosion with a physical radius

use super::{resolve_radius, separable_pass, LaneOp};
use voxsurf_core::{Algorithm, Error, Result, Volume};

/// Erode a binary mask by a physical radius in millimetres.
///
/// A voxel survives only if the whole box neighborhood implied by the
/// radius is foreground. Voxels outside the volume count as background,
/// so foreground touching the border is always peeled.
///
/// A non-positive radius, or one that rounds to zero voxels on every
/// axis, degrades to a copy of the input and a warning.
pub fn erode(mask: &Volume<u8>, radius_mm: f64) -> Result<Volume<u8>> {
    match resolve_radius("erode", radius_mm, mask.spacing()) {
        Some(radii) => separable_pass(mask, radii, LaneOp::Min),
        None => Ok(mask.clone()),
    }
}

/// Parameters for [`Erode`]
#[derive(Debug, Clone, Copy)]
pub struct ErodeParams {
    /// Structuring radius in millimetres
    pub radius_mm: f64,
}

impl Default for ErodeParams {
    fn default() -> Self {
        Self { radius_mm: 1.0 }
    }
}

/// Binary erosion algorithm
pub struct Erode;

impl Algorithm for Erode {
    type Input = Volume<u8>;
    type Output = Volume<u8>;
    type Params = ErodeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "erode"
    }

    fn description(&self) -> &'static str {
        "Binary erosion by a physical radius in millimetres"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        erode(&input, params.radius_mm)
    }
}
