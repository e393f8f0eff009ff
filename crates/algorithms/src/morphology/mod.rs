//! Physically-scaled binary morphology.
//!
//! Structuring radii are given in millimetres and converted to per-axis
//! voxel counts through the volume's [`Spacing`], so a 3 mm erosion removes
//! the same physical shell on anisotropic acquisitions as on isotropic
//! ones. Everything outside the volume counts as background.

mod dilate;
mod erode;
mod fill_holes;

pub use dilate::{dilate, Dilate, DilateParams};
pub use erode::{erode, Erode, ErodeParams};
pub use fill_holes::{fill_holes, FillHoles, FillHolesParams};

use crate::maybe_rayon::*;
use ndarray::{Array3, ArrayView3};
use voxsurf_core::{Error, Result, Spacing, Volume};

/// Windowed reduction applied along each lane
#[derive(Debug, Clone, Copy)]
pub(crate) enum LaneOp {
    /// Keep a voxel only if the whole window is foreground (erosion)
    Min,
    /// Set a voxel if any window voxel is foreground (dilation)
    Max,
}

/// Convert a physical radius to per-axis voxel counts.
///
/// Non-positive and sub-voxel radii are clamped to the identity operation
/// and logged, rather than aborting the pipeline.
pub(crate) fn resolve_radius(
    op: &str,
    radius_mm: f64,
    spacing: &Spacing,
) -> Option<(usize, usize, usize)> {
    if !radius_mm.is_finite() || radius_mm <= 0.0 {
        tracing::warn!(op, radius_mm, "non-positive radius, applying as a no-op");
        return None;
    }
    let radii = spacing.voxel_radii(radius_mm);
    if radii == (0, 0, 0) {
        tracing::warn!(
            op,
            radius_mm,
            spacing = %spacing,
            "radius rounds to zero voxels on every axis, applying as a no-op"
        );
        return None;
    }
    Some(radii)
}

/// Run a separable min/max box filter with per-axis radii `(rz, ry, rx)`.
///
/// Any non-zero input voxel counts as foreground; the output is strictly
/// {0, 1} valued. Each axis is processed with a sliding window over lanes,
/// lanes are independent and processed in parallel.
pub(crate) fn separable_pass(
    mask: &Volume<u8>,
    radii: (usize, usize, usize),
    op: LaneOp,
) -> Result<Volume<u8>> {
    let (rz, ry, rx) = radii;
    let mut current: Array3<u8> = mask.data().mapv(|v| u8::from(v != 0));

    if rx > 0 {
        current = lane_pass(current.view(), rx, op)?;
    }
    if ry > 0 {
        // lanes along y: view as (z, x, y), filter, permute back
        let out = lane_pass(current.view().permuted_axes([0, 2, 1]), ry, op)?;
        current = out
            .permuted_axes([0, 2, 1])
            .as_standard_layout()
            .into_owned();
    }
    if rz > 0 {
        // lanes along z: view as (y, x, z), filter, permute back
        let out = lane_pass(current.view().permuted_axes([1, 2, 0]), rz, op)?;
        current = out
            .permuted_axes([2, 0, 1])
            .as_standard_layout()
            .into_owned();
    }

    let mut result = Volume::from_array(current);
    result.set_spacing(*mask.spacing());
    Ok(result)
}

/// Apply a windowed min/max along the last axis of `src`.
fn lane_pass(src: ArrayView3<'_, u8>, r: usize, op: LaneOp) -> Result<Array3<u8>> {
    let (d0, d1, n) = src.dim();
    let data: Vec<u8> = (0..d0 * d1)
        .into_par_iter()
        .flat_map(|idx| {
            let a = idx / d1;
            let b = idx % d1;
            let mut lane = vec![0u8; n];
            match op {
                LaneOp::Min => min_lane(&src, a, b, r, &mut lane),
                LaneOp::Max => max_lane(&src, a, b, r, &mut lane),
            }
            lane
        })
        .collect();

    Array3::from_shape_vec((d0, d1, n), data).map_err(|e| Error::Other(e.to_string()))
}

/// Erosion lane: a window reaching outside the lane always contains
/// background, so the first and last `r` positions stay 0.
fn min_lane(src: &ArrayView3<'_, u8>, a: usize, b: usize, r: usize, lane: &mut [u8]) {
    let n = lane.len();
    if n < 2 * r + 1 {
        return;
    }
    let mut zeros = (0..=2 * r).filter(|&i| src[(a, b, i)] == 0).count();
    for c in r..n - r {
        if zeros == 0 {
            lane[c] = 1;
        }
        if c + r + 1 < n {
            if src[(a, b, c - r)] == 0 {
                zeros -= 1;
            }
            if src[(a, b, c + r + 1)] == 0 {
                zeros += 1;
            }
        }
    }
}

/// Dilation lane: windows are clipped at the lane ends, background outside
/// the volume never contributes foreground.
fn max_lane(src: &ArrayView3<'_, u8>, a: usize, b: usize, r: usize, lane: &mut [u8]) {
    let n = lane.len();
    if n == 0 {
        return;
    }
    let mut ones = (0..=r.min(n - 1)).filter(|&i| src[(a, b, i)] != 0).count();
    for c in 0..n {
        if c > 0 {
            if c + r < n && src[(a, b, c + r)] != 0 {
                ones += 1;
            }
            if c >= r + 1 && src[(a, b, c - r - 1)] != 0 {
                ones -= 1;
            }
        }
        if ones > 0 {
            lane[c] = 1;
        }
    }
}
