//! Two-stage watershed surface extraction.
//!
//! Stage one floods a gradient restricted to a band around the input
//! mask, which pins the front near the expected surface. Stage two
//! re-floods an unrestricted, unclamped gradient using the stage-one
//! result as the object marker, letting the surface relax onto the true
//! edge while the original background marker keeps it from escaping.

use tracing::{debug, info};

use voxsurf_core::labels::FOREGROUND;
use voxsurf_core::volume::check_same_geometry;
use voxsurf_core::{Algorithm, Connectivity, Error, Result, Volume, VoxelElement};

use crate::gradient::{
    directional_gradient, gaussian_smooth, DirectionalGradientParams, EdgePolarity,
};
use crate::markers::{
    build_markers, combine_prefer_foreground, inject_fiducials, select_label, MarkerParams,
    FIDUCIAL_SCALE_STAGE1, FIDUCIAL_SCALE_STAGE2,
};
use crate::morphology::fill_holes;
use crate::watershed::watershed;

/// Receiver for intermediate pipeline artifacts.
///
/// The pipeline hands every intermediate to the sink under a stable
/// name; what happens to it (written to disk, collected for assertions,
/// dropped) is the caller's business.
pub trait DebugSink {
    /// A label or mask volume
    fn labels(&mut self, name: &str, volume: &Volume<u8>);
    /// A scalar field volume
    fn field(&mut self, name: &str, volume: &Volume<f32>);
}

/// Sink that discards every artifact
#[derive(Debug, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn labels(&mut self, _name: &str, _volume: &Volume<u8>) {}
    fn field(&mut self, _name: &str, _volume: &Volume<f32>) {}
}

/// Parameters for [`run_segmentation`]
#[derive(Debug, Clone, Copy)]
pub struct SegmentationParams {
    /// Erosion radius (mm) for the object marker
    pub erode_mm: f64,
    /// Dilation radius (mm) bounding the first-stage search region
    pub dilate_mm: f64,
    /// Gaussian sigma (mm) applied to both gradient fields
    pub smoothing_mm: f64,
    /// Expected intensity transition at the surface
    pub polarity: EdgePolarity,
    /// Neighborhood used by both floods
    pub connectivity: Connectivity,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            erode_mm: 3.0,
            dilate_mm: 3.0,
            smoothing_mm: 2.0,
            polarity: EdgePolarity::default(),
            connectivity: Connectivity::default(),
        }
    }
}

/// Extract a surface mask from an intensity volume and a rough object mask.
///
/// `fiducials`, when given, marks skin-attached capsule voxels whose
/// gradient is boosted before each flood so the extracted surface wraps
/// around them instead of cutting them off.
///
/// Returns a {0, 1} mask whose foreground is the segmented object up to
/// its outer surface.
pub fn run_segmentation<T: VoxelElement>(
    intensity: &Volume<T>,
    mask: &Volume<u8>,
    fiducials: Option<&Volume<u8>>,
    params: SegmentationParams,
    sink: &mut dyn DebugSink,
) -> Result<Volume<u8>> {
    check_same_geometry(intensity, mask)?;
    if let Some(fid) = fiducials {
        check_same_geometry(intensity, fid)?;
    }

    let intensity: Volume<f32> = intensity.cast();

    info!(
        shape = ?intensity.shape(),
        spacing = %intensity.spacing(),
        "starting two-stage surface extraction"
    );

    let filled = fill_holes(mask)?;
    sink.labels("filled_mask", &filled);

    let marker_set = build_markers(
        &filled,
        MarkerParams {
            erode_mm: params.erode_mm,
            dilate_mm: params.dilate_mm,
        },
    )?;
    sink.labels("markers", &marker_set.markers);
    debug!(
        object = marker_set.markers.count_eq(FOREGROUND),
        background = marker_set.background.count_eq(voxsurf_core::labels::BACKGROUND),
        "markers built"
    );

    // stage one: restricted, clamped gradient keeps the front in the
    // band around the mask
    let mut relief = directional_gradient(
        &intensity,
        &marker_set.head_mask,
        DirectionalGradientParams {
            polarity: params.polarity,
            restrict_to_mask: true,
            clamp_negative: true,
        },
    )?;
    relief = gaussian_smooth(&relief, params.smoothing_mm)?;
    if let Some(fid) = fiducials {
        relief = inject_fiducials(&relief, fid, FIDUCIAL_SCALE_STAGE1)?;
    }
    sink.field("stage1_gradient", &relief);

    let labeled = watershed(&relief, &marker_set.markers, params.connectivity)?;
    let stage1 = select_label(&labeled, FOREGROUND);
    sink.labels("stage1_mask", &stage1);
    info!(voxels = stage1.count_eq(1), "stage one surface flooded");

    // stage two: the stage-one surface seeds the object, the original
    // background marker still bounds the outside
    let markers2 = combine_prefer_foreground(&stage1, &marker_set.background)?;
    sink.labels("stage2_markers", &markers2);

    let mut relief = directional_gradient(
        &intensity,
        &marker_set.head_mask,
        DirectionalGradientParams {
            polarity: params.polarity,
            restrict_to_mask: false,
            clamp_negative: false,
        },
    )?;
    relief = gaussian_smooth(&relief, params.smoothing_mm)?;
    if let Some(fid) = fiducials {
        relief = inject_fiducials(&relief, fid, FIDUCIAL_SCALE_STAGE2)?;
    }
    sink.field("stage2_gradient", &relief);

    let labeled = watershed(&relief, &markers2, params.connectivity)?;
    let surface = select_label(&labeled, FOREGROUND);
    info!(voxels = surface.count_eq(1), "stage two surface flooded");

    Ok(surface)
}

/// Two-stage surface extraction as an [`Algorithm`], without fiducials
/// or debug output
pub struct SurfaceSegmentation;

impl Algorithm for SurfaceSegmentation {
    type Input = (Volume<f32>, Volume<u8>);
    type Output = Volume<u8>;
    type Params = SegmentationParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "surface_segmentation"
    }

    fn description(&self) -> &'static str {
        "Two-stage marker-controlled watershed surface extraction"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        run_segmentation(&input.0, &input.1, None, params, &mut NullSink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(n: usize, r: f64) -> (Volume<f32>, Volume<u8>) {
        let c = (n / 2) as f64;
        let mut img = Volume::new(n, n, n);
        let mut mask = Volume::new(n, n, n);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let d = ((z as f64 - c).powi(2)
                        + (y as f64 - c).powi(2)
                        + (x as f64 - c).powi(2))
                    .sqrt();
                    if d <= r + 1.0 {
                        img.set(z, y, x, 100.0f32).unwrap();
                    }
                    if d <= r {
                        mask.set(z, y, x, 1).unwrap();
                    }
                }
            }
        }
        (img, mask)
    }

    fn small_params() -> SegmentationParams {
        SegmentationParams {
            erode_mm: 1.0,
            smoothing_mm: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_smoke_run_labels_object() {
        let (img, mask) = ball(17, 3.0);
        let out = run_segmentation(&img, &mask, None, small_params(), &mut NullSink).unwrap();
        let c = 8;
        assert_eq!(out.get(c, c, c).unwrap(), 1);
        assert_eq!(out.get(0, 0, 0).unwrap(), 0);
        assert!(out.count_eq(1) >= mask.count_eq(1));
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let (img, _) = ball(9, 2.0);
        let mask: Volume<u8> = Volume::new(9, 9, 8);
        let result = run_segmentation(&img, &mask, None, small_params(), &mut NullSink);
        assert!(matches!(result, Err(Error::GeometryMismatch { .. })));

        let (img, mask) = ball(9, 2.0);
        let fid: Volume<u8> = Volume::new(8, 9, 9);
        let result = run_segmentation(&img, &mask, Some(&fid), small_params(), &mut NullSink);
        assert!(matches!(result, Err(Error::GeometryMismatch { .. })));
    }

    #[test]
    fn test_debug_sink_sees_all_stages() {
        struct Recorder(Vec<String>);
        impl DebugSink for Recorder {
            fn labels(&mut self, name: &str, _v: &Volume<u8>) {
                self.0.push(name.to_string());
            }
            fn field(&mut self, name: &str, _v: &Volume<f32>) {
                self.0.push(name.to_string());
            }
        }

        let (img, mask) = ball(17, 3.0);
        let mut recorder = Recorder(Vec::new());
        run_segmentation(&img, &mask, None, small_params(), &mut recorder).unwrap();
        assert_eq!(
            recorder.0,
            vec![
                "filled_mask",
                "markers",
                "stage1_gradient",
                "stage1_mask",
                "stage2_markers",
                "stage2_gradient",
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let (img, mask) = ball(17, 3.0);
        let a = run_segmentation(&img, &mask, None, small_params(), &mut NullSink).unwrap();
        let b = run_segmentation(&img, &mask, None, small_params(), &mut NullSink).unwrap();
        assert_eq!(a, b);
    }
}
