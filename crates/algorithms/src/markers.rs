//! Marker construction for the two-stage watershed.
//!
//! Markers encode where the object and the surroundings certainly are:
//! a conservative erosion of the filled mask seeds the object, the
//! complement of a dilation seeds the background, and a wider dilation
//! bounds the band in which the first-stage gradient lives.

use voxsurf_core::labels::{BACKGROUND, FOREGROUND, UNLABELED};
use voxsurf_core::volume::check_same_geometry;
use voxsurf_core::{Result, Volume};

use crate::morphology::{dilate, erode};

/// Fiducial relief scale for the first flood
pub const FIDUCIAL_SCALE_STAGE1: f32 = 100.0;
/// Fiducial relief scale for the second flood; larger so stage-two
/// landmarks dominate any stage-one residual
pub const FIDUCIAL_SCALE_STAGE2: f32 = 200.0;
/// Floor on the dilation radius of the gradient-restriction region
pub const HEAD_DILATE_MIN_MM: f64 = 5.0;

/// Parameters for [`build_markers`]
#[derive(Debug, Clone, Copy)]
pub struct MarkerParams {
    /// Erosion radius (mm) producing the confident object marker
    pub erode_mm: f64,
    /// Dilation radius (mm) whose complement is the background marker
    pub dilate_mm: f64,
}

impl Default for MarkerParams {
    fn default() -> Self {
        Self {
            erode_mm: 3.0,
            dilate_mm: 3.0,
        }
    }
}

/// Markers and search region derived from a filled mask
#[derive(Debug, Clone)]
pub struct MarkerSet {
    /// Combined marker volume: `FOREGROUND`, `BACKGROUND` or `UNLABELED`
    pub markers: Volume<u8>,
    /// Background-only marker volume, reused when seeding the second stage
    pub background: Volume<u8>,
    /// Dilated mask bounding the restricted first-stage gradient
    pub head_mask: Volume<u8>,
}

/// Build watershed markers from a hole-filled binary mask.
///
/// The object marker is the mask eroded by `erode_mm`; the background
/// marker is everything outside the mask dilated by `dilate_mm`. The
/// head mask is a separate dilation, never smaller than
/// [`HEAD_DILATE_MIN_MM`], used only to restrict the first-stage
/// gradient. Voxels in neither marker stay `UNLABELED` for the flood to
/// decide.
pub fn build_markers(filled: &Volume<u8>, params: MarkerParams) -> Result<MarkerSet> {
    let object = erode(filled, params.erode_mm)?;
    let head_mask = dilate(filled, params.dilate_mm.max(HEAD_DILATE_MIN_MM))?;
    let extended = dilate(filled, params.dilate_mm)?;
    let background = invert_to_background(&extended);
    let markers = combine_prefer_foreground(&object, &background)?;
    Ok(MarkerSet {
        markers,
        background,
        head_mask,
    })
}

/// `BACKGROUND` wherever the mask is zero, `UNLABELED` elsewhere
pub fn invert_to_background(mask: &Volume<u8>) -> Volume<u8> {
    let mut out = mask.clone();
    out.data_mut()
        .mapv_inplace(|v| if v == 0 { BACKGROUND } else { UNLABELED });
    out
}

/// Merge an object mask and a background marker volume into one marker
/// volume. Any voxel claimed by both is `FOREGROUND`: the object marker
/// wins explicitly, independent of the numeric label values.
pub fn combine_prefer_foreground(object: &Volume<u8>, background: &Volume<u8>) -> Result<Volume<u8>> {
    check_same_geometry(object, background)?;
    let mut out = object.with_same_meta::<u8>();
    ndarray::Zip::from(out.data_mut())
        .and(object.data())
        .and(background.data())
        .for_each(|m, &obj, &bg| {
            *m = if obj != 0 {
                FOREGROUND
            } else if bg == BACKGROUND {
                BACKGROUND
            } else {
                UNLABELED
            };
        });
    Ok(out)
}

/// Binary mask of all voxels carrying `target` in a label volume
pub fn select_label(labeled: &Volume<u8>, target: u8) -> Volume<u8> {
    let mut out = labeled.clone();
    out.data_mut().mapv_inplace(|v| u8::from(v == target));
    out
}

/// Raise the relief under fiducial voxels to at least `scale` times the
/// fiducial value.
///
/// Fiducials are skin-attached capsules that the surface must pass
/// around, not through. The artificial wall makes them the last
/// territory any front claims, so the object front arriving from the
/// scalp side takes them before the background can cut across. Voxels
/// outside the fiducial volume are left untouched, including negative
/// relief values.
pub fn inject_fiducials(
    relief: &Volume<f32>,
    fiducials: &Volume<u8>,
    scale: f32,
) -> Result<Volume<f32>> {
    check_same_geometry(relief, fiducials)?;
    let mut out = relief.clone();
    ndarray::Zip::from(out.data_mut())
        .and(fiducials.data())
        .for_each(|v, &f| {
            if f != 0 {
                *v = v.max(f32::from(f) * scale);
            }
        });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxsurf_core::Spacing;

    fn ball_mask(n: usize, r: f64) -> Volume<u8> {
        let c = (n / 2) as f64;
        let mut mask = Volume::new(n, n, n);
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    let d = ((z as f64 - c).powi(2)
                        + (y as f64 - c).powi(2)
                        + (x as f64 - c).powi(2))
                    .sqrt();
                    if d <= r {
                        mask.set(z, y, x, 1).unwrap();
                    }
                }
            }
        }
        mask
    }

    #[test]
    fn test_marker_regions_disjoint() {
        let mask = ball_mask(21, 6.0);
        let set = build_markers(&mask, MarkerParams::default()).unwrap();
        let fg = set.markers.count_eq(FOREGROUND);
        let bg = set.markers.count_eq(BACKGROUND);
        let un = set.markers.count_eq(UNLABELED);
        assert!(fg > 0);
        assert!(bg > 0);
        assert!(un > 0);
        assert_eq!(fg + bg + un, set.markers.len());
    }

    #[test]
    fn test_background_complements_dilation() {
        let mask = ball_mask(15, 4.0);
        let params = MarkerParams::default();
        let set = build_markers(&mask, params).unwrap();
        let extended = dilate(&mask, params.dilate_mm).unwrap();
        for z in 0..15 {
            for y in 0..15 {
                for x in 0..15 {
                    let is_bg = set.markers.get(z, y, x).unwrap() == BACKGROUND;
                    let outside = extended.get(z, y, x).unwrap() == 0;
                    assert_eq!(is_bg, outside, "at ({z},{y},{x})");
                }
            }
        }
    }

    #[test]
    fn test_dilation_floor_applied() {
        // a 1mm dilation request still produces the 5mm search region
        let mask = ball_mask(21, 4.0);
        let set = build_markers(
            &mask,
            MarkerParams {
                erode_mm: 1.0,
                dilate_mm: 1.0,
            },
        )
        .unwrap();
        // 4mm ball + 5mm dilation reaches 9 voxels from center
        assert_eq!(set.head_mask.get(10, 10, 1).unwrap(), 1);
    }

    #[test]
    fn test_combine_prefers_foreground() {
        let mut object = Volume::new(2, 2, 2);
        object.set(0, 0, 0, 1u8).unwrap();
        let mut background = Volume::filled(2, 2, 2, BACKGROUND);
        background.set(1, 1, 1, UNLABELED).unwrap();

        let markers = combine_prefer_foreground(&object, &background).unwrap();
        // claimed by both sides: object wins
        assert_eq!(markers.get(0, 0, 0).unwrap(), FOREGROUND);
        assert_eq!(markers.get(0, 0, 1).unwrap(), BACKGROUND);
        assert_eq!(markers.get(1, 1, 1).unwrap(), UNLABELED);
    }

    #[test]
    fn test_select_label() {
        let mut labeled = Volume::filled(2, 2, 2, BACKGROUND);
        labeled.set(0, 1, 0, FOREGROUND).unwrap();
        let picked = select_label(&labeled, FOREGROUND);
        assert_eq!(picked.count_eq(1), 1);
        assert_eq!(picked.get(0, 1, 0).unwrap(), 1);
    }

    #[test]
    fn test_inject_fiducials_walls_only_marked_voxels() {
        let mut relief = Volume::filled(3, 3, 3, 2.0f32);
        relief.set(0, 0, 0, -3.0).unwrap();
        let mut fid = Volume::new(3, 3, 3);
        fid.set(1, 1, 1, 1u8).unwrap();
        fid.set(2, 2, 2, 1u8).unwrap();
        let boosted = inject_fiducials(&relief, &fid, FIDUCIAL_SCALE_STAGE1).unwrap();
        assert_eq!(boosted.get(1, 1, 1).unwrap(), 100.0);
        assert_eq!(boosted.get(2, 2, 2).unwrap(), 100.0);
        // untouched voxels keep their value, negatives included
        assert_eq!(boosted.get(0, 1, 0).unwrap(), 2.0);
        assert_eq!(boosted.get(0, 0, 0).unwrap(), -3.0);
        // stage two walls are higher than stage one
        assert!(FIDUCIAL_SCALE_STAGE2 > FIDUCIAL_SCALE_STAGE1);
    }

    #[test]
    fn test_geometry_mismatch_rejected() {
        let relief: Volume<f32> = Volume::new(3, 3, 3);
        let mut fid: Volume<u8> = Volume::new(3, 3, 4);
        fid.set(0, 0, 0, 1).unwrap();
        assert!(inject_fiducials(&relief, &fid, 2.0).is_err());
    }

    #[test]
    fn test_anisotropic_markers_use_spacing() {
        let mut mask = ball_mask(21, 4.0);
        mask.set_spacing(Spacing::new(1.0, 1.0, 2.0).unwrap());
        let set = build_markers(&mask, MarkerParams::default()).unwrap();
        // the 5mm dilation is 5 voxels in-plane but only 3 slices along z
        assert_eq!(set.head_mask.get(10, 10, 0).unwrap(), 0);
        assert_eq!(set.head_mask.get(10, 10, 1).unwrap(), 1);
        assert_eq!(set.head_mask.get(2, 10, 10).unwrap(), 0);
        assert_eq!(set.head_mask.get(3, 10, 10).unwrap(), 1);
    }
}
