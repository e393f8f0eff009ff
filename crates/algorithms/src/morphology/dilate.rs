//! Binary dilation with a physical radius

use super::{resolve_radius, separable_pass, LaneOp};
use voxsurf_core::{Algorithm, Error, Result, Volume};

/// Dilate a binary mask by a physical radius in millimetres.
///
/// A voxel becomes foreground if any voxel in the box neighborhood
/// implied by the radius is foreground. The result never grows past the
/// volume bounds; there is no wrap-around.
///
/// A non-positive radius, or one that rounds to zero voxels on every
/// axis, degrades to a copy of the input and a warning.
pub fn dilate(mask: &Volume<u8>, radius_mm: f64) -> Result<Volume<u8>> {
    match resolve_radius("dilate", radius_mm, mask.spacing()) {
        Some(radii) => separable_pass(mask, radii, LaneOp::Max),
        None => Ok(mask.clone()),
    }
}

/// Parameters for [`Dilate`]
#[derive(Debug, Clone, Copy)]
pub struct DilateParams {
    /// Structuring radius in millimetres
    pub radius_mm: f64,
}

impl Default for DilateParams {
    fn default() -> Self {
        Self { radius_mm: 1.0 }
    }
}

/// Binary dilation algorithm
pub struct Dilate;

impl Algorithm for Dilate {
    type Input = Volume<u8>;
    type Output = Volume<u8>;
    type Params = DilateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "dilate"
    }

    fn description(&self) -> &'static str {
        "Binary dilation by a physical radius in millimetres"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dilate(&input, params.radius_mm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::erode;

    fn dot() -> Volume<u8> {
        let mut vol = Volume::new(7, 7, 7);
        vol.set(3, 3, 3, 1).unwrap();
        vol
    }

    #[test]
    fn test_dilate_is_superset() {
        let vol = dot();
        let out = dilate(&vol, 1.0).unwrap();
        assert_eq!(out.get(3, 3, 3).unwrap(), 1);
        assert_eq!(out.count_eq(1), 27);
    }

    #[test]
    fn test_dilate_clips_at_border() {
        let mut vol = Volume::new(5, 5, 5);
        vol.set(0, 0, 0, 1).unwrap();
        let out = dilate(&vol, 1.0).unwrap();
        assert_eq!(out.count_eq(1), 8);
    }

    #[test]
    fn test_erode_dilate_monotone() {
        // eroded ⊆ input ⊆ dilated
        let mut vol = Volume::new(9, 9, 9);
        for z in 3..6 {
            for y in 3..6 {
                for x in 3..6 {
                    vol.set(z, y, x, 1).unwrap();
                }
            }
        }
        let small = erode(&vol, 1.0).unwrap();
        let big = dilate(&vol, 1.0).unwrap();
        for z in 0..9 {
            for y in 0..9 {
                for x in 0..9 {
                    let s = small.get(z, y, x).unwrap();
                    let m = u8::from(vol.get(z, y, x).unwrap() != 0);
                    let b = big.get(z, y, x).unwrap();
                    assert!(s <= m);
                    assert!(m <= b);
                }
            }
        }
    }

    #[test]
    fn test_larger_radius_dilates_more() {
        let mut vol = Volume::new(11, 11, 11);
        for z in 4..7 {
            for y in 4..7 {
                for x in 4..7 {
                    vol.set(z, y, x, 1).unwrap();
                }
            }
        }
        let r1 = dilate(&vol, 1.0).unwrap();
        let r2 = dilate(&vol, 2.0).unwrap();
        assert!(r2.count_eq(1) > r1.count_eq(1));
        for (a, b) in r1.data().iter().zip(r2.data().iter()) {
            assert!(a <= b);
        }
    }

    #[test]
    fn test_anisotropic_spacing_respected() {
        let mut vol = dot();
        vol.set_spacing(voxsurf_core::Spacing::new(1.0, 1.0, 3.0).unwrap());
        // 1mm radius rounds to 0 voxels along z (3mm slices)
        let out = dilate(&vol, 1.0).unwrap();
        assert_eq!(out.get(2, 3, 3).unwrap(), 0);
        assert_eq!(out.get(3, 2, 3).unwrap(), 1);
    }
}
