//! Physical voxel spacing

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Physical size of one voxel along each axis, in millimetres.
///
/// All physically-scaled operations (morphological radii, smoothing sigmas)
/// are converted to per-axis voxel counts through the spacing, so the
/// algorithms behave consistently on anisotropic acquisitions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    /// Voxel size along x (column axis), mm
    pub x: f64,
    /// Voxel size along y (row axis), mm
    pub y: f64,
    /// Voxel size along z (plane axis), mm
    pub z: f64,
}

impl Spacing {
    /// Create a new spacing, validating that every component is strictly positive
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        for (name, v) in [("spacing.x", x), ("spacing.y", y), ("spacing.z", z)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(Error::InvalidParameter {
                    name,
                    value: v.to_string(),
                    reason: "voxel spacing must be strictly positive".to_string(),
                });
            }
        }
        Ok(Self { x, y, z })
    }

    /// Isotropic spacing with the given voxel size
    pub fn isotropic(size: f64) -> Result<Self> {
        Self::new(size, size, size)
    }

    /// Whether all three axes share the same voxel size
    pub fn is_isotropic(&self) -> bool {
        (self.x - self.y).abs() < 1e-9 && (self.y - self.z).abs() < 1e-9
    }

    /// Convert a physical radius (mm) to per-axis voxel counts `(rz, ry, rx)`.
    ///
    /// Each axis is rounded to the nearest whole voxel; a positive radius
    /// smaller than half a voxel on some axis yields 0 on that axis.
    pub fn voxel_radii(&self, radius_mm: f64) -> (usize, usize, usize) {
        let to_voxels = |s: f64| ((radius_mm / s).round().max(0.0)) as usize;
        (to_voxels(self.z), to_voxels(self.y), to_voxels(self.x))
    }

    /// Convert a physical sigma (mm) to per-axis sigmas in voxel units `(sz, sy, sx)`
    pub fn voxel_sigmas(&self, sigma_mm: f64) -> (f64, f64, f64) {
        (sigma_mm / self.z, sigma_mm / self.y, sigma_mm / self.x)
    }

    /// Check two spacings for equality within tolerance
    pub fn approx_eq(&self, other: &Spacing) -> bool {
        const TOL: f64 = 1e-6;
        (self.x - other.x).abs() < TOL
            && (self.y - other.y).abs() < TOL
            && (self.z - other.z).abs() < TOL
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

impl std::fmt::Display for Spacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{} mm", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_spacing_required() {
        assert!(Spacing::new(1.0, 1.0, 1.0).is_ok());
        assert!(Spacing::new(0.0, 1.0, 1.0).is_err());
        assert!(Spacing::new(1.0, -2.0, 1.0).is_err());
        assert!(Spacing::new(1.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_voxel_radii_anisotropic() {
        let sp = Spacing::new(1.0, 1.0, 2.5).unwrap();
        // 5mm radius: 5 voxels in-plane, 2 voxels through-plane
        assert_eq!(sp.voxel_radii(5.0), (2, 5, 5));
    }

    #[test]
    fn test_voxel_radii_subvoxel() {
        let sp = Spacing::isotropic(1.0).unwrap();
        assert_eq!(sp.voxel_radii(0.4), (0, 0, 0));
        assert_eq!(sp.voxel_radii(1.0), (1, 1, 1));
    }

    #[test]
    fn test_isotropy() {
        assert!(Spacing::isotropic(0.8).unwrap().is_isotropic());
        assert!(!Spacing::new(1.0, 1.0, 3.0).unwrap().is_isotropic());
    }
}
