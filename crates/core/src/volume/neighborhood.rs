//! Voxel connectivity for flood and labeling operations

/// Defines which voxels count as neighbors in 3D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Face neighbors only (conservative default)
    #[default]
    Six,
    /// Face and edge neighbors
    Eighteen,
    /// Face, edge and corner neighbors
    TwentySix,
}

impl Connectivity {
    /// Relative offsets `(dz, dy, dx)` of all neighbors
    pub fn offsets(&self) -> Vec<(isize, isize, isize)> {
        let mut offsets = Vec::with_capacity(self.len());
        for dz in -1isize..=1 {
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let order = dz.abs() + dy.abs() + dx.abs();
                    let keep = match self {
                        Connectivity::Six => order == 1,
                        Connectivity::Eighteen => order == 1 || order == 2,
                        Connectivity::TwentySix => order >= 1,
                    };
                    if keep {
                        offsets.push((dz, dy, dx));
                    }
                }
            }
        }
        offsets
    }

    /// Number of neighbors
    pub fn len(&self) -> usize {
        match self {
            Connectivity::Six => 6,
            Connectivity::Eighteen => 18,
            Connectivity::TwentySix => 26,
        }
    }

    /// Connectivity is never empty
    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts() {
        assert_eq!(Connectivity::Six.offsets().len(), 6);
        assert_eq!(Connectivity::Eighteen.offsets().len(), 18);
        assert_eq!(Connectivity::TwentySix.offsets().len(), 26);
    }

    #[test]
    fn test_six_is_faces_only() {
        let offsets = Connectivity::Six.offsets();
        assert!(offsets.contains(&(1, 0, 0)));
        assert!(offsets.contains(&(0, -1, 0)));
        assert!(!offsets.contains(&(1, 1, 0)));
        assert!(!offsets.contains(&(0, 0, 0)));
    }

    #[test]
    fn test_deterministic_order() {
        assert_eq!(Connectivity::Six.offsets(), Connectivity::Six.offsets());
    }
}
