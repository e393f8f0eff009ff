//! Main Volume type

use crate::error::{Error, Result};
use crate::volume::{Spacing, VoxelElement};
use ndarray::{Array3, ArrayView3, ArrayViewMut3};
use num_traits::NumCast;

/// A 3D voxel grid with physical spacing.
///
/// `Volume<T>` stores values of type `T` in a dense 3D array indexed
/// `(z, y, x)` (plane, row, column), together with the physical voxel
/// size in millimetres.
///
/// # Type Parameters
///
/// - `T`: The voxel value type, must implement [`VoxelElement`]
///
/// # Example
///
/// ```ignore
/// use voxsurf_core::Volume;
///
/// // Create a 64x64x64 volume filled with zeros
/// let mut vol: Volume<f32> = Volume::new(64, 64, 64);
///
/// // Set a value
/// vol.set(10, 20, 30, 42.0)?;
///
/// // Get a value
/// let value = vol.get(10, 20, 30)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T: VoxelElement> {
    /// Voxel data stored (plane, row, col) = (z, y, x)
    data: Array3<T>,
    /// Physical voxel size
    spacing: Spacing,
}

impl<T: VoxelElement> Volume<T> {
    /// Create a new volume filled with zeros and unit spacing
    pub fn new(nz: usize, ny: usize, nx: usize) -> Self {
        Self {
            data: Array3::zeros((nz, ny, nx)),
            spacing: Spacing::default(),
        }
    }

    /// Create a new volume filled with a specific value
    pub fn filled(nz: usize, ny: usize, nx: usize, value: T) -> Self {
        Self {
            data: Array3::from_elem((nz, ny, nx), value),
            spacing: Spacing::default(),
        }
    }

    /// Create a volume from existing data in (z, y, x) order
    pub fn from_vec(data: Vec<T>, nz: usize, ny: usize, nx: usize) -> Result<Self> {
        if data.len() != nz * ny * nx {
            return Err(Error::InvalidDimensions {
                expected: nz * ny * nx,
                actual: data.len(),
            });
        }

        let array = Array3::from_shape_vec((nz, ny, nx), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data: array,
            spacing: Spacing::default(),
        })
    }

    /// Create a volume from an ndarray
    pub fn from_array(data: Array3<T>) -> Self {
        Self {
            data,
            spacing: Spacing::default(),
        }
    }

    /// Create a zero-filled volume of a different element type sharing this volume's geometry
    pub fn with_same_meta<U: VoxelElement>(&self) -> Volume<U> {
        let (nz, ny, nx) = self.data.dim();
        Volume {
            data: Array3::zeros((nz, ny, nx)),
            spacing: self.spacing,
        }
    }

    /// Create a volume with the same geometry, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array3::from_elem(self.data.dim(), fill_value),
            spacing: self.spacing,
        }
    }

    // Dimensions

    /// Number of planes (z)
    pub fn nz(&self) -> usize {
        self.data.dim().0
    }

    /// Number of rows (y)
    pub fn ny(&self) -> usize {
        self.data.dim().1
    }

    /// Number of columns (x)
    pub fn nx(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (nz, ny, nx)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Total number of voxels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the volume is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (z, y, x)
    pub fn get(&self, z: usize, y: usize, x: usize) -> Result<T> {
        self.data
            .get((z, y, x))
            .copied()
            .ok_or_else(|| self.oob(z, y, x))
    }

    /// Get value at (z, y, x) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure z < self.nz(), y < self.ny() and x < self.nx()
    pub unsafe fn get_unchecked(&self, z: usize, y: usize, x: usize) -> T {
        unsafe { *self.data.uget((z, y, x)) }
    }

    /// Set value at (z, y, x)
    pub fn set(&mut self, z: usize, y: usize, x: usize, value: T) -> Result<()> {
        if z >= self.nz() || y >= self.ny() || x >= self.nx() {
            return Err(self.oob(z, y, x));
        }
        self.data[(z, y, x)] = value;
        Ok(())
    }

    /// Set value at (z, y, x) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure z < self.nz(), y < self.ny() and x < self.nx()
    pub unsafe fn set_unchecked(&mut self, z: usize, y: usize, x: usize, value: T) {
        unsafe {
            *self.data.uget_mut((z, y, x)) = value;
        }
    }

    fn oob(&self, z: usize, y: usize, x: usize) -> Error {
        let (nz, ny, nx) = self.shape();
        Error::IndexOutOfBounds {
            z,
            y,
            x,
            nz,
            ny,
            nx,
        }
    }

    /// Get a view of the underlying data
    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    /// Get a mutable view of the underlying data
    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    /// Consume the volume and return the underlying array
    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    // Metadata

    /// Get the voxel spacing
    pub fn spacing(&self) -> &Spacing {
        &self.spacing
    }

    /// Set the voxel spacing
    pub fn set_spacing(&mut self, spacing: Spacing) {
        self.spacing = spacing;
    }

    /// Whether another volume has identical size and spacing
    pub fn same_geometry<U: VoxelElement>(&self, other: &Volume<U>) -> bool {
        self.shape() == other.shape() && self.spacing.approx_eq(other.spacing())
    }

    /// Cast every voxel to another element type, sharing geometry.
    ///
    /// Values that cannot be represented in `U` saturate to `U`'s range
    /// bounds rather than wrapping.
    pub fn cast<U: VoxelElement>(&self) -> Volume<U> {
        let data = self.data.mapv(|v| {
            <U as NumCast>::from(v).unwrap_or_else(|| {
                match v.to_f64() {
                    Some(f) if f > 0.0 => U::max_value(),
                    _ => U::min_value(),
                }
            })
        });
        Volume {
            data,
            spacing: self.spacing,
        }
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean)
    pub fn statistics(&self) -> VolumeStatistics<T> {
        let mut min = None;
        let mut max = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if min.is_none() || matches!(min, Some(m) if value < m) {
                min = Some(value);
            }
            if max.is_none() || matches!(max, Some(m) if value > m) {
                max = Some(value);
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        VolumeStatistics { min, max, mean }
    }

    /// Count voxels equal to a value
    pub fn count_eq(&self, value: T) -> usize {
        self.data.iter().filter(|&&v| v == value).count()
    }
}

/// Verify two volumes share size and spacing, as required for every
/// pair of volumes consumed together in one pipeline run.
pub fn check_same_geometry<T: VoxelElement, U: VoxelElement>(
    a: &Volume<T>,
    b: &Volume<U>,
) -> Result<()> {
    if a.same_geometry(b) {
        return Ok(());
    }
    let describe = |shape: (usize, usize, usize), spacing: &Spacing| {
        format!(
            "{}x{}x{} @ {}",
            shape.0, shape.1, shape.2, spacing
        )
    };
    Err(Error::GeometryMismatch {
        expected: describe(a.shape(), a.spacing()),
        actual: describe(b.shape(), b.spacing()),
    })
}

/// Basic statistics for a volume
#[derive(Debug, Clone)]
pub struct VolumeStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
}
