//! Voxel element trait for generic scalar values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a volume voxel.
///
/// This trait bounds the types that can be used as voxel values,
/// ensuring they support the necessary numeric operations.
pub trait VoxelElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert self to f32
    fn to_f32(self) -> Option<f32> {
        NumCast::from(self)
    }
}

macro_rules! impl_voxel_element_int {
    ($t:ty) => {
        impl VoxelElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                false
            }
        }
    };
}

macro_rules! impl_voxel_element_float {
    ($t:ty) => {
        impl VoxelElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn is_float() -> bool {
                true
            }
        }
    };
}

impl_voxel_element_int!(i8);
impl_voxel_element_int!(i16);
impl_voxel_element_int!(i32);
impl_voxel_element_int!(i64);
impl_voxel_element_int!(u8);
impl_voxel_element_int!(u16);
impl_voxel_element_int!(u32);
impl_voxel_element_int!(u64);
impl_voxel_element_float!(f32);
impl_voxel_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_element() {
        assert_eq!(<u8 as VoxelElement>::min_value(), 0);
        assert_eq!(<u8 as VoxelElement>::max_value(), 255);
        assert!(!<u8 as VoxelElement>::is_float());
    }

    #[test]
    fn test_float_element() {
        assert!(<f32 as VoxelElement>::is_float());
        assert_eq!(5i16.to_f32(), Some(5.0));
    }
}
