//! Hole filling for binary masks

use std::collections::VecDeque;

use ndarray::Array3;
use voxsurf_core::{Algorithm, Connectivity, Error, Result, Volume};

/// Fill interior cavities of a binary mask.
///
/// Background connected to the volume border stays background; any
/// background region fully enclosed by foreground becomes foreground.
/// Background connectivity is face-adjacent, so cavities touching the
/// outside only diagonally still count as holes.
///
/// The operation is idempotent.
pub fn fill_holes(mask: &Volume<u8>) -> Result<Volume<u8>> {
    let (nz, ny, nx) = mask.shape();
    if mask.is_empty() {
        return Ok(mask.clone());
    }

    let mut outside: Array3<bool> = Array3::from_elem((nz, ny, nx), false);
    let mut queue: VecDeque<(usize, usize, usize)> = VecDeque::new();

    // seed with all background voxels on the six faces
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let on_face =
                    z == 0 || z == nz - 1 || y == 0 || y == ny - 1 || x == 0 || x == nx - 1;
                if on_face && mask.get(z, y, x)? == 0 {
                    outside[(z, y, x)] = true;
                    queue.push_back((z, y, x));
                }
            }
        }
    }

    let offsets = Connectivity::Six.offsets();
    while let Some((z, y, x)) = queue.pop_front() {
        for &(dz, dy, dx) in &offsets {
            let zi = z as isize + dz;
            let yi = y as isize + dy;
            let xi = x as isize + dx;
            if zi < 0 || yi < 0 || xi < 0 {
                continue;
            }
            let (zi, yi, xi) = (zi as usize, yi as usize, xi as usize);
            if zi >= nz || yi >= ny || xi >= nx {
                continue;
            }
            // background reachable from the border stays background
            if !outside[(zi, yi, xi)] && unsafe { mask.get_unchecked(zi, yi, xi) } == 0 {
                outside[(zi, yi, xi)] = true;
                queue.push_back((zi, yi, xi));
            }
        }
    }

    let mut filled = mask.with_same_meta::<u8>();
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                let fg = unsafe { mask.get_unchecked(z, y, x) } != 0 || !outside[(z, y, x)];
                if fg {
                    unsafe { filled.set_unchecked(z, y, x, 1) };
                }
            }
        }
    }
    Ok(filled)
}

/// Parameters for [`FillHoles`] (none)
#[derive(Debug, Clone, Copy, Default)]
pub struct FillHolesParams;

/// Cavity filling algorithm
pub struct FillHoles;

impl Algorithm for FillHoles {
    type Input = Volume<u8>;
    type Output = Volume<u8>;
    type Params = FillHolesParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "fill_holes"
    }

    fn description(&self) -> &'static str {
        "Fill interior cavities of a binary mask"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        fill_holes(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hollow_box() -> Volume<u8> {
        // 7x7x7 with a 5x5x5 shell of foreground and an empty interior
        let mut vol = Volume::new(7, 7, 7);
        for z in 1..6 {
            for y in 1..6 {
                for x in 1..6 {
                    let on_shell = z == 1 || z == 5 || y == 1 || y == 5 || x == 1 || x == 5;
                    if on_shell {
                        vol.set(z, y, x, 1).unwrap();
                    }
                }
            }
        }
        vol
    }

    #[test]
    fn test_cavity_filled() {
        let vol = hollow_box();
        let filled = fill_holes(&vol).unwrap();
        assert_eq!(filled.get(3, 3, 3).unwrap(), 1);
        assert_eq!(filled.count_eq(1), 125);
        // outside stays background
        assert_eq!(filled.get(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn test_open_region_not_filled() {
        let mut vol = hollow_box();
        // punch a face-connected channel from the cavity to the border
        for z in 0..2 {
            vol.set(z, 3, 3, 0).unwrap();
        }
        let filled = fill_holes(&vol).unwrap();
        assert_eq!(filled.get(3, 3, 3).unwrap(), 0);
    }

    #[test]
    fn test_idempotent() {
        let vol = hollow_box();
        let once = fill_holes(&vol).unwrap();
        let twice = fill_holes(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_solid_mask_unchanged() {
        let mut vol = Volume::new(5, 5, 5);
        for z in 1..4 {
            for y in 1..4 {
                for x in 1..4 {
                    vol.set(z, y, x, 1).unwrap();
                }
            }
        }
        let filled = fill_holes(&vol).unwrap();
        assert_eq!(filled, vol);
    }
}
