//! Priority-flood implementation

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use voxsurf_core::labels::UNLABELED;
use voxsurf_core::volume::check_same_geometry;
use voxsurf_core::{Algorithm, Connectivity, Error, Result, Volume};

/// A voxel queued for flooding, keyed by relief value with insertion
/// order as the tie-break.
#[derive(Debug, Clone, Copy)]
struct Cell {
    value: f32,
    seq: u64,
    z: usize,
    y: usize,
    x: usize,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.seq == other.seq
    }
}

impl Eq for Cell {}

impl Ord for Cell {
    /// Reversed so the `BinaryHeap` max-heap pops the lowest value first;
    /// equal values pop in insertion order (FIFO), which keeps the flood
    /// deterministic on plateaus.
    fn cmp(&self, other: &Self) -> Ordering {
        match other.value.partial_cmp(&self.value) {
            Some(Ordering::Equal) | None => other.seq.cmp(&self.seq),
            Some(ordering) => ordering,
        }
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flood `relief` from the non-zero voxels of `markers`.
///
/// Marker voxels keep their label. Each unlabeled voxel receives the
/// label of the first front that reaches it; fronts advance in order of
/// increasing relief value, ties resolved first-queued-first-out.
///
/// Every voxel must be reachable from some marker through the chosen
/// connectivity; leftover unlabeled voxels are a consistency failure,
/// not a valid output.
pub fn watershed(
    relief: &Volume<f32>,
    markers: &Volume<u8>,
    connectivity: Connectivity,
) -> Result<Volume<u8>> {
    check_same_geometry(relief, markers)?;

    let (nz, ny, nx) = relief.shape();
    let mut labels = markers.clone();
    let offsets = connectivity.offsets();

    let mut heap: BinaryHeap<Cell> = BinaryHeap::new();
    let mut seq: u64 = 0;

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if unsafe { labels.get_unchecked(z, y, x) } != UNLABELED {
                    heap.push(Cell {
                        value: unsafe { relief.get_unchecked(z, y, x) },
                        seq,
                        z,
                        y,
                        x,
                    });
                    seq += 1;
                }
            }
        }
    }

    while let Some(cell) = heap.pop() {
        let label = unsafe { labels.get_unchecked(cell.z, cell.y, cell.x) };
        for &(dz, dy, dx) in &offsets {
            let zi = cell.z as isize + dz;
            let yi = cell.y as isize + dy;
            let xi = cell.x as isize + dx;
            if zi < 0 || yi < 0 || xi < 0 {
                continue;
            }
            let (zi, yi, xi) = (zi as usize, yi as usize, xi as usize);
            if zi >= nz || yi >= ny || xi >= nx {
                continue;
            }
            if unsafe { labels.get_unchecked(zi, yi, xi) } != UNLABELED {
                continue;
            }
            // label at queue insertion, not at pop: the first front to
            // reach a voxel claims it
            unsafe { labels.set_unchecked(zi, yi, xi, label) };
            heap.push(Cell {
                value: unsafe { relief.get_unchecked(zi, yi, xi) },
                seq,
                z: zi,
                y: yi,
                x: xi,
            });
            seq += 1;
        }
    }

    let unlabeled = labels.count_eq(UNLABELED);
    if unlabeled > 0 {
        return Err(Error::WatershedConsistency { unlabeled });
    }
    Ok(labels)
}

/// Parameters for [`Watershed`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WatershedParams {
    /// Neighborhood used by the flood
    pub connectivity: Connectivity,
}

/// Marker-controlled watershed algorithm
pub struct Watershed;

impl Algorithm for Watershed {
    type Input = (Volume<f32>, Volume<u8>);
    type Output = Volume<u8>;
    type Params = WatershedParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "watershed"
    }

    fn description(&self) -> &'static str {
        "Marker-controlled priority-flood watershed without watershed lines"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        watershed(&input.0, &input.1, params.connectivity)
    }
}
