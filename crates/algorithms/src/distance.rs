//! Chamfer distance transforms.
//!
//! Two-pass chamfer propagation over the full 26-neighborhood, with step
//! weights taken from the physical spacing so distances come out in
//! millimetres on anisotropic grids. The gradient of the (signed) distance
//! field gives the inward surface normal used to orient image gradients.

use ndarray::Array3;
use voxsurf_core::{Spacing, Volume};

/// The 13 neighbor offsets that precede the center in (z, y, x) scan
/// order, each weighted by its physical step length in millimetres.
fn half_offsets(spacing: &Spacing) -> Vec<(isize, isize, isize, f32)> {
    let mut offsets = Vec::with_capacity(13);
    for dz in -1isize..=1 {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                if (dz, dy, dx) >= (0, 0, 0) {
                    continue;
                }
                let step = ((dz as f64 * spacing.z).powi(2)
                    + (dy as f64 * spacing.y).powi(2)
                    + (dx as f64 * spacing.x).powi(2))
                .sqrt();
                offsets.push((dz, dy, dx, step as f32));
            }
        }
    }
    offsets
}

/// Distance (mm) from each foreground voxel to the nearest background.
///
/// Background voxels are 0; everything outside the volume counts as
/// background, so foreground on the border gets one step.
pub fn chamfer_distance(mask: &Volume<u8>) -> Volume<f32> {
    let (nz, ny, nx) = mask.shape();
    let mut dist: Array3<f32> = Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| {
        if mask.data()[(z, y, x)] != 0 {
            f32::INFINITY
        } else {
            0.0
        }
    });

    let fwd = half_offsets(mask.spacing());
    let bwd: Vec<_> = fwd.iter().map(|&(dz, dy, dx, w)| (-dz, -dy, -dx, w)).collect();

    let relax = |dist: &mut Array3<f32>,
                 offs: &[(isize, isize, isize, f32)],
                 z: usize,
                 y: usize,
                 x: usize| {
        let mut d = dist[(z, y, x)];
        if d == 0.0 {
            return;
        }
        for &(dz, dy, dx, w) in offs {
            let zi = z as isize + dz;
            let yi = y as isize + dy;
            let xi = x as isize + dx;
            let cand = if zi >= 0
                && yi >= 0
                && xi >= 0
                && (zi as usize) < nz
                && (yi as usize) < ny
                && (xi as usize) < nx
            {
                dist[(zi as usize, yi as usize, xi as usize)] + w
            } else {
                w
            };
            if cand < d {
                d = cand;
            }
        }
        dist[(z, y, x)] = d;
    };

    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                relax(&mut dist, &fwd, z, y, x);
            }
        }
    }
    for z in (0..nz).rev() {
        for y in (0..ny).rev() {
            for x in (0..nx).rev() {
                relax(&mut dist, &bwd, z, y, x);
            }
        }
    }

    let mut out = Volume::from_array(dist);
    out.set_spacing(*mask.spacing());
    out
}

/// Signed distance to the mask boundary: positive inside the mask,
/// negative outside. Its gradient points inward everywhere, which keeps
/// the directional field defined on both sides of the surface.
pub fn signed_distance(mask: &Volume<u8>) -> Volume<f32> {
    let inside = chamfer_distance(mask);
    let complement = {
        let mut c = mask.clone();
        c.data_mut().mapv_inplace(|v| u8::from(v == 0));
        c
    };
    let outside = chamfer_distance(&complement);

    let mut signed = inside;
    ndarray::Zip::from(signed.data_mut())
        .and(outside.data())
        .for_each(|s, &o| *s -= o);
    signed
}
