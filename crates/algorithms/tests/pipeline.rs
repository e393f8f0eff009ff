//! End-to-end tests for the two-stage surface extraction pipeline

use voxsurf_algorithms::gradient::EdgePolarity;
use voxsurf_algorithms::morphology::erode;
use voxsurf_algorithms::segmentation::{run_segmentation, NullSink, SegmentationParams};
use voxsurf_core::{Connectivity, Volume};

/// Bright ball phantom: intensity 100 inside `bright_r`, mask inside `mask_r`
fn phantom(
    n: usize,
    center: (usize, usize, usize),
    mask_r: f64,
    bright_r: f64,
) -> (Volume<f32>, Volume<u8>) {
    let (cz, cy, cx) = center;
    let mut img = Volume::new(n, n, n);
    let mut mask = Volume::new(n, n, n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let d = ((z as f64 - cz as f64).powi(2)
                    + (y as f64 - cy as f64).powi(2)
                    + (x as f64 - cx as f64).powi(2))
                .sqrt();
                if d <= bright_r {
                    img.set(z, y, x, 100.0f32).unwrap();
                }
                if d <= mask_r {
                    mask.set(z, y, x, 1).unwrap();
                }
            }
        }
    }
    (img, mask)
}

fn radius_from(center: (usize, usize, usize), z: usize, y: usize, x: usize) -> f64 {
    ((z as f64 - center.0 as f64).powi(2)
        + (y as f64 - center.1 as f64).powi(2)
        + (x as f64 - center.2 as f64).powi(2))
    .sqrt()
}

fn params() -> SegmentationParams {
    SegmentationParams {
        erode_mm: 1.0,
        dilate_mm: 3.0,
        smoothing_mm: 1.0,
        polarity: EdgePolarity::LightToDark,
        connectivity: Connectivity::Six,
    }
}

/// The extracted surface should land on the intensity edge (radius 4),
/// not on the rough input mask (radius 3): every boundary voxel of the
/// output within one voxel of the true radius.
#[test]
fn surface_tracks_intensity_edge() {
    let center = (8, 8, 8);
    let (img, mask) = phantom(17, center, 3.0, 4.0);
    let out = run_segmentation(&img, &mask, None, params(), &mut NullSink).unwrap();

    for z in 0..17 {
        for y in 0..17 {
            for x in 0..17 {
                let r = radius_from(center, z, y, x);
                let v = out.get(z, y, x).unwrap();
                if r <= 3.0 {
                    assert_eq!(v, 1, "input mask voxel lost at ({z},{y},{x})");
                }
                if r >= 5.0 {
                    assert_eq!(v, 0, "background claimed at ({z},{y},{x}), r={r:.2}");
                }
            }
        }
    }
    // strictly grew past the rough mask toward the true edge
    assert!(out.count_eq(1) > mask.count_eq(1));
}

/// A fiducial capsule resting on the surface must end up inside the
/// extracted mask, not cut away with the background.
#[test]
fn fiducial_pulled_into_surface() {
    let center = (5, 8, 8);
    let (img, mask) = phantom(17, center, 3.0, 4.0);

    // 3x3 capsule plate resting tangentially on the z=0 face, one voxel
    // outside the bright ball
    let mut fid = Volume::new(17, 17, 17);
    for y in 7..=9 {
        for x in 7..=9 {
            fid.set(0, y, x, 1u8).unwrap();
        }
    }

    let plain = run_segmentation(&img, &mask, None, params(), &mut NullSink).unwrap();
    assert_eq!(plain.get(0, 8, 8).unwrap(), 0);

    let with_fid = run_segmentation(&img, &mask, Some(&fid), params(), &mut NullSink).unwrap();
    assert_eq!(with_fid.get(0, 8, 8).unwrap(), 1);
    // the rest of the surface is unaffected far from the plate
    assert_eq!(with_fid.get(16, 8, 8).unwrap(), 0);
    assert_eq!(with_fid.get(5, 8, 8).unwrap(), 1);
}

/// Degenerate radii degrade to no-ops instead of aborting the run.
#[test]
fn degenerate_radii_do_not_abort() {
    let center = (8, 8, 8);
    let (img, mask) = phantom(17, center, 3.0, 4.0);

    assert_eq!(erode(&mask, -1.0).unwrap(), mask);

    let degenerate = SegmentationParams {
        erode_mm: -1.0,
        smoothing_mm: -1.0,
        ..params()
    };
    let out = run_segmentation(&img, &mask, None, degenerate, &mut NullSink).unwrap();
    assert_eq!(out.get(8, 8, 8).unwrap(), 1);
    assert_eq!(out.get(0, 0, 0).unwrap(), 0);
}

/// Two runs over the same inputs must agree bit for bit.
#[test]
fn pipeline_is_deterministic() {
    let center = (8, 8, 8);
    let (img, mask) = phantom(17, center, 3.0, 4.0);
    let a = run_segmentation(&img, &mask, None, params(), &mut NullSink).unwrap();
    let b = run_segmentation(&img, &mask, None, params(), &mut NullSink).unwrap();
    assert_eq!(a, b);
}

/// The pipeline is generic over the intensity element type; integer
/// volumes go through the same path as floats.
#[test]
fn integer_intensity_volumes_supported() {
    let center = (8, 8, 8);
    let (img, mask) = phantom(17, center, 3.0, 4.0);
    let img_i16: Volume<i16> = img.cast();
    let from_float = run_segmentation(&img, &mask, None, params(), &mut NullSink).unwrap();
    let from_int = run_segmentation(&img_i16, &mask, None, params(), &mut NullSink).unwrap();
    assert_eq!(from_float, from_int);
}
