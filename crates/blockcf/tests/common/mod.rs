// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

#![allow(dead_code)]

use ndarray::Array2;
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

pub fn allclose(actual: &[f64], ref_vals: &[f64], rtol: f64, atol: f64) -> bool {
    actual.len() == ref_vals.len()
        && actual
            .iter()
            .zip(ref_vals)
            .all(|(a, r)| isclose(*a, *r, rtol, atol))
}

/// `n_points` positions drawn uniformly from the cube `[0, side)^3`
pub fn uniform_points(seed: u64, n_points: usize, side: f64) -> Array2<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let distribution = Uniform::new(0.0, side).unwrap();
    Array2::from_shape_simple_fn((n_points, 3), || distribution.sample(&mut rng))
}

/// `n_clumps` tight clumps of `per_clump` points, scattered through the
/// cube `[0, side)^3`
pub fn clustered_points(seed: u64, n_clumps: usize, per_clump: usize, side: f64) -> Array2<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let center_dist = Uniform::new(0.1 * side, 0.9 * side).unwrap();
    let offset_dist = Uniform::new(-0.02 * side, 0.02 * side).unwrap();
    let mut out = Array2::zeros((n_clumps * per_clump, 3));
    for clump in 0..n_clumps {
        let center: [f64; 3] = std::array::from_fn(|_| center_dist.sample(&mut rng));
        for member in 0..per_clump {
            for axis in 0..3 {
                out[[clump * per_clump + member, axis]] =
                    center[axis] + offset_dist.sample(&mut rng);
            }
        }
    }
    out
}
