use blockcf::{
    BlockGrid, BlockSize, BootstrapConfig, BootstrapOutput, Catalog, DistanceMetric, FieldLayout,
    JackknifeConfig, MembershipStrategy, Result, Statistic, StatisticBuilder, block_bootstrap,
    block_bootstrap_seeded, block_jackknife,
};
use ndarray::{Array1, Array2, ArrayView2, array};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

mod common;

use common::{allclose, clustered_points, isclose, uniform_points};

fn n_data_statistic(data: ArrayView2<f64>, _rands: ArrayView2<f64>) -> Result<Array1<f64>> {
    Ok(array![data.nrows() as f64])
}

/// 3 data points near the first center and 5 near the second
fn two_field_catalog() -> (Array2<f64>, Array2<f64>, FieldLayout) {
    #[rustfmt::skip]
    let data = array![
        [0.1, 0.0, 0.0], [0.0, 0.2, 0.0], [-0.1, 0.0, 0.1],
        [10.0, 0.0, 0.0], [10.1, 0.0, 0.0], [9.9, 0.1, 0.0], [10.0, -0.2, 0.0], [10.0, 0.0, 0.3],
    ];
    #[rustfmt::skip]
    let rands = array![
        [0.5, 0.0, 0.0], [-0.5, 0.0, 0.0], [0.0, 0.5, 0.0], [0.0, -0.5, 0.0],
        [10.5, 0.0, 0.0], [9.5, 0.0, 0.0], [10.0, 0.5, 0.0], [10.0, -0.5, 0.0],
    ];
    let layout = FieldLayout::new(
        vec![[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]],
        [2.0, 2.0, 2.0],
        [1, 1, 1],
    )
    .unwrap();
    (data, rands, layout)
}

#[test]
fn jackknife_of_a_counting_statistic() {
    let (data, rands, layout) = two_field_catalog();
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let result = block_jackknife(
        &catalog,
        &layout,
        &DistanceMetric::Euclidean,
        &n_data_statistic,
        &JackknifeConfig::new().keep_replicates(true),
    )
    .unwrap();

    assert_eq!(result.mean, array![8.0]);
    assert_eq!(result.n_blocks, 2);
    assert_eq!(result.n_dropped, 0);
    // leaving out block 0 keeps 5 points, leaving out block 1 keeps 3
    assert_eq!(result.replicates.unwrap(), array![[5.0], [3.0]]);
    // (N-1)/N * ((5-8)^2 + (3-8)^2)
    assert_eq!(result.covariance, array![[17.0]]);
}

#[test]
fn jackknife_drops_nan_resamples() {
    let (data, rands, layout) = two_field_catalog();
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let statistic = |data: ArrayView2<f64>, _rands: ArrayView2<f64>| -> Result<Array1<f64>> {
        let n = data.nrows() as f64;
        Ok(array![if n < 4.0 { f64::NAN } else { n }])
    };
    let result = block_jackknife(
        &catalog,
        &layout,
        &DistanceMetric::Euclidean,
        &statistic,
        &JackknifeConfig::default(),
    )
    .unwrap();
    assert_eq!(result.n_dropped, 1);
    assert!(result.replicates.is_none());
    // the prefactor still counts both blocks
    assert_eq!(result.covariance, array![[0.5 * 9.0]]);
}

#[test]
fn jackknife_covariance_is_symmetric_and_psd() {
    let data = clustered_points(21, 10, 6, 30.0);
    let rands = uniform_points(22, 200, 30.0);
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let layout = FieldLayout::single([15.0, 15.0, 15.0], [30.0, 30.0, 30.0], [2, 2, 1]).unwrap();
    let statistic = StatisticBuilder::new()
        .name("xi_r")
        .bin_edges(&[0.5, 2.0, 5.0, 10.0])
        .build()
        .unwrap();

    let result = block_jackknife(
        &catalog,
        &layout,
        &DistanceMetric::Euclidean,
        statistic.as_ref(),
        &JackknifeConfig::default(),
    )
    .unwrap();
    let cov = &result.covariance;
    assert_eq!(cov.shape(), &[3, 3]);
    for i in 0..3 {
        assert!(cov[[i, i]] >= 0.0);
        for j in 0..3 {
            assert!(isclose(cov[[i, j]], cov[[j, i]], 1e-12, 1e-14));
        }
    }
    for v in [
        array![1.0, 0.0, 0.0],
        array![1.0, -1.0, 0.5],
        array![-0.3, 2.0, 1.0],
    ] {
        let quad = v.dot(&cov.dot(&v));
        assert!(quad >= -1e-12 * cov.diag().sum().abs());
    }
}

#[test]
fn jackknife_uses_binning_coordinates() {
    let (data, rands, layout) = two_field_catalog();
    // the binning coordinates put every point in the first field
    let data_to_bin = Array2::<f64>::zeros(data.raw_dim());
    let rands_to_bin = Array2::<f64>::zeros(rands.raw_dim());
    let catalog = Catalog::new(data.view(), rands.view())
        .unwrap()
        .with_binning_coords(data_to_bin.view(), rands_to_bin.view())
        .unwrap();
    let result = block_jackknife(
        &catalog,
        &layout,
        &DistanceMetric::Euclidean,
        &n_data_statistic,
        &JackknifeConfig::new().keep_replicates(true),
    )
    .unwrap();
    assert_eq!(result.replicates.unwrap(), array![[0.0], [8.0]]);
}

#[test]
fn jackknife_rejects_empty_catalogs() {
    let (data, _, layout) = two_field_catalog();
    let empty = Array2::<f64>::zeros((0, 3));
    let catalog = Catalog::new(data.view(), empty.view()).unwrap();
    let err = block_jackknife(
        &catalog,
        &layout,
        &DistanceMetric::Euclidean,
        &n_data_statistic,
        &JackknifeConfig::default(),
    )
    .unwrap_err();
    assert!(err.is_empty_input());
}

#[test]
fn bootstrap_without_resamples_is_direct() {
    let data = clustered_points(31, 5, 5, 20.0);
    let rands = uniform_points(32, 100, 20.0);
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let statistic = StatisticBuilder::new()
        .name("wp_rp")
        .bin_edges(&[0.5, 2.0, 5.0])
        .pimax(4.0)
        .build()
        .unwrap();

    let output = block_bootstrap_seeded(
        &catalog,
        &BlockSize::Length(10.0),
        statistic.as_ref(),
        &BootstrapConfig::new().n_bootstrap(0),
        0,
    )
    .unwrap();
    let direct = statistic.compute(data.view(), rands.view()).unwrap();
    match output {
        BootstrapOutput::Direct(value) => {
            assert!(allclose(
                value.as_slice().unwrap(),
                direct.as_slice().unwrap(),
                0.0,
                0.0
            ))
        }
        BootstrapOutput::Resampled(_) => panic!("expected the direct statistic"),
    }
}

#[test]
fn membership_strategies_agree() {
    let data = clustered_points(41, 8, 5, 20.0);
    let rands = uniform_points(42, 150, 20.0);
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let statistic = StatisticBuilder::new()
        .name("xi_r")
        .bin_edges(&[0.5, 2.0, 6.0])
        .estimator("natural")
        .build()
        .unwrap();
    let block_size = BlockSize::AxisLengths([5.0, 5.0, 10.0]);

    let run = |strategy: MembershipStrategy| {
        let config = BootstrapConfig::new().n_bootstrap(6).strategy(strategy);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        match block_bootstrap(&catalog, &block_size, statistic.as_ref(), &config, &mut rng) {
            Ok(BootstrapOutput::Resampled(estimate)) => estimate,
            _ => panic!("expected resampled output"),
        }
    };
    let indexed = run(MembershipStrategy::Indexed);
    let scan = run(MembershipStrategy::Scan);
    for (a, b) in [
        (&indexed.value, &scan.value),
        (&indexed.stderr, &scan.stderr),
        (&indexed.stderr_err, &scan.stderr_err),
    ] {
        assert!(allclose(a.as_slice().unwrap(), b.as_slice().unwrap(), 0.0, 0.0));
    }
    assert_eq!(indexed.n_success, scan.n_success);
}

#[test]
fn bootstrap_error_of_error() {
    let data = uniform_points(51, 60, 10.0);
    let rands = uniform_points(52, 60, 10.0);
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let config = BootstrapConfig::new().n_bootstrap(25);
    let output = block_bootstrap_seeded(
        &catalog,
        &BlockSize::Length(5.0),
        &n_data_statistic,
        &config,
        99,
    )
    .unwrap();
    let BootstrapOutput::Resampled(estimate) = output else {
        panic!("expected resampled output");
    };
    assert_eq!(estimate.n_success, vec![25]);
    let expected = estimate.stderr[0] / (2.0_f64 * 24.0).sqrt();
    assert!(isclose(estimate.stderr_err[0], expected, 1e-15, 0.0));
}

#[test]
fn bootstrap_of_equal_blocks_has_no_spread() {
    // every block of the 2x2x2 grid holds exactly one data point and one
    // random point, so every resample holds 8 of each
    let mut points = Vec::new();
    for ix in 0..2 {
        for iy in 0..2 {
            for iz in 0..2 {
                points.extend([ix as f64 + 0.5, iy as f64 + 0.5, iz as f64 + 0.5]);
            }
        }
    }
    let points = Array2::from_shape_vec((8, 3), points).unwrap();
    let catalog = Catalog::new(points.view(), points.view()).unwrap();
    let edges = vec![0.0, 1.0, 2.0];
    let block_size = BlockSize::Edges([edges.clone(), edges.clone(), edges]);
    let config = BootstrapConfig::new()
        .n_bootstrap(12)
        .return_better_answer(true);

    let output =
        block_bootstrap_seeded(&catalog, &block_size, &n_data_statistic, &config, 5).unwrap();
    let BootstrapOutput::Resampled(estimate) = output else {
        panic!("expected resampled output");
    };
    assert_eq!(estimate.value, array![8.0]);
    assert_eq!(estimate.stderr, array![0.0]);
    assert_eq!(estimate.stderr_err, array![0.0]);
}

#[test]
fn bootstrap_spread_matches_block_resampling_variance() {
    // 4 blocks along x holding 1, 2, 3 and 6 data points. A resample's data
    // count is the sum of 4 independent draws from those counts, so its
    // standard deviation is sqrt(4 * var(c)) with the population variance
    let counts = [1usize, 2, 3, 6];
    let mut data = Vec::new();
    for (block, &count) in counts.iter().enumerate() {
        for member in 0..count {
            data.extend([block as f64 + 0.5, (member as f64 + 0.5) / 8.0, 0.5]);
        }
    }
    let n_data = counts.iter().sum();
    let data = Array2::from_shape_vec((n_data, 3), data).unwrap();
    let rands = Array2::from_shape_fn((4, 3), |(i, j)| if j == 0 { i as f64 + 0.5 } else { 0.5 });
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let block_size = BlockSize::Edges([
        vec![0.0, 1.0, 2.0, 3.0, 4.0],
        vec![0.0, 1.0],
        vec![0.0, 1.0],
    ]);

    let n_blocks = counts.len() as f64;
    let mean_count = n_data as f64 / n_blocks;
    let var_pop = counts
        .iter()
        .map(|&c| (c as f64 - mean_count).powi(2))
        .sum::<f64>()
        / n_blocks;
    let expected_stderr = (n_blocks * var_pop).sqrt();

    let config = BootstrapConfig::new().n_bootstrap(4000);
    let output =
        block_bootstrap_seeded(&catalog, &block_size, &n_data_statistic, &config, 2024).unwrap();
    let BootstrapOutput::Resampled(estimate) = output else {
        panic!("expected resampled output");
    };
    assert_eq!(estimate.n_success, vec![4000]);
    assert!(isclose(estimate.stderr[0], expected_stderr, 0.06, 0.0));
    assert!(isclose(estimate.value[0], n_data as f64, 0.0, 0.3));
}

#[test]
fn bootstrap_is_reproducible_from_a_seed() {
    let data = clustered_points(61, 6, 5, 20.0);
    let rands = uniform_points(62, 120, 20.0);
    let catalog = Catalog::new(data.view(), rands.view()).unwrap();
    let statistic = StatisticBuilder::new()
        .name("xi_r")
        .bin_edges(&[0.5, 3.0, 8.0])
        .build()
        .unwrap();
    let config = BootstrapConfig::new().n_bootstrap(4);
    let block_size = BlockSize::Length(7.0);

    let first =
        block_bootstrap_seeded(&catalog, &block_size, statistic.as_ref(), &config, 11).unwrap();
    let second =
        block_bootstrap_seeded(&catalog, &block_size, statistic.as_ref(), &config, 11).unwrap();
    assert!(allclose(
        first.value().as_slice().unwrap(),
        second.value().as_slice().unwrap(),
        0.0,
        0.0
    ));
}

#[test]
fn bootstrap_rejects_empty_catalogs() {
    let points = uniform_points(71, 10, 5.0);
    let empty = Array2::<f64>::zeros((0, 3));
    let catalog = Catalog::new(empty.view(), points.view()).unwrap();
    let err = block_bootstrap_seeded(
        &catalog,
        &BlockSize::Length(1.0),
        &n_data_statistic,
        &BootstrapConfig::default(),
        0,
    )
    .unwrap_err();
    assert!(err.is_empty_input());
}

#[test]
fn grid_ids_are_in_range() {
    let rands = uniform_points(81, 300, 12.0);
    let data = uniform_points(82, 100, 12.0);
    let grid = BlockGrid::from_spec(rands.view(), &BlockSize::Length(3.0)).unwrap();
    let assignment = grid.assign(data.view(), rands.view()).unwrap();
    // the scalar-length grid is padded, so everything inside the randoms'
    // bounding box has a block
    assert_eq!(assignment.n_unassigned().1, 0);
    for label in assignment.rand_labels() {
        assert!(label.unwrap() < grid.n_blocks());
    }

    let trimmed = BlockGrid::from_spec(rands.view(), &BlockSize::AxisLengths([5.0; 3])).unwrap();
    let (_, rand_labels) = trimmed
        .assign(data.view(), rands.view())
        .unwrap()
        .as_signed_labels();
    assert!(rand_labels.iter().all(|&l| l >= -1 && l < trimmed.n_blocks() as i64));
    assert!(rand_labels.contains(&-1));
}
