/*!
Estimates two-point correlation functions of a galaxy catalog (measured
against a matched random catalog) and their uncertainties through spatial
block resampling.

# High-Level: Correlation Functions and Their Errors

The correlation functions are built from pair counts: DD (data-data), DR
(data-random) and RR (random-random) pairs, binned in 3D separation `r`, or
in separation perpendicular to (`rp`) and along (`pi`) the line of sight.
The counts combine into xi(r), xi(rp, pi) or the projected correlation
function wp(rp) with the Natural or the Landy & Szalay (1993) estimator.

Neighboring galaxies aren't independent, so the uncertainty of these
statistics is estimated by carving the survey volume into spatial blocks
and resampling whole blocks:
- [`block_jackknife`] leaves out one block at a time and builds a covariance
  matrix
- [`block_bootstrap`] draws blocks with replacement and reports a standard
  error along with the error on that standard error

Statistical degeneracies (e.g. a resample holding fewer than 2 points) never
produce errors. They show up as `NaN` values, which the resampling routines
filter out.

# User Guide

```
use blockcf::{BlockSize, BootstrapConfig, Catalog, StatisticBuilder, block_bootstrap_seeded};
use ndarray::Array2;

let data = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
let rands = Array2::from_shape_fn((80, 3), |(i, j)| ((i * 5 + j * 2) % 13) as f64);
let catalog = Catalog::new(data.view(), rands.view()).unwrap();

let statistic = StatisticBuilder::new()
    .name("xi_r")
    .bin_edges(&[1.0, 2.0, 4.0])
    .build()
    .unwrap();
let config = BootstrapConfig::new().n_bootstrap(5);
let output = block_bootstrap_seeded(
    &catalog,
    &BlockSize::Length(6.0),
    statistic.as_ref(),
    &config,
    42,
)
.unwrap();
assert_eq!(output.value().len(), 2);
```

# Developer Guide

Raw pair counts come from a [`PairCounter`]. [`BruteForceCounter`] is built
on the loops in [`blockcf_nostd_internal`], which holds everything that
doesn't need an allocator.

*/

#![deny(rustdoc::broken_intra_doc_links)]

// inform build-system of the crates in this package
mod bias;
mod bootstrap;
mod catalog;
mod counter;
mod error;
mod estimators;
mod jackknife;
mod misc;
mod paircounts;
mod partition;
mod statistic;

// pull in symbols that visible outside of the package
pub use bias::{BiasCurves, DEFAULT_ALPHA, DEFAULT_R0, DarkMatterWp, RpBinning, bias_rp};
pub use bootstrap::{
    BootstrapConfig, BootstrapEstimate, BootstrapOutput, MembershipStrategy, block_bootstrap,
    block_bootstrap_seeded,
};
pub use catalog::Catalog;
pub use counter::{
    BruteForceCounter, CountConfig, PairCounter, convert_3d_counts_to_cf,
    convert_rp_pi_counts_to_wp,
};
pub use error::{Error, Result};
pub use estimators::{Estimator, wp_rp, wp_rp_box, xi_r, xi_rp_pi};
pub use jackknife::{JackknifeConfig, JackknifeResult, block_jackknife};
pub use paircounts::{
    PairCounts, PrecomputedCounts, counts_to_wp, counts_to_xi, paircount_r, paircount_rp_pi,
};
pub use partition::{
    BlockAssignment, BlockGrid, BlockSize, DistanceMetric, FieldLayout, FieldMetric,
    MAX_BLOCKS_PER_AXIS,
};
pub use statistic::{Statistic, StatisticBuilder, statistic_names};
