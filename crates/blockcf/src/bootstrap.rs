//! Block bootstrap
//!
//! Each resample draws `n_blocks` blocks, uniformly and with replacement,
//! from the uniform block grid and gathers every data point and random
//! point of the drawn blocks (in draw order, so a block drawn twice
//! contributes its points twice). The statistic is evaluated on every
//! resample and summarized column by column, ignoring `NaN` entries.

use ndarray::{Array1, Array2, Axis, stack};
use rand::Rng;
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

use crate::{
    BlockAssignment, BlockGrid, BlockSize, Catalog, Error, Result, Statistic,
    misc::{gather_rows, nan_mean_std},
};

/// How the members of the drawn blocks are looked up.
///
/// Both strategies produce identical resamples for a given sequence of
/// draws. They only differ in cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipStrategy {
    /// Build the member list of every block once, up front. Uses memory
    /// proportional to the number of points.
    Indexed,
    /// Rescan the block labels for every drawn block
    Scan,
}

const DEFAULT_N_BOOTSTRAP: usize = 10;
const DEFAULT_FAST_PATH_WORK_LIMIT: usize = 10_000_000;

/// Settings for [`block_bootstrap`]
#[derive(Clone, Debug)]
pub struct BootstrapConfig {
    n_bootstrap: usize,
    return_better_answer: bool,
    fast_path_work_limit: usize,
    strategy: Option<MembershipStrategy>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_bootstrap: DEFAULT_N_BOOTSTRAP,
            return_better_answer: false,
            fast_path_work_limit: DEFAULT_FAST_PATH_WORK_LIMIT,
            strategy: None,
        }
    }
}

impl BootstrapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of resamples. With 0, the statistic is evaluated once on the
    /// full catalog and no errors are estimated.
    pub fn n_bootstrap(mut self, n_bootstrap: usize) -> Self {
        self.n_bootstrap = n_bootstrap;
        self
    }

    /// report the statistic of the full catalog (rather than the mean of
    /// the resamples) as the central value
    pub fn return_better_answer(mut self, flag: bool) -> Self {
        self.return_better_answer = flag;
        self
    }

    /// The [`MembershipStrategy::Indexed`] strategy is used while
    /// `n_bootstrap * max(n_data, n_rands)` stays below this value
    pub fn fast_path_work_limit(mut self, limit: usize) -> Self {
        self.fast_path_work_limit = limit;
        self
    }

    /// force a particular membership strategy
    pub fn strategy(mut self, strategy: MembershipStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn get_n_bootstrap(&self) -> usize {
        self.n_bootstrap
    }

    /// the strategy used for catalogs with the given sizes
    pub fn resolve_strategy(&self, n_data: usize, n_rands: usize) -> MembershipStrategy {
        match self.strategy {
            Some(strategy) => strategy,
            None if self.n_bootstrap.saturating_mul(n_data.max(n_rands))
                < self.fast_path_work_limit =>
            {
                MembershipStrategy::Indexed
            }
            None => MembershipStrategy::Scan,
        }
    }
}

/// Summary of the bootstrap resamples. Every array has one entry per
/// component of the statistic.
#[derive(Clone, Debug)]
pub struct BootstrapEstimate {
    /// the `NaN`-ignoring mean of the resamples (or the statistic of the
    /// full catalog, with `return_better_answer`)
    pub value: Array1<f64>,
    /// sample standard deviation (ddof = 1) of the resamples
    pub stderr: Array1<f64>,
    /// `stderr / sqrt(2 (n_success - 1))`
    pub stderr_err: Array1<f64>,
    /// number of non-`NaN` resamples
    pub n_success: Vec<usize>,
}

#[derive(Clone, Debug)]
pub enum BootstrapOutput {
    /// the statistic of the full catalog (`n_bootstrap == 0`)
    Direct(Array1<f64>),
    Resampled(BootstrapEstimate),
}

impl BootstrapOutput {
    /// the central value, whichever way it was computed
    pub fn value(&self) -> &Array1<f64> {
        match self {
            BootstrapOutput::Direct(value) => value,
            BootstrapOutput::Resampled(estimate) => &estimate.value,
        }
    }
}

/// Looks up the points of the drawn blocks
enum Membership<'a> {
    Indexed {
        data: Vec<Vec<usize>>,
        rands: Vec<Vec<usize>>,
    },
    Scan(&'a BlockAssignment),
}

fn member_lists(labels: &[Option<usize>], n_blocks: usize) -> Vec<Vec<usize>> {
    let mut lists = vec![Vec::new(); n_blocks];
    for (i, label) in labels.iter().enumerate() {
        if let Some(block) = label {
            lists[*block].push(i);
        }
    }
    lists
}

fn scan(labels: &[Option<usize>], block: usize, out: &mut Vec<usize>) {
    out.extend(
        labels
            .iter()
            .enumerate()
            .filter_map(|(i, label)| (*label == Some(block)).then_some(i)),
    );
}

impl<'a> Membership<'a> {
    fn new(assignment: &'a BlockAssignment, strategy: MembershipStrategy) -> Self {
        match strategy {
            MembershipStrategy::Indexed => Membership::Indexed {
                data: member_lists(assignment.data_labels(), assignment.n_blocks()),
                rands: member_lists(assignment.rand_labels(), assignment.n_blocks()),
            },
            MembershipStrategy::Scan => Membership::Scan(assignment),
        }
    }

    /// indices of the data points and of the random points in `blocks`,
    /// concatenated in the order of `blocks`
    fn gather(&self, blocks: &[usize]) -> (Vec<usize>, Vec<usize>) {
        let mut data_idx = Vec::new();
        let mut rand_idx = Vec::new();
        for &block in blocks {
            match self {
                Membership::Indexed { data, rands } => {
                    data_idx.extend_from_slice(&data[block]);
                    rand_idx.extend_from_slice(&rands[block]);
                }
                Membership::Scan(assignment) => {
                    scan(assignment.data_labels(), block, &mut data_idx);
                    scan(assignment.rand_labels(), block, &mut rand_idx);
                }
            }
        }
        (data_idx, rand_idx)
    }
}

/// Column-wise summary of the resample matrix (one row per resample)
fn summarize(results: &Array2<f64>) -> BootstrapEstimate {
    let n_cols = results.ncols();
    let mut value = Array1::zeros(n_cols);
    let mut stderr = Array1::zeros(n_cols);
    let mut stderr_err = Array1::zeros(n_cols);
    let mut n_success = Vec::with_capacity(n_cols);
    for (col, column) in results.axis_iter(Axis(1)).enumerate() {
        let (mean, std, n) = nan_mean_std(column);
        if n == 0 {
            tracing::warn!(column = col, "every bootstrap resample is NaN");
        }
        value[col] = mean;
        stderr[col] = std;
        stderr_err[col] = if n >= 2 {
            std / (2.0 * (n - 1) as f64).sqrt()
        } else {
            f64::NAN
        };
        n_success.push(n);
    }
    BootstrapEstimate {
        value,
        stderr,
        stderr_err,
        n_success,
    }
}

/// Estimates the uncertainty of `statistic` with the block bootstrap.
///
/// Blocks come from a [`BlockGrid`] spanning the extent of the catalog's
/// random binning coordinates. The resampled blocks are drawn from `rng`.
pub fn block_bootstrap<S, R>(
    catalog: &Catalog,
    block_size: &BlockSize,
    statistic: &S,
    config: &BootstrapConfig,
    rng: &mut R,
) -> Result<BootstrapOutput>
where
    S: Statistic + ?Sized,
    R: Rng + ?Sized,
{
    catalog.require_nonempty()?;
    let grid = BlockGrid::from_spec(catalog.rands_to_bin(), block_size)?;
    let assignment = grid.assign(catalog.data_to_bin(), catalog.rands_to_bin())?;

    if config.n_bootstrap == 0 {
        return Ok(BootstrapOutput::Direct(
            statistic.compute(catalog.data(), catalog.rands())?,
        ));
    }

    let n_blocks = grid.n_blocks();
    let strategy = config.resolve_strategy(catalog.data().nrows(), catalog.rands().nrows());
    tracing::info!(
        n_blocks,
        n_bootstrap = config.n_bootstrap,
        ?strategy,
        "starting block bootstrap"
    );
    let membership = Membership::new(&assignment, strategy);
    let block_dist = Uniform::try_from(0..n_blocks)
        .map_err(|_| Error::integer_range("number of blocks", 0, 1, i64::MAX))?;

    let mut results: Vec<Array1<f64>> = Vec::with_capacity(config.n_bootstrap);
    for resample in 0..config.n_bootstrap {
        let blocks: Vec<usize> = (0..n_blocks).map(|_| block_dist.sample(rng)).collect();
        let (data_idx, rand_idx) = membership.gather(&blocks);
        let data = gather_rows(catalog.data(), &data_idx);
        let rands = gather_rows(catalog.rands(), &rand_idx);
        let answer = statistic.compute(data.view(), rands.view())?;
        if let Some(first) = results.first() {
            if first.len() != answer.len() {
                return Err(Error::mismatch(
                    "length of the statistic",
                    first.len().to_string(),
                    answer.len().to_string(),
                ));
            }
        }
        tracing::debug!(
            resample,
            n_data = data_idx.len(),
            n_rands = rand_idx.len(),
            "computed bootstrap resample"
        );
        results.push(answer);
    }

    let views: Vec<_> = results.iter().map(|r| r.view()).collect();
    let results =
        stack(Axis(0), &views).map_err(|_| Error::internal("inconsistent resamples"))?;
    let mut estimate = summarize(&results);
    if config.return_better_answer {
        estimate.value = statistic.compute(catalog.data(), catalog.rands())?;
    }
    Ok(BootstrapOutput::Resampled(estimate))
}

/// Like [`block_bootstrap`], with the blocks drawn from a
/// `Xoshiro256PlusPlus` generator seeded with `seed`
pub fn block_bootstrap_seeded<S: Statistic + ?Sized>(
    catalog: &Catalog,
    block_size: &BlockSize,
    statistic: &S,
    config: &BootstrapConfig,
    seed: u64,
) -> Result<BootstrapOutput> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    block_bootstrap(catalog, block_size, statistic, config, &mut rng)
}
