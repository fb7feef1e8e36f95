//! Delete-one-block jackknife

use ndarray::{Array1, Array2, ArrayView1, Axis, stack};

use crate::{
    Catalog, Error, FieldLayout, FieldMetric, Result, Statistic,
    misc::{all_nan, complement_indices, gather_rows},
};

/// Settings for [`block_jackknife`]
#[derive(Clone, Debug, Default)]
pub struct JackknifeConfig {
    keep_replicates: bool,
}

impl JackknifeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// retain the statistic of every surviving leave-one-out resample in
    /// [`JackknifeResult::replicates`]
    pub fn keep_replicates(mut self, keep: bool) -> Self {
        self.keep_replicates = keep;
        self
    }
}

#[derive(Clone, Debug)]
pub struct JackknifeResult {
    /// the statistic evaluated on the full catalog
    pub mean: Array1<f64>,
    /// `(N-1)/N` times the summed outer products of the deviations of every
    /// surviving resample from `mean`, where `N` counts every block
    pub covariance: Array2<f64>,
    pub n_blocks: usize,
    /// number of resamples whose statistic was entirely `NaN`
    pub n_dropped: usize,
    /// one row per surviving resample, when requested
    pub replicates: Option<Array2<f64>>,
}

/// Estimates the covariance of `statistic` with the delete-one-block
/// jackknife.
///
/// Blocks come from `layout` (points are attached to their nearest field
/// center under `metric`, using the catalog's binning coordinates). For
/// every block, the statistic is recomputed on all points outside of that
/// block. Resamples whose statistic is entirely `NaN` are dropped, but the
/// `(N-1)/N` prefactor always uses the total number of blocks.
pub fn block_jackknife<S: Statistic + ?Sized>(
    catalog: &Catalog,
    layout: &FieldLayout,
    metric: &impl FieldMetric,
    statistic: &S,
    config: &JackknifeConfig,
) -> Result<JackknifeResult> {
    catalog.require_nonempty()?;
    let assignment = layout.assign(catalog.data_to_bin(), catalog.rands_to_bin(), metric)?;
    let n_blocks = assignment.n_blocks();
    tracing::info!(
        n_blocks,
        n_fields = layout.n_fields(),
        n_data = catalog.data().nrows(),
        n_rands = catalog.rands().nrows(),
        "starting block jackknife"
    );

    let mean = statistic.compute(catalog.data(), catalog.rands())?;

    let mut survivors: Vec<Array1<f64>> = Vec::with_capacity(n_blocks);
    let mut n_dropped = 0;
    for block in 0..n_blocks {
        let data_idx = complement_indices(assignment.data_labels(), block);
        let rand_idx = complement_indices(assignment.rand_labels(), block);
        let data = gather_rows(catalog.data(), &data_idx);
        let rands = gather_rows(catalog.rands(), &rand_idx);
        let answer = statistic.compute(data.view(), rands.view())?;
        if answer.len() != mean.len() {
            return Err(Error::mismatch(
                "length of the statistic",
                mean.len().to_string(),
                answer.len().to_string(),
            ));
        }
        tracing::debug!(
            block,
            n_data = data_idx.len(),
            n_rands = rand_idx.len(),
            "computed leave-one-out resample"
        );
        if all_nan(answer.view()) {
            tracing::warn!(block, "dropping jackknife resample: statistic is entirely NaN");
            n_dropped += 1;
        } else {
            survivors.push(answer);
        }
    }

    let covariance = if survivors.is_empty() {
        tracing::warn!(n_blocks, "every jackknife resample was dropped");
        Array2::from_elem((mean.len(), mean.len()), f64::NAN)
    } else {
        scaled_covariance(&survivors, mean.view(), n_blocks)?
    };

    let replicates = if config.keep_replicates && !survivors.is_empty() {
        let views: Vec<_> = survivors.iter().map(|a| a.view()).collect();
        Some(stack(Axis(0), &views).map_err(|_| Error::internal("inconsistent replicates"))?)
    } else if config.keep_replicates {
        Some(Array2::zeros((0, mean.len())))
    } else {
        None
    };

    Ok(JackknifeResult {
        mean,
        covariance,
        n_blocks,
        n_dropped,
        replicates,
    })
}

/// `(N-1)/N sum_l (x_l - ref) (x_l - ref)^T`
fn scaled_covariance(
    replicates: &[Array1<f64>],
    reference: ArrayView1<f64>,
    n_blocks: usize,
) -> Result<Array2<f64>> {
    let deviations: Vec<Array1<f64>> = replicates.iter().map(|r| r - &reference).collect();
    let views: Vec<_> = deviations.iter().map(|d| d.view()).collect();
    let deviations =
        stack(Axis(0), &views).map_err(|_| Error::internal("inconsistent replicates"))?;
    let n = n_blocks as f64;
    Ok(deviations.t().dot(&deviations) * ((n - 1.0) / n))
}
