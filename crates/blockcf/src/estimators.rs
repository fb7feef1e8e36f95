//! Correlation-function estimators computed directly from point sets.

use std::fmt;
use std::str::FromStr;

use blockcf_nostd_internal::validate_bin_edges;
use ndarray::{Array1, Array2, ArrayView2, Ix1, Ix2};

use crate::{
    CountConfig, Error, Result,
    misc::{nan_array, point_set_view},
    paircounts::{PrecomputedCounts, paircount_r, paircount_rp_pi, paircount_unit_pi},
};

/// Selects how DD, DR and RR combine into a correlation function.
///
/// With `f = n_rand / n_data`:
/// - `Natural`: `f^2 DD / RR - 1`
/// - `LandySzalay`: `(f^2 DD - 2 f DR + RR) / RR` (Landy & Szalay 1993)
///
/// Bins without any random-random pairs evaluate to `NaN`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Estimator {
    Natural,
    #[default]
    LandySzalay,
}

const ESTIMATOR_NAMES: [(&str, Estimator); 2] = [
    ("natural", Estimator::Natural),
    ("landy-szalay", Estimator::LandySzalay),
];

impl Estimator {
    pub fn name(&self) -> &'static str {
        match self {
            Estimator::Natural => "natural",
            Estimator::LandySzalay => "landy-szalay",
        }
    }

    /// evaluates the estimator for a single bin
    pub(crate) fn apply(&self, factor: f64, dd: f64, dr: f64, rr: f64) -> f64 {
        if !(rr > 0.0) {
            return f64::NAN;
        }
        match self {
            Estimator::Natural => factor * factor * dd / rr - 1.0,
            Estimator::LandySzalay => (factor * factor * dd - 2.0 * factor * dr + rr) / rr,
        }
    }
}

impl FromStr for Estimator {
    type Err = Error;

    /// Parses an estimator name (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.to_lowercase();
        ESTIMATOR_NAMES
            .iter()
            .find_map(|(name, estimator)| (*name == lowered).then_some(*estimator))
            .ok_or_else(|| {
                Error::estimator_name(
                    s.to_owned(),
                    ESTIMATOR_NAMES.iter().map(|(n, _)| n.to_string()).collect(),
                )
            })
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn n_bins_of(bin_edges: &[f64], who: &'static str) -> Result<usize> {
    validate_bin_edges(bin_edges).map_err(|what| Error::bin_edge(who, what))?;
    Ok(bin_edges.len() - 1)
}

fn either_is_empty(data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<bool> {
    point_set_view(data, "data")?;
    point_set_view(rands, "rands")?;
    Ok(data.nrows() == 0 || rands.nrows() == 0)
}

/// The 3D correlation function xi(r), evaluated in the bins `rbins`.
///
/// When either point set is empty, every entry is `NaN`.
pub fn xi_r(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rbins: &[f64],
    estimator: Estimator,
    config: &CountConfig,
) -> Result<Array1<f64>> {
    let n_rbins = n_bins_of(rbins, "rbins")?;
    if either_is_empty(data, rands)? {
        return Ok(nan_array(n_rbins));
    }
    paircount_r(data, rands, rbins, config, PrecomputedCounts::default())?
        .to_xi_with(estimator)?
        .into_dimensionality::<Ix1>()
        .map_err(|_| Error::internal("xi(r) must be 1D"))
}

/// The 2D correlation function xi(rp, pi), with shape
/// `(n_rpbins, n_pibins)`.
///
/// `pibins` must be evenly spaced and start at 0. When either point set is
/// empty, every entry is `NaN`.
pub fn xi_rp_pi(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rpbins: &[f64],
    pibins: &[f64],
    estimator: Estimator,
    config: &CountConfig,
) -> Result<Array2<f64>> {
    let n_rpbins = n_bins_of(rpbins, "rpbins")?;
    let n_pibins = n_bins_of(pibins, "pibins")?;
    let pimax = pibins[n_pibins];
    let dpi = pimax / n_pibins as f64;
    if pibins[0] != 0.0 {
        return Err(Error::bin_edge("pibins", "the first edge must be 0"));
    }
    let evenly_spaced = pibins
        .windows(2)
        .all(|w| ((w[1] - w[0]) - dpi).abs() <= 1e-8 * dpi);
    if !evenly_spaced {
        return Err(Error::bin_edge("pibins", "the edges must be evenly spaced"));
    }

    if either_is_empty(data, rands)? {
        return Ok(Array2::from_elem((n_rpbins, n_pibins), f64::NAN));
    }
    paircount_unit_pi(
        data,
        rands,
        rpbins,
        n_pibins,
        dpi,
        config,
        PrecomputedCounts::default(),
    )?
    .to_xi_with(estimator)?
    .into_dimensionality::<Ix2>()
    .map_err(|_| Error::internal("xi(rp, pi) must be 2D"))
}

/// The projected correlation function wp(rp), integrated over line-of-sight
/// separations up to `pimax` in bins of width `dpi`.
///
/// Only the Landy-Szalay estimator is available. When either point set is
/// empty, every entry is `NaN`.
pub fn wp_rp(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rpbins: &[f64],
    pimax: f64,
    dpi: f64,
    config: &CountConfig,
) -> Result<Array1<f64>> {
    let n_rpbins = n_bins_of(rpbins, "rpbins")?;
    if either_is_empty(data, rands)? {
        return Ok(nan_array(n_rpbins));
    }
    paircount_rp_pi(
        data,
        rands,
        rpbins,
        pimax,
        dpi,
        config,
        PrecomputedCounts::default(),
    )?
    .to_wp()
}

/// wp(rp) for points in a periodic cube of side `boxsize`. No random
/// catalog is needed; the counter compares against the analytic random-pair
/// expectation.
pub fn wp_rp_box(
    data: ArrayView2<f64>,
    rpbins: &[f64],
    pimax: f64,
    boxsize: f64,
    config: &CountConfig,
) -> Result<Array1<f64>> {
    let wp = config.get_counter().wp_box(
        data,
        rpbins,
        pimax,
        boxsize,
        config.get_nthreads(),
    )?;
    Ok(Array1::from(wp))
}
