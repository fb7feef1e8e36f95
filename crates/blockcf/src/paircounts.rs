//! Raw pair counts (DD, DR, RR) and their conversion to estimators.

use std::fmt;
use std::ops::Add;

use blockcf_nostd_internal::validate_bin_edges;
use ndarray::{Array1, ArrayD, ArrayView2, IxDyn};

use crate::{
    CountConfig, Error, Estimator, Result,
    counter::{convert_rp_pi_counts_to_wp, n_pibins},
    misc::{point_set_view, rescale_line_of_sight},
};

/// Stores the pair counts DD, DR and RR (plus the sample sizes and binning
/// metadata) needed to compute a correlation function.
///
/// With line-of-sight metadata (`pimax`), the counts are laid out rp-major
/// with `floor(pimax)` unit-width pi bins per rp bin. Counts that couldn't be
/// formed (fewer than 2 points) are filled with `NaN`.
#[derive(Clone, Debug, PartialEq)]
pub struct PairCounts {
    n_data: usize,
    n_rand: usize,
    dd: Vec<f64>,
    dr: Vec<f64>,
    rr: Vec<f64>,
    n_rpbins: usize,
    pimax: Option<f64>,
    dpi: Option<f64>,
}

/// Counts that the caller already knows. Any entry left as `None` is
/// computed.
#[derive(Clone, Debug, Default)]
pub struct PrecomputedCounts {
    pub dd: Option<Vec<f64>>,
    pub dr: Option<Vec<f64>>,
    pub rr: Option<Vec<f64>>,
}

impl PairCounts {
    /// create a new instance
    ///
    /// `dd`, `dr`, and `rr` must each hold `n_rpbins` entries (times the
    /// number of pi bins, when `pimax` is provided).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n_data: usize,
        n_rand: usize,
        dd: Vec<f64>,
        dr: Vec<f64>,
        rr: Vec<f64>,
        n_rpbins: usize,
        pimax: Option<f64>,
        dpi: Option<f64>,
    ) -> Result<Self> {
        if n_rpbins == 0 {
            return Err(Error::integer_range("n_rpbins", 0, 1, i64::MAX));
        }
        let n_pibins = match pimax {
            Some(pimax) => n_pibins(pimax)?,
            None => 1,
        };
        let expected = n_rpbins * n_pibins;
        for (name, counts) in [("DD", &dd), ("DR", &dr), ("RR", &rr)] {
            if counts.len() != expected {
                return Err(Error::mismatch(
                    format!("length of {name}"),
                    expected.to_string(),
                    counts.len().to_string(),
                ));
            }
        }
        Ok(Self {
            n_data,
            n_rand,
            dd,
            dr,
            rr,
            n_rpbins,
            pimax,
            dpi,
        })
    }

    pub fn n_data(&self) -> usize {
        self.n_data
    }

    pub fn n_rand(&self) -> usize {
        self.n_rand
    }

    pub fn dd(&self) -> &[f64] {
        &self.dd
    }

    pub fn dr(&self) -> &[f64] {
        &self.dr
    }

    pub fn rr(&self) -> &[f64] {
        &self.rr
    }

    pub fn n_rpbins(&self) -> usize {
        self.n_rpbins
    }

    pub fn pimax(&self) -> Option<f64> {
        self.pimax
    }

    pub fn dpi(&self) -> Option<f64> {
        self.dpi
    }

    /// number of line-of-sight bins (1 without line-of-sight metadata)
    pub fn n_pibins(&self) -> usize {
        self.dd.len() / self.n_rpbins
    }

    /// The Landy & Szalay (1993) correlation function. This is `xi(r)`
    /// (1D) without line-of-sight metadata and `xi(rp, pi)` (2D, shape
    /// `(n_rpbins, n_pibins)`) otherwise.
    pub fn to_xi(&self) -> Result<ArrayD<f64>> {
        self.to_xi_with(Estimator::LandySzalay)
    }

    /// like [`PairCounts::to_xi`], but with a choice of estimator
    pub fn to_xi_with(&self, estimator: Estimator) -> Result<ArrayD<f64>> {
        let factor = self.n_rand as f64 / self.n_data as f64;
        let xi: Vec<f64> = (0..self.dd.len())
            .map(|i| estimator.apply(factor, self.dd[i], self.dr[i], self.rr[i]))
            .collect();
        let shape = if self.pimax.is_some() {
            let n_pibins = self.dd.len() / self.n_rpbins;
            if n_pibins * self.n_rpbins != xi.len() {
                return Err(Error::mismatch(
                    "number of (rp, pi) counts",
                    format!("a multiple of {}", self.n_rpbins),
                    xi.len().to_string(),
                ));
            }
            vec![self.n_rpbins, n_pibins]
        } else {
            vec![xi.len()]
        };
        ArrayD::from_shape_vec(IxDyn(&shape), xi)
            .map_err(|_| Error::internal("xi has an inconsistent shape"))
    }

    /// The projected correlation function wp(rp), using the Landy & Szalay
    /// (1993) estimator (the only estimator available for wp).
    pub fn to_wp(&self) -> Result<Array1<f64>> {
        let (Some(pimax), Some(dpi)) = (self.pimax, self.dpi) else {
            return Err(Error::mismatch(
                "PairCounts metadata",
                "line-of-sight binning (pimax and dpi)".to_owned(),
                "3D binning".to_owned(),
            ));
        };
        let wp = convert_rp_pi_counts_to_wp(
            self.n_data,
            self.n_data,
            self.n_rand,
            self.n_rand,
            &self.dd,
            &self.dr,
            &self.dr,
            &self.rr,
            self.n_rpbins,
            pimax,
        )?;
        Ok(Array1::from(wp) * dpi)
    }

    /// Sums the counts and sample sizes of two sets of counts that share the
    /// same binning metadata
    pub fn try_add(&self, other: &PairCounts) -> Result<PairCounts> {
        if self.n_rpbins != other.n_rpbins
            || self.pimax != other.pimax
            || self.dpi != other.dpi
            || self.dd.len() != other.dd.len()
        {
            return Err(Error::mismatch(
                "PairCounts binning",
                format!(
                    "n_rpbins={}, pimax={:?}, dpi={:?}",
                    self.n_rpbins, self.pimax, self.dpi
                ),
                format!(
                    "n_rpbins={}, pimax={:?}, dpi={:?}",
                    other.n_rpbins, other.pimax, other.dpi
                ),
            ));
        }
        let sum = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x + y).collect();
        Ok(PairCounts {
            n_data: self.n_data + other.n_data,
            n_rand: self.n_rand + other.n_rand,
            dd: sum(&self.dd, &other.dd),
            dr: sum(&self.dr, &other.dr),
            rr: sum(&self.rr, &other.rr),
            n_rpbins: self.n_rpbins,
            pimax: self.pimax,
            dpi: self.dpi,
        })
    }
}

/// `(a + b)?` fails when the binning metadata differs
impl Add<&PairCounts> for &PairCounts {
    type Output = Result<PairCounts>;

    fn add(self, other: &PairCounts) -> Self::Output {
        self.try_add(other)
    }
}

impl Add for PairCounts {
    type Output = Result<PairCounts>;

    fn add(self, other: PairCounts) -> Self::Output {
        self.try_add(&other)
    }
}

impl fmt::Display for PairCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tPairCounts")?;
        writeln!(f, "\t==========")?;
        writeln!(f, "\tNdata = {}", self.n_data)?;
        writeln!(f, "\tNrand = {}", self.n_rand)?;
        writeln!(f, "DD = {:?}", self.dd)?;
        writeln!(f, "DR = {:?}", self.dr)?;
        write!(f, "RR = {:?}", self.rr)
    }
}

/// how pairs are binned
#[derive(Clone, Copy, Debug)]
enum Binning<'a> {
    R { bin_edges: &'a [f64] },
    RpPi { rp_bin_edges: &'a [f64], pimax: f64 },
}

impl Binning<'_> {
    fn n_rpbins(&self) -> usize {
        match self {
            Binning::R { bin_edges } => bin_edges.len() - 1,
            Binning::RpPi { rp_bin_edges, .. } => rp_bin_edges.len() - 1,
        }
    }

    fn n_counts(&self) -> Result<usize> {
        match self {
            Binning::R { .. } => Ok(self.n_rpbins()),
            Binning::RpPi { pimax, .. } => Ok(self.n_rpbins() * n_pibins(*pimax)?),
        }
    }

    fn count(
        &self,
        config: &CountConfig,
        points_a: ArrayView2<f64>,
        points_b: Option<ArrayView2<f64>>,
    ) -> Result<Vec<f64>> {
        let counter = config.get_counter();
        let nthreads = config.get_nthreads();
        match *self {
            Binning::R { bin_edges } => counter.count_r(points_a, points_b, bin_edges, nthreads),
            Binning::RpPi {
                rp_bin_edges,
                pimax,
            } => counter.count_rp_pi(points_a, points_b, rp_bin_edges, pimax, nthreads),
        }
    }
}

/// Shared implementation of [`paircount_r`] and [`paircount_rp_pi`]
fn count_pairs(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    binning: Binning,
    config: &CountConfig,
    precomputed: PrecomputedCounts,
    dpi: Option<f64>,
) -> Result<PairCounts> {
    point_set_view(data, "data")?;
    point_set_view(rands, "rands")?;
    let edges = match binning {
        Binning::R { bin_edges } => bin_edges,
        Binning::RpPi { rp_bin_edges, .. } => rp_bin_edges,
    };
    validate_bin_edges(edges).map_err(|what| Error::bin_edge("distance bin edges", what))?;
    let n_counts = binning.n_counts()?;

    let (n_data, n_rand) = (data.nrows(), rands.nrows());
    let PrecomputedCounts { dd, dr, rr } = precomputed;
    let degenerate = || Some(vec![f64::NAN; n_counts]);
    let dd = if n_data < 2 { degenerate() } else { dd };
    let dr = if n_data < 2 || n_rand < 2 { degenerate() } else { dr };
    let rr = if n_rand < 2 { degenerate() } else { rr };

    let dd = match dd {
        Some(dd) => dd,
        None => binning.count(config, data, None)?,
    };
    let dr = match dr {
        Some(dr) => dr,
        None => binning.count(config, data, Some(rands))?,
    };
    let rr = match rr {
        Some(rr) => rr,
        None => binning.count(config, rands, None)?,
    };

    let pimax = match binning {
        Binning::R { .. } => None,
        Binning::RpPi { pimax, .. } => Some(pimax),
    };
    PairCounts::new(
        n_data,
        n_rand,
        dd,
        dr,
        rr,
        binning.n_rpbins(),
        pimax,
        dpi,
    )
}

/// Count pairs in 3D r bins.
///
/// DD is `NaN` when `data` holds fewer than 2 points, RR is `NaN` when
/// `rands` holds fewer than 2 points, and DR is `NaN` in either case.
/// Counts supplied through `precomputed` aren't recomputed.
pub fn paircount_r(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rbins: &[f64],
    config: &CountConfig,
    precomputed: PrecomputedCounts,
) -> Result<PairCounts> {
    count_pairs(
        data,
        rands,
        Binning::R { bin_edges: rbins },
        config,
        precomputed,
        None,
    )
}

/// Count pairs in rp and pi bins.
///
/// The line-of-sight bins have width `dpi` and extend to `pimax` (the
/// number of pi bins is `floor(pimax / dpi)`). The degeneracy rules of
/// [`paircount_r`] apply.
pub fn paircount_rp_pi(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rpbins: &[f64],
    pimax: f64,
    dpi: f64,
    config: &CountConfig,
    precomputed: PrecomputedCounts,
) -> Result<PairCounts> {
    if !(dpi.is_finite() && dpi > 0.0) {
        return Err(Error::bin_edge("dpi", format!("dpi must be positive, not {dpi}")));
    }
    let n_pibins = n_pibins((pimax / dpi).floor())?;
    paircount_unit_pi(data, rands, rpbins, n_pibins, dpi, config, precomputed)
}

/// Counts pairs in rp bins and `n_pibins` line-of-sight bins of width
/// `dpi`, starting at 0.
pub(crate) fn paircount_unit_pi(
    data: ArrayView2<f64>,
    rands: ArrayView2<f64>,
    rpbins: &[f64],
    n_pibins: usize,
    dpi: f64,
    config: &CountConfig,
    precomputed: PrecomputedCounts,
) -> Result<PairCounts> {
    let binning = Binning::RpPi {
        rp_bin_edges: rpbins,
        pimax: n_pibins as f64,
    };
    if dpi == 1.0 {
        count_pairs(data, rands, binning, config, precomputed, Some(dpi))
    } else {
        point_set_view(data, "data")?;
        point_set_view(rands, "rands")?;
        let data = rescale_line_of_sight(data, dpi);
        let rands = rescale_line_of_sight(rands, dpi);
        count_pairs(
            data.view(),
            rands.view(),
            binning,
            config,
            precomputed,
            Some(dpi),
        )
    }
}

/// Converts counts to `xi` with the Landy-Szalay estimator.
/// See [`PairCounts::to_xi`].
pub fn counts_to_xi(pc: &PairCounts) -> Result<ArrayD<f64>> {
    pc.to_xi()
}

/// Converts counts to `wp(rp)`. See [`PairCounts::to_wp`].
pub fn counts_to_wp(pc: &PairCounts) -> Result<Array1<f64>> {
    pc.to_wp()
}
