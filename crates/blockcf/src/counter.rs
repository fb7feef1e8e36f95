//! The pair-counting collaborator.
//!
//! Everything in this crate that needs raw pair counts goes through the
//! [`PairCounter`] trait. The crate ships [`BruteForceCounter`], a serial
//! O(N^2) backend built on the loops in [`blockcf_nostd_internal`]. A faster
//! backend (e.g. a tree code or a binding to an external library) only needs
//! to implement the trait.
//!
//! Every implementation must follow the same conventions:
//! - for auto-counts each unique pair of distinct points is reported twice
//!   (once per ordering); for cross-counts each pair is reported once
//! - distance bins are half-open, `[lo, hi)`
//! - (rp, pi) counts treat the z axis as the line of sight, use unit-width
//!   pi bins starting at 0, and are laid out rp-major

use std::f64::consts::PI;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;

use blockcf_nostd_internal::{
    IrregularBinEdges, Separation, count_pairs_r, count_pairs_rp_pi, validate_bin_edges,
};
use ndarray::ArrayView2;

use crate::{Error, Result, misc::point_set_view, misc::rescale_line_of_sight};

/// Computes raw pair counts.
///
/// `nthreads` is a hint. Backends without any parallelism may ignore it.
pub trait PairCounter: Send + Sync {
    /// Counts pairs binned by 3D separation. When `points_b` is `None`,
    /// this computes auto-counts of `points_a`.
    fn count_r(
        &self,
        points_a: ArrayView2<f64>,
        points_b: Option<ArrayView2<f64>>,
        bin_edges: &[f64],
        nthreads: NonZeroU32,
    ) -> Result<Vec<f64>>;

    /// Counts pairs binned by perpendicular separation (`rp_bin_edges`) and
    /// by line-of-sight separation, using `floor(pimax)` unit-width pi bins.
    fn count_rp_pi(
        &self,
        points_a: ArrayView2<f64>,
        points_b: Option<ArrayView2<f64>>,
        rp_bin_edges: &[f64],
        pimax: f64,
        nthreads: NonZeroU32,
    ) -> Result<Vec<f64>>;

    /// Computes wp(rp) for the points in a periodic cube of side `boxsize`
    /// (coordinates are expected in `[0, boxsize)`), integrating over
    /// `|pi| < pimax` against the analytic random-pair expectation.
    fn wp_box(
        &self,
        points: ArrayView2<f64>,
        rp_bin_edges: &[f64],
        pimax: f64,
        boxsize: f64,
        nthreads: NonZeroU32,
    ) -> Result<Vec<f64>>;
}

/// The serial pair-counting backend.
///
/// This directly loops over every pair of points. It is exact, but it scales
/// quadratically with the number of points.
#[derive(Clone, Copy, Debug, Default)]
pub struct BruteForceCounter;

/// validates distance bin edges and returns the squared edges
fn squared_edges(bin_edges: &[f64], who: &'static str) -> Result<Vec<f64>> {
    validate_bin_edges(bin_edges).map_err(|what| Error::bin_edge(who, what))?;
    if bin_edges[0] < 0.0 {
        return Err(Error::bin_edge(who, "distance bin edges can't be negative"));
    }
    Ok(bin_edges.iter().map(|x| x * x).collect())
}

/// number of unit-width line-of-sight bins implied by `pimax`
pub(crate) fn n_pibins(pimax: f64) -> Result<usize> {
    if pimax.is_finite() && pimax >= 1.0 {
        // this cast handles the truncation
        Ok(pimax as usize)
    } else {
        Err(Error::bin_edge(
            "pimax",
            format!("pimax must be finite and at least 1, not {pimax}"),
        ))
    }
}

impl PairCounter for BruteForceCounter {
    fn count_r(
        &self,
        points_a: ArrayView2<f64>,
        points_b: Option<ArrayView2<f64>>,
        bin_edges: &[f64],
        _nthreads: NonZeroU32,
    ) -> Result<Vec<f64>> {
        let squared = squared_edges(bin_edges, "distance bin edges")?;
        let bins = IrregularBinEdges::new(&squared).map_err(Error::internal)?;
        let points_a = point_set_view(points_a, "points_a")?;
        let points_b = points_b.map(|p| point_set_view(p, "points_b")).transpose()?;

        let mut counts = vec![0.0; bin_edges.len() - 1];
        count_pairs_r(
            &mut counts,
            &points_a,
            points_b.as_ref(),
            &bins,
            Separation::Open,
        )
        .map_err(Error::internal)?;
        Ok(counts)
    }

    fn count_rp_pi(
        &self,
        points_a: ArrayView2<f64>,
        points_b: Option<ArrayView2<f64>>,
        rp_bin_edges: &[f64],
        pimax: f64,
        _nthreads: NonZeroU32,
    ) -> Result<Vec<f64>> {
        let squared = squared_edges(rp_bin_edges, "rp bin edges")?;
        let bins = IrregularBinEdges::new(&squared).map_err(Error::internal)?;
        let n_pibins = n_pibins(pimax)?;
        let points_a = point_set_view(points_a, "points_a")?;
        let points_b = points_b.map(|p| point_set_view(p, "points_b")).transpose()?;

        let mut counts = vec![0.0; (rp_bin_edges.len() - 1) * n_pibins];
        count_pairs_rp_pi(
            &mut counts,
            &points_a,
            points_b.as_ref(),
            &bins,
            n_pibins,
            Separation::Open,
        )
        .map_err(Error::internal)?;
        Ok(counts)
    }

    fn wp_box(
        &self,
        points: ArrayView2<f64>,
        rp_bin_edges: &[f64],
        pimax: f64,
        boxsize: f64,
        _nthreads: NonZeroU32,
    ) -> Result<Vec<f64>> {
        let squared = squared_edges(rp_bin_edges, "rp bin edges")?;
        let bins = IrregularBinEdges::new(&squared).map_err(Error::internal)?;
        if !(boxsize.is_finite() && boxsize > 0.0) {
            return Err(Error::bin_edge("boxsize", "boxsize must be positive"));
        } else if !(pimax.is_finite() && pimax > 0.0 && 2.0 * pimax <= boxsize) {
            return Err(Error::bin_edge(
                "pimax",
                "pimax must be positive and no more than half of boxsize",
            ));
        }

        // rescale the line of sight so that a single unit-width pi bin
        // spans |pi| < pimax
        let scaled = rescale_line_of_sight(points, pimax);
        let points = point_set_view(scaled.view(), "points")?;
        let separation = Separation::Periodic {
            boxsize: [boxsize, boxsize, boxsize / pimax],
        };

        let n_rpbins = rp_bin_edges.len() - 1;
        let mut npairs = vec![0.0; n_rpbins];
        count_pairs_rp_pi(&mut npairs, &points, None, &bins, 1, separation)
            .map_err(Error::internal)?;

        let n = points.n_points() as f64;
        let volume = boxsize.powi(3);
        let wp = rp_bin_edges
            .windows(2)
            .zip(npairs)
            .map(|(edges, npairs)| {
                let shell_volume = PI * (edges[1].powi(2) - edges[0].powi(2)) * 2.0 * pimax;
                let expected = n * (n - 1.0) * shell_volume / volume;
                2.0 * pimax * (npairs / expected - 1.0)
            })
            .collect();
        Ok(wp)
    }
}

/// Converts raw pair counts to a correlation function with the Landy-Szalay
/// estimator:
/// `(fN1 fN2 D1D2 - fN1 D1R2 - fN2 D2R1 + R1R2) / R1R2`, where
/// `fN1 = NR1 / ND1` and `fN2 = NR2 / ND2`.
///
/// Bins without any random-random pairs produce `NaN`.
#[allow(clippy::too_many_arguments)]
pub fn convert_3d_counts_to_cf(
    nd1: usize,
    nd2: usize,
    nr1: usize,
    nr2: usize,
    d1d2: &[f64],
    d1r2: &[f64],
    d2r1: &[f64],
    r1r2: &[f64],
) -> Result<Vec<f64>> {
    let n = r1r2.len();
    for (name, counts) in [("D1D2", d1d2), ("D1R2", d1r2), ("D2R1", d2r1)] {
        if counts.len() != n {
            return Err(Error::mismatch(
                format!("length of {name}"),
                n.to_string(),
                counts.len().to_string(),
            ));
        }
    }

    let fn1 = nr1 as f64 / nd1 as f64;
    let fn2 = nr2 as f64 / nd2 as f64;
    let cf = (0..n)
        .map(|i| {
            if r1r2[i] > 0.0 {
                (fn1 * fn2 * d1d2[i] - fn1 * d1r2[i] - fn2 * d2r1[i] + r1r2[i]) / r1r2[i]
            } else {
                f64::NAN
            }
        })
        .collect();
    Ok(cf)
}

/// Converts raw (rp, pi) pair counts into the projected correlation function
/// with the Landy-Szalay estimator.
///
/// The counts are laid out rp-major. With `n_pibins = len / n_rpbins` line of
/// sight bins of width `dpi = pimax / n_pibins`,
/// `wp[i] = 2 dpi sum_k xi(rp_i, pi_k)`.
#[allow(clippy::too_many_arguments)]
pub fn convert_rp_pi_counts_to_wp(
    nd1: usize,
    nd2: usize,
    nr1: usize,
    nr2: usize,
    d1d2: &[f64],
    d1r2: &[f64],
    d2r1: &[f64],
    r1r2: &[f64],
    n_rpbins: usize,
    pimax: f64,
) -> Result<Vec<f64>> {
    let xirppi = convert_3d_counts_to_cf(nd1, nd2, nr1, nr2, d1d2, d1r2, d2r1, r1r2)?;
    if n_rpbins == 0 || xirppi.len() % n_rpbins != 0 || xirppi.len() < n_rpbins {
        return Err(Error::mismatch(
            "number of (rp, pi) counts",
            format!("a nonzero multiple of {n_rpbins}"),
            xirppi.len().to_string(),
        ));
    }
    let n_pibins = xirppi.len() / n_rpbins;
    let dpi = pimax / n_pibins as f64;
    Ok(xirppi
        .chunks_exact(n_pibins)
        .map(|row| 2.0 * dpi * row.iter().sum::<f64>())
        .collect())
}

/// Settings shared by every routine that needs pair counts.
///
/// A fresh instance is cheap to make (the counter is reference counted).
#[derive(Clone)]
pub struct CountConfig {
    nthreads: NonZeroU32,
    counter: Arc<dyn PairCounter>,
}

impl CountConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of threads handed to the pair counter
    pub fn nthreads(mut self, nthreads: NonZeroU32) -> Self {
        self.nthreads = nthreads;
        self
    }

    /// replace the pair-counting backend
    pub fn counter(mut self, counter: Arc<dyn PairCounter>) -> Self {
        self.counter = counter;
        self
    }

    pub fn get_nthreads(&self) -> NonZeroU32 {
        self.nthreads
    }

    pub fn get_counter(&self) -> &dyn PairCounter {
        self.counter.as_ref()
    }
}

const DEFAULT_NTHREADS: NonZeroU32 = NonZeroU32::new(2).unwrap();

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            nthreads: DEFAULT_NTHREADS,
            counter: Arc::new(BruteForceCounter),
        }
    }
}

impl fmt::Debug for CountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountConfig")
            .field("nthreads", &self.nthreads)
            .finish_non_exhaustive()
    }
}
