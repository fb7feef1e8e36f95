//! Galaxy bias from the projected correlation function

use blockcf_nostd_internal::validate_bin_edges;
use ndarray::Array1;

use crate::{Catalog, CountConfig, Error, Result, estimators::wp_rp};

/// Power-law fit to the dark matter wp(rp) of MDR1 at z = 1 (with
/// pimax = 50): `wp(rp) = (rp / r0)^alpha`
pub const DEFAULT_R0: f64 = 41.437187675742656;
pub const DEFAULT_ALPHA: f64 = -0.832326251664125;

/// How the rp bins are grouped
#[derive(Clone, Debug, PartialEq)]
pub enum RpBinning {
    /// A single sequence of edges. Every bin is treated as its own group, so
    /// wp is computed separately for each pair of consecutive edges.
    Edges(Vec<f64>),
    /// Groups of edges, each producing its own bias curve
    Groups(Vec<Vec<f64>>),
}

impl RpBinning {
    fn groups(&self) -> Vec<Vec<f64>> {
        match self {
            RpBinning::Edges(edges) => edges.windows(2).map(|w| w.to_vec()).collect(),
            RpBinning::Groups(groups) => groups.clone(),
        }
    }
}

/// The dark matter wp(rp) that the galaxy wp(rp) is compared against
#[derive(Clone, Debug, PartialEq)]
pub enum DarkMatterWp {
    /// `(rp / r0)^alpha`, evaluated at the geometric center of each bin
    PowerLaw { r0: f64, alpha: f64 },
    /// one vector of values per group of rp bins (one value per bin)
    Tabulated(Vec<Vec<f64>>),
}

impl Default for DarkMatterWp {
    fn default() -> Self {
        DarkMatterWp::PowerLaw {
            r0: DEFAULT_R0,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl DarkMatterWp {
    fn is_default(&self) -> bool {
        *self == DarkMatterWp::default()
    }

    fn for_group(&self, group_index: usize, rpbins: &[f64]) -> Result<Array1<f64>> {
        let n_bins = rpbins.len().saturating_sub(1);
        match self {
            DarkMatterWp::PowerLaw { r0, alpha } => Ok(rpbins
                .windows(2)
                .map(|w| ((w[0] * w[1]).sqrt() / r0).powf(*alpha))
                .collect()),
            DarkMatterWp::Tabulated(tables) => {
                let Some(table) = tables.get(group_index) else {
                    return Err(Error::mismatch(
                        "number of tabulated dark matter wp(rp)",
                        format!("at least {}", group_index + 1),
                        tables.len().to_string(),
                    ));
                };
                if table.len() != n_bins {
                    return Err(Error::mismatch(
                        "length of tabulated dark matter wp(rp)",
                        n_bins.to_string(),
                        table.len().to_string(),
                    ));
                }
                Ok(Array1::from(table.clone()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BiasCurves {
    Single(Array1<f64>),
    PerGroup(Vec<Array1<f64>>),
}

/// Computes the galaxy bias `sqrt(wp_gal / wp_dm)` in rp bins.
///
/// `wp_gal` is the Landy-Szalay wp(rp) of the catalog (unit-width pi bins
/// up to `pimax`). With [`RpBinning::Edges`] the result is a single curve
/// holding one value per bin. With [`RpBinning::Groups`] there is one curve
/// per group, unless there is only one group.
pub fn bias_rp(
    catalog: &Catalog,
    binning: &RpBinning,
    reference: &DarkMatterWp,
    pimax: f64,
    config: &CountConfig,
) -> Result<BiasCurves> {
    let groups = binning.groups();
    if groups.is_empty() {
        return Err(Error::bin_edge("rpbins", "A minimum of two bin edges are required"));
    }

    let mut curves = Vec::with_capacity(groups.len());
    for (i, rpbins) in groups.iter().enumerate() {
        validate_bin_edges(rpbins).map_err(|what| Error::bin_edge("rpbins", what))?;
        let wp_dm = reference.for_group(i, rpbins)?;
        if reference.is_default() {
            tracing::warn!(
                rp_mid = 0.5 * (rpbins[0] + rpbins[rpbins.len() - 1]),
                wp_dm = ?wp_dm.as_slice(),
                "using the default dark matter wp(rp)"
            );
        }
        let wp_gal = wp_rp(catalog.data(), catalog.rands(), rpbins, pimax, 1.0, config)?;
        curves.push((wp_gal / wp_dm).mapv(f64::sqrt));
    }

    match binning {
        RpBinning::Edges(_) => Ok(BiasCurves::Single(
            curves.iter().flat_map(|c| c.iter().copied()).collect(),
        )),
        RpBinning::Groups(_) if curves.len() == 1 => {
            Ok(BiasCurves::Single(curves.swap_remove(0)))
        }
        RpBinning::Groups(_) => Ok(BiasCurves::PerGroup(curves)),
    }
}
