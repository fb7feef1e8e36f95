//! The statistics evaluated on every resample.
//!
//! The resampling routines accept anything implementing [`Statistic`]:
//! closures with the signature
//! `Fn(ArrayView2<f64>, ArrayView2<f64>) -> Result<Array1<f64>>` work out of
//! the box. The built-in correlation functions are looked up by name through
//! [`StatisticBuilder`].

use std::{collections::HashMap, sync::LazyLock};

use ndarray::{Array1, ArrayView2};

use crate::{
    CountConfig, Error, Estimator, Result,
    estimators::{wp_rp, xi_r, xi_rp_pi},
};

/// A statistic of a data catalog and its random catalog, flattened to 1D.
pub trait Statistic {
    fn compute(&self, data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<Array1<f64>>;
}

impl<F> Statistic for F
where
    F: Fn(ArrayView2<f64>, ArrayView2<f64>) -> Result<Array1<f64>>,
{
    fn compute(&self, data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<Array1<f64>> {
        self(data, rands)
    }
}

struct XiR {
    rbins: Vec<f64>,
    estimator: Estimator,
    count_config: CountConfig,
}

impl Statistic for XiR {
    fn compute(&self, data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<Array1<f64>> {
        xi_r(data, rands, &self.rbins, self.estimator, &self.count_config)
    }
}

/// xi(rp, pi), flattened rp-major
struct XiRpPi {
    rpbins: Vec<f64>,
    pibins: Vec<f64>,
    estimator: Estimator,
    count_config: CountConfig,
}

impl Statistic for XiRpPi {
    fn compute(&self, data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<Array1<f64>> {
        let xi = xi_rp_pi(
            data,
            rands,
            &self.rpbins,
            &self.pibins,
            self.estimator,
            &self.count_config,
        )?;
        Ok(Array1::from_iter(xi))
    }
}

struct WpRp {
    rpbins: Vec<f64>,
    pimax: f64,
    dpi: f64,
    count_config: CountConfig,
}

impl Statistic for WpRp {
    fn compute(&self, data: ArrayView2<f64>, rands: ArrayView2<f64>) -> Result<Array1<f64>> {
        wp_rp(
            data,
            rands,
            &self.rpbins,
            self.pimax,
            self.dpi,
            &self.count_config,
        )
    }
}

/// The settings accumulated by a [`StatisticBuilder`]
#[derive(Clone, Debug)]
struct Config {
    name: String,
    bin_edges: Option<Vec<f64>>,
    pi_bin_edges: Option<Vec<f64>>,
    pimax: Option<f64>,
    dpi: f64,
    estimator: Option<String>,
    count_config: CountConfig,
}

impl Config {
    fn require_bin_edges(&self) -> Result<Vec<f64>> {
        self.bin_edges.clone().ok_or_else(|| {
            Error::bin_edge(self.name.clone(), "the statistic requires bin_edges")
        })
    }

    fn estimator(&self) -> Result<Estimator> {
        match &self.estimator {
            Some(name) => name.parse(),
            None => Ok(Estimator::default()),
        }
    }

    fn reject_estimator(&self) -> Result<()> {
        match self.estimator.as_deref().map(str::parse::<Estimator>) {
            None | Some(Ok(Estimator::LandySzalay)) => Ok(()),
            Some(Err(err)) => Err(err),
            Some(Ok(other)) => Err(Error::estimator_name(
                other.name().to_owned(),
                vec![Estimator::LandySzalay.name().to_owned()],
            )),
        }
    }
}

/// an entry of the registry
struct MkStatisticFn(fn(&Config) -> Result<Box<dyn Statistic>>);

fn build_registry() -> HashMap<String, MkStatisticFn> {
    HashMap::from([
        (
            "xi_r".to_owned(),
            MkStatisticFn(|c: &Config| -> Result<Box<dyn Statistic>> {
                Ok(Box::new(XiR {
                    rbins: c.require_bin_edges()?,
                    estimator: c.estimator()?,
                    count_config: c.count_config.clone(),
                }))
            }),
        ),
        (
            "xi_rp_pi".to_owned(),
            MkStatisticFn(|c: &Config| -> Result<Box<dyn Statistic>> {
                let Some(pibins) = c.pi_bin_edges.clone() else {
                    return Err(Error::bin_edge(
                        c.name.clone(),
                        "the statistic requires pi_bin_edges",
                    ));
                };
                Ok(Box::new(XiRpPi {
                    rpbins: c.require_bin_edges()?,
                    pibins,
                    estimator: c.estimator()?,
                    count_config: c.count_config.clone(),
                }))
            }),
        ),
        (
            "wp_rp".to_owned(),
            MkStatisticFn(|c: &Config| -> Result<Box<dyn Statistic>> {
                // wp is only defined for the Landy-Szalay estimator
                c.reject_estimator()?;
                let Some(pimax) = c.pimax else {
                    return Err(Error::bin_edge(c.name.clone(), "the statistic requires pimax"));
                };
                Ok(Box::new(WpRp {
                    rpbins: c.require_bin_edges()?,
                    pimax,
                    dpi: c.dpi,
                    count_config: c.count_config.clone(),
                }))
            }),
        ),
    ])
}

/// Maps the names of the built-in statistics to functions that construct
/// them. Lazily initialized on first use.
static STATISTIC_MAKER_REGISTRY: LazyLock<HashMap<String, MkStatisticFn>> =
    LazyLock::new(build_registry);

/// The names of the built-in statistics (sorted)
pub fn statistic_names() -> Vec<String> {
    let mut names: Vec<String> = STATISTIC_MAKER_REGISTRY.keys().cloned().collect();
    names.sort();
    names
}

/// Constructs one of the built-in statistics.
///
/// ```
/// use blockcf::StatisticBuilder;
/// let statistic = StatisticBuilder::new()
///     .name("xi_r")
///     .bin_edges(&[1.0, 2.0, 4.0, 8.0])
///     .estimator("natural")
///     .build()
///     .unwrap();
/// ```
///
/// Names are matched case-insensitively:
/// - `"xi_r"` needs `bin_edges`
/// - `"xi_rp_pi"` needs `bin_edges` (rp) and `pi_bin_edges` (evenly spaced,
///   starting at 0). The result is flattened rp-major.
/// - `"wp_rp"` needs `bin_edges` (rp) and `pimax`; `dpi` defaults to 1.
///
/// The estimator defaults to Landy-Szalay.
#[derive(Clone, Debug)]
pub struct StatisticBuilder {
    config: Config,
}

impl Default for StatisticBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                name: String::new(),
                bin_edges: None,
                pi_bin_edges: None,
                pimax: None,
                dpi: 1.0,
                estimator: None,
                count_config: CountConfig::default(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.config.name = name.to_owned();
        self
    }

    /// distance (or rp) bin edges
    pub fn bin_edges(mut self, edges: &[f64]) -> Self {
        self.config.bin_edges = Some(edges.to_vec());
        self
    }

    pub fn pi_bin_edges(mut self, edges: &[f64]) -> Self {
        self.config.pi_bin_edges = Some(edges.to_vec());
        self
    }

    pub fn pimax(mut self, pimax: f64) -> Self {
        self.config.pimax = Some(pimax);
        self
    }

    pub fn dpi(mut self, dpi: f64) -> Self {
        self.config.dpi = dpi;
        self
    }

    /// estimator name (parsed when [`StatisticBuilder::build`] is called)
    pub fn estimator(mut self, name: &str) -> Self {
        self.config.estimator = Some(name.to_owned());
        self
    }

    pub fn count_config(mut self, count_config: CountConfig) -> Self {
        self.config.count_config = count_config;
        self
    }

    pub fn build(&self) -> Result<Box<dyn Statistic>> {
        let key = self.config.name.to_lowercase();
        if let Some(func) = STATISTIC_MAKER_REGISTRY.get(&key) {
            func.0(&self.config)
        } else {
            Err(Error::statistic_name(
                self.config.name.clone(),
                statistic_names(),
            ))
        }
    }
}
