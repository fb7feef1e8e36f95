use ndarray::ArrayView2;

use crate::{Error, Result, misc::point_set_view};

/// A galaxy catalog paired with its random catalog.
///
/// Both arrays have shape `(n_points, 3)`. The two catalogs are independent
/// and generally differ in size.
///
/// Resampling routines assign spatial blocks using the "binning
/// coordinates". By default these are the positions themselves, but a
/// separate pair of arrays (with matching row counts) can be attached with
/// [`Catalog::with_binning_coords`]. This is useful when the statistic is
/// measured in comoving coordinates but the survey footprint is naturally
/// carved up in `(ra, dec, redshift)`.
#[derive(Clone, Debug)]
pub struct Catalog<'a> {
    data: ArrayView2<'a, f64>,
    rands: ArrayView2<'a, f64>,
    binning: Option<(ArrayView2<'a, f64>, ArrayView2<'a, f64>)>,
}

impl<'a> Catalog<'a> {
    /// create a new instance
    pub fn new(data: ArrayView2<'a, f64>, rands: ArrayView2<'a, f64>) -> Result<Self> {
        point_set_view(data, "data")?;
        point_set_view(rands, "rands")?;
        Ok(Self {
            data,
            rands,
            binning: None,
        })
    }

    /// attach separate coordinates that are only used for block assignment
    pub fn with_binning_coords(
        self,
        data_to_bin: ArrayView2<'a, f64>,
        rands_to_bin: ArrayView2<'a, f64>,
    ) -> Result<Self> {
        point_set_view(data_to_bin, "data_to_bin")?;
        point_set_view(rands_to_bin, "rands_to_bin")?;
        for (who, actual, expected) in [
            ("data_to_bin", data_to_bin.nrows(), self.data.nrows()),
            ("rands_to_bin", rands_to_bin.nrows(), self.rands.nrows()),
        ] {
            if actual != expected {
                return Err(Error::mismatch(
                    format!("number of rows in {who}"),
                    expected.to_string(),
                    actual.to_string(),
                ));
            }
        }
        Ok(Self {
            binning: Some((data_to_bin, rands_to_bin)),
            ..self
        })
    }

    pub fn data(&self) -> ArrayView2<'a, f64> {
        self.data
    }

    pub fn rands(&self) -> ArrayView2<'a, f64> {
        self.rands
    }

    /// the coordinates used to assign data points to blocks
    pub fn data_to_bin(&self) -> ArrayView2<'a, f64> {
        self.binning.map_or(self.data, |(data_to_bin, _)| data_to_bin)
    }

    /// the coordinates used to assign random points to blocks
    pub fn rands_to_bin(&self) -> ArrayView2<'a, f64> {
        self.binning.map_or(self.rands, |(_, rands_to_bin)| rands_to_bin)
    }

    /// Returns an error if either catalog is empty. Block resampling isn't
    /// defined without any points.
    pub(crate) fn require_nonempty(&self) -> Result<()> {
        if self.data.nrows() == 0 {
            Err(Error::empty_input("data"))
        } else if self.rands.nrows() == 0 {
            Err(Error::empty_input("rands"))
        } else {
            Ok(())
        }
    }
}
