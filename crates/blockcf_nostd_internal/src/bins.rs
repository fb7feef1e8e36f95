//! Implements types to represent "bin edges", used for distance binning of
//! pair counts and for carving catalogs into spatial blocks. The [`BinEdges`]
//! trait provides a common interface that is implemented by
//! [`RegularBinEdges`] and [`IrregularBinEdges`]

/// Super simple. This can be expanded as needed.
pub trait BinEdges {
    /// Calculate the bin index for a given value. Values which are equal to
    /// boundary values are considered part of the higher bin, i.e. intervals
    /// do not include the right edge.
    fn bin_index(&self, value: f64) -> Option<usize>;

    fn n_bins(&self) -> usize;

    /// Like [`BinEdges::bin_index`], but the outermost edges are treated as
    /// `-inf` and `+inf`. Only `NaN` lands outside of every bin.
    fn open_bin_index(&self, value: f64) -> Option<usize>;
}

/// Check that `bin_edges` holds at least 2 finite, strictly increasing values
pub fn validate_bin_edges(bin_edges: &[f64]) -> Result<(), &'static str> {
    if bin_edges.len() < 2 {
        return Err("A minimum of two bin edges are required");
    }

    if bin_edges.iter().any(|&x| !x.is_finite()) {
        return Err("Bin edges must be finite");
    }

    if bin_edges.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err("Bin edges must be in strictly increasing order");
    }
    Ok(())
}

/// Regular bins with uniform spacing
#[derive(Clone, Debug, PartialEq)]
pub struct RegularBinEdges {
    min: f64,
    max: f64,
    bin_size: f64,
    n_bins: usize,
}

impl RegularBinEdges {
    /// Note that we initialize with num_bins rather than bin_size
    pub fn new(min: f64, max: f64, n_bins: usize) -> Result<Self, &'static str> {
        if n_bins == 0 {
            Err("Number of bins must be greater than zero")
        } else if !min.is_finite() || !max.is_finite() {
            Err("Min and max values must be finite")
        } else if max <= min {
            Err("Maximum value must be greater than minimum value")
        } else {
            Ok(Self {
                min,
                max,
                bin_size: (max - min) / n_bins as f64,
                n_bins,
            })
        }
    }

    pub fn leftmost_edge(&self) -> f64 {
        self.min
    }

    pub fn rightmost_edge(&self) -> f64 {
        self.max
    }

    /// the value of the `i`th edge (`i` may equal `n_bins`)
    pub fn edge(&self, i: usize) -> f64 {
        if i == self.n_bins {
            // avoid accumulating roundoff at the right edge
            self.max
        } else {
            self.min + (i as f64) * self.bin_size
        }
    }
}

impl BinEdges for RegularBinEdges {
    fn bin_index(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }

        // this cast handles the truncation. The min guards against roundoff
        // pushing values just below max into a nonexistent bin
        let index = ((value - self.min) / self.bin_size) as usize;
        Some(index.min(self.n_bins - 1))
    }

    fn n_bins(&self) -> usize {
        self.n_bins
    }

    fn open_bin_index(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            None
        } else if value < self.min {
            Some(0)
        } else if value >= self.max {
            Some(self.n_bins - 1)
        } else {
            self.bin_index(value)
        }
    }
}

#[derive(Clone, Debug)]
pub struct IrregularBinEdges<'a> {
    bin_edges: &'a [f64],
}

impl<'a> IrregularBinEdges<'a> {
    pub fn new(bin_edges: &'a [f64]) -> Result<IrregularBinEdges<'a>, &'static str> {
        validate_bin_edges(bin_edges)?;
        Ok(IrregularBinEdges { bin_edges })
    }

    pub fn as_slice(&self) -> &'a [f64] {
        self.bin_edges
    }
}

impl BinEdges for IrregularBinEdges<'_> {
    fn bin_index(&self, value: f64) -> Option<usize> {
        // the negated comparison also rejects NaN
        if !(value >= self.bin_edges[0] && value < self.bin_edges[self.bin_edges.len() - 1]) {
            return None;
        }

        // IEEE comparisons (rather than total_cmp) keep -0.0 and 0.0 equal,
        // consistent with the range check above. That check also guarantees
        // at least one edge is <= value
        let n_le = self.bin_edges.partition_point(|edge| *edge <= value);
        Some(n_le - 1)
    }

    fn n_bins(&self) -> usize {
        self.bin_edges.len() - 1
    }

    fn open_bin_index(&self, value: f64) -> Option<usize> {
        if value.is_nan() {
            None
        } else if value < self.bin_edges[0] {
            Some(0)
        } else if value >= self.bin_edges[self.bin_edges.len() - 1] {
            Some(self.n_bins() - 1)
        } else {
            self.bin_index(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_bins_invalid_creation() {
        // Zero bins
        assert!(RegularBinEdges::new(0.0, 10.0, 0).is_err());

        // Max <= min
        assert!(RegularBinEdges::new(10.0, 10.0, 5).is_err());
        assert!(RegularBinEdges::new(10.0, 5.0, 5).is_err());

        // Non-finite values
        assert!(RegularBinEdges::new(f64::NAN, 10.0, 5).is_err());
        assert!(RegularBinEdges::new(0.0, f64::INFINITY, 5).is_err());
    }

    #[test]
    fn irregular_bins_invalid_creation() {
        // not enough edges
        assert!(IrregularBinEdges::new(&[0.0]).is_err());

        // unsorted or repeated bin edges
        assert!(IrregularBinEdges::new(&[2.0, 1.0]).is_err());
        assert!(IrregularBinEdges::new(&[0.0, 3.0, 2.0]).is_err());
        assert!(IrregularBinEdges::new(&[0.0, 3.0, 3.0]).is_err());

        // Non-finite values
        assert!(IrregularBinEdges::new(&[f64::NAN, 10.0]).is_err());
        assert!(IrregularBinEdges::new(&[0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn half_open_lookup() {
        let rbins = RegularBinEdges::new(0.0, 10.0, 5).unwrap();
        let ibins = IrregularBinEdges::new(&[0.0, 2.0, 4.0, 6.0, 8.0, 10.0]).unwrap();

        let bins_list: [&dyn BinEdges; 2] = [&rbins, &ibins];

        for bins in &bins_list {
            assert_eq!(bins.n_bins(), 5);

            // an internal edge belongs to the bin on its right
            assert_eq!(bins.bin_index(0.0), Some(0));
            assert_eq!(bins.bin_index(1.9), Some(0));
            assert_eq!(bins.bin_index(2.0), Some(1));
            assert_eq!(bins.bin_index(8.0), Some(4));
            assert_eq!(bins.bin_index(9.9), Some(4));

            // max is exclusive
            assert_eq!(bins.bin_index(10.0), None);
            assert_eq!(bins.bin_index(-0.1), None);
            assert_eq!(bins.bin_index(f64::NAN), None);
        }
    }

    #[test]
    fn open_lookup_never_drops_finite_values() {
        let rbins = RegularBinEdges::new(-1.0, 1.0, 4).unwrap();
        let ibins = IrregularBinEdges::new(&[-1.0, -0.5, 0.0, 0.5, 1.0]).unwrap();

        let bins_list: [&dyn BinEdges; 2] = [&rbins, &ibins];
        for bins in &bins_list {
            assert_eq!(bins.open_bin_index(-1e300), Some(0));
            assert_eq!(bins.open_bin_index(-0.75), Some(0));
            assert_eq!(bins.open_bin_index(0.0), Some(2));
            assert_eq!(bins.open_bin_index(1.0), Some(3));
            assert_eq!(bins.open_bin_index(f64::INFINITY), Some(3));
            assert_eq!(bins.open_bin_index(f64::NAN), None);
        }
    }

    #[test]
    fn regular_edges() {
        let bins = RegularBinEdges::new(2.0, 3.0, 4).unwrap();
        assert_eq!(bins.edge(0), 2.0);
        assert_eq!(bins.edge(2), 2.5);
        assert_eq!(bins.edge(4), 3.0);
        assert_eq!(bins.leftmost_edge(), 2.0);
        assert_eq!(bins.rightmost_edge(), 3.0);
    }

    #[test]
    fn negative_zero_matches_a_zero_edge() {
        let rbins = RegularBinEdges::new(0.0, 10.0, 5).unwrap();
        let ibins = IrregularBinEdges::new(&[0.0, 2.0, 4.0]).unwrap();
        let shifted = IrregularBinEdges::new(&[-0.0, 1.0]).unwrap();

        let bins_list: [&dyn BinEdges; 2] = [&rbins, &ibins];
        for bins in &bins_list {
            assert_eq!(bins.bin_index(-0.0), Some(0));
            assert_eq!(bins.open_bin_index(-0.0), Some(0));
        }
        assert_eq!(shifted.bin_index(0.0), Some(0));
        assert_eq!(shifted.bin_index(-0.0), Some(0));
    }
}
