//! Miscellaneous machinery used to implement the package

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use blockcf_nostd_internal::PointSetView;

use crate::{Error, Result};

/// wraps `points` in a [`PointSetView`], reporting shape problems in terms of
/// `who`
pub(crate) fn point_set_view<'a>(
    points: ArrayView2<'a, f64>,
    who: &'static str,
) -> Result<PointSetView<'a>> {
    PointSetView::new(points).map_err(|_| Error::point_shape(who, points.shape()))
}

/// Copies the rows of `points` listed in `indices` (repeats are allowed and
/// produce repeated rows)
pub(crate) fn gather_rows(points: ArrayView2<f64>, indices: &[usize]) -> Array2<f64> {
    points.select(Axis(0), indices)
}

/// Indices of the rows whose label differs from `Some(excluded)`
pub(crate) fn complement_indices(labels: &[Option<usize>], excluded: usize) -> Vec<usize> {
    labels
        .iter()
        .enumerate()
        .filter_map(|(i, label)| (*label != Some(excluded)).then_some(i))
        .collect()
}

/// Returns a copy of `points` with the line-of-sight (z) column divided by
/// `factor`.
pub(crate) fn rescale_line_of_sight(points: ArrayView2<f64>, factor: f64) -> Array2<f64> {
    let mut out = points.to_owned();
    out.column_mut(2).mapv_inplace(|z| z / factor);
    out
}

pub(crate) fn all_nan(values: ArrayView1<f64>) -> bool {
    values.iter().all(|v| v.is_nan())
}

/// Mean, sample standard deviation (ddof = 1) and the number of non-`NaN`
/// entries of `column`, ignoring `NaN` entries.
///
/// The mean is `NaN` without any usable entries and the standard deviation
/// is `NaN` with fewer than 2.
pub(crate) fn nan_mean_std(column: ArrayView1<f64>) -> (f64, f64, usize) {
    let finite: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = finite.len();
    let mean = if n >= 1 {
        finite.iter().sum::<f64>() / n as f64
    } else {
        f64::NAN
    };
    let std = if n >= 2 {
        let sum_sq: f64 = finite.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };
    (mean, std, n)
}

pub(crate) fn nan_array(len: usize) -> Array1<f64> {
    Array1::from_elem(len, f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nan_aware_moments() {
        let (mean, std, n) = nan_mean_std(array![1.0, f64::NAN, 3.0].view());
        assert_eq!((mean, std, n), (2.0, 2.0_f64.sqrt(), 2));

        let (mean, std, n) = nan_mean_std(array![5.0, f64::NAN].view());
        assert_eq!((mean, n), (5.0, 1));
        assert!(std.is_nan());

        let (mean, std, n) = nan_mean_std(array![f64::NAN, f64::NAN].view());
        assert!(mean.is_nan() && std.is_nan());
        assert_eq!(n, 0);
    }

    #[test]
    fn row_gathering() {
        let points = array![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
        let gathered = gather_rows(points.view(), &[2, 0, 2]);
        assert_eq!(gathered, array![[2.0, 2.0, 2.0], [0.0, 0.0, 0.0], [2.0, 2.0, 2.0]]);

        let labels = [Some(0), None, Some(1), Some(0)];
        assert_eq!(complement_indices(&labels, 0), vec![1, 2]);
    }

    #[test]
    fn line_of_sight_rescaling() {
        let points = array![[1.0, 2.0, 4.0]];
        assert_eq!(
            rescale_line_of_sight(points.view(), 2.0),
            array![[1.0, 2.0, 2.0]]
        );
    }
}
