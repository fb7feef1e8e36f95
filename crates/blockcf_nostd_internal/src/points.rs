use ndarray::ArrayView2;

/// A read-only view of a catalog of 3D points.
///
/// We place the following constraints on the wrapped array:
/// - axis 0 is the slow axis and the length along it is the number of points
///   (one row per object)
/// - axis 1 is the fast axis and it holds the `(x, y, z)` components. We
///   require exactly 3 components.
/// - In other words the shape of the array is `(n_points, 3)`.
///
/// Empty catalogs are allowed. Whether an empty catalog is meaningful is
/// decided by the caller.
#[derive(Clone, Debug)]
pub struct PointSetView<'a> {
    positions: ArrayView2<'a, f64>,
}

impl<'a> PointSetView<'a> {
    /// create a new instance
    pub fn new(positions: ArrayView2<'a, f64>) -> Result<PointSetView<'a>, &'static str> {
        if positions.shape()[1] != 3 {
            Err("positions must have exactly 3 columns (x, y, z)")
        } else {
            Ok(Self { positions })
        }
    }

    pub fn n_points(&self) -> usize {
        self.positions.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.n_points() == 0
    }

    /// returns the `(x, y, z)` coordinates of the `i`th point
    #[inline(always)]
    pub fn point(&self, i: usize) -> [f64; 3] {
        [
            self.positions[[i, 0]],
            self.positions[[i, 1]],
            self.positions[[i, 2]],
        ]
    }

    pub fn as_array_view(&self) -> ArrayView2<'a, f64> {
        self.positions
    }
}
