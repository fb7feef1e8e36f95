//! Spatial block partitioning.
//!
//! Both resampling schemes carve the survey volume into blocks and label
//! every data and random point with the block it falls in. There are two
//! ways of doing that:
//! - [`BlockGrid`]: one axis-aligned grid covering the extent of the random
//!   catalog (used by the bootstrap)
//! - [`FieldLayout`]: each point is attached to its nearest field center,
//!   and the volume around every center is subdivided into a local grid
//!   (used by the jackknife)
//!
//! A point that doesn't land in any block carries the label `None`. Such a
//! point is excluded from every resample.

use std::f64::consts::PI;

use blockcf_nostd_internal::{BinEdges, IrregularBinEdges, RegularBinEdges, validate_bin_edges};
use ndarray::ArrayView2;

use crate::{Error, Result, misc::point_set_view};

/// The block label of every data point and every random point.
///
/// Labels are computed once per resampling call and never change
/// afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockAssignment {
    data: Vec<Option<usize>>,
    rands: Vec<Option<usize>>,
    n_blocks: usize,
}

impl BlockAssignment {
    pub fn n_blocks(&self) -> usize {
        self.n_blocks
    }

    pub fn data_labels(&self) -> &[Option<usize>] {
        &self.data
    }

    pub fn rand_labels(&self) -> &[Option<usize>] {
        &self.rands
    }

    /// indices of the data points and of the random points in `block`
    pub fn members(&self, block: usize) -> (Vec<usize>, Vec<usize>) {
        let select = |labels: &[Option<usize>]| {
            labels
                .iter()
                .enumerate()
                .filter_map(|(i, label)| (*label == Some(block)).then_some(i))
                .collect()
        };
        (select(&self.data), select(&self.rands))
    }

    /// number of data points and of random points outside of every block
    pub fn n_unassigned(&self) -> (usize, usize) {
        let count = |labels: &[Option<usize>]| labels.iter().filter(|l| l.is_none()).count();
        (count(&self.data), count(&self.rands))
    }

    /// The labels as signed integers, with `-1` marking points outside of
    /// every block.
    pub fn as_signed_labels(&self) -> (Vec<i64>, Vec<i64>) {
        let convert = |labels: &[Option<usize>]| {
            labels
                .iter()
                .map(|l| l.map_or(-1, |block| block as i64))
                .collect()
        };
        (convert(&self.data), convert(&self.rands))
    }
}

fn require_nonempty(
    data_to_bin: ArrayView2<f64>,
    rands_to_bin: ArrayView2<f64>,
) -> Result<()> {
    point_set_view(data_to_bin, "data_to_bin")?;
    point_set_view(rands_to_bin, "rands_to_bin")?;
    if data_to_bin.nrows() == 0 {
        Err(Error::empty_input("data_to_bin"))
    } else if rands_to_bin.nrows() == 0 {
        Err(Error::empty_input("rands_to_bin"))
    } else {
        Ok(())
    }
}

fn point(points: &ArrayView2<f64>, i: usize) -> [f64; 3] {
    [points[[i, 0]], points[[i, 1]], points[[i, 2]]]
}

/// Describes how the uniform block grid is laid out.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockSize {
    /// A target block length shared by all axes. Each axis of the random
    /// catalog's bounding box is split into `ceil(extent / length)` equal
    /// bins (so blocks are no longer than `length`), and the outermost
    /// edges are pushed outwards by 1.0 so that no random point is lost.
    Length(f64),
    /// Exact per-axis block lengths. Each axis holds as many whole blocks
    /// as fit in the extent; the grid is centered in the extent and the
    /// leftover slabs at both ends are excluded.
    AxisLengths([f64; 3]),
    /// Explicit per-axis bin edges
    Edges([Vec<f64>; 3]),
}

/// An axis-aligned grid of blocks
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGrid {
    edges: [Vec<f64>; 3],
}

const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];

/// The extent `(min, max)` of the `axis`th coordinate of `points`
fn axis_extent(points: &ArrayView2<f64>, axis: usize) -> (f64, f64) {
    points
        .column(axis)
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// upper limit on the number of blocks along a single axis of a grid
pub const MAX_BLOCKS_PER_AXIS: usize = 100_000;

/// `ceil(extent / length)`, rejecting counts above [`MAX_BLOCKS_PER_AXIS`]
fn blocks_along_axis(extent: f64, length: f64) -> Result<usize> {
    let n = (extent / length).ceil();
    if n > MAX_BLOCKS_PER_AXIS as f64 {
        return Err(Error::integer_range(
            "number of blocks along an axis",
            n.min(i64::MAX as f64) as i64,
            1,
            MAX_BLOCKS_PER_AXIS as i64,
        ));
    }
    Ok(n as usize)
}

fn check_length(length: f64) -> Result<()> {
    if length.is_finite() && length > 0.0 {
        Ok(())
    } else {
        Err(Error::bin_edge(
            "block length",
            format!("must be positive and finite, not {length}"),
        ))
    }
}

impl BlockGrid {
    /// Builds the grid from the extent of `rands_to_bin`
    pub fn from_spec(rands_to_bin: ArrayView2<f64>, spec: &BlockSize) -> Result<Self> {
        point_set_view(rands_to_bin, "rands_to_bin")?;
        if rands_to_bin.nrows() == 0 {
            return Err(Error::empty_input("rands_to_bin"));
        }

        let edges = match spec {
            BlockSize::Length(length) => {
                check_length(*length)?;
                let mut edges: [Vec<f64>; 3] = Default::default();
                for (axis, axis_edges) in edges.iter_mut().enumerate() {
                    let (lo, hi) = axis_extent(&rands_to_bin, axis);
                    let n = blocks_along_axis(hi - lo, *length)?.max(1);
                    *axis_edges = (0..=n)
                        .map(|i| lo + (hi - lo) * (i as f64) / (n as f64))
                        .collect();
                    axis_edges[0] -= 1.0;
                    axis_edges[n] += 1.0;
                }
                edges
            }
            BlockSize::AxisLengths(lengths) => {
                for length in lengths {
                    check_length(*length)?;
                }
                let mut edges: [Vec<f64>; 3] = Default::default();
                for (axis, axis_edges) in edges.iter_mut().enumerate() {
                    let (lo, hi) = axis_extent(&rands_to_bin, axis);
                    let length = lengths[axis];
                    let n_edges = blocks_along_axis(hi - lo, length)?;
                    *axis_edges = (0..n_edges).map(|i| lo + (i as f64) * length).collect();
                    if let Some(&last) = axis_edges.last() {
                        let shift = (hi - last) / 2.0;
                        axis_edges.iter_mut().for_each(|e| *e += shift);
                    }
                }
                edges
            }
            BlockSize::Edges(edges) => edges.clone(),
        };
        Self::from_edges(edges)
    }

    /// Builds the grid from explicit per-axis edges
    pub fn from_edges(edges: [Vec<f64>; 3]) -> Result<Self> {
        for (axis, axis_edges) in edges.iter().enumerate() {
            if axis_edges.len() < 2 {
                return Err(Error::integer_range(
                    "number of blocks along an axis",
                    axis_edges.len().saturating_sub(1) as i64,
                    1,
                    i64::MAX,
                ));
            }
            validate_bin_edges(axis_edges).map_err(|what| {
                Error::bin_edge(format!("{} block edges", AXIS_NAMES[axis]), what)
            })?;
        }
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[Vec<f64>; 3] {
        &self.edges
    }

    /// number of blocks along each axis
    pub fn shape(&self) -> [usize; 3] {
        std::array::from_fn(|axis| self.edges[axis].len() - 1)
    }

    pub fn n_blocks(&self) -> usize {
        self.shape().iter().product()
    }

    fn bins(&self) -> Result<[IrregularBinEdges<'_>; 3]> {
        Ok([
            IrregularBinEdges::new(&self.edges[0]).map_err(Error::internal)?,
            IrregularBinEdges::new(&self.edges[1]).map_err(Error::internal)?,
            IrregularBinEdges::new(&self.edges[2]).map_err(Error::internal)?,
        ])
    }

    /// The flat block id `ix*ny*nz + iy*nz + iz` of `position`, or `None`
    /// when `position` lies outside of the grid. Bins are half-open.
    pub fn block_index(&self, position: [f64; 3]) -> Option<usize> {
        let bins = self.bins().ok()?;
        flat_block_index(&bins, position, |bins, value| bins.bin_index(value))
    }

    /// Labels every data point and random point with its block
    pub fn assign(
        &self,
        data_to_bin: ArrayView2<f64>,
        rands_to_bin: ArrayView2<f64>,
    ) -> Result<BlockAssignment> {
        require_nonempty(data_to_bin, rands_to_bin)?;
        let bins = self.bins()?;
        let label = |points: &ArrayView2<f64>| -> Vec<Option<usize>> {
            (0..points.nrows())
                .map(|i| flat_block_index(&bins, point(points, i), |b, v| b.bin_index(v)))
                .collect()
        };
        Ok(BlockAssignment {
            data: label(&data_to_bin),
            rands: label(&rands_to_bin),
            n_blocks: self.n_blocks(),
        })
    }
}

/// Combines per-axis bin lookups into a flat, row-major block id
fn flat_block_index<B: BinEdges>(
    bins: &[B; 3],
    position: [f64; 3],
    lookup: impl Fn(&B, f64) -> Option<usize>,
) -> Option<usize> {
    let ix = lookup(&bins[0], position[0])?;
    let iy = lookup(&bins[1], position[1])?;
    let iz = lookup(&bins[2], position[2])?;
    let (ny, nz) = (bins[1].n_bins(), bins[2].n_bins());
    Some(ix * ny * nz + iy * nz + iz)
}

/// Measures how far a point lies from a field center.
pub trait FieldMetric {
    fn distance(&self, position: [f64; 3], center: [f64; 3]) -> f64;
}

/// The built-in distance metrics
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DistanceMetric {
    /// straight-line distance between cartesian positions
    #[default]
    Euclidean,
    /// Positions are `(ra, dec, redshift)`, with angles in degrees. The
    /// distance is `sqrt(theta^2 + (redshift_scale * dz)^2)`, where `theta`
    /// is the great-circle separation in degrees.
    RaDecZ { redshift_scale: f64 },
}

/// great-circle separation in degrees (haversine formula)
fn angular_separation(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let to_rad = PI / 180.0;
    let (dec1, dec2) = (dec1 * to_rad, dec2 * to_rad);
    let half_ddec = 0.5 * (dec2 - dec1);
    let half_dra = 0.5 * (ra2 - ra1) * to_rad;
    let h = half_ddec.sin().powi(2) + dec1.cos() * dec2.cos() * half_dra.sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin() / to_rad
}

impl FieldMetric for DistanceMetric {
    fn distance(&self, position: [f64; 3], center: [f64; 3]) -> f64 {
        match self {
            DistanceMetric::Euclidean => {
                let dx = position[0] - center[0];
                let dy = position[1] - center[1];
                let dz = position[2] - center[2];
                (dx * dx + dy * dy + dz * dz).sqrt()
            }
            DistanceMetric::RaDecZ { redshift_scale } => {
                let theta = angular_separation(position[0], position[1], center[0], center[1]);
                let dz = redshift_scale * (position[2] - center[2]);
                (theta * theta + dz * dz).sqrt()
            }
        }
    }
}

impl<F> FieldMetric for F
where
    F: Fn([f64; 3], [f64; 3]) -> f64,
{
    fn distance(&self, position: [f64; 3], center: [f64; 3]) -> f64 {
        self(position, center)
    }
}

/// A set of survey fields, each subdivided into a local grid of blocks.
///
/// Every point is attached to its nearest center (ties go to the center
/// listed first). The volume around a center is split into `nbins` blocks
/// spanning `center +/- field_shape / 2` on each axis. The outermost edges
/// of that local grid are treated as `-inf` and `+inf`, so a point is never
/// dropped for lying outside of its field's nominal shape.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout {
    centers: Vec<[f64; 3]>,
    field_shape: [f64; 3],
    nbins: [usize; 3],
}

impl FieldLayout {
    /// create a new instance
    pub fn new(centers: Vec<[f64; 3]>, field_shape: [f64; 3], nbins: [usize; 3]) -> Result<Self> {
        if centers.is_empty() {
            return Err(Error::integer_range("number of field centers", 0, 1, i64::MAX));
        }
        for n in nbins {
            if n == 0 {
                return Err(Error::integer_range(
                    "number of blocks along an axis of a field",
                    0,
                    1,
                    i64::MAX,
                ));
            }
        }
        if field_shape.iter().any(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(Error::bin_edge(
                "field_shape",
                format!("every extent must be positive and finite, not {field_shape:?}"),
            ));
        }
        Ok(Self {
            centers,
            field_shape,
            nbins,
        })
    }

    /// a single field
    pub fn single(center: [f64; 3], field_shape: [f64; 3], nbins: [usize; 3]) -> Result<Self> {
        Self::new(vec![center], field_shape, nbins)
    }

    pub fn centers(&self) -> &[[f64; 3]] {
        &self.centers
    }

    pub fn field_shape(&self) -> [f64; 3] {
        self.field_shape
    }

    pub fn nbins(&self) -> [usize; 3] {
        self.nbins
    }

    pub fn n_fields(&self) -> usize {
        self.centers.len()
    }

    pub fn blocks_per_field(&self) -> usize {
        self.nbins.iter().product()
    }

    pub fn n_blocks(&self) -> usize {
        self.n_fields() * self.blocks_per_field()
    }

    fn local_bins(&self, center: [f64; 3]) -> Result<[RegularBinEdges; 3]> {
        let axis = |i: usize| {
            let half = 0.5 * self.field_shape[i];
            RegularBinEdges::new(center[i] - half, center[i] + half, self.nbins[i])
                .map_err(Error::internal)
        };
        Ok([axis(0)?, axis(1)?, axis(2)?])
    }

    /// index of the center nearest to `position` (`None` if every distance
    /// is `NaN`)
    fn nearest_field(&self, position: [f64; 3], metric: &impl FieldMetric) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, center) in self.centers.iter().enumerate() {
            let dist = metric.distance(position, *center);
            match best {
                Some((_, best_dist)) if !(dist < best_dist) => {}
                _ if dist.is_nan() => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Labels every data point and random point with its block
    pub fn assign(
        &self,
        data_to_bin: ArrayView2<f64>,
        rands_to_bin: ArrayView2<f64>,
        metric: &impl FieldMetric,
    ) -> Result<BlockAssignment> {
        require_nonempty(data_to_bin, rands_to_bin)?;
        let grids = self
            .centers
            .iter()
            .map(|c| self.local_bins(*c))
            .collect::<Result<Vec<_>>>()?;
        let per_field = self.blocks_per_field();

        let label = |points: &ArrayView2<f64>| -> Vec<Option<usize>> {
            (0..points.nrows())
                .map(|i| {
                    let position = point(points, i);
                    let field = self.nearest_field(position, metric)?;
                    let local =
                        flat_block_index(&grids[field], position, |b, v| b.open_bin_index(v))?;
                    Some(field * per_field + local)
                })
                .collect()
        };
        Ok(BlockAssignment {
            data: label(&data_to_bin),
            rands: label(&rands_to_bin),
            n_blocks: self.n_blocks(),
        })
    }
}
