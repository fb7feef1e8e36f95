//! Internal machinery for the `blockcf` crate.
//!
//! This crate holds the pieces that don't need an allocator: bin-edge
//! lookups and the brute-force pair-counting loops. Every routine writes
//! into caller-provided buffers and reports problems with `&'static str`
//! errors (the public crate wraps those in its own error type).
//!
//! Nothing in here is intended to be used directly. The public crate is the
//! only supported entry point.

#![no_std]
mod bins;
mod misc;
mod paircount;
mod points;

pub use bins::{BinEdges, IrregularBinEdges, RegularBinEdges, validate_bin_edges};
pub use misc::{Separation, squared_norm};
pub use paircount::{count_pairs_r, count_pairs_rp_pi};
pub use points::PointSetView;
