use crate::bins::BinEdges;
use crate::misc::{Separation, abs, squared_norm};
use crate::points::PointSetView;

/// Counts pairs of points, binned by their 3D separation.
///
/// `counts` acts as the output buffer. It holds one entry per distance bin,
/// and the function adds its contributions to whatever is already there.
///
/// When `points_b` is `None`, the function considers all unique pairs of
/// distinct points within `points_a` and, following the usual convention
/// for auto-correlations, each unique pair is counted twice (once per
/// ordering). Otherwise, every pair between `points_a` and `points_b` is
/// counted once.
///
/// TODO: like the rest of this crate, we accept squared distance bin edges
///       to avoid a sqrt in the inner loop (`f64::sqrt` isn't available in
///       no_std crates anyway). Forgetting to square the edges is an easy
///       mistake to make, so the public crate should be the only caller.
pub fn count_pairs_r(
    counts: &mut [f64],
    points_a: &PointSetView,
    points_b: Option<&PointSetView>,
    squared_distance_bin_edges: &impl BinEdges,
    separation: Separation,
) -> Result<(), &'static str> {
    if counts.len() != squared_distance_bin_edges.n_bins() {
        return Err("counts must hold one entry per distance bin");
    }

    let bin_of = |disp: [f64; 3]| squared_distance_bin_edges.bin_index(squared_norm(disp));
    dispatch(counts, points_a, points_b, separation, bin_of);
    Ok(())
}

/// Counts pairs of points, binned by their separation perpendicular to
/// (`rp`) and along (`pi`) the line of sight, which is taken to be the z
/// axis.
///
/// The line-of-sight bins have unit width and start at 0: pair with
/// `|dz|` in `[k, k+1)` lands in pi-bin `k`, and pairs with `|dz|` at or
/// beyond `n_pibins` are ignored. `counts` is laid out rp-major, i.e.
/// the entry for `(rp-bin i, pi-bin k)` is at `i * n_pibins + k`.
///
/// The pair-counting convention matches [`count_pairs_r`].
pub fn count_pairs_rp_pi(
    counts: &mut [f64],
    points_a: &PointSetView,
    points_b: Option<&PointSetView>,
    squared_rp_bin_edges: &impl BinEdges,
    n_pibins: usize,
    separation: Separation,
) -> Result<(), &'static str> {
    if n_pibins == 0 {
        return Err("there must be at least one line-of-sight bin");
    } else if counts.len() != squared_rp_bin_edges.n_bins() * n_pibins {
        return Err("counts must hold one entry per (rp, pi) bin");
    }

    let pimax = n_pibins as f64;
    let bin_of = |disp: [f64; 3]| {
        let pi = abs(disp[2]);
        if !(pi < pimax) {
            return None;
        }
        let rp_squared = disp[0] * disp[0] + disp[1] * disp[1];
        squared_rp_bin_edges
            .bin_index(rp_squared)
            // this cast handles the truncation
            .map(|rp_idx| rp_idx * n_pibins + (pi as usize))
    };
    dispatch(counts, points_a, points_b, separation, bin_of);
    Ok(())
}

fn dispatch(
    counts: &mut [f64],
    points_a: &PointSetView,
    points_b: Option<&PointSetView>,
    separation: Separation,
    bin_of: impl Fn([f64; 3]) -> Option<usize>,
) {
    if let Some(points_b) = points_b {
        count_pairs_helper::<false>(counts, points_a, points_b, separation, bin_of);
    } else {
        count_pairs_helper::<true>(counts, points_a, points_a, separation, bin_of);
    }
}

fn count_pairs_helper<const AUTO: bool>(
    counts: &mut [f64],
    points_a: &PointSetView,
    points_b: &PointSetView,
    separation: Separation,
    bin_of: impl Fn([f64; 3]) -> Option<usize>,
) {
    let increment = if AUTO { 2.0 } else { 1.0 };
    for i_a in 0..points_a.n_points() {
        let pos_a = points_a.point(i_a);
        let i_b_start = if AUTO { i_a + 1 } else { 0 };
        for i_b in i_b_start..points_b.n_points() {
            let disp = separation.displacement(pos_a, points_b.point(i_b));
            if let Some(bin_idx) = bin_of(disp) {
                counts[bin_idx] += increment;
            }
        }
    }
}
