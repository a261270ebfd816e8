//! Cross-layer branch-connectivity builder.
//!
//! For every slice above the substrate, each branch is linked to the
//! branches of the slice below that come within `connection_distance` in
//! the Chebyshev norm. Because two branches can run close for several
//! layers before visually merging, a raw proximity test over-counts
//! connections near merges; the de-duplication pass below compensates.
//! The drop-count formula is a known heuristic workaround for T-junction
//! artifacts and is kept exactly as calibrated; do not tighten its
//! tie-breaking without new test evidence.

use nalgebra::Point2;
use rayon::prelude::*;

use crate::geometry::PointGrid;
use crate::slicing::Slice;

/// For each slice, for each branch, the indices of the branches in the
/// slice below it is connected to. Slice 0 has an empty list per branch.
pub type BranchConnections = Vec<Vec<Vec<usize>>>;

/// Builds the connectivity graph between consecutive slices.
pub fn branch_connections(slices: &[Slice], connection_distance: f64) -> BranchConnections {
    if slices.is_empty() {
        return Vec::new();
    }
    let mut connections: BranchConnections = Vec::with_capacity(slices.len());
    // substrate: nothing below
    connections.push(vec![Vec::new(); slices[0].n_branches()]);
    let upper: Vec<Vec<Vec<usize>>> = (1..slices.len())
        .into_par_iter()
        .map(|i| slice_connections(&slices[i], &slices[i - 1], connection_distance))
        .collect();
    connections.extend(upper);
    connections
}

/// Connections of every branch in `slice` to the branches of `below`.
fn slice_connections(slice: &Slice, below: &Slice, connection_distance: f64) -> Vec<Vec<usize>> {
    let branch_pts: Vec<Vec<Point2<f64>>> = (0..slice.n_branches() as u32)
        .map(|b| slice.branch_points(b))
        .collect();
    let below_pts: Vec<Vec<Point2<f64>>> = (0..below.n_branches() as u32)
        .map(|b| below.branch_points(b))
        .collect();

    branch_pts
        .iter()
        .map(|pts| {
            let grid = PointGrid::build(pts, connection_distance.max(f64::MIN_POSITIVE));
            // raw candidates with their minimum inter-branch distance
            let mut candidates: Vec<(usize, f64)> = below_pts
                .iter()
                .enumerate()
                .filter_map(|(k, bp)| {
                    grid.min_distance_linf(bp, connection_distance)
                        .map(|d| (k, d))
                })
                .collect();

            let n_conn = candidates.len();
            if n_conn > 1 {
                // Two nearby branches below may both look connected even
                // though only one genuinely continues into this branch. If
                // the seemingly merged branches still exist side by side in
                // the current slice, the extras are duplicates: count the
                // current-slice branches within connection distance (the
                // branch itself included) and drop the farthest candidates.
                let count = branch_pts
                    .iter()
                    .filter(|other| {
                        grid.min_distance_linf(other.as_slice(), connection_distance)
                            .is_some()
                    })
                    .count();
                if count > 1 && count <= n_conn {
                    let n_keep = n_conn - count + 1;
                    candidates
                        .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
                    candidates.truncate(n_keep);
                }
            }
            candidates.into_iter().map(|(k, _)| k).collect()
        })
        .collect()
}
