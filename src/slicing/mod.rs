//! Slicing: horizontal cross-sections, branch decomposition and the
//! cross-layer branch-connectivity graph.
//!
//! A [`Slice`] is the resampled point cloud of one z-level together with a
//! branch labelling that partitions the points into connected contour
//! components. [`connectivity::branch_connections`] then links each branch
//! to the branches of the layer below it, which is what the resistance
//! propagation walks bottom-up.

pub mod connectivity;
pub mod slicer;

pub use connectivity::branch_connections;
pub use slicer::{SliceStack, slice_surface};

use nalgebra::Point2;

/// One horizontal cross-section of the surface.
///
/// # Invariants
/// - `points.len() == branch_ids.len()`;
/// - branch ids are contiguous `0..branch_lengths.len()` and every id in
///   that range labels at least zero points (a degenerate branch may have
///   resampled to nothing but keeps its length entry).
#[derive(Debug, Clone)]
pub struct Slice {
    /// Height of the slicing plane.
    pub z: f64,
    /// Resampled points, grouped by branch, lexicographically sorted within
    /// each branch.
    pub points: Vec<Point2<f64>>,
    /// Branch label per point, parallel to `points`.
    pub branch_ids: Vec<u32>,
    /// Exact polyline length of each branch before resampling.
    pub branch_lengths: Vec<f64>,
}

impl Slice {
    /// Number of branches in this slice.
    #[inline]
    pub fn n_branches(&self) -> usize {
        self.branch_lengths.len()
    }

    /// Points belonging to branch `b`.
    pub fn branch_points(&self, b: u32) -> Vec<Point2<f64>> {
        self.points
            .iter()
            .zip(&self.branch_ids)
            .filter(|&(_, &id)| id == b)
            .map(|(p, _)| *p)
            .collect()
    }

    /// Centroid of branch `b`, or `None` for an empty branch.
    pub fn branch_centroid(&self, b: u32) -> Option<Point2<f64>> {
        let pts = self.branch_points(b);
        if pts.is_empty() {
            return None;
        }
        let sum = pts
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / pts.len() as f64))
    }

    /// Centroid of the whole slice, or `None` if it has no points.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / self.points.len() as f64))
    }
}
