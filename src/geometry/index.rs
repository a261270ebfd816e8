//! `PointGrid`: uniform-grid spatial index over 2D point sets.
//!
//! Both consumers of this index only ever ask bounded-distance questions
//! (is anything within `r`? which pairs are within `r`?), so a hash grid
//! with cell size equal to the query radius answers every query from a
//! 3x3 cell neighborhood. Queries farther than the build radius are a
//! contract violation and checked in debug builds.

use std::collections::HashMap;

use nalgebra::Point2;

/// Uniform hash-grid over a fixed 2D point set.
///
/// Built once per branch/layer, then queried read-only; the grid never
/// outlives the point slice it indexes (points are copied in to keep the
/// type self-contained and `Send`).
#[derive(Debug, Clone)]
pub struct PointGrid {
    cell: f64,
    points: Vec<Point2<f64>>,
    buckets: HashMap<(i64, i64), Vec<u32>>,
}

impl PointGrid {
    /// Indexes `points` with cell size `cell` (the maximum query radius).
    ///
    /// `cell` must be positive and finite.
    pub fn build(points: &[Point2<f64>], cell: f64) -> Self {
        debug_assert!(cell.is_finite() && cell > 0.0, "grid cell must be positive");
        let mut buckets: HashMap<(i64, i64), Vec<u32>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            buckets
                .entry(Self::key(p, cell))
                .or_default()
                .push(i as u32);
        }
        Self {
            cell,
            points: points.to_vec(),
            buckets,
        }
    }

    /// Number of indexed points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the grid indexes no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    fn key(p: &Point2<f64>, cell: f64) -> (i64, i64) {
        ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
    }

    /// Calls `f(i)` for every indexed point in the 3x3 cell neighborhood of
    /// `p`. Candidates only; the caller filters by actual distance.
    fn for_candidates(&self, p: &Point2<f64>, mut f: impl FnMut(usize)) {
        let (kx, ky) = Self::key(p, self.cell);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(ids) = self.buckets.get(&(kx + dx, ky + dy)) {
                    for &i in ids {
                        f(i as usize);
                    }
                }
            }
        }
    }

    /// Minimum Chebyshev (infinity-norm) distance between `queries` and the
    /// indexed set, or `None` if no pair comes within `radius`.
    ///
    /// `radius` must not exceed the build cell size.
    pub fn min_distance_linf(&self, queries: &[Point2<f64>], radius: f64) -> Option<f64> {
        debug_assert!(radius <= self.cell + 1e-12, "query radius exceeds grid cell");
        let mut best: Option<f64> = None;
        for q in queries {
            self.for_candidates(q, |i| {
                let p = &self.points[i];
                let d = (q.x - p.x).abs().max((q.y - p.y).abs());
                if d <= radius && best.is_none_or(|b| d < b) {
                    best = Some(d);
                }
            });
        }
        best
    }

    /// Calls `f(i, j, d)` for every ordered pair of indexed points with
    /// Euclidean distance `d <= radius`, *including* the self-pairs
    /// `(i, i, 0.0)`. Pair order is deterministic: `i` ascending, `j` in
    /// bucket order.
    ///
    /// `radius` must not exceed the build cell size.
    pub fn for_pairs_within(&self, radius: f64, mut f: impl FnMut(usize, usize, f64)) {
        debug_assert!(radius <= self.cell + 1e-12, "query radius exceeds grid cell");
        for (i, p) in self.points.iter().enumerate() {
            self.for_candidates(p, |j| {
                let q = &self.points[j];
                let d = nalgebra::distance(p, q);
                if d <= radius {
                    f(i, j, d);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point2<f64>> {
        coords.iter().map(|&(x, y)| Point2::new(x, y)).collect()
    }

    #[test]
    fn linf_distance_finds_closest_pair() {
        let grid = PointGrid::build(&pts(&[(0.0, 0.0), (10.0, 0.0)]), 2.0);
        let d = grid.min_distance_linf(&pts(&[(1.5, 0.5)]), 2.0);
        assert_eq!(d, Some(1.5));
    }

    #[test]
    fn linf_distance_none_when_out_of_range() {
        let grid = PointGrid::build(&pts(&[(0.0, 0.0)]), 1.0);
        assert_eq!(grid.min_distance_linf(&pts(&[(5.0, 5.0)]), 1.0), None);
    }

    #[test]
    fn pairs_include_diagonal() {
        let grid = PointGrid::build(&pts(&[(0.0, 0.0), (1.0, 0.0), (5.0, 0.0)]), 1.5);
        let mut pairs = Vec::new();
        grid.for_pairs_within(1.5, |i, j, d| pairs.push((i, j, d)));
        // each point pairs with itself; 0 and 1 pair both ways; 2 is isolated
        assert!(pairs.contains(&(0, 0, 0.0)));
        assert!(pairs.contains(&(2, 2, 0.0)));
        assert!(pairs.iter().any(|&(i, j, d)| i == 0 && j == 1 && (d - 1.0).abs() < 1e-12));
        assert!(pairs.iter().any(|&(i, j, _)| i == 1 && j == 0));
        assert!(!pairs.iter().any(|&(i, j, _)| i == 2 && j != 2));
    }

    #[test]
    fn pair_counts_match_brute_force() {
        let coords: Vec<(f64, f64)> = (0..40)
            .map(|k| ((k % 8) as f64 * 0.7, (k / 8) as f64 * 0.9))
            .collect();
        let points = pts(&coords);
        let radius = 1.3;
        let grid = PointGrid::build(&points, radius);
        let mut n_grid = 0usize;
        grid.for_pairs_within(radius, |_, _, _| n_grid += 1);
        let mut n_brute = 0usize;
        for a in &points {
            for b in &points {
                if nalgebra::distance(a, b) <= radius {
                    n_brute += 1;
                }
            }
        }
        assert_eq!(n_grid, n_brute);
    }
}
