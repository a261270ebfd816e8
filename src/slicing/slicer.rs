//! Mesh slicer: plane intersection, branch labelling and equidistant
//! resampling.
//!
//! Z-levels run from just above the bottom of the surface to just below its
//! top, stepping half the pitch. Per level, the face/plane intersection
//! yields raw segments; segments sharing an endpoint (after quantized
//! grouping) are merged into connected components ("branches") by a
//! union-find pass, and each branch is resampled onto the pitch grid.
//! Levels with an empty intersection are dropped together with their level
//! value.

use nalgebra::Point2;
use rayon::prelude::*;

use crate::error::StreamError;
use crate::geometry::surface::{Segment2, TriangleSurface};
use crate::slicing::Slice;

/// Offset keeping the first/last plane off the exact surface bounds, where
/// coplanar faces produce intersection artifacts.
const Z_MARGIN: f64 = 1e-3;

/// Grouping tolerance for coincident segment endpoints.
const MERGE_TOL: f64 = 1e-6;

/// The non-empty slices of a surface, bottom to top.
#[derive(Debug, Clone)]
pub struct SliceStack {
    /// Slices in ascending z order.
    pub slices: Vec<Slice>,
}

impl SliceStack {
    /// Heights of the retained levels.
    pub fn z_levels(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.z).collect()
    }
}

/// Slices `surface` with horizontal planes spaced `pitch / 2` apart.
///
/// # Errors
/// - [`StreamError::EmptySurface`] if no level produces an intersection;
/// - [`StreamError::DegenerateSlice`] if a level yields non-finite
///   intersection data (a geometry bug, never silently recovered).
pub fn slice_surface(
    surface: &(impl TriangleSurface + Sync + ?Sized),
    pitch: f64,
) -> Result<SliceStack, StreamError> {
    let bounds = surface.bounds();
    let start = bounds.min.z + Z_MARGIN;
    let stop = bounds.max.z - Z_MARGIN;
    let step = pitch / 2.0;

    let mut levels = Vec::new();
    let mut k = 0u32;
    loop {
        let z = start + f64::from(k) * step;
        if z >= stop {
            break;
        }
        levels.push(z);
        k += 1;
    }

    log::info!("slicing {} levels at pitch {pitch}", levels.len());
    let slices: Vec<Option<Slice>> = levels
        .par_iter()
        .enumerate()
        .map(|(idx, &z)| {
            let segments = surface.cross_section(z);
            if segments.is_empty() {
                Ok(None)
            } else {
                build_slice(&segments, z, idx, pitch).map(Some)
            }
        })
        .collect::<Result<_, StreamError>>()?;

    let slices: Vec<Slice> = slices.into_iter().flatten().collect();
    if slices.is_empty() {
        return Err(StreamError::EmptySurface);
    }
    log::info!("sliced into {} non-empty layers", slices.len());
    Ok(SliceStack { slices })
}

/// Labels the segments of one level into branches and resamples each branch.
fn build_slice(
    segments: &[Segment2],
    z: f64,
    level: usize,
    pitch: f64,
) -> Result<Slice, StreamError> {
    for seg in segments {
        for p in seg {
            if !(p.x.is_finite() && p.y.is_finite()) {
                return Err(StreamError::DegenerateSlice {
                    slice: level,
                    detail: format!("non-finite intersection point ({}, {})", p.x, p.y),
                });
            }
        }
    }

    let labels = label_branches(segments);
    let n_branches = labels.iter().copied().max().map_or(0, |m| m as usize + 1);

    let mut points = Vec::new();
    let mut branch_ids = Vec::new();
    let mut branch_lengths = Vec::with_capacity(n_branches);
    for b in 0..n_branches as u32 {
        let branch_segs: Vec<Segment2> = segments
            .iter()
            .zip(&labels)
            .filter(|&(_, &lbl)| lbl == b)
            .map(|(s, _)| *s)
            .collect();
        branch_lengths.push(
            branch_segs
                .iter()
                .map(|s| nalgebra::distance(&s[0], &s[1]))
                .sum(),
        );
        let pts = resample_branch(&branch_segs, pitch);
        branch_ids.resize(branch_ids.len() + pts.len(), b);
        points.extend(pts);
    }

    Ok(Slice {
        z,
        points,
        branch_ids,
        branch_lengths,
    })
}

/// Union-find over quantized segment endpoints; returns one contiguous
/// component label per segment, in order of first appearance.
fn label_branches(segments: &[Segment2]) -> Vec<u32> {
    use std::collections::HashMap;

    let quantize = |p: &Point2<f64>| -> (i64, i64) {
        ((p.x / MERGE_TOL).round() as i64, (p.y / MERGE_TOL).round() as i64)
    };

    let mut node_of: HashMap<(i64, i64), u32> = HashMap::new();
    let mut uf = UnionFind::default();
    let mut seg_nodes = Vec::with_capacity(segments.len());
    for seg in segments {
        let ids: Vec<u32> = seg
            .iter()
            .map(|p| {
                *node_of
                    .entry(quantize(p))
                    .or_insert_with(|| uf.make_node())
            })
            .collect();
        uf.union(ids[0], ids[1]);
        seg_nodes.push(ids[0]);
    }

    // relabel roots contiguously by first appearance
    let mut label_of_root: HashMap<u32, u32> = HashMap::new();
    let mut labels = Vec::with_capacity(segments.len());
    for &node in &seg_nodes {
        let root = uf.find(node);
        let next = label_of_root.len() as u32;
        labels.push(*label_of_root.entry(root).or_insert(next));
    }
    labels
}

#[derive(Debug, Default)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn make_node(&mut self) -> u32 {
        let id = self.parent.len() as u32;
        self.parent.push(id);
        id
    }

    fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            let gp = self.parent[self.parent[x as usize] as usize];
            self.parent[x as usize] = gp;
            x = gp;
        }
        x
    }

    fn union(&mut self, a: u32, b: u32) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb as usize] = ra;
        }
    }
}

/// Resamples a branch polyline into pitch-spaced grid points.
///
/// Each segment is subdivided into `ceil(len / pitch)` uniform,
/// endpoint-exclusive steps; every generated point is snapped to the
/// nearest multiple of the pitch, then the set is deduplicated and sorted
/// lexicographically. Snapping both enforces uniform spacing and merges
/// points that coincide across segment boundaries.
fn resample_branch(segments: &[Segment2], pitch: f64) -> Vec<Point2<f64>> {
    let mut pts: Vec<Point2<f64>> = Vec::new();
    for seg in segments {
        let v = seg[1] - seg[0];
        let len = v.norm();
        let n = (len / pitch).ceil() as usize;
        for i in 0..n {
            let p = seg[0] + v * (i as f64 / n as f64);
            pts.push(Point2::new(
                (p.x / pitch).round() * pitch,
                (p.y / pitch).round() * pitch,
            ));
        }
    }
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
    });
    pts.dedup();
    pts
}
