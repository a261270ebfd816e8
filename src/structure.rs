//! `Structure`: a mesh plus its lazily computed, atomically cached sliced
//! geometry.
//!
//! Derived state (slices, branch labels, branch lengths, connectivity) is
//! computed on first use via `ensure_sliced` and cached as one immutable
//! [`SlicedGeometry`] bundle. Every geometric mutation clears the whole
//! bundle; there is no partial invalidation, so branch ids can never refer
//! to a geometry that has since been transformed.

use nalgebra::{Point2, Point3, Vector3};
use once_cell::sync::OnceCell;

use crate::error::StreamError;
use crate::geometry::surface::{TriMesh, TriangleSurface};
use crate::slicing::connectivity::{BranchConnections, branch_connections};
use crate::slicing::{Slice, slice_surface};

/// Epsilon added to the pitch when deciding whether branches of consecutive
/// layers touch.
const CONNECTION_EPS: f64 = 0.01;

/// Immutable derived geometry: slices plus the branch graph.
#[derive(Debug, Clone)]
pub struct SlicedGeometry {
    /// Slicing pitch the bundle was computed with.
    pub pitch: f64,
    /// Non-empty slices, bottom to top.
    pub slices: Vec<Slice>,
    /// Branch connectivity towards the layer below, per slice per branch.
    pub connections: BranchConnections,
}

impl SlicedGeometry {
    /// Number of layers.
    #[inline]
    pub fn n_layers(&self) -> usize {
        self.slices.len()
    }

    /// Heights of the retained z-levels.
    pub fn z_levels(&self) -> Vec<f64> {
        self.slices.iter().map(|s| s.z).collect()
    }

    /// Target thickness per layer: the z-step to the next level. The top
    /// layer has no next level and reuses the step below it; a single-level
    /// geometry falls back to the slicing step `pitch / 2`.
    pub fn layer_thicknesses(&self) -> Vec<f64> {
        let n = self.slices.len();
        (0..n)
            .map(|i| {
                if i + 1 < n {
                    self.slices[i + 1].z - self.slices[i].z
                } else if i > 0 {
                    self.slices[i].z - self.slices[i - 1].z
                } else {
                    self.pitch / 2.0
                }
            })
            .collect()
    }

    /// Per-layer centroid of the slice point cloud, with its height as the
    /// third coordinate. Empty (degenerate) slices fall back to (0, 0, z).
    pub fn layer_centroids(&self) -> Vec<Point3<f64>> {
        self.slices
            .iter()
            .map(|s| {
                let c = s.centroid().unwrap_or_else(Point2::origin);
                Point3::new(c.x, c.y, s.z)
            })
            .collect()
    }
}

/// A deposition target: exclusively owned mesh geometry plus slicing pitch.
#[derive(Debug)]
pub struct Structure {
    mesh: TriMesh,
    pitch: f64,
    derived: OnceCell<SlicedGeometry>,
}

impl Structure {
    /// Wraps a mesh with the given slicing pitch.
    pub fn new(mesh: TriMesh, pitch: f64) -> Self {
        Self {
            mesh,
            pitch,
            derived: OnceCell::new(),
        }
    }

    /// Read-only access to the underlying mesh.
    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// Slicing pitch.
    #[inline]
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Whether the derived geometry is currently cached.
    #[inline]
    pub fn is_sliced(&self) -> bool {
        self.derived.get().is_some()
    }

    /// Returns the derived geometry, computing it on first call.
    ///
    /// Slicing and connectivity are computed together; the cache is either
    /// fully populated or untouched (errors leave it empty).
    pub fn ensure_sliced(&self) -> Result<&SlicedGeometry, StreamError> {
        self.derived.get_or_try_init(|| {
            let stack = slice_surface(&self.mesh, self.pitch)?;
            let connections = branch_connections(&stack.slices, self.pitch + CONNECTION_EPS);
            Ok(SlicedGeometry {
                pitch: self.pitch,
                slices: stack.slices,
                connections,
            })
        })
    }

    /// Uniformly scales the mesh and drops all derived state.
    pub fn rescale(&mut self, scale: f64) {
        self.mesh.rescale(scale);
        self.clear_derived();
    }

    /// Rotates the mesh about `axis` by `angle_deg` degrees and drops all
    /// derived state.
    pub fn rotate_deg(&mut self, axis: Vector3<f64>, angle_deg: f64) {
        self.mesh.rotate_deg(axis, angle_deg);
        self.clear_derived();
    }

    /// Translates the mesh and drops all derived state.
    pub fn translate(&mut self, offset: Vector3<f64>) {
        self.mesh.translate(offset);
        self.clear_derived();
    }

    /// Drops the mesh onto the substrate plane and centres it on the z
    /// axis, then drops all derived state.
    pub fn centre(&mut self) {
        self.mesh.centre_xy();
        self.clear_derived();
    }

    fn clear_derived(&mut self) {
        self.derived.take();
    }
}
