//! Geometry primitives for beamstream.
//!
//! This module provides the abstract triangulated-surface interface the
//! slicer consumes, a concrete in-memory mesh backend, and the uniform-grid
//! spatial index used for bounded-distance point queries.

pub mod index;
pub mod surface;

pub use index::PointGrid;
pub use surface::{Aabb, TriMesh, TriangleSurface};
