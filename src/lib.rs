//! # beamstream
//!
//! beamstream converts a 3D solid model into a time-ordered sequence of
//! electron-beam dwell commands that deposits the model layer by layer,
//! compensating for proximity effects (material already deposited nearby
//! raises the local growth rate) and resistive heating of the growing
//! structure.
//!
//! ## Pipeline
//! Data flows one way:
//!
//! mesh → slicer → (slices, branch labels, branch lengths) → connectivity
//! builder → resistance propagator → proximity model → dwell solver →
//! stream builder → exposure stream.
//!
//! - [`geometry`]: the abstract [`TriangleSurface`](geometry::TriangleSurface)
//!   interface, the owned [`TriMesh`](geometry::TriMesh) backend and the
//!   uniform-grid spatial index;
//! - [`slicing`]: plane intersection, branch decomposition, equidistant
//!   resampling, and the cross-layer branch-connectivity graph;
//! - [`structure`]: a mesh plus its atomically cached derived geometry;
//! - [`resistance`]: bottom-up resistor-network evaluation over the branch
//!   graph;
//! - [`model`]: the composable proximity-model family (reaction-limited,
//!   desorption-dominated, height and angle corrections);
//! - [`solver`]: embarrassingly parallel bounded least-squares dwell solves;
//! - [`stream`]: dwell splitting, scan ordering, pixel mapping and the
//!   validated exposure-stream file format.
//!
//! ## Determinism
//! Layer solves and per-level slicing fan out over rayon but merge into
//! index-addressed result vectors, so scheduling never affects the output
//! stream.
//!
//! Mesh-file parsing, plotting and settings loading are deliberately out of
//! scope; the core consumes triangle buffers and plain config structs.

pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod resistance;
pub mod slicing;
pub mod solver;
pub mod sparse;
pub mod stream;
pub mod structure;

/// A convenient prelude importing the most-used types.
pub mod prelude {
    pub use crate::config::{ModelConfig, ScanOrder, StreamConfig};
    pub use crate::error::StreamError;
    pub use crate::geometry::{Aabb, PointGrid, TriMesh, TriangleSurface};
    pub use crate::model::{DdModel, GrowthModel, HeightCorrection, PhiAngleCorrection, RrlModel};
    pub use crate::resistance::{ResistanceField, propagate_resistance};
    pub use crate::slicing::{Slice, branch_connections, slice_surface};
    pub use crate::solver::{DwellSolver, LayerDwells, solve_layer};
    pub use crate::stream::{DwellCommand, Stream, StreamBuilder};
    pub use crate::structure::{SlicedGeometry, Structure};
}
