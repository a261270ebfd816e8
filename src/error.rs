//! `StreamError`: unified error type for beamstream public APIs.
//!
//! Every fallible operation in the library reports through this enum so that
//! callers get robust, non-panicking error handling end to end: slicing,
//! model construction, stream validation and stream file I/O.

use thiserror::Error;

/// Unified error type for beamstream operations.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A slice produced intersection data the branch-grouping pass cannot
    /// label consistently. This indicates a geometry or grouping bug, never
    /// something to recover from silently.
    #[error("degenerate slice {slice}: {detail}")]
    DegenerateSlice {
        /// Index of the offending z-level.
        slice: usize,
        /// What went wrong while grouping/resampling.
        detail: String,
    },

    /// The surface never intersects any slicing plane (e.g. zero-height or
    /// empty mesh).
    #[error("surface produced no non-empty cross sections")]
    EmptySurface,

    /// A layer index outside the sliced geometry was requested.
    #[error("layer {layer} out of range ({n_layers} layers)")]
    LayerOutOfRange {
        /// Requested layer.
        layer: usize,
        /// Number of available layers.
        n_layers: usize,
    },

    /// A stream coordinate falls outside the addressable pixel bounds.
    #[error("stream point ({x:.1}, {y:.1}) outside addressable pixels {bounds:?}")]
    PointOutOfBounds {
        /// Offending x coordinate in pixels.
        x: f64,
        /// Offending y coordinate in pixels.
        y: f64,
        /// Addressable pixel bounds.
        bounds: [u32; 2],
    },

    /// A dwell command exceeds the device's maximum dwell time.
    #[error("dwell time {dwell} exceeds device maximum {max}")]
    DwellTooLong {
        /// Offending dwell time (working units).
        dwell: f64,
        /// Device maximum (working units).
        max: f64,
    },

    /// A stream file could not be parsed.
    #[error("malformed stream file at line {line}: {detail}")]
    MalformedStreamFile {
        /// 1-based line number.
        line: usize,
        /// Parse failure description.
        detail: String,
    },

    /// Underlying I/O failure while reading or writing a stream file.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}
