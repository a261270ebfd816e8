//! Configuration value bags for the deposition pipeline.
//!
//! The core never loads settings itself; callers construct these structs
//! once (by hand, or through `serde` from whatever format they like) and
//! pass them down explicitly. Defaults follow the reference microscope
//! setup. All lengths are in the caller's working length unit (nominally
//! nm) and all times in milliseconds.

use serde::{Deserialize, Serialize};

/// Layer scanning order for the assembled stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanOrder {
    /// Every pass keeps the forward point order.
    Serial,
    /// Alternate passes are reversed to minimize beam travel.
    Serpentine,
}

/// Growth-model parameters shared by the proximity model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Unconstrained growth rate `GR` (length per unit dwell).
    pub growth_rate: f64,
    /// Deposit width sigma; the neighbor threshold is `3 * sigma`.
    pub sigma: f64,
    /// Temperature scaling parameter for the resistance-aware model.
    pub k: f64,
    /// Width of a single-pixel line, used by the resistance propagation.
    pub single_pixel_width: f64,
    /// Length scale over which the height correction doubles dwell time.
    pub doubling_length: f64,
    /// Reference angle for the phi-angle correction, in radians.
    pub phi0: f64,
    /// Amplitude of the phi-angle correction.
    pub angle_correction: f64,
    /// How many layers apart the centroid displacement is taken when
    /// estimating the local growth direction.
    pub smoothing_layers: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            growth_rate: 0.1,
            sigma: 4.4,
            k: 1.0,
            single_pixel_width: 50.0,
            doubling_length: 500.0,
            phi0: 0.0,
            angle_correction: 0.0,
            smoothing_layers: 10,
        }
    }
}

/// Device-facing parameters for stream assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Addressable pixel bounds of the patterning engine, x then y.
    pub addressable_pixels: [u32; 2],
    /// Maximum dwell time per visit, in ms.
    pub max_dwell: f64,
    /// Dwells at or below this time are dropped (sub-resolution), in ms.
    pub cutoff: f64,
    /// Physical width covered by the addressable x range.
    pub screen_width: f64,
    /// Pass ordering of the assembled stream.
    pub scan_order: ScanOrder,
}

impl StreamConfig {
    /// Pixels per working length unit along x.
    #[inline]
    pub fn pixels_per_unit(&self) -> f64 {
        f64::from(self.addressable_pixels[0]) / self.screen_width
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            addressable_pixels: [65_536, 56_576],
            max_dwell: 5.0,
            cutoff: 0.01,
            screen_width: 6_400.0,
            scan_order: ScanOrder::Serpentine,
        }
    }
}
