//! Stream builder: turns solved dwells into a device-ready command stream.
//!
//! Assembly steps, in order:
//! 1. drop dwells at or below the cutoff time (sub-resolution);
//! 2. split every remaining dwell `t` into `N = ceil(t / max_dwell)` equal
//!    visits of `t / N`, preserving total exposure under the per-visit cap;
//! 3. interleave visits breadth-first: within a layer, pass k carries the
//!    k-th visit of every point that still has one, spreading repeated
//!    exposure in time; under serpentine ordering every odd pass is
//!    reversed to minimize beam travel, serial keeps all passes forward;
//! 4. scale in-plane coordinates to device pixels;
//! 5. optionally recentre the bounding box on a target pixel position.

use crate::config::{ScanOrder, StreamConfig};
use crate::solver::LayerDwells;
use crate::stream::{DwellCommand, Stream};

/// Builds an exposure [`Stream`] from per-layer solved dwells.
#[derive(Debug)]
pub struct StreamBuilder {
    layers: Vec<LayerDwells>,
    config: StreamConfig,
}

impl StreamBuilder {
    /// New builder over solved layers.
    pub fn new(layers: Vec<LayerDwells>, config: StreamConfig) -> Self {
        Self { layers, config }
    }

    /// Assembles the stream without recentring.
    pub fn build(&self) -> Stream {
        let ppu = self.config.pixels_per_unit();
        let mut commands = Vec::new();
        let mut pass_parity = 0usize;
        for layer in &self.layers {
            for mut pass in layer_passes(layer, self.config.cutoff, self.config.max_dwell) {
                if self.config.scan_order == ScanOrder::Serpentine && pass_parity % 2 == 1 {
                    pass.reverse();
                }
                commands.extend(pass.into_iter().map(|c| DwellCommand {
                    dwell: c.dwell,
                    x: c.x * ppu,
                    y: c.y * ppu,
                }));
                pass_parity += 1;
            }
        }
        Stream::new(
            commands,
            self.config.addressable_pixels,
            self.config.max_dwell,
        )
    }

    /// Assembles the stream and recentres it on `target` (screen centre
    /// when `None`). Logs a warning if the result still falls outside the
    /// addressable area; the caller sees the failure at validation time.
    pub fn build_centred(&self, target: Option<[f64; 2]>) -> Stream {
        let mut stream = self.build();
        stream.recentre(target);
        if !stream.is_valid() {
            log::warn!("stream outside screen limits after recentring; structure may be too large");
        }
        stream
    }
}

/// Splits a dwell into equal visits respecting the per-visit cap.
///
/// Returns `N = ceil(t / max_dwell)` visits of exactly `t / N` each; their
/// sum reproduces `t` with no time lost.
pub fn split_dwell(t: f64, max_dwell: f64) -> Vec<f64> {
    let n = (t / max_dwell).ceil().max(1.0) as usize;
    vec![t / n as f64; n]
}

/// Breadth-first visit passes of one layer, in working units.
fn layer_passes(layer: &LayerDwells, cutoff: f64, max_dwell: f64) -> Vec<Vec<DwellCommand>> {
    // surviving points with their visit plan
    let survivors: Vec<(f64, f64, Vec<f64>)> = layer
        .times
        .iter()
        .zip(&layer.points)
        .filter(|&(&t, _)| t > cutoff)
        .map(|(&t, p)| (p.x, p.y, split_dwell(t, max_dwell)))
        .collect();
    let max_visits = survivors
        .iter()
        .map(|(_, _, visits)| visits.len())
        .max()
        .unwrap_or(0);

    (0..max_visits)
        .map(|k| {
            survivors
                .iter()
                .filter_map(|&(x, y, ref visits)| {
                    visits.get(k).map(|&dwell| DwellCommand { dwell, x, y })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn layer(z: f64, entries: &[(f64, f64, f64)]) -> LayerDwells {
        LayerDwells {
            z,
            points: entries.iter().map(|&(x, y, _)| Point2::new(x, y)).collect(),
            times: entries.iter().map(|&(_, _, t)| t).collect(),
        }
    }

    fn config(scan_order: ScanOrder) -> StreamConfig {
        StreamConfig {
            addressable_pixels: [1000, 1000],
            max_dwell: 5.0,
            cutoff: 0.01,
            screen_width: 1000.0, // ppu = 1 for easy assertions
            scan_order,
        }
    }

    #[test]
    fn split_respects_cap_and_preserves_total() {
        let visits = split_dwell(12.0, 5.0);
        assert_eq!(visits.len(), 3);
        for &v in &visits {
            assert_relative_eq!(v, 4.0);
            assert!(v <= 5.0);
        }
        assert_relative_eq!(visits.iter().sum::<f64>(), 12.0);
    }

    #[test]
    fn split_under_cap_is_single_visit() {
        assert_eq!(split_dwell(3.0, 5.0), vec![3.0]);
    }

    #[test]
    fn cutoff_drops_insignificant_dwells() {
        let b = StreamBuilder::new(
            vec![layer(0.0, &[(1.0, 1.0, 0.005), (2.0, 2.0, 1.0)])],
            config(ScanOrder::Serial),
        );
        let s = b.build();
        assert_eq!(s.len(), 1);
        assert_relative_eq!(s.dwells()[0].dwell, 1.0);
    }

    #[test]
    fn breadth_first_interleaving() {
        // point A needs 2 visits, point B needs 1: order is A1 B1 A2
        let b = StreamBuilder::new(
            vec![layer(0.0, &[(1.0, 0.0, 8.0), (2.0, 0.0, 2.0)])],
            config(ScanOrder::Serial),
        );
        let s = b.build();
        let xs: Vec<f64> = s.dwells().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 1.0]);
        let total: f64 = s.total_time();
        assert_relative_eq!(total, 10.0);
    }

    #[test]
    fn serpentine_reverses_odd_passes() {
        // every point needs 2 visits; the second pass runs backwards
        let b = StreamBuilder::new(
            vec![layer(0.0, &[(1.0, 0.0, 8.0), (2.0, 0.0, 8.0), (3.0, 0.0, 8.0)])],
            config(ScanOrder::Serpentine),
        );
        let xs: Vec<f64> = b.build().dwells().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn serial_keeps_all_passes_forward() {
        let b = StreamBuilder::new(
            vec![layer(0.0, &[(1.0, 0.0, 8.0), (2.0, 0.0, 8.0)])],
            config(ScanOrder::Serial),
        );
        let xs: Vec<f64> = b.build().dwells().iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn serpentine_parity_continues_across_layers() {
        let b = StreamBuilder::new(
            vec![
                layer(0.0, &[(1.0, 0.0, 1.0), (2.0, 0.0, 1.0)]),
                layer(0.5, &[(1.0, 0.0, 1.0), (2.0, 0.0, 1.0)]),
            ],
            config(ScanOrder::Serpentine),
        );
        let xs: Vec<f64> = b.build().dwells().iter().map(|c| c.x).collect();
        // layer passes are global: forward, then the next layer reversed
        assert_eq!(xs, vec![1.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn coordinates_scale_to_pixels() {
        let mut cfg = config(ScanOrder::Serial);
        cfg.screen_width = 100.0; // ppu = 10
        let b = StreamBuilder::new(vec![layer(0.0, &[(3.0, 4.0, 1.0)])], cfg);
        let s = b.build();
        assert_relative_eq!(s.dwells()[0].x, 30.0);
        assert_relative_eq!(s.dwells()[0].y, 40.0);
    }

    #[test]
    fn split_visits_never_exceed_cap_in_stream() {
        let b = StreamBuilder::new(
            vec![layer(0.0, &[(1.0, 1.0, 23.0)])],
            config(ScanOrder::Serial),
        );
        let s = b.build();
        assert_eq!(s.len(), 5);
        for c in s.dwells() {
            assert!(c.dwell <= 5.0);
        }
        assert_relative_eq!(s.total_time(), 23.0);
        assert!(s.is_valid());
    }
}
