//! Bounded per-layer dwell solver.
//!
//! Each layer is an independent bounded least-squares problem: find dwell
//! times `t >= 0` minimizing `|| P t - h 1 ||` subject to
//! `t_i <= h / diag(P)_i`. The upper bound is exact: if nothing else
//! contributed, self-growth alone at rate `diag(P)_i` reaches the target
//! thickness `h` in exactly that time, so larger dwells are never needed.
//!
//! The solve is projected coordinate descent over the CSR columns with an
//! incrementally maintained residual (`P` is symmetric, so rows double as
//! columns). It runs to a fixed tolerance or sweep cap and always returns
//! its best bounded iterate; approximate convergence is not an error.
//!
//! Layers share no mutable state, so they fan out across the rayon pool
//! and merge by layer index, making the result independent of scheduling.

use nalgebra::Point2;
use rayon::prelude::*;

use crate::error::StreamError;
use crate::model::GrowthModel;
use crate::sparse::CsrMatrix;
use crate::structure::SlicedGeometry;

/// Default relative tolerance on the largest per-sweep dwell update.
const DEFAULT_TOL: f64 = 1e-3;

/// Default cap on coordinate-descent sweeps per layer.
const DEFAULT_MAX_SWEEPS: usize = 200;

/// Solved dwell times of one layer, parallel to the layer's point order.
#[derive(Debug, Clone)]
pub struct LayerDwells {
    /// Height of the layer.
    pub z: f64,
    /// In-plane point positions (working units).
    pub points: Vec<Point2<f64>>,
    /// Non-negative dwell time per point (ms).
    pub times: Vec<f64>,
}

/// Drives the per-layer solves for one model over one sliced geometry.
#[derive(Debug)]
pub struct DwellSolver<'a, M> {
    model: &'a M,
    geo: &'a SlicedGeometry,
    tol: f64,
    max_sweeps: usize,
}

impl<'a, M: GrowthModel> DwellSolver<'a, M> {
    /// New solver with default tolerance and sweep cap.
    pub fn new(model: &'a M, geo: &'a SlicedGeometry) -> Self {
        Self {
            model,
            geo,
            tol: DEFAULT_TOL,
            max_sweeps: DEFAULT_MAX_SWEEPS,
        }
    }

    /// Overrides the convergence tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Solves every layer in parallel; results are merged by layer index.
    pub fn solve(&self) -> Result<Vec<LayerDwells>, StreamError> {
        let thicknesses = self.geo.layer_thicknesses();
        log::info!("solving dwells for {} layers", self.geo.n_layers());
        let layers: Result<Vec<LayerDwells>, StreamError> = (0..self.geo.n_layers())
            .into_par_iter()
            .map(|layer| {
                let prox = self.model.proximity_matrix(self.geo, layer)?.to_csr();
                let slice = &self.geo.slices[layer];
                let times = solve_layer(&prox, thicknesses[layer], self.tol, self.max_sweeps);
                Ok(LayerDwells {
                    z: slice.z,
                    points: slice.points.clone(),
                    times,
                })
            })
            .collect();
        layers
    }
}

/// Total exposure time (ms) of a solved dwell set.
pub fn total_time(layers: &[LayerDwells]) -> f64 {
    layers.iter().map(|l| l.times.iter().sum::<f64>()).sum()
}

/// Flattens solved layers into `[t, x, y, z]` rows, bottom to top, keeping
/// each layer's point order.
pub fn flatten_dwells(layers: &[LayerDwells]) -> Vec<[f64; 4]> {
    layers
        .iter()
        .flat_map(|l| {
            l.times
                .iter()
                .zip(&l.points)
                .map(|(&t, p)| [t, p.x, p.y, l.z])
        })
        .collect()
}

/// Solves one layer: `min || P t - h 1 ||` with `0 <= t <= h / diag(P)`.
///
/// Returns the best bounded iterate after convergence or `max_sweeps`
/// sweeps, whichever comes first. Points whose column is entirely zero
/// keep a dwell of zero.
pub fn solve_layer(prox: &CsrMatrix, thickness: f64, tol: f64, max_sweeps: usize) -> Vec<f64> {
    let n = prox.n();
    if n == 0 {
        return Vec::new();
    }
    let diag = prox.diagonal();
    let upper: Vec<f64> = diag
        .iter()
        .map(|&d| if d > 0.0 { thickness / d } else { 0.0 })
        .collect();
    let col_sq: Vec<f64> = (0..n)
        .map(|i| {
            let (_, vals) = prox.row(i);
            vals.iter().map(|v| v * v).sum()
        })
        .collect();

    let mut t = vec![0.0; n];
    // residual r = P t - h 1
    let mut r = vec![-thickness; n];
    for _ in 0..max_sweeps {
        let mut max_step = 0.0f64;
        for i in 0..n {
            if col_sq[i] == 0.0 {
                continue;
            }
            let (cols, vals) = prox.row(i);
            let g: f64 = cols
                .iter()
                .zip(vals)
                .map(|(&c, &v)| v * r[c as usize])
                .sum();
            let proposed = (t[i] - g / col_sq[i]).clamp(0.0, upper[i]);
            let step = proposed - t[i];
            if step != 0.0 {
                for (&c, &v) in cols.iter().zip(vals) {
                    r[c as usize] += v * step;
                }
                t[i] = proposed;
                max_step = max_step.max(step.abs());
            }
        }
        if max_step <= tol * thickness {
            break;
        }
    }
    t
}
