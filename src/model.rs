//! Proximity growth models: how a dwell at one point grows material at its
//! neighbors.
//!
//! Every model turns a layer's pairwise distance matrix (restricted to
//! pairs within the model's neighbor threshold) into a same-shaped
//! contribution matrix. The base reaction-rate-limited model is a Gaussian
//! of the distance; further physics (resistive heating, height-dependent
//! defocus, directional growth bias) composes by wrapping a base model in
//! a decorator that rescales the wrapped matrix. Decorators forward the
//! neighbor threshold unless they deliberately override it.
//!
//! The diagonal of every matrix is the model's zero-distance value: the
//! unconstrained per-point growth rate the solver bounds dwell times
//! against. For [`RrlModel`] it is exactly `gr`, independent of sigma.

use crate::config::ModelConfig;
use crate::error::StreamError;
use crate::geometry::PointGrid;
use crate::resistance::{ResistanceField, propagate_resistance};
use crate::slicing::Slice;
use crate::sparse::CooMatrix;
use crate::structure::SlicedGeometry;

/// A proximity growth model over sliced geometry.
pub trait GrowthModel: Sync {
    /// Distance under which two points of a layer influence each other.
    fn nb_threshold(&self) -> f64;

    /// Sparse symmetric contribution matrix for `layer`, explicit diagonal
    /// included.
    ///
    /// # Errors
    /// [`StreamError::LayerOutOfRange`] if `layer` is not a valid index
    /// into `geo`.
    fn proximity_matrix(
        &self,
        geo: &SlicedGeometry,
        layer: usize,
    ) -> Result<CooMatrix, StreamError>;
}

/// Sparse pairwise distance matrix of one slice, restricted to pairs within
/// `threshold` (self-pairs at distance zero included).
pub fn distance_matrix(slice: &Slice, threshold: f64) -> CooMatrix {
    let n = slice.points.len();
    let mut m = CooMatrix::with_capacity(n, n * 4);
    if n == 0 {
        return m;
    }
    let grid = PointGrid::build(&slice.points, threshold.max(f64::MIN_POSITIVE));
    grid.for_pairs_within(threshold, |i, j, d| m.push(i, j, d));
    m
}

fn check_layer(geo: &SlicedGeometry, layer: usize) -> Result<&Slice, StreamError> {
    geo.slices.get(layer).ok_or(StreamError::LayerOutOfRange {
        layer,
        n_layers: geo.n_layers(),
    })
}

/// Reaction-rate-limited model: Gaussian proximity with growth rate `gr`
/// and deposit width `sigma`.
#[derive(Debug, Clone)]
pub struct RrlModel {
    gr: f64,
    sigma: f64,
}

impl RrlModel {
    /// New model from growth rate and deposit width.
    pub fn new(gr: f64, sigma: f64) -> Self {
        Self { gr, sigma }
    }

    /// New model from a config value bag.
    pub fn from_config(cfg: &ModelConfig) -> Self {
        Self::new(cfg.growth_rate, cfg.sigma)
    }

    #[inline]
    fn gaussian(&self, d: f64) -> f64 {
        self.gr * (-(d * d) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

impl GrowthModel for RrlModel {
    fn nb_threshold(&self) -> f64 {
        3.0 * self.sigma
    }

    fn proximity_matrix(
        &self,
        geo: &SlicedGeometry,
        layer: usize,
    ) -> Result<CooMatrix, StreamError> {
        let slice = check_layer(geo, layer)?;
        let mut m = distance_matrix(slice, self.nb_threshold());
        for v in m.values_mut() {
            *v = self.gaussian(*v);
        }
        Ok(m)
    }
}

/// Desorption-dominated model: the RRL Gaussian damped by `exp(-k * R)`
/// with `R` the propagated resistance of the contributing point's branch.
///
/// The resistance field is computed once at construction from the same
/// sliced geometry the matrices are later requested for.
#[derive(Debug, Clone)]
pub struct DdModel {
    gr: f64,
    k: f64,
    sigma: f64,
    resistance: ResistanceField,
}

impl DdModel {
    /// Builds the model and propagates the resistance field for `geo`.
    pub fn new(geo: &SlicedGeometry, gr: f64, k: f64, sigma: f64, single_pixel_width: f64) -> Self {
        Self {
            gr,
            k,
            sigma,
            resistance: propagate_resistance(geo, single_pixel_width),
        }
    }

    /// Builds the model from a config value bag.
    pub fn from_config(geo: &SlicedGeometry, cfg: &ModelConfig) -> Self {
        Self::new(geo, cfg.growth_rate, cfg.k, cfg.sigma, cfg.single_pixel_width)
    }

    /// The propagated resistance field.
    pub fn resistance(&self) -> &ResistanceField {
        &self.resistance
    }
}

impl GrowthModel for DdModel {
    fn nb_threshold(&self) -> f64 {
        3.0 * self.sigma
    }

    fn proximity_matrix(
        &self,
        geo: &SlicedGeometry,
        layer: usize,
    ) -> Result<CooMatrix, StreamError> {
        let slice = check_layer(geo, layer)?;
        let mut m = distance_matrix(slice, self.nb_threshold());
        let res = self.resistance.layer(layer);
        let two_sigma_sq = 2.0 * self.sigma * self.sigma;
        m.map_entries(|row, _col, d| {
            self.gr * (-self.k * res[row]).exp() * (-(d * d) / two_sigma_sq).exp()
        });
        Ok(m)
    }
}

/// Decorator dividing the wrapped contribution by `2^(z / doubling_length)`:
/// dwell times double over every `doubling_length` of structure height.
/// Useful where disconnected components break the resistance model.
#[derive(Debug, Clone)]
pub struct HeightCorrection<M> {
    base: M,
    doubling_length: f64,
}

impl<M: GrowthModel> HeightCorrection<M> {
    /// Wraps `base` with the given doubling length.
    pub fn new(base: M, doubling_length: f64) -> Self {
        Self {
            base,
            doubling_length,
        }
    }
}

impl<M: GrowthModel> GrowthModel for HeightCorrection<M> {
    fn nb_threshold(&self) -> f64 {
        self.base.nb_threshold()
    }

    fn proximity_matrix(
        &self,
        geo: &SlicedGeometry,
        layer: usize,
    ) -> Result<CooMatrix, StreamError> {
        let z = check_layer(geo, layer)?.z;
        let mut m = self.base.proximity_matrix(geo, layer)?;
        m.scale(2.0f64.powf(z / self.doubling_length).recip());
        Ok(m)
    }
}

/// Decorator multiplying the wrapped contribution by
/// `1 + c * cos(phi - phi0)`, where `phi` is the layer's growth-direction
/// angle estimated from the displacement between layer centroids
/// `smoothing_layers` apart. Layers without enough history below them get
/// angle 0.
#[derive(Debug, Clone)]
pub struct PhiAngleCorrection<M> {
    base: M,
    phi0: f64,
    correction_factor: f64,
    layer_angles: Vec<f64>,
}

impl<M: GrowthModel> PhiAngleCorrection<M> {
    /// Wraps `base`, precomputing the per-layer growth angles from `geo`.
    pub fn new(base: M, geo: &SlicedGeometry, phi0: f64, correction_factor: f64, smoothing_layers: usize) -> Self {
        Self {
            base,
            phi0,
            correction_factor,
            layer_angles: layer_angles(geo, smoothing_layers),
        }
    }

    /// The correction factor applied at growth angle `phi`.
    #[inline]
    pub fn angle_correction(&self, phi: f64) -> f64 {
        1.0 + self.correction_factor * (phi - self.phi0).cos()
    }

    /// Estimated growth angle per layer.
    pub fn layer_angles(&self) -> &[f64] {
        &self.layer_angles
    }
}

/// In-plane growth direction per layer from smoothed centroid displacement.
fn layer_angles(geo: &SlicedGeometry, smoothing_layers: usize) -> Vec<f64> {
    let centres = geo.layer_centroids();
    let n = centres.len();
    let mut angles = vec![0.0; n];
    if smoothing_layers == 0 {
        return angles;
    }
    for i in smoothing_layers..n {
        let v = centres[i] - centres[i - smoothing_layers];
        angles[i] = v.y.atan2(v.x);
    }
    angles
}

impl<M: GrowthModel> GrowthModel for PhiAngleCorrection<M> {
    fn nb_threshold(&self) -> f64 {
        self.base.nb_threshold()
    }

    fn proximity_matrix(
        &self,
        geo: &SlicedGeometry,
        layer: usize,
    ) -> Result<CooMatrix, StreamError> {
        check_layer(geo, layer)?;
        let mut m = self.base.proximity_matrix(geo, layer)?;
        m.scale(self.angle_correction(self.layer_angles[layer]));
        Ok(m)
    }
}
