//! Resistance propagator: bottom-up resistor-network evaluation over the
//! branch-connectivity graph.
//!
//! Models the electrical/thermal path from each branch down to the
//! substrate. Substrate branches are fixed at 0; every branch above adds
//! one resistor per connection (proportional to the centroid separation,
//! normalized by the branch length) in series with the branch below, and
//! connections combine in parallel. A branch with no connections is a
//! floating segment and resolves to 0 by convention.

use crate::structure::SlicedGeometry;

/// Resistance of every point, layer by layer, plus the per-branch values
/// the propagation runs on.
#[derive(Debug, Clone)]
pub struct ResistanceField {
    /// One scalar per point per layer, parallel to the slice point arrays.
    pub per_point: Vec<Vec<f64>>,
    /// One scalar per branch per layer.
    pub per_branch: Vec<Vec<f64>>,
}

impl ResistanceField {
    /// Resistance values for one layer's points.
    #[inline]
    pub fn layer(&self, layer: usize) -> &[f64] {
        &self.per_point[layer]
    }
}

/// Propagates resistance bottom-up through the branch graph.
///
/// `single_pixel_width` is the width of a single-pixel line; it scales the
/// per-connection increment `sep / (branch_length + width)`.
pub fn propagate_resistance(geo: &SlicedGeometry, single_pixel_width: f64) -> ResistanceField {
    let n = geo.n_layers();
    let mut per_point: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut per_branch: Vec<Vec<f64>> = Vec::with_capacity(n);

    for (i, slice) in geo.slices.iter().enumerate() {
        let n_branches = slice.n_branches();
        if i == 0 {
            per_branch.push(vec![0.0; n_branches]);
            per_point.push(vec![0.0; slice.points.len()]);
            continue;
        }

        let below = &geo.slices[i - 1];
        let dz = slice.z - below.z;
        let mut branch_res = vec![0.0; n_branches];
        for (j, res) in branch_res.iter_mut().enumerate() {
            let Some(centre) = slice.branch_centroid(j as u32) else {
                continue; // degenerate branch, stays floating at 0
            };
            let brlen = slice.branch_lengths[j];
            let mut r_inv = 0.0;
            for &c in &geo.connections[i][j] {
                let Some(centre_below) = below.branch_centroid(c as u32) else {
                    continue;
                };
                let sep = (nalgebra::distance_squared(&centre, &centre_below) + dz * dz).sqrt();
                let connection_resistance = per_branch[i - 1][c]
                    + single_pixel_width * sep / (brlen + single_pixel_width);
                r_inv += 1.0 / connection_resistance;
            }
            *res = if r_inv > 0.0 { 1.0 / r_inv } else { 0.0 };
        }

        let point_res = slice
            .branch_ids
            .iter()
            .map(|&b| branch_res[b as usize])
            .collect();
        per_branch.push(branch_res);
        per_point.push(point_res);
    }

    ResistanceField {
        per_point,
        per_branch,
    }
}
