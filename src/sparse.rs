//! Sparse symmetric matrices for per-layer proximity contributions.
//!
//! [`CooMatrix`] is the build/transform representation the growth models
//! fill and rescale; [`CsrMatrix`] is the frozen, deterministic-order view
//! the solver iterates. The matrices here are structurally symmetric with
//! an explicit diagonal (self-pairs at distance zero), which is what the
//! solver's upper bound reads.

use itertools::izip;

/// Square sparse matrix in coordinate form.
#[derive(Debug, Clone)]
pub struct CooMatrix {
    n: usize,
    rows: Vec<u32>,
    cols: Vec<u32>,
    vals: Vec<f64>,
}

impl CooMatrix {
    /// Empty `n x n` matrix with reserved entry capacity.
    pub fn with_capacity(n: usize, cap: usize) -> Self {
        Self {
            n,
            rows: Vec::with_capacity(cap),
            cols: Vec::with_capacity(cap),
            vals: Vec::with_capacity(cap),
        }
    }

    /// Appends an explicit entry. Duplicate coordinates are not merged;
    /// the builders here never produce them.
    #[inline]
    pub fn push(&mut self, row: usize, col: usize, val: f64) {
        debug_assert!(row < self.n && col < self.n);
        self.rows.push(row as u32);
        self.cols.push(col as u32);
        self.vals.push(val);
    }

    /// Matrix dimension.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Row index per stored entry.
    #[inline]
    pub fn rows(&self) -> &[u32] {
        &self.rows
    }

    /// Stored values, mutable; used by the models to map distances into
    /// contributions in place.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.vals
    }

    /// Rewrites every stored entry as `f(row, col, val)`.
    pub fn map_entries(&mut self, mut f: impl FnMut(usize, usize, f64) -> f64) {
        for (&r, &c, v) in izip!(&self.rows, &self.cols, &mut self.vals) {
            *v = f(r as usize, c as usize, *v);
        }
    }

    /// Multiplies every stored value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.vals {
            *v *= factor;
        }
    }

    /// Dense diagonal (zeros where no diagonal entry is stored).
    pub fn diagonal(&self) -> Vec<f64> {
        let mut diag = vec![0.0; self.n];
        for (&r, &c, &v) in izip!(&self.rows, &self.cols, &self.vals) {
            if r == c {
                diag[r as usize] = v;
            }
        }
        diag
    }

    /// Freezes into CSR form with rows sorted and columns ascending within
    /// each row.
    pub fn to_csr(&self) -> CsrMatrix {
        let mut offsets = vec![0usize; self.n + 1];
        for &r in &self.rows {
            offsets[r as usize + 1] += 1;
        }
        for i in 0..self.n {
            offsets[i + 1] += offsets[i];
        }
        let nnz = self.vals.len();
        let mut indices = vec![0u32; nnz];
        let mut vals = vec![0.0; nnz];
        let mut cursor = offsets.clone();
        for (&r, &c, &v) in izip!(&self.rows, &self.cols, &self.vals) {
            let at = cursor[r as usize];
            indices[at] = c;
            vals[at] = v;
            cursor[r as usize] += 1;
        }
        // sort columns within each row for deterministic traversal
        for i in 0..self.n {
            let (lo, hi) = (offsets[i], offsets[i + 1]);
            let mut entries: Vec<(u32, f64)> = indices[lo..hi]
                .iter()
                .copied()
                .zip(vals[lo..hi].iter().copied())
                .collect();
            entries.sort_by_key(|&(c, _)| c);
            for (k, (c, v)) in entries.into_iter().enumerate() {
                indices[lo + k] = c;
                vals[lo + k] = v;
            }
        }
        CsrMatrix {
            n: self.n,
            offsets,
            indices,
            vals,
        }
    }
}

/// Immutable CSR matrix; row slices are contiguous and column-sorted.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n: usize,
    offsets: Vec<usize>,
    indices: Vec<u32>,
    vals: Vec<f64>,
}

impl CsrMatrix {
    /// Matrix dimension.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Column indices and values of row `i`.
    #[inline]
    pub fn row(&self, i: usize) -> (&[u32], &[f64]) {
        let (lo, hi) = (self.offsets[i], self.offsets[i + 1]);
        (&self.indices[lo..hi], &self.vals[lo..hi])
    }

    /// Dense diagonal.
    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n)
            .map(|i| {
                let (cols, vals) = self.row(i);
                cols.iter()
                    .position(|&c| c as usize == i)
                    .map_or(0.0, |k| vals[k])
            })
            .collect()
    }

    /// Dense matrix-vector product `y = A x`.
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.n);
        (0..self.n)
            .map(|i| {
                let (cols, vals) = self.row(i);
                cols.iter()
                    .zip(vals)
                    .map(|(&c, &v)| v * x[c as usize])
                    .sum()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> CooMatrix {
        // [2 1 0]
        // [1 2 0]
        // [0 0 3]
        let mut m = CooMatrix::with_capacity(3, 5);
        m.push(0, 0, 2.0);
        m.push(1, 0, 1.0);
        m.push(0, 1, 1.0);
        m.push(1, 1, 2.0);
        m.push(2, 2, 3.0);
        m
    }

    #[test]
    fn diagonal_and_scale() {
        let mut m = sample();
        assert_eq!(m.diagonal(), vec![2.0, 2.0, 3.0]);
        m.scale(0.5);
        assert_eq!(m.diagonal(), vec![1.0, 1.0, 1.5]);
    }

    #[test]
    fn csr_rows_are_sorted() {
        let csr = sample().to_csr();
        let (cols, vals) = csr.row(0);
        assert_eq!(cols, &[0, 1]);
        assert_eq!(vals, &[2.0, 1.0]);
        let (cols, _) = csr.row(2);
        assert_eq!(cols, &[2]);
    }

    #[test]
    fn matvec_matches_dense() {
        let csr = sample().to_csr();
        let y = csr.matvec(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(y[0], 4.0);
        assert_relative_eq!(y[1], 5.0);
        assert_relative_eq!(y[2], 9.0);
    }
}
