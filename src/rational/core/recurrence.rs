//! Monomial evaluation — values, batched design matrices, gradients, cache.
//!
//! Purpose
//! -------
//! Evaluate every monomial of a [`MonomialStructure`] at a point, at many
//! points (a design matrix with one row per point), and differentiate each
//! monomial with respect to each coordinate. These are the hot paths of both
//! fitting (design matrices for training and constraint points) and
//! certification (`q(x)` and `∇q(x)` inside local searches).
//!
//! Key behaviors
//! -------------
//! - [`evaluate`] builds one power table per coordinate (`1, x, x², …` by
//!   repeated multiplication) and forms each monomial as a product of table
//!   entries. No `powf`/`powi` is used; the one-dimensional case is a single
//!   power ladder.
//! - [`evaluate_many`] maps [`evaluate`] over rows, in parallel with `rayon`
//!   once the design matrix is large enough.
//! - [`evaluate_gradient`] returns a `[dim × len]` matrix whose entry
//!   `(c, k)` is `jac[c] · e_c · x_c^(e_c − 1) · ∏_{d≠c} x_d^{e_d}`. Entries
//!   with `e_c = 0` are exact zeros.
//! - [`RecurrenceCache`] memoizes design matrices keyed by a fingerprint of
//!   the point set plus the structure `(dim, degree)`; a new point set
//!   invalidates every entry.
//!
//! Invariants & assumptions
//! ------------------------
//! - Point length equals `structure.dim()`; this is a programming error if
//!   violated and callers validate at the boundary (`TrainingSet`,
//!   `DomainBox`).
//! - `jacobian` passed to [`evaluate_gradient`] has length `dim`; pass ones
//!   for raw coordinates or the scaler factors `2 / (hi − lo)`.
//!
//! Performance
//! -----------
//! - `evaluate` is `O(dim · degree + len · dim)`.
//! - The cache is owned by one SIP run; it is not shared across threads.
use crate::rational::core::structure::MonomialStructure;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use std::{
    collections::HashMap,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

/// Minimum number of design-matrix entries before rows are evaluated in
/// parallel.
pub const PARALLEL_EVAL_THRESHOLD: usize = 1 << 14;

/// Evaluate all monomials of `structure` at `point`.
pub fn evaluate(point: ArrayView1<f64>, structure: &MonomialStructure) -> Array1<f64> {
    let degree = structure.degree();
    if structure.dim() == 1 {
        let x = point[0];
        let mut out = Array1::zeros(structure.len());
        let mut acc = 1.0;
        for k in 0..=degree {
            out[k] = acc;
            acc *= x;
        }
        return out;
    }
    let powers = power_table(point, degree);
    structure
        .iter()
        .map(|e| e.iter().enumerate().fold(1.0, |acc, (d, &ed)| acc * powers[d][ed]))
        .collect()
}

/// Evaluate all monomials at every row of `points`.
///
/// Returns an `[n_points × structure.len()]` design matrix.
pub fn evaluate_many(points: ArrayView2<f64>, structure: &MonomialStructure) -> Array2<f64> {
    let (rows, cols) = (points.nrows(), structure.len());
    let mut out = Array2::zeros((rows, cols));
    if rows * cols >= PARALLEL_EVAL_THRESHOLD {
        let evaluated: Vec<Array1<f64>> =
            (0..rows).into_par_iter().map(|i| evaluate(points.row(i), structure)).collect();
        for (i, row) in evaluated.into_iter().enumerate() {
            out.row_mut(i).assign(&row);
        }
    } else {
        for (i, point) in points.outer_iter().enumerate() {
            out.row_mut(i).assign(&evaluate(point, structure));
        }
    }
    out
}

/// Partial derivatives of every monomial with respect to every coordinate.
///
/// Parameters
/// ----------
/// - `point`: evaluation point, length `dim`.
/// - `structure`: monomial structure.
/// - `jacobian`: per-coordinate chain-rule factor, length `dim`.
///
/// Returns
/// -------
/// `Array2<f64>` of shape `[dim × structure.len()]`.
pub fn evaluate_gradient(
    point: ArrayView1<f64>, structure: &MonomialStructure, jacobian: ArrayView1<f64>,
) -> Array2<f64> {
    let dim = structure.dim();
    let powers = power_table(point, structure.degree());
    let mut out = Array2::zeros((dim, structure.len()));
    for (k, e) in structure.iter().enumerate() {
        for c in 0..dim {
            if e[c] == 0 {
                continue;
            }
            let mut term = jacobian[c] * e[c] as f64 * powers[c][e[c] - 1];
            for (d, &ed) in e.iter().enumerate() {
                if d != c {
                    term *= powers[d][ed];
                }
            }
            out[[c, k]] = term;
        }
    }
    out
}

/// Hash of the shape and raw bit patterns of a point set.
pub fn fingerprint(points: ArrayView2<f64>) -> u64 {
    let mut hasher = DefaultHasher::new();
    points.shape().hash(&mut hasher);
    for v in points.iter() {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Design-matrix cache keyed by (point-set fingerprint, structure dim/degree).
///
/// Owned by a single SIP run. Requesting a design matrix for a different
/// point set drops every cached entry before computing the new one.
#[derive(Debug, Clone, Default)]
pub struct RecurrenceCache {
    fingerprint: Option<u64>,
    entries: HashMap<(usize, usize), Array2<f64>>,
    hits: usize,
    misses: usize,
}

impl RecurrenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Design matrix of `structure` at `points`, computed on first request.
    pub fn design(&mut self, points: ArrayView2<f64>, structure: &MonomialStructure) -> &Array2<f64> {
        let fp = fingerprint(points);
        if self.fingerprint != Some(fp) {
            self.entries.clear();
            self.fingerprint = Some(fp);
        }
        let key = (structure.dim(), structure.degree());
        if self.entries.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.entries.entry(key).or_insert_with(|| evaluate_many(points, structure))
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---- Helper Methods ----

/// `powers[d][e] = point[d]^e` for `e ∈ 0..=degree`.
fn power_table(point: ArrayView1<f64>, degree: usize) -> Vec<Vec<f64>> {
    point
        .iter()
        .map(|&x| {
            let mut ladder = Vec::with_capacity(degree + 1);
            let mut acc = 1.0;
            for _ in 0..=degree {
                ladder.push(acc);
                acc *= x;
            }
            ladder
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::core::structure::generate_structure;
    use finitediff::FiniteDiff;
    use ndarray::{array, Array};

    // ---- Test plan ----
    //
    // Scope
    // -----
    // - Multiplicativity: each monomial equals the product of coordinate
    //   powers, up to degree 6, within 1e-9.
    // - 1-D power ladder.
    // - Batched evaluation (serial and parallel paths) matches row-wise calls.
    // - Gradient against finitediff central differences, zero entries for
    //   absent coordinates, and jacobian scaling.
    // - Cache hit/miss accounting and invalidation.

    #[test]
    // Purpose
    // -------
    // Every monomial value equals the explicit product of powers.
    fn evaluate_is_multiplicative_up_to_degree_six() {
        let point = array![0.7, -1.3, 0.4];
        for degree in 0..=6 {
            let s = generate_structure(3, degree).unwrap();
            let vals = evaluate(point.view(), &s);
            for (k, e) in s.iter().enumerate() {
                let direct: f64 =
                    e.iter().enumerate().map(|(d, &ed)| point[d].powi(ed as i32)).product();
                assert!((vals[k] - direct).abs() < 1e-9, "degree {degree}, monomial {k}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // One-dimensional evaluation is the power ladder `1, x, x², …`.
    fn one_dim_evaluation_is_power_ladder() {
        let s = generate_structure(1, 4).unwrap();
        let vals = evaluate(array![2.0].view(), &s);
        assert_eq!(vals, array![1.0, 2.0, 4.0, 8.0, 16.0]);
    }

    #[test]
    // Purpose
    // -------
    // Batched evaluation matches per-row evaluation on both the serial and
    // the parallel paths.
    //
    // Given
    // -----
    // - A small 5-point set (serial) and a large 4000-point set with a
    //   degree-4 2-D structure (15 columns, parallel).
    fn evaluate_many_matches_rowwise_evaluation() {
        let s = generate_structure(2, 4).unwrap();
        for n in [5usize, 4000] {
            let points = Array::from_shape_fn((n, 2), |(i, j)| {
                ((i * 7 + j * 3) % 11) as f64 / 5.5 - 1.0
            });
            let design = evaluate_many(points.view(), &s);
            assert_eq!(design.dim(), (n, s.len()));
            for i in [0, n / 2, n - 1] {
                assert_eq!(design.row(i), evaluate(points.row(i), &s));
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Analytic monomial gradients agree with central differences.
    //
    // Given
    // -----
    // - A 2-D degree-4 structure, a point away from zero, unit jacobian.
    //
    // Expect
    // ------
    // - Each row `c` of the gradient matches `∂/∂x_c` of every monomial
    //   within 1e-5.
    fn evaluate_gradient_matches_central_differences() {
        let s = generate_structure(2, 4).unwrap();
        let point = array![0.3, -0.8];
        let grad = evaluate_gradient(point.view(), &s, array![1.0, 1.0].view());
        for k in 0..s.len() {
            let f = |x: &Array1<f64>| evaluate(x.view(), &s)[k];
            let fd = point.central_diff(&f);
            for c in 0..2 {
                assert!((grad[[c, k]] - fd[c]).abs() < 1e-5, "monomial {k}, coord {c}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Coordinates absent from a monomial give exact zeros even at x = 0,
    // and the jacobian scales each row.
    fn evaluate_gradient_zero_exponent_entries_are_exact_zero() {
        let s = generate_structure(2, 2).unwrap();
        let grad = evaluate_gradient(array![0.0, 0.0].view(), &s, array![2.0, 3.0].view());
        // d/dx of x is 1, scaled by jac[0] = 2; d/dy of y is 1, scaled by 3.
        assert_eq!(grad[[0, 1]], 2.0);
        assert_eq!(grad[[1, 2]], 3.0);
        assert_eq!(grad[[1, 1]], 0.0);
        assert_eq!(grad[[0, 0]], 0.0);
        assert!(grad.iter().all(|v| v.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // The cache reuses matrices for the same point set and drops them when
    // the point set changes.
    fn recurrence_cache_hits_and_clears_on_new_points() {
        let mut cache = RecurrenceCache::new();
        let s2 = generate_structure(1, 2).unwrap();
        let s3 = generate_structure(1, 3).unwrap();
        let pts = array![[0.1], [0.5]];

        let first = cache.design(pts.view(), &s2).clone();
        let _ = cache.design(pts.view(), &s3);
        let again = cache.design(pts.view(), &s2).clone();
        assert_eq!(first, again);
        assert_eq!((cache.hits(), cache.misses()), (1, 2));
        assert_eq!(cache.len(), 2);

        let other = array![[0.2], [0.5]];
        let _ = cache.design(other.view(), &s2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 3);
    }
}
