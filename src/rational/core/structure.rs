//! Monomial structures — ordered exponent tuples for multivariate polynomials.
//!
//! Purpose
//! -------
//! Enumerate every monomial `x₁^e₁ ⋯ x_D^e_D` of total degree `≤ deg` in a
//! fixed, canonical order. Coefficient vectors throughout the crate are laid
//! out in this order, so the structure is the single source of truth for
//! "which coefficient multiplies which monomial".
//!
//! Key behaviors
//! -------------
//! - Ordering is degree-graded: all tuples of total degree 0, then 1, and so
//!   on. Within one total degree, tuples are ordered by descending exponent
//!   of the first coordinate, then recursively for the remaining
//!   coordinates. For `D = 2`, degree 2 this gives `00, 10, 01, 20, 11, 02`.
//! - The structure for degree `m` is a prefix of the structure for degree
//!   `m + 1` (nesting), so lower-degree coefficients keep their indices.
//! - [`num_coeffs_poly`] returns `C(D + deg, deg)`, the structure length.
//!
//! Invariants & assumptions
//! ------------------------
//! - `dim ≥ 1`; degree is a `usize`, so negative degrees cannot be expressed.
//! - Every tuple has exactly `dim` entries and the first tuple is all zeros
//!   (the constant term).
//!
//! Testing notes
//! -------------
//! - Unit tests cover counts against the binomial formula, the explicit
//!   `D = 2` ordering, nesting across degrees, and `degree_range`.
use crate::rational::errors::{RationalError, RationalResult};
use std::ops::Range;

/// Ordered list of exponent tuples for all monomials of total degree
/// `≤ degree` in `dim` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonomialStructure {
    dim: usize,
    degree: usize,
    exponents: Vec<Vec<usize>>,
}

impl MonomialStructure {
    /// Build the canonical structure for `(dim, degree)`.
    ///
    /// # Errors
    /// - [`RationalError::InvalidDimension`] if `dim == 0`.
    pub fn new(dim: usize, degree: usize) -> RationalResult<Self> {
        if dim == 0 {
            return Err(RationalError::InvalidDimension {
                dim,
                reason: "Monomial structures need at least one variable.",
            });
        }
        let mut exponents = Vec::with_capacity(num_coeffs_poly(dim, degree));
        for total in 0..=degree {
            push_compositions(dim, total, &mut Vec::with_capacity(dim), &mut exponents);
        }
        Ok(Self { dim, degree, exponents })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of monomials, `C(dim + degree, degree)`.
    pub fn len(&self) -> usize {
        self.exponents.len()
    }

    /// Always `false`: the constant monomial is present for every degree.
    pub fn is_empty(&self) -> bool {
        self.exponents.is_empty()
    }

    /// Exponent tuple of monomial `k`.
    ///
    /// # Panics
    /// - If `k >= self.len()`.
    pub fn exponents(&self, k: usize) -> &[usize] {
        &self.exponents[k]
    }

    /// Iterate over all exponent tuples in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.exponents.iter().map(Vec::as_slice)
    }

    /// Total degree of monomial `k`.
    pub fn total_degree(&self, k: usize) -> usize {
        self.exponents[k].iter().sum()
    }

    /// Index span of the monomials whose total degree equals `degree_k`.
    ///
    /// # Errors
    /// - [`RationalError::DegreeOutOfRange`] if `degree_k > self.degree()`.
    pub fn degree_range(&self, degree_k: usize) -> RationalResult<Range<usize>> {
        if degree_k > self.degree {
            return Err(RationalError::DegreeOutOfRange {
                degree: degree_k,
                max_degree: self.degree,
            });
        }
        let start = if degree_k == 0 { 0 } else { num_coeffs_poly(self.dim, degree_k - 1) };
        Ok(start..num_coeffs_poly(self.dim, degree_k))
    }
}

/// Convenience wrapper around [`MonomialStructure::new`].
pub fn generate_structure(dim: usize, degree: usize) -> RationalResult<MonomialStructure> {
    MonomialStructure::new(dim, degree)
}

/// Number of monomials of total degree `≤ degree` in `dim` variables,
/// `C(dim + degree, degree)`.
pub fn num_coeffs_poly(dim: usize, degree: usize) -> usize {
    // Running product stays integral: after step i it equals C(dim + i, i).
    (1..=degree).fold(1usize, |acc, i| acc * (dim + i) / i)
}

// ---- Helper Methods ----

/// Append all tuples of length `dim` summing to `total`, ordered by
/// descending leading exponent.
fn push_compositions(dim: usize, total: usize, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    if dim == 1 {
        let mut tuple = prefix.clone();
        tuple.push(total);
        out.push(tuple);
        return;
    }
    for lead in (0..=total).rev() {
        prefix.push(lead);
        push_compositions(dim - 1, total - lead, prefix, out);
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Test plan ----
    //
    // Scope
    // -----
    // - Structure length equals C(D + deg, deg) across a grid of (D, deg).
    // - Canonical ordering for D = 2 and D = 3.
    // - Nesting: degree m structure is a prefix of degree m + 1.
    // - Degree bounds and `degree_range` spans.
    // - Rejection of dim = 0.

    #[test]
    // Purpose
    // -------
    // Structure length matches the binomial count and every tuple respects
    // the degree bound.
    fn structure_len_matches_binomial_count() {
        for dim in 1..=4 {
            for degree in 0..=5 {
                let s = MonomialStructure::new(dim, degree).unwrap();
                assert_eq!(s.len(), num_coeffs_poly(dim, degree));
                assert!(s.iter().all(|e| e.len() == dim && e.iter().sum::<usize>() <= degree));
            }
        }
        assert_eq!(num_coeffs_poly(2, 2), 6);
        assert_eq!(num_coeffs_poly(3, 3), 20);
        assert_eq!(num_coeffs_poly(1, 4), 5);
    }

    #[test]
    // Purpose
    // -------
    // Two-dimensional degree-2 ordering follows the canonical rule.
    //
    // Expect
    // ------
    // - `00, 10, 01, 20, 11, 02`.
    fn two_dim_degree_two_ordering_is_canonical() {
        let s = generate_structure(2, 2).unwrap();
        let got: Vec<Vec<usize>> = s.iter().map(<[usize]>::to_vec).collect();
        let expected =
            vec![vec![0, 0], vec![1, 0], vec![0, 1], vec![2, 0], vec![1, 1], vec![0, 2]];
        assert_eq!(got, expected);
    }

    #[test]
    // Purpose
    // -------
    // Three-dimensional degree-1 and degree-2 blocks order by the leading
    // coordinate first, then recursively.
    fn three_dim_ordering_recurses_on_trailing_coordinates() {
        let s = generate_structure(3, 2).unwrap();
        assert_eq!(s.exponents(1), &[1, 0, 0]);
        assert_eq!(s.exponents(2), &[0, 1, 0]);
        assert_eq!(s.exponents(3), &[0, 0, 1]);
        let deg2: Vec<&[usize]> = (4..10).map(|k| s.exponents(k)).collect();
        assert_eq!(
            deg2,
            vec![&[2, 0, 0][..], &[1, 1, 0], &[1, 0, 1], &[0, 2, 0], &[0, 1, 1], &[0, 0, 2]]
        );
    }

    #[test]
    // Purpose
    // -------
    // Lower-degree structures are prefixes of higher-degree ones.
    fn structures_nest_across_degrees() {
        for dim in 1..=3 {
            for degree in 0..4 {
                let small = generate_structure(dim, degree).unwrap();
                let large = generate_structure(dim, degree + 1).unwrap();
                for k in 0..small.len() {
                    assert_eq!(small.exponents(k), large.exponents(k));
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // `degree_range` returns contiguous spans that tile the structure.
    fn degree_range_tiles_structure() {
        let s = generate_structure(2, 3).unwrap();
        assert_eq!(s.degree_range(0).unwrap(), 0..1);
        assert_eq!(s.degree_range(1).unwrap(), 1..3);
        assert_eq!(s.degree_range(2).unwrap(), 3..6);
        assert_eq!(s.degree_range(3).unwrap(), 6..10);
        for k in 0..=3 {
            for idx in s.degree_range(k).unwrap() {
                assert_eq!(s.total_degree(idx), k);
            }
        }
        assert!(matches!(
            s.degree_range(4),
            Err(RationalError::DegreeOutOfRange { degree: 4, max_degree: 3 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // A zero-dimensional structure is rejected.
    fn zero_dim_is_rejected() {
        assert!(matches!(
            MonomialStructure::new(0, 2),
            Err(RationalError::InvalidDimension { dim: 0, .. })
        ));
    }
}
