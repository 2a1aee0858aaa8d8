//! Axis-aligned boxes and the affine scaler onto `[-1, 1]^D`.
//!
//! Purpose
//! -------
//! [`DomainBox`] is the region over which denominator positivity is
//! certified. It also doubles as the scaler used when a model rescales raw
//! coordinates before evaluating its monomials.
//!
//! Key behaviors
//! -------------
//! - Validated construction: equal lengths, at least one dimension, finite
//!   bounds, `lo < hi` per dimension.
//! - Geometry helpers: midpoint, widths, containment, corners, uniform
//!   sampling from a caller-owned RNG.
//! - Scaler: `to_unit(x) = 2 (x − lo) / (hi − lo) − 1` and the constant
//!   chain-rule factor `2 / (hi − lo)`.
//! - Corner enumeration is limited to [`MAX_CORNER_DIM`] dimensions.
//!
//! Conventions
//! -----------
//! - Sampling draws coordinates in dimension order from the supplied RNG, so
//!   a seeded RNG yields a reproducible sequence of points.
use crate::rational::errors::{RationalError, RationalResult};
use ndarray::{Array1, ArrayView1, Zip};
use rand::Rng;

/// Largest dimension for which [`DomainBox::corners`] enumerates `2^D`
/// points.
pub const MAX_CORNER_DIM: usize = 12;

/// Product of closed intervals `[lo_d, hi_d]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainBox {
    lo: Array1<f64>,
    hi: Array1<f64>,
}

impl DomainBox {
    /// Validated box from lower and upper bounds.
    ///
    /// # Errors
    /// - [`RationalError::InvalidDimension`] if the bounds are empty.
    /// - [`RationalError::PointDimMismatch`] if `lo` and `hi` differ in length.
    /// - [`RationalError::InvalidBounds`] for non-finite bounds or `lo ≥ hi`.
    pub fn new(lo: Array1<f64>, hi: Array1<f64>) -> RationalResult<Self> {
        if lo.is_empty() {
            return Err(RationalError::InvalidDimension {
                dim: 0,
                reason: "A box needs at least one dimension.",
            });
        }
        if lo.len() != hi.len() {
            return Err(RationalError::PointDimMismatch { expected: lo.len(), found: hi.len() });
        }
        for (index, (&l, &h)) in lo.iter().zip(hi.iter()).enumerate() {
            if !l.is_finite() || !h.is_finite() {
                return Err(RationalError::InvalidBounds {
                    index,
                    lo: l,
                    hi: h,
                    reason: "Bounds must be finite.",
                });
            }
            if l >= h {
                return Err(RationalError::InvalidBounds {
                    index,
                    lo: l,
                    hi: h,
                    reason: "Lower bound must be strictly below the upper bound.",
                });
            }
        }
        Ok(Self { lo, hi })
    }

    /// Box from `[lo, hi]` pairs, one per dimension.
    pub fn from_pairs(pairs: &[[f64; 2]]) -> RationalResult<Self> {
        let lo = pairs.iter().map(|p| p[0]).collect();
        let hi = pairs.iter().map(|p| p[1]).collect();
        Self::new(lo, hi)
    }

    /// The cube `[-1, 1]^dim`.
    pub fn unit(dim: usize) -> RationalResult<Self> {
        Self::new(Array1::from_elem(dim, -1.0), Array1::from_elem(dim, 1.0))
    }

    pub fn dim(&self) -> usize {
        self.lo.len()
    }

    pub fn lo(&self) -> ArrayView1<'_, f64> {
        self.lo.view()
    }

    pub fn hi(&self) -> ArrayView1<'_, f64> {
        self.hi.view()
    }

    /// `[lo, hi]` pairs, one per dimension.
    pub fn pairs(&self) -> Vec<[f64; 2]> {
        self.lo.iter().zip(self.hi.iter()).map(|(&l, &h)| [l, h]).collect()
    }

    pub fn midpoint(&self) -> Array1<f64> {
        (&self.lo + &self.hi) * 0.5
    }

    pub fn widths(&self) -> Array1<f64> {
        &self.hi - &self.lo
    }

    /// `true` if `x` lies in the closed box (with `tol` slack per side).
    pub fn contains(&self, x: ArrayView1<f64>, tol: f64) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.lo.iter().zip(self.hi.iter()))
                .all(|(&v, (&l, &h))| v >= l - tol && v <= h + tol)
    }

    /// Uniform sample, coordinates drawn in dimension order.
    pub fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        self.lo
            .iter()
            .zip(self.hi.iter())
            .map(|(&l, &h)| l + rng.gen::<f64>() * (h - l))
            .collect()
    }

    /// All `2^D` corners, bit `d` of the index selecting `hi_d`; `None`
    /// above [`MAX_CORNER_DIM`] dimensions.
    pub fn corners(&self) -> Option<Vec<Array1<f64>>> {
        let dim = self.dim();
        if dim > MAX_CORNER_DIM {
            return None;
        }
        let corners = (0..1usize << dim)
            .map(|mask| {
                (0..dim).map(|d| if (mask >> d) & 1 == 1 { self.hi[d] } else { self.lo[d] }).collect()
            })
            .collect();
        Some(corners)
    }

    // ---- Scaler ----

    /// Affine map of `x` onto `[-1, 1]^D`.
    pub fn to_unit(&self, x: ArrayView1<f64>) -> Array1<f64> {
        Zip::from(&x)
            .and(&self.lo)
            .and(&self.hi)
            .map_collect(|&v, &l, &h| 2.0 * (v - l) / (h - l) - 1.0)
    }

    /// Chain-rule factor `∂u_d/∂x_d = 2 / (hi_d − lo_d)`.
    pub fn unit_jacobian(&self) -> Array1<f64> {
        Zip::from(&self.lo).and(&self.hi).map_collect(|&l, &h| 2.0 / (h - l))
    }

    /// Split along `dim` at the midpoint of that side.
    pub(crate) fn bisect(&self, dim: usize) -> (Self, Self) {
        let mid = 0.5 * (self.lo[dim] + self.hi[dim]);
        let mut left = self.clone();
        let mut right = self.clone();
        left.hi[dim] = mid;
        right.lo[dim] = mid;
        (left, right)
    }
}
