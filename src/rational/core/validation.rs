//! Shared validation helpers for the rational stack.
//!
//! Small, allocation-free checks used by constructors and entry points so
//! that every boundary reports the same error variants for the same
//! problems.
use crate::rational::errors::{RationalError, RationalResult};
use ndarray::ArrayView1;

/// Coefficient vector has the expected length and finite entries.
///
/// # Errors
/// - [`RationalError::CoeffLengthMismatch`] on a length mismatch.
/// - [`RationalError::NonFiniteCoefficient`] for the first non-finite entry.
pub fn validate_coefficients(coeffs: ArrayView1<f64>, expected: usize) -> RationalResult<()> {
    if coeffs.len() != expected {
        return Err(RationalError::CoeffLengthMismatch { expected, found: coeffs.len() });
    }
    for (index, &value) in coeffs.iter().enumerate() {
        if !value.is_finite() {
            return Err(RationalError::NonFiniteCoefficient { index, value });
        }
    }
    Ok(())
}

/// Point has `dim` coordinates, all finite.
pub fn validate_point(point: ArrayView1<f64>, dim: usize) -> RationalResult<()> {
    if point.len() != dim {
        return Err(RationalError::PointDimMismatch { expected: dim, found: point.len() });
    }
    for (index, &value) in point.iter().enumerate() {
        if !value.is_finite() {
            return Err(RationalError::NonFiniteData { index, value });
        }
    }
    Ok(())
}

/// Positivity threshold is finite and strictly positive.
pub fn validate_threshold(value: f64) -> RationalResult<()> {
    if !value.is_finite() {
        return Err(RationalError::InvalidThreshold { value, reason: "Threshold must be finite." });
    }
    if value <= 0.0 {
        return Err(RationalError::InvalidThreshold {
            value,
            reason: "Threshold must be strictly positive.",
        });
    }
    Ok(())
}

/// Penalty weight is finite and non-negative.
pub fn validate_penalty(value: f64) -> RationalResult<()> {
    if !value.is_finite() {
        return Err(RationalError::InvalidPenalty { value, reason: "Penalty must be finite." });
    }
    if value < 0.0 {
        return Err(RationalError::InvalidPenalty { value, reason: "Penalty must be non-negative." });
    }
    Ok(())
}

/// Count-style budget is strictly positive.
pub fn validate_budget(name: &'static str, value: usize) -> RationalResult<()> {
    if value == 0 {
        return Err(RationalError::InvalidBudget {
            name,
            value: value as f64,
            reason: "Budget must be greater than zero.",
        });
    }
    Ok(())
}
