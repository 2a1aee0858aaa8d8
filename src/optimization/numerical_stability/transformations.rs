//! Numerical stability utilities.
//!
//! Provides guarded versions of the logistic map and its inverse, plus the
//! box reparameterization built on top of them. The logistic branch avoids
//! `exp` overflow for large `|t|`, and the logit clamps its argument into
//! `[LOGIT_EPS, 1 − LOGIT_EPS]` so that points on a box face map to a
//! finite unconstrained coordinate.
//!
//! # Provided items
//! - [`LOGIT_EPS`]: clamp used by [`safe_logit`].
//! - [`safe_logistic(t)`]: `σ(t) = 1 / (1 + exp(−t))`, ℝ → (0, 1).
//! - [`logistic_deriv(t)`]: `σ'(t) = σ(t)(1 − σ(t))`.
//! - [`safe_logit(u)`]: inverse of the logistic, (0, 1) → ℝ.
//! - [`to_box`] / [`from_box`]: per-coordinate maps between unconstrained
//!   `t` and `x ∈ [lo, hi]`.

use ndarray::{Array1, ArrayView1};

/// Clamp for logit inputs. Keeps `logit(u)` within roughly ±27.6.
pub const LOGIT_EPS: f64 = 1e-12;

/// Numerically stable logistic `σ(t) = 1 / (1 + exp(−t))`.
///
/// Uses the symmetric form `exp(t) / (1 + exp(t))` for negative `t` so the
/// exponential never overflows.
pub fn safe_logistic(t: f64) -> f64 {
    if t >= 0.0 {
        1.0 / (1.0 + (-t).exp())
    } else {
        let e = t.exp();
        e / (1.0 + e)
    }
}

/// Derivative of the logistic, `σ(t)(1 − σ(t))`.
pub fn logistic_deriv(t: f64) -> f64 {
    let s = safe_logistic(t);
    s * (1.0 - s)
}

/// Inverse logistic `ln(u / (1 − u))` with `u` clamped to
/// `[LOGIT_EPS, 1 − LOGIT_EPS]`.
pub fn safe_logit(u: f64) -> f64 {
    let u = u.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    (u / (1.0 - u)).ln()
}

/// Map unconstrained coordinates into the box: `x_d = lo_d + (hi_d − lo_d) σ(t_d)`.
///
/// # Parameters
/// - `t`: unconstrained coordinates.
/// - `lo`, `hi`: box bounds, same length as `t`.
pub fn to_box(t: ArrayView1<f64>, lo: ArrayView1<f64>, hi: ArrayView1<f64>) -> Array1<f64> {
    let mut x = Array1::zeros(t.len());
    for d in 0..t.len() {
        x[d] = lo[d] + (hi[d] - lo[d]) * safe_logistic(t[d]);
    }
    x
}

/// Inverse of [`to_box`]. Points on a face map to a large finite `t`.
pub fn from_box(x: ArrayView1<f64>, lo: ArrayView1<f64>, hi: ArrayView1<f64>) -> Array1<f64> {
    let mut t = Array1::zeros(x.len());
    for d in 0..x.len() {
        t[d] = safe_logit((x[d] - lo[d]) / (hi[d] - lo[d]));
    }
    t
}

/// Diagonal Jacobian `∂x_d/∂t_d = (hi_d − lo_d) σ'(t_d)` of [`to_box`].
pub fn to_box_jacobian(
    t: ArrayView1<f64>, lo: ArrayView1<f64>, hi: ArrayView1<f64>,
) -> Array1<f64> {
    let mut jac = Array1::zeros(t.len());
    for d in 0..t.len() {
        jac[d] = (hi[d] - lo[d]) * logistic_deriv(t[d]);
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // ---- Test plan ----
    //
    // Scope
    // -----
    // - Agreement of the guarded logistic with the naive formula on a safe grid.
    // - Tail behavior: no NaN or overflow for very large |t|.
    // - Logit/logistic inversion, including clamped face points.
    // - Box maps: midpoint at t = 0, round trip, Jacobian vs finite differences.

    #[test]
    // Purpose
    // -------
    // Guarded logistic matches the textbook formula where the latter is safe.
    fn safe_logistic_matches_naive_formula_on_grid() {
        for i in -40..=40 {
            let t = i as f64 * 0.5;
            let naive = 1.0 / (1.0 + (-t).exp());
            assert!((safe_logistic(t) - naive).abs() < 1e-15, "t = {t}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Extreme arguments saturate without producing NaN.
    fn safe_logistic_saturates_in_the_tails() {
        assert_eq!(safe_logistic(1e4), 1.0);
        assert_eq!(safe_logistic(-1e4), 0.0);
        assert!(logistic_deriv(-1e4).is_finite());
    }

    #[test]
    // Purpose
    // -------
    // `safe_logit` inverts `safe_logistic` and stays finite at 0 and 1.
    fn safe_logit_inverts_logistic_and_clamps_faces() {
        for t in [-5.0, -0.3, 0.0, 1.7, 8.0] {
            assert!((safe_logit(safe_logistic(t)) - t).abs() < 1e-9);
        }
        assert!(safe_logit(0.0).is_finite());
        assert!(safe_logit(1.0).is_finite());
        assert!(safe_logit(0.0) < -20.0);
    }

    #[test]
    // Purpose
    // -------
    // The origin in t-space is the box midpoint and the maps round-trip.
    //
    // Given
    // -----
    // - Box [-1, 3] x [0, 0.5].
    //
    // Expect
    // ------
    // - `to_box(0) = (1, 0.25)`; `to_box(from_box(x)) ≈ x` for interior x.
    fn box_maps_center_at_midpoint_and_round_trip() {
        // Arrange
        let lo = array![-1.0, 0.0];
        let hi = array![3.0, 0.5];
        let x = array![2.2, 0.1];

        // Act
        let mid = to_box(Array1::zeros(2).view(), lo.view(), hi.view());
        let back = to_box(from_box(x.view(), lo.view(), hi.view()).view(), lo.view(), hi.view());

        // Assert
        assert!((mid[0] - 1.0).abs() < 1e-15 && (mid[1] - 0.25).abs() < 1e-15);
        assert!((back[0] - 2.2).abs() < 1e-12 && (back[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // `to_box_jacobian` agrees with a central difference of `to_box`.
    fn to_box_jacobian_matches_central_difference() {
        let lo = array![-2.0];
        let hi = array![5.0];
        let h = 1e-6;
        for t0 in [-3.0, 0.0, 0.4, 2.5] {
            let plus = to_box(array![t0 + h].view(), lo.view(), hi.view())[0];
            let minus = to_box(array![t0 - h].view(), lo.view(), hi.view())[0];
            let fd = (plus - minus) / (2.0 * h);
            let jac = to_box_jacobian(array![t0].view(), lo.view(), hi.view())[0];
            assert!((fd - jac).abs() < 1e-6, "t0 = {t0}: fd {fd} vs {jac}");
        }
    }
}
