//! numerical_stability — guarded logistic transforms for bounded search.
//!
//! Purpose
//! -------
//! Collect the numerically stable scalar transforms used to turn a box
//! constrained minimization into an unconstrained one. The bounded local
//! search in the certifiers optimizes over `t ∈ ℝ^D` and maps each
//! coordinate into `[lo_d, hi_d]` through the logistic function.
//!
//! Key behaviors
//! -------------
//! - `safe_logistic` / `safe_logit` are overflow-free and mutually inverse
//!   on the open unit interval; the logit clamps with `LOGIT_EPS`.
//! - `to_box`, `from_box` and `to_box_jacobian` lift the scalar maps to
//!   `ndarray` vectors, including the diagonal chain-rule factor.
//!
//! Conventions
//! -----------
//! - Pure numerical helpers: no logging, no I/O, no global state.
//! - Inputs are assumed finite and bounds are assumed validated upstream
//!   (`DomainBox::new`).
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] check agreement with naive formulas,
//!   tail saturation, inversion and the Jacobian against central
//!   differences.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    from_box, logistic_deriv, safe_logistic, safe_logit, to_box, to_box_jacobian, LOGIT_EPS,
};

pub mod prelude {
    pub use super::transformations::{from_box, safe_logistic, safe_logit, to_box, LOGIT_EPS};
}
