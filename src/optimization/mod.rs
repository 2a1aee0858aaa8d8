//! optimization — smooth minimizer, numerical helpers and unified error surface.
//!
//! Purpose
//! -------
//! Provide the local optimization layer consumed by the rational fitting
//! stack: an Argmin-backed L-BFGS minimizer for smooth objectives, guarded
//! transforms for box-bounded search, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **minimizing** smooth objectives `c(θ)`
//!   (`smooth_optimizer`), including configuration of solvers and stopping
//!   criteria.
//! - Supply the logistic reparameterization (`numerical_stability`) that
//!   maps unconstrained coordinates into a bounding box.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers operate in an unconstrained space `θ` and assume inputs are
//!   finite once validation has passed; invalid states are reported as
//!   `OptError`, not panics.
//!
//! Conventions
//! -----------
//! - Variables and gradients use `ndarray`-based aliases (`Theta`, `Grad`).
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - This module does not log; the rational layer reports solver status.
//!
//! Downstream usage
//! ----------------
//! - `rational::fit` minimizes augmented-Lagrangian subproblems.
//! - `rational::certify` minimizes `q(x)` over a box in logistic coordinates.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover solver wiring, tolerance handling,
//!   FD fallbacks, transforms, and error conversions.

pub mod errors;
pub mod numerical_stability;
pub mod smooth_optimizer;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
    pub use super::smooth_optimizer::prelude::*;
}
