//! smooth_optimizer — argmin-powered minimization of smooth objectives.
//!
//! Purpose
//! -------
//! Provide a small, Argmin-backed optimization layer for **minimizing**
//! smooth scalar objectives `c(θ)`. Callers implement a single trait,
//! [`Objective`], and invoke [`minimize`] to run L-BFGS with a configurable
//! line search, tolerances, and finite-difference fallbacks.
//!
//! Key behaviors
//! -------------
//! - Bridge user objectives into Argmin's `CostFunction`/`Gradient` via
//!   [`adapter::ArgMinAdapter`].
//! - Expose a single entrypoint [`minimize`] that validates the starting
//!   point, selects an L-BFGS solver via [`builders`], executes it via
//!   [`run::run_lbfgs`], and normalizes results into an [`OptimOutcome`].
//! - Fall back to central / forward finite differences ([`finite_diff`])
//!   when an objective has no analytic gradient.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`Objective::value`] and [`Objective::grad`] report invalid inputs as
//!   [`OptError`](crate::optimization::errors::OptError), never panics.
//! - Configuration types ([`Tolerances`], [`SolverOptions`]) are validated
//!   on construction.
//!
//! Downstream usage
//! ----------------
//! - The constrained fit engine minimizes augmented-Lagrangian subproblems
//!   through [`minimize`].
//! - The local-search certifiers minimize the denominator polynomial in
//!   logistic box coordinates through [`minimize`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign conventions and FD fallback in [`adapter`],
//!   solver construction in [`builders`], validation helpers, and
//!   end-to-end minimization of toy quadratics in [`api`].

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::{minimize, minimize_with_retry};
pub use self::traits::{LineSearcher, Objective, OptimOutcome, SolverOptions, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Theta, DEFAULT_LBFGS_MEM};

pub mod prelude {
    pub use super::api::{minimize, minimize_with_retry};
    pub use super::traits::{LineSearcher, Objective, OptimOutcome, SolverOptions, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}
