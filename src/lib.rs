//! rust_rational — multivariate rational approximation with certified
//! denominator positivity.
//!
//! Purpose
//! -------
//! Fit `r(x) = p(x) / q(x)` to scattered samples in `D` dimensions such that
//! the denominator provably (up to the chosen certifier) stays above a
//! threshold over a whole box, so the fitted model has no poles there.
//!
//! Key behaviors
//! -------------
//! - `rational`: monomial bases, the constrained fit engine, positivity
//!   certifiers, the SIP controller, fitted models and their records.
//! - `selection`: k-fold cross-validation and one-standard-error penalty
//!   selection on top of full SIP runs.
//! - `optimization`: the argmin-backed L-BFGS layer and box transforms
//!   shared by the fit engine and the local certifiers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are validated at the public boundary; inner numerics assume
//!   finite, shape-consistent data.
//! - Runs are reproducible for a fixed configuration and seed.
//!
//! Conventions
//! -----------
//! - Arrays are `ndarray` types; points are rows of an `N × D` matrix.
//! - Errors are typed (`RationalError`, `OptError`); progress is reported
//!   through the `log` facade and left to the caller's logger.
//!
//! Downstream usage
//! ----------------
//! - `use rust_rational::rational::prelude::*;` then
//!   `RationalModel::fit(&data, &config)`.
//!
//! Testing notes
//! -------------
//! - Unit tests live beside each module; end-to-end pipelines are in
//!   `tests/integration_sip_pipeline.rs`.

pub mod optimization;
pub mod rational;
pub mod selection;
