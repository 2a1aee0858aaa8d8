//! Errors for the rational approximation stack (input validation, solver
//! status, positivity exhaustion, and degenerate evaluation).
//!
//! This module defines [`RationalError`], the single error type returned by
//! every fallible operation under `rational::*` and `selection`, together
//! with the coarse classification [`ErrorKind`].
//!
//! ## Conventions
//! - **Indices are 0-based**.
//! - Structural problems (bad dimensions, non-finite data, invalid
//!   hyperparameters) fail at the boundary with an `InvalidArgument` kind.
//! - Local solver non-convergence inside a SIP run is absorbed and logged;
//!   it only surfaces as an error when the optimizer layer itself rejects
//!   the problem ([`RationalError::Optimizer`]).
//! - [`RationalError::PositivityExhausted`] carries the full iteration
//!   history so callers can inspect every fit and certification.
use crate::{optimization::errors::OptError, rational::records::IterationRecord};
use thiserror::Error as ThisError;

/// Result alias for rational approximation operations.
pub type RationalResult<T> = Result<T, RationalError>;

/// Smallest `|q(x)|` accepted when evaluating `p(x) / q(x)`.
pub const DENOMINATOR_FLOOR: f64 = 1e-12;

/// Coarse classification of [`RationalError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    SolverNonconvergence,
    PositivityExhausted,
    DivisionDegenerate,
}

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum RationalError {
    // ---- Data / structure validation ----
    /// Training set has no rows.
    #[error("Training set is empty.")]
    EmptyTrainingSet,

    /// Spatial dimension must be at least one.
    #[error("Invalid dimension {dim}: {reason}")]
    InvalidDimension { dim: usize, reason: &'static str },

    /// A point has the wrong number of coordinates.
    #[error("Point dimension mismatch: expected {expected}, found {found}")]
    PointDimMismatch { expected: usize, found: usize },

    /// Number of points and number of values differ.
    #[error("Training set has {points} points but {values} values.")]
    LengthMismatch { points: usize, values: usize },

    /// A coordinate or value is NaN/±inf.
    #[error("Non-finite data at index {index}: {value}")]
    NonFiniteData { index: usize, value: f64 },

    /// Box bounds must be finite with `lo < hi`.
    #[error("Invalid bounds in dimension {index}: [{lo}, {hi}]: {reason}")]
    InvalidBounds { index: usize, lo: f64, hi: f64, reason: &'static str },

    /// Coefficient vector length does not match its structure.
    #[error("Coefficient length mismatch: expected {expected}, found {found}")]
    CoeffLengthMismatch { expected: usize, found: usize },

    /// A coefficient is NaN/±inf.
    #[error("Non-finite coefficient at index {index}: {value}")]
    NonFiniteCoefficient { index: usize, value: f64 },

    /// Requested total degree exceeds the structure.
    #[error("Degree {degree} out of range for structure of degree {max_degree}.")]
    DegreeOutOfRange { degree: usize, max_degree: usize },

    // ---- Hyperparameters ----
    /// Training-size policy asks for more points than available.
    #[error("Training scale requires {requested} points but only {available} are available.")]
    InsufficientTrainingData { requested: usize, available: usize },

    /// Fold configuration is unusable.
    #[error("Invalid fold k = {k}, index = {index} for {len} points: {reason}")]
    InvalidFold { k: usize, index: usize, len: usize, reason: &'static str },

    /// Penalty weight must be finite and non-negative.
    #[error("Invalid penalty weight {value}: {reason}")]
    InvalidPenalty { value: f64, reason: &'static str },

    /// Penalty mask must have one flag per degree `0..=degree`.
    #[error("Invalid {which} penalty mask: expected {expected} entries, found {found}")]
    InvalidPenaltyMask { which: &'static str, expected: usize, found: usize },

    /// Mask would leave the problem without a usable denominator.
    #[error("Degenerate {which} penalty mask: {reason}")]
    DegeneratePenaltyMask { which: &'static str, reason: &'static str },

    /// Strategies 1 and 2 need both penalty masks.
    #[error("Fitting strategy {strategy} requires a {which} penalty mask.")]
    MissingPenaltyMask { strategy: u8, which: &'static str },

    /// Unknown fitting strategy code.
    #[error("Unknown fitting strategy {strategy}; valid codes are 0, 1 and 2.")]
    InvalidStrategy { strategy: u8 },

    /// Positivity threshold must be finite and strictly positive.
    #[error("Invalid positivity threshold {value}: {reason}")]
    InvalidThreshold { value: f64, reason: &'static str },

    /// A budget (iterations, restarts, samples, nodes) is unusable.
    #[error("Invalid budget '{name}' = {value}: {reason}")]
    InvalidBudget { name: &'static str, value: f64, reason: &'static str },

    /// Configuration text could not be parsed.
    #[error("Invalid configuration: {text}")]
    InvalidConfig { text: String },

    /// Stored record is internally inconsistent.
    #[error("Invalid model record: {reason}")]
    InvalidRecord { reason: String },

    /// Candidate list for model selection is unusable.
    #[error("Invalid selection input: {reason}")]
    InvalidSelection { reason: &'static str },

    // ---- Solver ----
    /// A fit did not converge and the caller asked for strict behavior.
    #[error("Solver did not converge after {iterations} iterations: {status}")]
    SolverNonconvergence { status: String, iterations: usize },

    /// Optimizer layer rejected the problem.
    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptError),

    // ---- SIP ----
    /// Budget exhausted without certifying positivity.
    #[error(
        "Could not certify denominator positivity after {iterations} iterations \
         (last certified minimum {last_value})."
    )]
    PositivityExhausted { iterations: usize, last_value: f64, history: Vec<IterationRecord> },

    // ---- Evaluation ----
    /// `|q(x)|` fell below [`DENOMINATOR_FLOOR`].
    #[error("Denominator {value} is below the evaluation floor at point index {index}.")]
    DivisionDegenerate { index: usize, value: f64 },
}

impl RationalError {
    /// Coarse classification used by callers that branch on failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RationalError::SolverNonconvergence { .. } | RationalError::Optimizer(_) => {
                ErrorKind::SolverNonconvergence
            }
            RationalError::PositivityExhausted { .. } => ErrorKind::PositivityExhausted,
            RationalError::DivisionDegenerate { .. } => ErrorKind::DivisionDegenerate,
            _ => ErrorKind::InvalidArgument,
        }
    }

    /// Iteration history carried by [`RationalError::PositivityExhausted`].
    pub fn history(&self) -> Option<&[IterationRecord]> {
        match self {
            RationalError::PositivityExhausted { history, .. } => Some(history.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // `kind()` groups variants into the four public failure classes.
    fn kind_classifies_variants() {
        assert_eq!(RationalError::EmptyTrainingSet.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            RationalError::InvalidStrategy { strategy: 7 }.kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            RationalError::Optimizer(OptError::UnknownError).kind(),
            ErrorKind::SolverNonconvergence
        );
        assert_eq!(
            RationalError::DivisionDegenerate { index: 0, value: 0.0 }.kind(),
            ErrorKind::DivisionDegenerate
        );
        let exhausted = RationalError::PositivityExhausted {
            iterations: 3,
            last_value: -0.5,
            history: Vec::new(),
        };
        assert_eq!(exhausted.kind(), ErrorKind::PositivityExhausted);
        assert_eq!(exhausted.history().map(<[_]>::len), Some(0));
    }

    #[test]
    // Purpose
    // -------
    // Optimizer errors convert through `?` via `From<OptError>`.
    fn opt_error_converts_into_rational_error() {
        fn fails() -> RationalResult<()> {
            Err(OptError::NoTolerancesProvided)?;
            Ok(())
        }
        assert_eq!(fails(), Err(RationalError::Optimizer(OptError::NoTolerancesProvided)));
    }
}
