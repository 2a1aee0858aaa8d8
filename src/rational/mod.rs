//! rational — positivity-certified multivariate rational approximation.
//!
//! Purpose
//! -------
//! Fit `p(x) / q(x)` to sampled data while guaranteeing, numerically, that
//! the denominator stays at or above a threshold everywhere in a box, not
//! only at the samples. The Sequential Iterative Positivity (SIP) loop
//! alternates a constrained least-squares fit with a global search for
//! `min q`, adding each violating point as a new constraint.
//!
//! Key behaviors
//! -------------
//! - [`core`]: monomial structures and evaluation, boxes, training data,
//!   constraint sets and configuration.
//! - [`fit`]: augmented-Lagrangian fit engine with plain, pinned-zero and
//!   L1-penalized strategies.
//! - [`certify`]: single-start, multi-start, interval branch-and-bound,
//!   direct-sampling and comparison certifiers behind one trait.
//! - [`sip`]: the controller that ties fitting and certification together.
//! - [`models`] and [`records`]: the resulting model and its plain-data
//!   records.
//! - [`errors`]: [`RationalError`] and [`ErrorKind`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Data, boxes, coefficients and hyperparameters are validated once at
//!   the boundary; inner numerics assume finite, shape-consistent input.
//! - Certification and constraints live in model coordinates; with
//!   rescaling enabled these are `[-1, 1]^D`.
//!
//! Conventions
//! -----------
//! - Indices are 0-based; SIP iterations are numbered from 1.
//! - Progress is reported through the `log` facade by the SIP controller,
//!   the fit engine and the certifiers.
//!
//! Downstream usage
//! ----------------
//! 1. Build a [`TrainingSet`] and a [`SipConfig`] (in code or from TOML).
//! 2. Call [`RationalModel::fit`] (or drive a [`SipController`]).
//! 3. Evaluate the returned model, or store `run.record(&config)`.

pub mod certify;
pub mod core;
pub mod errors;
pub mod fit;
pub mod models;
pub mod records;
pub mod sip;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::certify::{Certification, CertifierKind, Certify};
pub use self::core::{
    bounds::DomainBox,
    data::TrainingSet,
    options::{FitOptions, FitStrategy, SipConfig, TrainingScale},
    structure::{generate_structure, num_coeffs_poly, MonomialStructure},
};
pub use self::errors::{ErrorKind, RationalError, RationalResult};
pub use self::models::RationalModel;
pub use self::records::{IterationRecord, ModelRecord};
pub use self::sip::{SipController, SipRun};

pub mod prelude {
    pub use super::{
        Certification, CertifierKind, DomainBox, ErrorKind, FitOptions, FitStrategy,
        IterationRecord, ModelRecord, RationalError, RationalModel, RationalResult, SipConfig,
        SipController, SipRun, TrainingScale, TrainingSet,
    };
}
