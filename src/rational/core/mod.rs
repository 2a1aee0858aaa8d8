//! rational::core — building blocks shared by fitting, certification and SIP.
//!
//! Purpose
//! -------
//! Collect the structural and numerical primitives of the rational stack:
//! monomial structures and their evaluation, boxes and the coordinate
//! scaler, validated training data, positivity constraints, and the
//! hyperparameter/configuration types.
//!
//! Key behaviors
//! -------------
//! - [`structure`]: canonical degree-graded monomial ordering and counts.
//! - [`recurrence`]: monomial values, design matrices, gradients, and the
//!   per-run [`RecurrenceCache`](recurrence::RecurrenceCache).
//! - [`bounds`]: [`DomainBox`](bounds::DomainBox) with sampling, corners and
//!   the `[-1, 1]^D` scaler.
//! - [`data`]: [`TrainingSet`](data::TrainingSet) with head/select/fold.
//! - [`constraints`]: [`ConstraintSet`](constraints::ConstraintSet) and the
//!   fit-engine [`ConstraintDescriptor`](constraints::ConstraintDescriptor).
//! - [`options`]: [`SipConfig`](options::SipConfig), strategies, masks and
//!   training-size policies.
//! - [`validation`]: shared boundary checks.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every container validates at construction; downstream numerics assume
//!   finite data and consistent dimensions.
//! - Coefficient vectors follow the order of their
//!   [`MonomialStructure`](structure::MonomialStructure).
//!
//! Conventions
//! -----------
//! - No logging or I/O happens here; the SIP controller reports progress.

pub mod bounds;
pub mod constraints;
pub mod data;
pub mod options;
pub mod recurrence;
pub mod structure;
pub mod validation;
