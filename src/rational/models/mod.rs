//! models — the user-facing rational approximation `p(x) / q(x)`.
//!
//! Purpose
//! -------
//! Hold fitted or reloaded rational models and evaluate them. Fitting is
//! delegated to the SIP controller; this layer only owns coefficients,
//! structures and the optional input scaler.
//!
//! Key behaviors
//! -------------
//! - [`RationalModel`] evaluates numerator, denominator, the ratio and its
//!   gradient at single points, and the ratio over point matrices.
//! - Models are built from a full SIP run or from a stored
//!   [`ModelRecord`](crate::rational::records::ModelRecord).
//!
//! Testing notes
//! -------------
//! - Unit tests in [`rational`] cover evaluation against hand-computed
//!   values, the gradient vs finite differences (with and without a
//!   scaler), the denominator floor, and record round trips.

pub mod rational;

pub use self::rational::RationalModel;

pub mod prelude {
    pub use super::rational::RationalModel;
}
