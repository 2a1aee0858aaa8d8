//! smooth_optimizer::finite_diff — finite-difference gradients with error capture.
//!
//! The `finitediff` closures must return a bare `f64`, so objective errors
//! are parked in a shared `RefCell` while differencing runs and surfaced
//! afterwards. Central differences are preferred; forward differences are
//! the fallback when the central stencil fails.
use crate::optimization::{
    errors::OptResult,
    smooth_optimizer::{validation::validate_grad, Grad, Theta},
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central-difference gradient, falling back to forward differences.
///
/// `func` must route any evaluation error into `closure_err` and return
/// `NaN`. When the central pass captured an error or produced a gradient that
/// fails [`validate_grad`], one forward-difference pass is attempted.
///
/// # Errors
/// - The error captured during the forward pass, converted into `OptError`.
/// - Validation errors of the forward-difference gradient.
pub fn fd_gradient<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let central = theta.central_diff(func);
    if closure_err.borrow().is_none() && validate_grad(&central, theta.len()).is_ok() {
        return Ok(central);
    }
    run_fd_diff(theta, func, closure_err)
}

/// Forward-difference gradient with error capture and validation.
///
/// # Errors
/// - The error stored in `closure_err` during differencing.
/// - [`OptError::GradientDimMismatch`](crate::optimization::errors::OptError::GradientDimMismatch)
///   / [`OptError::InvalidGradient`](crate::optimization::errors::OptError::InvalidGradient)
///   from validation.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, theta.len())?;
    Ok(fd_grad)
}
