//! High-level entry point for minimizing a user-provided [`Objective`].
//!
//! Selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an [`ArgMinAdapter`] and delegates the run
//! to [`run_lbfgs`].
use crate::optimization::{
    errors::OptResult,
    smooth_optimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, Objective, SolverOptions},
        validation::validate_theta0,
        OptimOutcome, Theta,
    },
};

/// Minimize `c(θ)` using L-BFGS with the chosen line search.
///
/// # Behavior
/// - Rejects non-finite starting points, then runs `f.check(theta0, data)`.
/// - Builds the solver selected by `opts.line_searcher` and runs it.
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates builder errors and runtime errors from `run_lbfgs`
///   (e.g., line search failures).
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_rational::optimization::errors::OptResult;
/// use rust_rational::optimization::smooth_optimizer::{minimize, Objective, SolverOptions, Theta};
///
/// struct Bowl;
/// impl Objective for Bowl {
///     type Data = ();
///     fn value(&self, theta: &Theta, _: &()) -> OptResult<f64> {
///         Ok(theta.dot(theta))
///     }
///     fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let out = minimize(&Bowl, array![0.1, -0.2, 0.3], &(), &SolverOptions::default())?;
/// println!("θ̂ = {:?}", out.theta_hat);
/// # Ok::<(), rust_rational::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &SolverOptions,
) -> OptResult<OptimOutcome> {
    validate_theta0(&theta0)?;
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(theta0, opts, problem, solver)
        }
    }
}

/// [`minimize`], retried once with the alternate line search on error.
///
/// Backend failures such as a line search rejecting a non-descent direction
/// are often specific to one line search; the second attempt starts from the
/// same `theta0`.
///
/// # Errors
/// - The error of the second attempt when both attempts fail.
pub fn minimize_with_retry<F: Objective>(
    f: &F, theta0: Theta, data: &F::Data, opts: &SolverOptions,
) -> OptResult<OptimOutcome> {
    match minimize(f, theta0.clone(), data, opts) {
        Ok(outcome) => Ok(outcome),
        Err(_) => {
            let alternate = opts.with_line_searcher(opts.line_searcher.alternate());
            minimize(f, theta0, data, &alternate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::{
        errors::OptError,
        smooth_optimizer::{Cost, Grad},
    };
    use ndarray::array;

    /// `c(θ) = (θ₀ − 1)² + 10 (θ₁ + 2)²` with analytic gradient.
    struct Ellipse;

    impl Objective for Ellipse {
        type Data = ();

        fn value(&self, theta: &Theta, _: &()) -> OptResult<Cost> {
            Ok((theta[0] - 1.0).powi(2) + 10.0 * (theta[1] + 2.0).powi(2))
        }

        fn check(&self, theta: &Theta, _: &()) -> OptResult<()> {
            if theta.len() != 2 {
                return Err(OptError::GradientDimMismatch { expected: 2, found: theta.len() });
            }
            Ok(())
        }

        fn grad(&self, theta: &Theta, _: &()) -> OptResult<Grad> {
            Ok(array![2.0 * (theta[0] - 1.0), 20.0 * (theta[1] + 2.0)])
        }
    }

    #[test]
    // Purpose
    // -------
    // Both line searches find the minimizer of a convex quadratic.
    //
    // Given
    // -----
    // - `Ellipse` started from the origin.
    //
    // Expect
    // ------
    // - `theta_hat ≈ (1, −2)`, value ≈ 0, converged.
    fn minimize_finds_quadratic_minimum_with_both_line_searches() {
        for searcher in [LineSearcher::MoreThuente, LineSearcher::HagerZhang] {
            // Arrange
            let opts = SolverOptions::default().with_line_searcher(searcher);

            // Act
            let out = minimize(&Ellipse, array![0.0, 0.0], &(), &opts).expect("minimize");

            // Assert
            assert!((out.theta_hat[0] - 1.0).abs() < 1e-5, "{searcher:?}: {:?}", out.theta_hat);
            assert!((out.theta_hat[1] + 2.0).abs() < 1e-5, "{searcher:?}: {:?}", out.theta_hat);
            assert!(out.value < 1e-9);
            assert!(out.converged);
        }
    }

    #[test]
    // Purpose
    // -------
    // The check hook runs before any solver work.
    fn minimize_propagates_check_errors() {
        let err = minimize(&Ellipse, array![0.0], &(), &SolverOptions::default()).unwrap_err();
        assert_eq!(err, OptError::GradientDimMismatch { expected: 2, found: 1 });
    }

    #[test]
    // Purpose
    // -------
    // The retry wrapper returns the first successful attempt unchanged.
    fn minimize_with_retry_matches_minimize_on_success() {
        let opts = SolverOptions::default();
        let direct = minimize(&Ellipse, array![3.0, 1.0], &(), &opts).unwrap();
        let retried = minimize_with_retry(&Ellipse, array![3.0, 1.0], &(), &opts).unwrap();
        assert_eq!(direct.theta_hat, retried.theta_hat);
        assert_eq!(direct.iterations, retried.iterations);
    }

    #[test]
    // Purpose
    // -------
    // Non-finite starting points are rejected up front.
    fn minimize_rejects_non_finite_start() {
        let err =
            minimize(&Ellipse, array![f64::NAN, 0.0], &(), &SolverOptions::default()).unwrap_err();
        assert!(matches!(err, OptError::InvalidObjectiveInput { index: 0, .. }));
    }
}
