//! Augmented-Lagrangian solver for linearly constrained convex quadratics.
//!
//! Purpose
//! -------
//! Minimize `vᵀ H v + ℓᵀ v` subject to `G v − r ≥ 0` with the
//! Powell–Hestenes–Rockafellar (PHR) augmented Lagrangian. Each inner
//! subproblem is smooth and unconstrained and is handed to the L-BFGS
//! stack in [`smooth_optimizer`](crate::optimization::smooth_optimizer).
//!
//! Key behaviors
//! -------------
//! - Inner objective:
//!   `L(v) = vᵀHv + ℓᵀv + Σ_j (1 / 2ρ) (max(0, μ_j − ρ g_j(v))² − μ_j²)`
//!   with analytic gradient `2Hv + ℓ − Gᵀ max(0, μ − ρ g(v))`.
//! - Multiplier update `μ ← max(0, μ − ρ g(v))`; `ρ` grows tenfold (capped
//!   at `rho_max`) whenever the KKT residual fails to shrink by a quarter.
//! - Convergence when `max_j |min(g_j, μ_j / ρ)| ≤ feasibility_tol` and the
//!   Lagrangian gradient `2Hv + ℓ − Gᵀμ` at the new multipliers is at most
//!   `stationarity_tol` relative to `1 + max(‖2Hv + ℓ‖∞, ‖Gᵀμ‖∞)`.
//!   A feasible point whose inner solve stopped early is not converged.
//! - An inner solver error is retried with the alternate line search; if
//!   that fails too, the last iterate is returned unconverged.
//!
//! Invariants & assumptions
//! ------------------------
//! - `H` is symmetric positive semidefinite, `[nvar × nvar]`.
//! - `G` is `[n_ineq × nvar]`, `r` has `n_ineq` entries.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        smooth_optimizer::{minimize_with_retry, Cost, Grad, Objective, Theta},
    },
    rational::core::options::FitOptions,
};
use log::{debug, warn};
use ndarray::{Array1, Array2, Zip};

/// Convex quadratic program with linear inequalities `G v − r ≥ 0`.
#[derive(Debug, Clone)]
pub struct QuadraticProgram {
    pub hessian: Array2<f64>,
    pub linear: Array1<f64>,
    pub constraints: Array2<f64>,
    pub rhs: Array1<f64>,
}

impl QuadraticProgram {
    pub fn nvar(&self) -> usize {
        self.linear.len()
    }

    /// `vᵀ H v + ℓᵀ v`.
    pub fn value(&self, v: &Array1<f64>) -> f64 {
        v.dot(&self.hessian.dot(v)) + self.linear.dot(v)
    }

    /// Constraint values `G v − r`.
    pub fn slack(&self, v: &Array1<f64>) -> Array1<f64> {
        self.constraints.dot(v) - &self.rhs
    }

    /// Largest violation `max(0, −min_j g_j)`.
    pub fn max_violation(&self, v: &Array1<f64>) -> f64 {
        self.slack(v).iter().fold(0.0_f64, |acc, &g| acc.max(-g))
    }
}

/// Outcome of [`solve`].
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedOutcome {
    pub solution: Array1<f64>,
    pub converged: bool,
    pub status: String,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    pub max_violation: f64,
    /// Relative Lagrangian gradient at the returned iterate.
    pub stationarity: f64,
}

/// PHR augmented Lagrangian of a [`QuadraticProgram`].
struct AugmentedLagrangian<'a> {
    program: &'a QuadraticProgram,
}

/// Multipliers and penalty parameter held fixed during one inner solve.
struct PenaltyState {
    multipliers: Array1<f64>,
    rho: f64,
}

impl AugmentedLagrangian<'_> {
    /// `max(0, μ − ρ g(v))`.
    fn shifted(&self, v: &Theta, state: &PenaltyState) -> Array1<f64> {
        let g = self.program.slack(v);
        Zip::from(&state.multipliers).and(&g).map_collect(|&mu, &gj| (mu - state.rho * gj).max(0.0))
    }

    /// `‖2Hv + ℓ − Gᵀ max(0, μ − ρ g(v))‖∞` scaled by the larger of its two
    /// parts. The shifted multipliers are the ones the outer update installs.
    fn stationarity(&self, v: &Theta, state: &PenaltyState) -> f64 {
        let shifted = self.shifted(v, state);
        let quad = self.program.hessian.dot(v) * 2.0 + &self.program.linear;
        let pull = self.program.constraints.t().dot(&shifted);
        let scale = 1.0 + inf_norm(&quad).max(inf_norm(&pull));
        inf_norm(&(quad - pull)) / scale
    }
}

/// `max_i |a_i|`; NaN if any entry is NaN.
fn inf_norm(a: &Array1<f64>) -> f64 {
    if a.iter().any(|x| x.is_nan()) {
        return f64::NAN;
    }
    a.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()))
}

impl Objective for AugmentedLagrangian<'_> {
    type Data = PenaltyState;

    fn value(&self, theta: &Theta, data: &PenaltyState) -> OptResult<Cost> {
        let shifted = self.shifted(theta, data);
        let penalty: f64 = Zip::from(&shifted)
            .and(&data.multipliers)
            .fold(0.0, |acc, &s, &mu| acc + (s * s - mu * mu));
        Ok(self.program.value(theta) + penalty / (2.0 * data.rho))
    }

    fn check(&self, theta: &Theta, _data: &PenaltyState) -> OptResult<()> {
        if theta.len() != self.program.nvar() {
            return Err(OptError::GradientDimMismatch {
                expected: self.program.nvar(),
                found: theta.len(),
            });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &PenaltyState) -> OptResult<Grad> {
        let shifted = self.shifted(theta, data);
        let quad = self.program.hessian.dot(theta) * 2.0 + &self.program.linear;
        Ok(quad - self.program.constraints.t().dot(&shifted))
    }
}

/// Minimize a [`QuadraticProgram`] from `start`.
///
/// Returns the last iterate even when the outer loop does not converge.
pub fn solve(program: &QuadraticProgram, start: Array1<f64>, options: &FitOptions) -> AugmentedOutcome {
    let lagrangian = AugmentedLagrangian { program };
    let mut v = start;
    let mut state =
        PenaltyState { multipliers: Array1::zeros(program.rhs.len()), rho: options.rho_init };
    let mut previous_residual = f64::INFINITY;
    let mut inner_iterations = 0;
    let mut status = String::from("Not started");
    let mut converged = false;
    let mut outer_iterations = 0;
    let mut stationarity = f64::INFINITY;
    for outer in 1..=options.max_outer {
        outer_iterations = outer;
        let inner_converged = match minimize_with_retry(&lagrangian, v.clone(), &state, &options.solver) {
            Ok(outcome) => {
                inner_iterations += outcome.iterations;
                status = outcome.status;
                v = outcome.theta_hat;
                outcome.converged
            }
            Err(err) => {
                warn!("augmented Lagrangian inner solve failed at outer iteration {outer}: {err}");
                status = format!("Inner solver error: {err}");
                break;
            }
        };

        stationarity = lagrangian.stationarity(&v, &state);
        let g = program.slack(&v);
        let rho = state.rho;
        let residual = Zip::from(&g)
            .and(&state.multipliers)
            .fold(0.0_f64, |acc, &gj, &mu| acc.max(gj.min(mu / rho).abs()));
        Zip::from(&mut state.multipliers).and(&g).for_each(|mu, &gj| *mu = (*mu - rho * gj).max(0.0));
        debug!(
            "outer {outer}: rho = {rho:.1e}, KKT residual = {residual:.3e}, \
             stationarity = {stationarity:.3e}, inner converged = {inner_converged}"
        );

        if residual <= options.feasibility_tol {
            if stationarity <= options.stationarity_tol {
                converged = true;
                break;
            }
            continue;
        }
        if residual > 0.25 * previous_residual {
            state.rho = (rho * 10.0).min(options.rho_max);
        }
        previous_residual = residual;
    }

    if !converged && status != "Not started" && !status.starts_with("Inner solver error") {
        status = format!("Outer budget exhausted ({status}, stationarity {stationarity:.3e})");
    }
    let max_violation = program.max_violation(&v);
    AugmentedOutcome {
        solution: v,
        converged,
        status,
        outer_iterations,
        inner_iterations,
        max_violation,
        stationarity,
    }
}
