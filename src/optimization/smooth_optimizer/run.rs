//! Execution helper: drives an `argmin` L-BFGS solver over an [`Objective`]
//! and folds the final solver state into an [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    smooth_optimizer::{adapter::ArgMinAdapter, Grad, Objective, OptimOutcome, SolverOptions, Theta},
};
use argmin::core::{CostFunction, Executor, Gradient, IterState, Solver, State};
use argmin_math::ArgminL2Norm;

/// Solver state type shared by both line-search variants.
type LbfgsState = IterState<Theta, Grad, (), (), (), f64>;

/// Minimize `problem` from `theta0` with a prebuilt solver.
///
/// The iteration cap from `opts.tols.max_iter` is applied to the executor.
/// With `opts.verbose`, the starting cost (and gradient norm, when it can be
/// computed) is logged at debug level, and behind the `obs_slog` feature a
/// terminal observer follows every iteration.
///
/// # Errors
/// - Any `argmin` runtime error (line-search failures, objective errors),
///   converted through `From<argmin::core::Error>`.
/// - Validation errors raised when building [`OptimOutcome`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &SolverOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: Objective,
    S: Solver<ArgMinAdapter<'a, F>, LbfgsState> + Send + 'static,
{
    if opts.verbose {
        log_start(&theta0, &problem)?;
    }
    let max_iter = opts.tols.max_iter;
    let executor = Executor::new(problem, solver).configure(|state| match max_iter {
        Some(cap) => state.param(theta0).max_iters(cap as u64),
        None => state.param(theta0),
    });
    #[cfg(feature = "obs_slog")]
    let executor = if opts.verbose {
        executor.add_observer(
            argmin_observer_slog::SlogLogger::term_noblock(),
            argmin::core::observers::ObserverMode::Always,
        )
    } else {
        executor
    };

    let finished = executor.run()?;
    into_outcome(finished.state().clone())
}

// ---- Helper Methods ----

fn into_outcome(mut state: LbfgsState) -> OptResult<OptimOutcome> {
    let iterations = state.get_iter();
    let fn_evals = state.get_func_counts().clone();
    let termination = state.get_termination_status().clone();
    let best_cost = state.get_best_cost();
    let grad = state.take_gradient();
    OptimOutcome::new(state.take_best_param(), best_cost, termination, iterations, fn_evals, grad)
}

fn log_start<F>(theta0: &Theta, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let c0 = problem.cost(theta0)?;
    match problem.gradient(theta0) {
        Ok(g) => log::debug!("L-BFGS start: c = {c0:.6e}, |grad| = {:.6e}", g.l2_norm()),
        Err(_) => log::debug!("L-BFGS start: c = {c0:.6e}"),
    }
    Ok(())
}
