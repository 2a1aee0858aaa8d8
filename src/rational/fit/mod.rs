//! Constrained fit engine — linearized least squares for `p / q` under
//! positivity constraints, with optional pinning or L1 shrinkage.
//!
//! Purpose
//! -------
//! Given training design matrices, a [`ConstraintSet`] and a
//! [`FitStrategy`], compute numerator and denominator coefficients that
//! minimize the linearized residual `Σ_i (y_i q(x_i) − p(x_i))²` while
//! keeping `q(z) ≥ 1` at every constraint point `z`.
//!
//! Key behaviors
//! -------------
//! - The residual is written as `‖R c‖²` with `R = [−P | diag(y) Q]` and
//!   `c = [p ; q]`, so the objective is the quadratic `cᵀ (RᵀR) c`.
//! - Strategy 1 removes pinned coefficients from the optimizer vector and
//!   re-inserts exact zeros afterwards.
//! - Strategy 2 appends one surrogate `s_k` per penalized coefficient with
//!   `s_k − c_k ≥ 0`, `s_k + c_k ≥ 0` and adds `λ Σ s_k` to the objective.
//! - The constrained problem is solved by [`augmented::solve`]; a failed or
//!   unfinished solve is reported through [`FitDiagnostics::converged`]
//!   rather than as an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - `p_design` is `[n × M]`, `q_design` is `[n × N]`, `values` has `n`
//!   entries, all in model coordinates.
//! - The default start `p = 0`, `q = 1` satisfies every positivity row
//!   because the constant monomial is always first.
//! - The fit never certifies positivity off the constraint points.
pub mod augmented;

use crate::rational::{
    core::{
        constraints::{ConstraintDescriptor, ConstraintSet},
        options::{FitOptions, FitStrategy, PenaltyMask},
        structure::MonomialStructure,
        validation::validate_penalty,
    },
    errors::{RationalError, RationalResult},
};
use augmented::QuadraticProgram;
use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::time::{Duration, Instant};

/// Coefficients below this magnitude do not count towards the L1 term.
pub const L1_COUNT_TOL: f64 = 1e-5;

/// Training-side inputs of one fit.
#[derive(Debug, Clone)]
pub struct FitProblem<'a> {
    pub p_design: ArrayView2<'a, f64>,
    pub q_design: ArrayView2<'a, f64>,
    pub values: ArrayView1<'a, f64>,
    pub p_structure: &'a MonomialStructure,
    pub q_structure: &'a MonomialStructure,
    /// Previous `[p ; q]`, used as the starting point when present.
    pub warm_start: Option<ArrayView1<'a, f64>>,
}

/// Solver-side report of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitDiagnostics {
    /// `Σ (y q − p)²` at the returned coefficients.
    pub l2_term: f64,
    /// `Σ |c_k|` over penalized coefficients above [`L1_COUNT_TOL`];
    /// `None` unless strategy 2.
    pub l1_term: Option<f64>,
    pub status: String,
    pub converged: bool,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    /// Largest violation of the lowered inequality rows.
    pub max_violation: f64,
    pub wall_time: Duration,
}

/// Coefficients and diagnostics of one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub pcoeff: Array1<f64>,
    pub qcoeff: Array1<f64>,
    /// `l2_term + λ · l1_term` (strategy 2) or `l2_term`.
    pub objective: f64,
    pub diagnostics: FitDiagnostics,
}

/// Descriptor list for `n_rows` positivity rows under `strategy`.
///
/// `selected` are stacked `[p ; q]` indices from
/// [`FitStrategy::selected_indices`]; surrogate `j` belongs to `selected[j]`.
pub fn describe_constraints(
    n_rows: usize, strategy: &FitStrategy, selected: &[usize],
) -> Vec<ConstraintDescriptor> {
    let mut out: Vec<ConstraintDescriptor> =
        (0..n_rows).map(|row| ConstraintDescriptor::Positivity { row }).collect();
    match strategy {
        FitStrategy::Plain => {}
        FitStrategy::PinnedZero { .. } => {
            out.extend(selected.iter().map(|&coeff| ConstraintDescriptor::PinnedZero { coeff }));
        }
        FitStrategy::L1Penalty { .. } => {
            for (surrogate, &coeff) in selected.iter().enumerate() {
                out.push(ConstraintDescriptor::AbsUpper { coeff, surrogate });
                out.push(ConstraintDescriptor::AbsLower { coeff, surrogate });
            }
        }
    }
    out
}

/// Fit numerator and denominator coefficients.
///
/// Parameters
/// ----------
/// - `problem`: training design matrices, values and optional warm start.
/// - `constraints`: positivity points with cached denominator rows.
/// - `strategy`: plain, pinned-zero or L1-penalized fit.
/// - `options`: augmented-Lagrangian and inner L-BFGS tuning.
///
/// Returns
/// -------
/// [`FitResult`] with the last iterate; `diagnostics.converged` is `false`
/// when the solver failed or ran out of outer iterations.
///
/// Errors
/// ------
/// - `LengthMismatch` / `CoeffLengthMismatch` for inconsistent shapes.
/// - `InvalidPenaltyMask` if a mask does not match its structure.
/// - `InvalidPenalty` for a bad `λ`.
pub fn fit(
    problem: &FitProblem<'_>, constraints: &ConstraintSet, strategy: &FitStrategy,
    options: &FitOptions,
) -> RationalResult<FitResult> {
    validate_problem(problem, constraints, strategy)?;
    let started = Instant::now();
    let num_p = problem.p_structure.len();
    let num_c = num_p + problem.q_structure.len();

    let residual = residual_matrix(problem);
    let hessian = residual.t().dot(&residual);
    let q_rows = constraints.design_matrix();
    let selected = strategy.selected_indices(problem.p_structure, problem.q_structure);
    let descriptors = describe_constraints(q_rows.nrows(), strategy, &selected);

    let mut start = Array1::<f64>::zeros(num_c);
    match problem.warm_start {
        Some(w) => start.assign(&w),
        None => start[num_p] = 1.0,
    }

    // Columns of the optimizer vector, as indices into `[p ; q]`.
    let pinned: Vec<usize> = descriptors
        .iter()
        .filter_map(|d| match d {
            ConstraintDescriptor::PinnedZero { coeff } => Some(*coeff),
            _ => None,
        })
        .collect();
    let free: Vec<usize> = (0..num_c).filter(|k| !pinned.contains(k)).collect();
    let n_surrogates = match strategy {
        FitStrategy::L1Penalty { .. } => selected.len(),
        _ => 0,
    };
    let nvar = free.len() + n_surrogates;
    let position = |coeff: usize| free.iter().position(|&k| k == coeff);

    let mut program_hessian = Array2::<f64>::zeros((nvar, nvar));
    for (a, &ka) in free.iter().enumerate() {
        for (b, &kb) in free.iter().enumerate() {
            program_hessian[[a, b]] = hessian[[ka, kb]];
        }
    }
    let mut linear = Array1::<f64>::zeros(nvar);
    linear.slice_mut(s![free.len()..]).fill(strategy.lambda());

    let n_ineq = descriptors.iter().filter(|d| d.is_inequality()).count();
    let mut g = Array2::<f64>::zeros((n_ineq, nvar));
    let mut rhs = Array1::<f64>::zeros(n_ineq);
    let mut r = 0;
    for d in &descriptors {
        match *d {
            ConstraintDescriptor::Positivity { row } => {
                for (j, &value) in q_rows.row(row).iter().enumerate() {
                    if let Some(col) = position(num_p + j) {
                        g[[r, col]] = value;
                    }
                }
                rhs[r] = 1.0;
            }
            ConstraintDescriptor::AbsUpper { coeff, surrogate } => {
                g[[r, free.len() + surrogate]] = 1.0;
                if let Some(col) = position(coeff) {
                    g[[r, col]] = -1.0;
                }
            }
            ConstraintDescriptor::AbsLower { coeff, surrogate } => {
                g[[r, free.len() + surrogate]] = 1.0;
                if let Some(col) = position(coeff) {
                    g[[r, col]] = 1.0;
                }
            }
            ConstraintDescriptor::PinnedZero { .. } => continue,
        }
        r += 1;
    }

    let mut v0 = Array1::<f64>::zeros(nvar);
    for (a, &k) in free.iter().enumerate() {
        v0[a] = start[k];
    }
    for (j, &k) in selected.iter().enumerate().take(n_surrogates) {
        v0[free.len() + j] = start[k].abs();
    }

    let program = QuadraticProgram { hessian: program_hessian, linear, constraints: g, rhs };
    debug!(
        "fit: strategy {}, {} variables, {} inequality rows, {} pinned",
        strategy.code(),
        nvar,
        n_ineq,
        pinned.len()
    );
    let outcome = augmented::solve(&program, v0, options);

    let mut coeffs = Array1::<f64>::zeros(num_c);
    for (a, &k) in free.iter().enumerate() {
        coeffs[k] = outcome.solution[a];
    }
    let l2_term = residual.dot(&coeffs).mapv(|r| r * r).sum();
    let l1_term = match strategy {
        FitStrategy::L1Penalty { .. } => Some(
            selected.iter().map(|&k| coeffs[k].abs()).filter(|&a| a > L1_COUNT_TOL).sum::<f64>(),
        ),
        _ => None,
    };
    let objective = l2_term + strategy.lambda() * l1_term.unwrap_or(0.0);

    let qcoeff = coeffs.slice(s![num_p..]).to_owned();
    let pcoeff = coeffs.slice(s![..num_p]).to_owned();
    Ok(FitResult {
        pcoeff,
        qcoeff,
        objective,
        diagnostics: FitDiagnostics {
            l2_term,
            l1_term,
            status: outcome.status,
            converged: outcome.converged,
            outer_iterations: outcome.outer_iterations,
            inner_iterations: outcome.inner_iterations,
            max_violation: outcome.max_violation,
            wall_time: started.elapsed(),
        },
    })
}

// ---- Helper Methods ----

/// `R = [−P | diag(y) Q]`, so that `R c` holds the residuals `y q − p`.
fn residual_matrix(problem: &FitProblem<'_>) -> Array2<f64> {
    let num_p = problem.p_design.ncols();
    let mut residual = Array2::<f64>::zeros((problem.values.len(), num_p + problem.q_design.ncols()));
    residual.slice_mut(s![.., ..num_p]).assign(&problem.p_design.mapv(|v| -v));
    residual
        .slice_mut(s![.., num_p..])
        .assign(&(&problem.q_design * &problem.values.insert_axis(Axis(1))));
    residual
}

fn validate_problem(
    problem: &FitProblem<'_>, constraints: &ConstraintSet, strategy: &FitStrategy,
) -> RationalResult<()> {
    let n = problem.values.len();
    for rows in [problem.p_design.nrows(), problem.q_design.nrows()] {
        if rows != n {
            return Err(RationalError::LengthMismatch { points: rows, values: n });
        }
    }
    if n == 0 {
        return Err(RationalError::EmptyTrainingSet);
    }
    let num_p = problem.p_structure.len();
    let num_q = problem.q_structure.len();
    for (expected, found) in [(num_p, problem.p_design.ncols()), (num_q, problem.q_design.ncols())] {
        if expected != found {
            return Err(RationalError::CoeffLengthMismatch { expected, found });
        }
    }
    if !constraints.is_empty() {
        let cols = constraints.design_matrix().ncols();
        if cols != num_q {
            return Err(RationalError::CoeffLengthMismatch { expected: num_q, found: cols });
        }
    }
    if let Some(w) = problem.warm_start {
        if w.len() != num_p + num_q {
            return Err(RationalError::CoeffLengthMismatch { expected: num_p + num_q, found: w.len() });
        }
    }
    let check_mask = |mask: &PenaltyMask, structure: &MonomialStructure, which: &'static str| {
        if mask.active().len() != structure.degree() + 1 {
            return Err(RationalError::InvalidPenaltyMask {
                which,
                expected: structure.degree() + 1,
                found: mask.active().len(),
            });
        }
        Ok(())
    };
    match strategy {
        FitStrategy::Plain => Ok(()),
        FitStrategy::PinnedZero { numerator, denominator } => {
            check_mask(numerator, problem.p_structure, "numerator")?;
            check_mask(denominator, problem.q_structure, "denominator")
        }
        FitStrategy::L1Penalty { lambda, numerator, denominator } => {
            validate_penalty(*lambda)?;
            check_mask(numerator, problem.p_structure, "numerator")?;
            check_mask(denominator, problem.q_structure, "denominator")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::core::{recurrence::evaluate_many, structure::generate_structure};
    use ndarray::array;

    // ---- Test plan ----
    //
    // Scope
    // -----
    // - Plain fit reproduces an exactly representable rational function.
    // - Positivity rows hold at every constraint point after the fit.
    // - Strategy 1 returns exact zeros for pinned coefficients.
    // - Strategy 2 reports the L1/L2 split and shrinks the penalized block.
    // - The reported L2 term is the direct residual sum of squares.
    // - A starved solver budget is reported through `converged`.
    // - Descriptor lowering and shape validation.

    struct Fixture {
        points: Array2<f64>,
        values: Array1<f64>,
        p: MonomialStructure,
        q: MonomialStructure,
    }

    impl Fixture {
        fn new(f: impl Fn(f64) -> f64, m: usize, n: usize, count: usize) -> Self {
            let points =
                Array2::from_shape_fn((count, 1), |(i, _)| -1.0 + 2.0 * i as f64 / (count - 1) as f64);
            let values = points.column(0).mapv(&f);
            Self {
                points,
                values,
                p: generate_structure(1, m).unwrap(),
                q: generate_structure(1, n).unwrap(),
            }
        }

        fn run(&self, strategy: &FitStrategy) -> (FitResult, ConstraintSet) {
            self.run_with(strategy, &FitOptions::default())
        }

        fn run_with(&self, strategy: &FitStrategy, options: &FitOptions) -> (FitResult, ConstraintSet) {
            let pd = evaluate_many(self.points.view(), &self.p);
            let qd = evaluate_many(self.points.view(), &self.q);
            let constraints = ConstraintSet::seeded(self.points.view(), qd.view());
            let problem = FitProblem {
                p_design: pd.view(),
                q_design: qd.view(),
                values: self.values.view(),
                p_structure: &self.p,
                q_structure: &self.q,
                warm_start: None,
            };
            let result = fit(&problem, &constraints, strategy, options).unwrap();
            (result, constraints)
        }
    }

    #[test]
    // Purpose
    // -------
    // An exactly representable target is reproduced at the training points.
    //
    // Given
    // -----
    // - y = (1 + x + x²) / (2 + x) on 21 points in [-1, 1], m = 2, n = 1.
    //
    // Expect
    // ------
    // - Converged, residual objective ~ 0, p/q matches y to 1e-4.
    fn plain_fit_reproduces_exact_rational() {
        // Arrange
        let fx = Fixture::new(|x| (1.0 + x + x * x) / (2.0 + x), 2, 1, 21);

        // Act
        let (result, _) = fx.run(&FitStrategy::Plain);

        // Assert
        assert!(result.diagnostics.converged, "{}", result.diagnostics.status);
        assert!(result.objective < 1e-8, "objective = {}", result.objective);
        assert_eq!(result.diagnostics.l1_term, None);
        let pd = evaluate_many(fx.points.view(), &fx.p).dot(&result.pcoeff);
        let qd = evaluate_many(fx.points.view(), &fx.q).dot(&result.qcoeff);
        for i in 0..fx.values.len() {
            assert!((pd[i] / qd[i] - fx.values[i]).abs() < 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // The L2 term equals `Σ (y q − p)²` evaluated directly, including near an
    // exact fit where the residual sum is tiny.
    //
    // Given
    // -----
    // - An exactly representable target (residual ~ 0) and a non-rational
    //   target (residual > 0).
    //
    // Expect
    // ------
    // - `l2_term ≥ 0` and agrees with the pointwise sum to 1e-12 absolute.
    fn l2_term_matches_pointwise_residuals() {
        for fx in [
            Fixture::new(|x| (1.0 + x + x * x) / (2.0 + x), 2, 1, 21),
            Fixture::new(|x| x.exp(), 1, 1, 11),
        ] {
            // Act
            let (result, _) = fx.run(&FitStrategy::Plain);

            // Assert
            let pd = evaluate_many(fx.points.view(), &fx.p).dot(&result.pcoeff);
            let qd = evaluate_many(fx.points.view(), &fx.q).dot(&result.qcoeff);
            let direct: f64 =
                (0..fx.values.len()).map(|i| (fx.values[i] * qd[i] - pd[i]).powi(2)).sum();
            assert!(result.diagnostics.l2_term >= 0.0, "{}", result.diagnostics.l2_term);
            assert!((result.diagnostics.l2_term - direct).abs() < 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A fit that runs out of solver budget keeps its last iterate and says
    // so instead of claiming convergence.
    //
    // Given
    // -----
    // - y = exp(x), m = n = 2; one L-BFGS iteration and one outer iteration.
    //
    // Expect
    // ------
    // - `Ok` with `converged == false`, one outer iteration, finite
    //   coefficients and an exhausted-budget status.
    fn starved_fit_reports_non_convergence() {
        // Arrange
        let fx = Fixture::new(|x| x.exp(), 2, 2, 15);
        let defaults = FitOptions::default();
        let mut solver = defaults.solver.clone();
        solver.tols.max_iter = Some(1);
        let options = FitOptions { solver, max_outer: 1, ..defaults };

        // Act
        let (result, _) = fx.run_with(&FitStrategy::Plain, &options);

        // Assert
        assert!(!result.diagnostics.converged, "{}", result.diagnostics.status);
        assert_eq!(result.diagnostics.outer_iterations, 1);
        assert!(result.diagnostics.status.starts_with("Outer budget exhausted"));
        assert!(result.pcoeff.iter().chain(result.qcoeff.iter()).all(|c| c.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // Every positivity row holds after the fit (up to the solver tolerance).
    fn fit_respects_positivity_rows() {
        let fx = Fixture::new(|x| x.exp(), 2, 2, 15);
        let (result, constraints) = fx.run(&FitStrategy::Plain);
        let q_at = constraints.design_matrix().dot(&result.qcoeff);
        assert!(q_at.iter().all(|&v| v >= 1.0 - 1e-4), "{q_at:?}");
    }

    #[test]
    // Purpose
    // -------
    // Strategy 1 re-inserts exact zeros for pinned coefficients.
    //
    // Given
    // -----
    // - m = 2, n = 2; numerator degree 2 and denominator degree 1 pinned.
    //
    // Expect
    // ------
    // - `pcoeff[2] == 0.0` and `qcoeff[1] == 0.0` exactly.
    fn pinned_fit_returns_exact_zeros() {
        let fx = Fixture::new(|x| 1.0 / (1.5 + x * x), 2, 2, 15);
        let strategy = FitStrategy::from_parts(
            1,
            0.0,
            Some(&[true, true, false][..]),
            Some(&[true, false, true][..]),
            2,
            2,
        )
        .unwrap();
        let (result, _) = fx.run(&strategy);
        assert_eq!(result.pcoeff[2], 0.0);
        assert_eq!(result.qcoeff[1], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Strategy 2 splits the objective and shrinks the penalized block.
    //
    // Given
    // -----
    // - y = exp(x), m = 2, n = 1; the degree-1 denominator coefficient is
    //   penalized with λ = 10.
    //
    // Expect
    // ------
    // - `objective = l2 + λ l1`; the penalized coefficient is no larger in
    //   magnitude than the plain fit's.
    fn l1_fit_reports_split_and_shrinks() {
        let fx = Fixture::new(|x| x.exp(), 2, 1, 21);
        let strategy = FitStrategy::from_parts(
            2,
            10.0,
            Some(&[true, true, true][..]),
            Some(&[true, false][..]),
            2,
            1,
        )
        .unwrap();
        let (plain, _) = fx.run(&FitStrategy::Plain);
        let (penalized, _) = fx.run(&strategy);
        let d = &penalized.diagnostics;
        let l1 = d.l1_term.unwrap();
        assert!((penalized.objective - (d.l2_term + 10.0 * l1)).abs() < 1e-10);
        assert!(penalized.qcoeff[1].abs() <= plain.qcoeff[1].abs() + 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // Descriptors list positivity rows first, then strategy-specific rows.
    fn describe_constraints_lowers_each_strategy() {
        let pinned = FitStrategy::from_parts(1, 0.0, Some(&[true, false][..]), Some(&[true, true][..]), 1, 1)
            .unwrap();
        assert_eq!(
            describe_constraints(2, &pinned, &[1]),
            vec![
                ConstraintDescriptor::Positivity { row: 0 },
                ConstraintDescriptor::Positivity { row: 1 },
                ConstraintDescriptor::PinnedZero { coeff: 1 },
            ]
        );
        let l1 = FitStrategy::from_parts(2, 1.0, Some(&[true, false][..]), Some(&[true, true][..]), 1, 1)
            .unwrap();
        assert_eq!(
            describe_constraints(1, &l1, &[1]),
            vec![
                ConstraintDescriptor::Positivity { row: 0 },
                ConstraintDescriptor::AbsUpper { coeff: 1, surrogate: 0 },
                ConstraintDescriptor::AbsLower { coeff: 1, surrogate: 0 },
            ]
        );
        assert_eq!(describe_constraints(3, &FitStrategy::Plain, &[]).len(), 3);
    }

    #[test]
    // Purpose
    // -------
    // Inconsistent shapes and mismatched masks are rejected before solving.
    fn fit_rejects_inconsistent_inputs() {
        let p = generate_structure(1, 1).unwrap();
        let q = generate_structure(1, 1).unwrap();
        let pts = array![[0.0], [1.0]];
        let pd = evaluate_many(pts.view(), &p);
        let qd = evaluate_many(pts.view(), &q);
        let constraints = ConstraintSet::seeded(pts.view(), qd.view());
        let values = array![1.0, 2.0, 3.0];
        let problem = FitProblem {
            p_design: pd.view(),
            q_design: qd.view(),
            values: values.view(),
            p_structure: &p,
            q_structure: &q,
            warm_start: None,
        };
        assert!(matches!(
            fit(&problem, &constraints, &FitStrategy::Plain, &FitOptions::default()),
            Err(RationalError::LengthMismatch { .. })
        ));

        let values = array![1.0, 2.0];
        let problem = FitProblem { values: values.view(), ..problem };
        let wrong_degree = FitStrategy::from_parts(1, 0.0, Some(&[true; 3][..]), Some(&[true; 2][..]), 2, 1)
            .unwrap();
        assert!(matches!(
            fit(&problem, &constraints, &wrong_degree, &FitOptions::default()),
            Err(RationalError::InvalidPenaltyMask { which: "numerator", .. })
        ));
    }
}
