//! Sequential Iterative Positivity (SIP) controller.
//!
//! Purpose
//! -------
//! Drive the outer loop that alternates a constrained fit with a global
//! certification of `min q` over the box, appending each violating point
//! as a new constraint until the denominator is certified positive or the
//! budget runs out.
//!
//! Key behaviors
//! -------------
//! - States [`SipState::Fitting`] → [`SipState::Certifying`] →
//!   {[`SipState::Converged`] | [`SipState::Exhausted`]}, with a return to
//!   fitting after every violation.
//! - A non-converged fit is logged and kept; `retry_nonconverged` extra
//!   refits on the same constraints are attempted first.
//! - Each iteration certifies with seed `seed + iteration`, so runs are
//!   reproducible and iterations draw different samples.
//! - Design matrices of the training points come from a
//!   [`RecurrenceCache`] owned by the controller.
//! - Exhaustion (iteration or wall-clock budget) returns
//!   [`RationalError::PositivityExhausted`] with the full history.
//!
//! Invariants & assumptions
//! ------------------------
//! - The constraint set only grows, by exactly one point per violating
//!   iteration.
//! - The wall-clock budget is checked after each certification, so at
//!   least one iteration always runs.
//! - With `rescale`, fitting and certification happen on `[-1, 1]^D` and
//!   the returned model carries the raw box as its scaler.
use crate::rational::{
    certify::{certify, Certifier},
    core::{
        bounds::DomainBox,
        constraints::ConstraintSet,
        data::TrainingSet,
        options::{FitStrategy, SipConfig},
        recurrence::RecurrenceCache,
        structure::MonomialStructure,
    },
    errors::{RationalError, RationalResult},
    fit::{fit, FitProblem, FitResult},
    models::rational::RationalModel,
    records::{IterationRecord, ModelRecord},
};
use log::{error, info, warn};
use ndarray::{Array1, Array2};
use std::time::{Duration, Instant};

/// Phase of the SIP loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SipState {
    Fitting,
    Certifying,
    Converged,
    Exhausted,
}

/// Outcome of a certified SIP run.
#[derive(Debug, Clone, PartialEq)]
pub struct SipRun {
    pub model: RationalModel,
    pub history: Vec<IterationRecord>,
    pub constraints: ConstraintSet,
    /// Number of leading training points used.
    pub training_size: usize,
    /// Certification box in raw coordinates.
    pub domain: DomainBox,
    pub elapsed: Duration,
}

impl SipRun {
    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    /// Certified `min q` of the final iteration.
    pub fn certified_min(&self) -> f64 {
        self.history.last().map_or(f64::NAN, |r| r.certification.value)
    }

    /// Serializable record of this run.
    pub fn record(&self, config: &SipConfig) -> ModelRecord {
        ModelRecord::from_run(self, config)
    }
}

/// Runs SIP for one validated configuration.
#[derive(Debug, Clone)]
pub struct SipController {
    config: SipConfig,
    strategy: FitStrategy,
    certifier: Certifier,
    cache: RecurrenceCache,
    state: SipState,
}

impl SipController {
    /// # Errors
    /// - Any error from [`SipConfig::validate`].
    pub fn new(config: SipConfig) -> RationalResult<Self> {
        config.validate()?;
        let strategy = config.fit_strategy()?;
        let certifier =
            Certifier::new(config.certifier.clone(), config.seed, config.local_solver.clone());
        Ok(Self { config, strategy, certifier, cache: RecurrenceCache::new(), state: SipState::Fitting })
    }

    pub fn config(&self) -> &SipConfig {
        &self.config
    }

    /// State reached by the last call to [`SipController::run`].
    pub fn state(&self) -> SipState {
        self.state
    }

    pub fn cache(&self) -> &RecurrenceCache {
        &self.cache
    }

    /// Fit and certify until positivity holds on the box.
    ///
    /// Parameters
    /// ----------
    /// - `data`: full training set; the leading rows selected by the
    ///   training-scale policy are used.
    ///
    /// Errors
    /// ------
    /// - `InsufficientTrainingData` when the policy needs more rows.
    /// - `PointDimMismatch` when the configured box has the wrong dimension.
    /// - `PositivityExhausted` when the iteration or wall-clock budget
    ///   runs out, carrying every [`IterationRecord`].
    pub fn run(&mut self, data: &TrainingSet) -> RationalResult<SipRun> {
        let started = Instant::now();
        let cfg = &self.config;
        let dim = data.dim();
        let p_structure = MonomialStructure::new(dim, cfg.m)?;
        let q_structure = MonomialStructure::new(dim, cfg.n)?;
        let training_size = cfg.training_scale.size(p_structure.len(), q_structure.len(), data.len())?;
        let train = data.head(training_size)?;
        let domain = cfg.domain_box(dim)?;

        let (points, cert_box, scaler) = if cfg.rescale {
            let mut scaled = Array2::zeros(train.points().raw_dim());
            for (i, row) in train.points().outer_iter().enumerate() {
                scaled.row_mut(i).assign(&domain.to_unit(row));
            }
            (scaled, DomainBox::unit(dim)?, Some(domain.clone()))
        } else {
            (train.points().to_owned(), domain.clone(), None)
        };
        let p_design = self.cache.design(points.view(), &p_structure).clone();
        let q_design = self.cache.design(points.view(), &q_structure).clone();
        let mut constraints = ConstraintSet::seeded(points.view(), q_design.view());

        let budget = cfg.wall_clock();
        let mut history: Vec<IterationRecord> = Vec::new();
        let mut warm: Option<Array1<f64>> = None;
        let mut last_value = f64::NAN;
        info!(
            "SIP start: dim {dim}, m {}, n {}, {} training points, strategy {}",
            cfg.m,
            cfg.n,
            training_size,
            self.strategy.code()
        );

        for iteration in 1..=cfg.max_iterations {
            self.state = SipState::Fitting;
            let mut result = self.fit_once(
                &p_design,
                &q_design,
                &train,
                &p_structure,
                &q_structure,
                &constraints,
                warm.as_ref(),
            )?;
            let mut retries = 0;
            while !result.diagnostics.converged && retries < cfg.retry_nonconverged {
                retries += 1;
                warn!(
                    "SIP iteration {iteration}: fit did not converge ({}); retry {retries}",
                    result.diagnostics.status
                );
                let restart = stack(&result);
                result = self.fit_once(
                    &p_design,
                    &q_design,
                    &train,
                    &p_structure,
                    &q_structure,
                    &constraints,
                    Some(&restart),
                )?;
            }
            if !result.diagnostics.converged {
                warn!(
                    "SIP iteration {iteration}: keeping non-converged fit ({}), max violation {:.3e}",
                    result.diagnostics.status, result.diagnostics.max_violation
                );
            }

            self.state = SipState::Certifying;
            let certifier = self.certifier.with_seed(cfg.seed.wrapping_add(iteration as u64));
            let certification =
                certify(&certifier, result.qcoeff.view(), &q_structure, &cert_box, cfg.threshold)?;
            last_value = certification.value;
            let certified = certification.is_certified(cfg.threshold);
            if !certified {
                constraints.push(certification.point.view(), &q_structure);
            }
            info!(
                "SIP iteration {iteration}: objective {:.6e}, min q {:.6e} via {}, {} constraints",
                result.objective,
                certification.value,
                certification.strategy,
                constraints.len()
            );
            history.push(IterationRecord::new(
                iteration,
                &result,
                &certification,
                certified,
                constraints.len(),
            ));

            if certified {
                self.state = SipState::Converged;
                let model = RationalModel::new(dim, cfg.m, cfg.n, result.pcoeff, result.qcoeff, scaler)?;
                return Ok(SipRun {
                    model,
                    history,
                    constraints,
                    training_size,
                    domain,
                    elapsed: started.elapsed(),
                });
            }
            warm = Some(stack(&result));
            if budget.is_some_and(|b| started.elapsed() >= b) {
                warn!("SIP wall-clock budget reached after {iteration} iterations");
                break;
            }
        }

        self.state = SipState::Exhausted;
        error!(
            "SIP exhausted after {} iterations without certifying positivity (last min q {last_value:.6e})",
            history.len()
        );
        Err(RationalError::PositivityExhausted { iterations: history.len(), last_value, history })
    }

    // ---- Helper Methods ----

    #[allow(clippy::too_many_arguments)]
    fn fit_once(
        &self, p_design: &Array2<f64>, q_design: &Array2<f64>, train: &TrainingSet,
        p_structure: &MonomialStructure, q_structure: &MonomialStructure,
        constraints: &ConstraintSet, warm: Option<&Array1<f64>>,
    ) -> RationalResult<FitResult> {
        let problem = FitProblem {
            p_design: p_design.view(),
            q_design: q_design.view(),
            values: train.values(),
            p_structure,
            q_structure,
            warm_start: warm.map(Array1::view),
        };
        fit(&problem, constraints, &self.strategy, &self.config.fit)
    }
}

/// `[p ; q]` of a fit result.
fn stack(result: &FitResult) -> Array1<f64> {
    result.pcoeff.iter().chain(result.qcoeff.iter()).copied().collect()
}
