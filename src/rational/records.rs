//! Plain, serializable records of SIP iterations and fitted models.
//!
//! Purpose
//! -------
//! Capture everything a caller needs to inspect, store or reload a SIP run
//! as plain data (numbers, strings, vectors). Records derive `serde`
//! traits; choosing a storage format is left to the caller.
//!
//! Key behaviors
//! -------------
//! - [`IterationRecord`] is an immutable snapshot of one fit + certify
//!   cycle, including the L1/L2 split of the objective for strategy 2.
//! - [`ModelRecord`] holds the final coefficients, the box and the
//!   hyperparameters; [`RationalModel::from_record`] rebuilds an
//!   evaluable model from it without fitting.
//!
//! Conventions
//! -----------
//! - Coefficients are in canonical monomial order.
//! - Certification points and constraint points are in model coordinates
//!   (after rescaling when `rescale` is set).
//!
//! [`RationalModel::from_record`]: crate::rational::models::rational::RationalModel::from_record
use crate::rational::{
    certify::{Certification, CertificationEntry},
    core::options::SipConfig,
    fit::FitResult,
    sip::SipRun,
};
use serde::{Deserialize, Serialize};

/// Fit diagnostics as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub objective: f64,
    pub l2_term: f64,
    pub l1_term: Option<f64>,
    pub status: String,
    pub converged: bool,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    pub max_violation: f64,
    pub wall_time_secs: f64,
}

impl From<&FitResult> for FitSummary {
    fn from(result: &FitResult) -> Self {
        let d = &result.diagnostics;
        Self {
            objective: result.objective,
            l2_term: d.l2_term,
            l1_term: d.l1_term,
            status: d.status.clone(),
            converged: d.converged,
            outer_iterations: d.outer_iterations,
            inner_iterations: d.inner_iterations,
            max_violation: d.max_violation,
            wall_time_secs: d.wall_time.as_secs_f64(),
        }
    }
}

/// Certification result as plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationSummary {
    pub point: Vec<f64>,
    pub value: f64,
    pub strategy: String,
    pub log: Vec<CertificationEntry>,
}

impl From<&Certification> for CertificationSummary {
    fn from(c: &Certification) -> Self {
        Self {
            point: c.point.to_vec(),
            value: c.value,
            strategy: c.strategy.clone(),
            log: c.log.clone(),
        }
    }
}

/// Snapshot of one SIP iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based iteration number.
    pub iteration: usize,
    pub pcoeff: Vec<f64>,
    pub qcoeff: Vec<f64>,
    pub fit: FitSummary,
    pub certification: CertificationSummary,
    /// `true` if the certified minimum cleared the threshold.
    pub certified: bool,
    /// Constraint points after this iteration (including any point it added).
    pub constraint_count: usize,
}

impl IterationRecord {
    pub fn new(
        iteration: usize, fit: &FitResult, certification: &Certification, certified: bool,
        constraint_count: usize,
    ) -> Self {
        Self {
            iteration,
            pcoeff: fit.pcoeff.to_vec(),
            qcoeff: fit.qcoeff.to_vec(),
            fit: FitSummary::from(fit),
            certification: CertificationSummary::from(certification),
            certified,
            constraint_count,
        }
    }
}

/// Everything needed to rebuild and describe a fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub dim: usize,
    pub m: usize,
    pub n: usize,
    pub pcoeff: Vec<f64>,
    pub qcoeff: Vec<f64>,
    /// Certification box in raw coordinates, `[lo, hi]` per dimension.
    pub domain: Vec<[f64; 2]>,
    /// Raw inputs are mapped from `domain` onto `[-1, 1]^D` before evaluation.
    pub rescale: bool,
    pub strategy: u8,
    pub lambda: f64,
    pub numerator_mask: Option<Vec<bool>>,
    pub denominator_mask: Option<Vec<bool>>,
    /// Training-scale label (`0.5x`, `1x`, `2x`, `Cp`).
    pub training_scale: String,
    pub training_size: usize,
    pub threshold: f64,
    /// Certified minimum of `q` from the final iteration.
    pub certified_min: f64,
    /// Points appended by certification, in insertion order.
    pub added_constraints: Vec<Vec<f64>>,
    pub fit_time_secs: f64,
    pub iterations: Vec<IterationRecord>,
}

impl ModelRecord {
    /// Record of a finished run under `config`.
    pub fn from_run(run: &SipRun, config: &SipConfig) -> Self {
        let model = &run.model;
        let (numerator_mask, denominator_mask) = match config.fit_strategy() {
            Ok(strategy) => strategy.masks(),
            Err(_) => (config.numerator_mask.clone(), config.denominator_mask.clone()),
        };
        Self {
            dim: model.dim(),
            m: model.m(),
            n: model.n(),
            pcoeff: model.pcoeff().to_vec(),
            qcoeff: model.qcoeff().to_vec(),
            domain: run.domain.pairs(),
            rescale: model.scaler().is_some(),
            strategy: config.strategy,
            lambda: config.lambda,
            numerator_mask,
            denominator_mask,
            training_scale: config.training_scale.label().to_string(),
            training_size: run.training_size,
            threshold: config.threshold,
            certified_min: run.certified_min(),
            added_constraints: run.constraints.added_points().iter().map(|p| p.to_vec()).collect(),
            fit_time_secs: run.elapsed.as_secs_f64(),
            iterations: run.history.clone(),
        }
    }
}
