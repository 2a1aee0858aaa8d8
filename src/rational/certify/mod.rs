//! Positivity certification — search a box for the minimum of `q(x)`.
//!
//! Purpose
//! -------
//! After every fit the SIP controller asks a certifier for the smallest
//! denominator value it can find inside the certification box. A value at
//! or above the threshold ends the run; anything below it hands back the
//! offending point as a new constraint.
//!
//! Key behaviors
//! -------------
//! - One trait, [`Certify`], implemented by a closed set of strategies:
//!   [`SingleStart`], [`MultiStart`], [`BranchAndBound`],
//!   [`DirectSampling`], and [`Compare`] which runs the other four, with
//!   sampling repeated at growing budgets.
//! - [`CertifierKind`] is the serializable selector; [`Certifier`] turns it
//!   plus a seed and local-solver options into a runnable certifier.
//! - [`certify`] validates inputs once and dispatches.
//!
//! Invariants & assumptions
//! ------------------------
//! - Certifiers never mutate coefficients or constraints.
//! - The box and the coefficients live in the same coordinates the
//!   denominator is evaluated in (model coordinates).
//! - With a fixed seed, every strategy is deterministic, including the
//!   parallel modes.
//!
//! Conventions
//! -----------
//! - `Certification::value` is the smallest `q` found, not a proven lower
//!   bound (the branch-and-bound log reports its bound separately).
pub mod branch_bound;
pub mod local;
pub mod sampling;

pub use self::branch_bound::BranchAndBound;
pub use self::local::{
    BoxMinimizer, BoxMinimum, BoxObjective, DenominatorSurface, LogisticLbfgs, MultiStart,
    SingleStart,
};
pub use self::sampling::DirectSampling;

use crate::{
    optimization::smooth_optimizer::SolverOptions,
    rational::{
        core::{
            bounds::DomainBox,
            structure::MonomialStructure,
            validation::{validate_coefficients, validate_threshold},
        },
        errors::{RationalError, RationalResult},
    },
};
use log::debug;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Default number of starts for [`MultiStart`].
pub const DEFAULT_RESTARTS: usize = 10;

/// Default sample budget for [`DirectSampling`].
pub const DEFAULT_MAX_EVALS: usize = 50_000;

/// Default node budget for [`BranchAndBound`].
pub const DEFAULT_MAX_NODES: usize = 20_000;

/// Default absolute gap at which branch-and-bound stops.
pub const DEFAULT_GAP_TOL: f64 = 1e-6;

/// [`Compare`] runs direct sampling at each multiple of
/// [`DEFAULT_MAX_EVALS`] from 1 up to this value.
pub const COMPARE_SAMPLING_MULTIPLES: usize = 4;

/// One line of a certifier's diagnostic log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationEntry {
    /// What produced the entry, e.g. `restart 3` or `near-violation`.
    pub label: String,
    pub point: Vec<f64>,
    pub value: f64,
    /// Objective evaluations, iterations or nodes behind this entry.
    pub evaluations: usize,
    pub status: String,
}

impl CertificationEntry {
    pub fn new(
        label: impl Into<String>, point: ArrayView1<f64>, value: f64, evaluations: usize,
        status: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            point: point.to_vec(),
            value,
            evaluations,
            status: status.into(),
        }
    }
}

/// Result of one certification: the worst point found and how.
#[derive(Debug, Clone, PartialEq)]
pub struct Certification {
    pub point: Array1<f64>,
    pub value: f64,
    /// Name of the strategy that produced `point`.
    pub strategy: String,
    pub log: Vec<CertificationEntry>,
}

impl Certification {
    /// `true` if the certified minimum clears `threshold`.
    pub fn is_certified(&self, threshold: f64) -> bool {
        self.value >= threshold
    }

    /// Total evaluations recorded in the log.
    pub fn evaluations(&self) -> usize {
        self.log.iter().map(|e| e.evaluations).sum()
    }
}

/// A positivity certification strategy.
///
/// Implementors receive validated input: `qcoeff.len() == structure.len()`,
/// `domain.dim() == structure.dim()`, `threshold > 0`.
pub trait Certify {
    fn name(&self) -> &'static str;

    fn certify(
        &self, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
        threshold: f64,
    ) -> Certification;
}

fn default_restarts() -> usize {
    DEFAULT_RESTARTS
}

fn default_max_evals() -> usize {
    DEFAULT_MAX_EVALS
}

fn default_max_nodes() -> usize {
    DEFAULT_MAX_NODES
}

fn default_gap_tol() -> f64 {
    DEFAULT_GAP_TOL
}

/// Serializable selector of the certification strategy.
///
/// In TOML the variant goes in a `kind` key:
///
/// ```toml
/// [certifier]
/// kind = "deterministic_global"
/// max_nodes = 5000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CertifierKind {
    /// One bounded local search from the box midpoint.
    SingleStart,
    /// Midpoint plus seeded uniform starts; keeps the best.
    MultiStart {
        #[serde(default = "default_restarts")]
        restarts: usize,
        /// Run all starts concurrently (no early exit).
        #[serde(default)]
        parallel: bool,
    },
    /// Interval branch-and-bound.
    DeterministicGlobal {
        #[serde(default = "default_max_nodes")]
        max_nodes: usize,
        #[serde(default = "default_gap_tol")]
        gap_tol: f64,
    },
    /// Midpoint then seeded uniform samples; stops at the first violation.
    DirectSampling {
        #[serde(default = "default_max_evals")]
        max_evals: usize,
    },
    /// Run every strategy and keep the overall minimum.
    Compare,
}

impl Default for CertifierKind {
    fn default() -> Self {
        CertifierKind::MultiStart { restarts: DEFAULT_RESTARTS, parallel: false }
    }
}

impl CertifierKind {
    /// # Errors
    /// - [`RationalError::InvalidBudget`] for zero budgets or a bad gap.
    pub fn validate(&self) -> RationalResult<()> {
        let positive = |name: &'static str, value: usize| {
            if value == 0 {
                return Err(RationalError::InvalidBudget {
                    name,
                    value: 0.0,
                    reason: "Must be at least 1.",
                });
            }
            Ok(())
        };
        match *self {
            CertifierKind::SingleStart | CertifierKind::Compare => Ok(()),
            CertifierKind::MultiStart { restarts, .. } => positive("restarts", restarts),
            CertifierKind::DirectSampling { max_evals } => positive("max_evals", max_evals),
            CertifierKind::DeterministicGlobal { max_nodes, gap_tol } => {
                positive("max_nodes", max_nodes)?;
                if !gap_tol.is_finite() || gap_tol <= 0.0 {
                    return Err(RationalError::InvalidBudget {
                        name: "gap_tol",
                        value: gap_tol,
                        reason: "Must be finite and strictly positive.",
                    });
                }
                Ok(())
            }
        }
    }
}

/// Runnable certifier: a [`CertifierKind`] with its seed and local solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Certifier {
    pub kind: CertifierKind,
    pub seed: u64,
    pub local: SolverOptions,
}

impl Certifier {
    pub fn new(kind: CertifierKind, seed: u64, local: SolverOptions) -> Self {
        Self { kind, seed, local }
    }

    /// Same certifier with a different seed.
    pub fn with_seed(&self, seed: u64) -> Self {
        Self { seed, ..self.clone() }
    }
}

impl Certify for Certifier {
    fn name(&self) -> &'static str {
        match self.kind {
            CertifierKind::SingleStart => "single_start",
            CertifierKind::MultiStart { .. } => "multi_start",
            CertifierKind::DeterministicGlobal { .. } => "deterministic_global",
            CertifierKind::DirectSampling { .. } => "direct_sampling",
            CertifierKind::Compare => "compare",
        }
    }

    fn certify(
        &self, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
        threshold: f64,
    ) -> Certification {
        let local = LogisticLbfgs::new(self.local.clone());
        match self.kind {
            CertifierKind::SingleStart => {
                SingleStart { local }.certify(qcoeff, structure, domain, threshold)
            }
            CertifierKind::MultiStart { restarts, parallel } => {
                MultiStart { restarts, parallel, seed: self.seed, local }
                    .certify(qcoeff, structure, domain, threshold)
            }
            CertifierKind::DeterministicGlobal { max_nodes, gap_tol } => {
                BranchAndBound { max_nodes, gap_tol }.certify(qcoeff, structure, domain, threshold)
            }
            CertifierKind::DirectSampling { max_evals } => {
                DirectSampling { max_evals, seed: self.seed }
                    .certify(qcoeff, structure, domain, threshold)
            }
            CertifierKind::Compare => {
                Compare { seed: self.seed, local }.certify(qcoeff, structure, domain, threshold)
            }
        }
    }
}

/// Runs single-start, multi-start and branch-and-bound with their default
/// budgets, then direct sampling at 1× to [`COMPARE_SAMPLING_MULTIPLES`]×
/// the default sample budget, and reports the overall minimum.
///
/// Sampling run `k` uses seed `seed + k`, so the budgets draw independent
/// streams instead of nested prefixes of one stream.
#[derive(Debug, Clone)]
pub struct Compare {
    pub seed: u64,
    pub local: LogisticLbfgs,
}

impl Certify for Compare {
    fn name(&self) -> &'static str {
        "compare"
    }

    fn certify(
        &self, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
        threshold: f64,
    ) -> Certification {
        let mut runs: Vec<(String, Certification)> = vec![
            (
                "single_start".to_string(),
                SingleStart { local: self.local.clone() }.certify(qcoeff, structure, domain, threshold),
            ),
            (
                "multi_start".to_string(),
                MultiStart {
                    restarts: DEFAULT_RESTARTS,
                    parallel: false,
                    seed: self.seed,
                    local: self.local.clone(),
                }
                .certify(qcoeff, structure, domain, threshold),
            ),
            (
                "deterministic_global".to_string(),
                BranchAndBound { max_nodes: DEFAULT_MAX_NODES, gap_tol: DEFAULT_GAP_TOL }
                    .certify(qcoeff, structure, domain, threshold),
            ),
        ];
        for multiple in 1..=COMPARE_SAMPLING_MULTIPLES {
            let sampler = DirectSampling {
                max_evals: multiple * DEFAULT_MAX_EVALS,
                seed: self.seed.wrapping_add(multiple as u64),
            };
            runs.push((
                format!("direct_sampling {multiple}x"),
                sampler.certify(qcoeff, structure, domain, threshold),
            ));
        }

        let mut best: Option<Certification> = None;
        let mut log = Vec::with_capacity(runs.len());
        for (label, result) in runs {
            debug!("compare: {label} found q = {:.6e}", result.value);
            log.push(CertificationEntry::new(
                label,
                result.point.view(),
                result.value,
                result.evaluations(),
                if result.is_certified(threshold) { "certified" } else { "violation" },
            ));
            if best.as_ref().map_or(true, |b| result.value < b.value) {
                best = Some(result);
            }
        }
        match best {
            Some(b) => Certification {
                point: b.point,
                value: b.value,
                strategy: format!("compare ({})", b.strategy),
                log,
            },
            None => Certification {
                point: domain.midpoint(),
                value: f64::INFINITY,
                strategy: self.name().to_string(),
                log,
            },
        }
    }
}

/// Validate inputs and run `certifier`.
///
/// # Errors
/// - `CoeffLengthMismatch` / `NonFiniteCoefficient` for bad coefficients.
/// - `PointDimMismatch` if the box dimension differs from the structure's.
/// - `InvalidThreshold` for a non-positive or non-finite threshold.
pub fn certify<C: Certify + ?Sized>(
    certifier: &C, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
    threshold: f64,
) -> RationalResult<Certification> {
    validate_coefficients(qcoeff, structure.len())?;
    if domain.dim() != structure.dim() {
        return Err(RationalError::PointDimMismatch { expected: structure.dim(), found: domain.dim() });
    }
    validate_threshold(threshold)?;
    Ok(certifier.certify(qcoeff, structure, domain, threshold))
}
