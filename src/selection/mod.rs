//! selection — k-fold cross-validation and penalty selection for SIP fits.
//!
//! Purpose
//! -------
//! Choose the L1 penalty weight (or compare any other configurations) by
//! contiguous k-fold cross-validation of full SIP runs, and apply the
//! one-standard-error rule to prefer simpler models whose error is
//! statistically indistinguishable from the best.
//!
//! Key behaviors
//! -------------
//! - [`cross_validate`] fits on `k − 1` folds and scores the held-out fold
//!   by its sum of squared errors. A fold whose run exhausts the positivity
//!   budget is scored with the last fitted iterate; a fold whose model hits
//!   a denominator root on test data scores `+∞`.
//! - [`one_standard_error`] picks, among candidates ordered from most to
//!   least regularized, the first whose mean error is within one standard
//!   error of the best mean.
//! - [`select_penalty`] sweeps λ under strategy 2 and reports both the
//!   minimum-error and one-SE choices.
//!
//! Invariants & assumptions
//! ------------------------
//! - Folds are contiguous row blocks ([`TrainingSet::fold`]); shuffle the
//!   data beforehand for a randomized split.
//! - The standard error uses the sample standard deviation of the best
//!   candidate's fold errors divided by `√k` (`statrs`).
//!
//! Testing notes
//! -------------
//! - Unit tests cover CV on an exactly representable target, the one-SE
//!   rule on hand-built scores, and input validation for the λ sweep.
use crate::rational::{
    core::{data::TrainingSet, options::SipConfig},
    errors::{RationalError, RationalResult},
    models::RationalModel,
};
use log::{info, warn};
use ndarray::Array1;
use statrs::statistics::Statistics;

/// Cross-validation outcome for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct CvScore {
    /// Held-out sum of squared errors, one entry per fold.
    pub fold_errors: Vec<f64>,
    /// Mean of `fold_errors`.
    pub mean: f64,
}

impl CvScore {
    pub fn new(fold_errors: Vec<f64>) -> Self {
        let mean = fold_errors.iter().mean();
        Self { fold_errors, mean }
    }

    /// Number of folds.
    pub fn k(&self) -> usize {
        self.fold_errors.len()
    }

    /// Sample standard deviation of the fold errors over `√k`.
    pub fn std_error(&self) -> f64 {
        self.fold_errors.iter().std_dev() / (self.k() as f64).sqrt()
    }
}

/// Result of a λ sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltySelection {
    pub lambdas: Vec<f64>,
    pub scores: Vec<CvScore>,
    /// Index of the smallest mean error.
    pub best_index: usize,
    /// Index chosen by the one-standard-error rule.
    pub one_se_index: usize,
}

impl PenaltySelection {
    pub fn best_lambda(&self) -> f64 {
        self.lambdas[self.best_index]
    }

    pub fn one_se_lambda(&self) -> f64 {
        self.lambdas[self.one_se_index]
    }
}

/// Contiguous k-fold cross-validation of a SIP configuration.
///
/// Parameters
/// ----------
/// - `set`: full data set; fold `i` holds out a contiguous block of rows.
/// - `config`: applied unchanged to every training split.
/// - `k`: number of folds, `2 ≤ k ≤ set.len()`.
///
/// Errors
/// ------
/// - `InvalidFold` for a bad `k`.
/// - Configuration and data errors from the SIP controller.
pub fn cross_validate(set: &TrainingSet, config: &SipConfig, k: usize) -> RationalResult<CvScore> {
    let mut fold_errors = Vec::with_capacity(k);
    for i in 0..k {
        let (train, test) = set.fold(k, i)?;
        let model = fold_model(&train, config)?;
        let error = match model.evaluate_many(test.points()) {
            Ok(pred) => (&pred - &test.values()).mapv(|r| r * r).sum(),
            Err(RationalError::DivisionDegenerate { index, value }) => {
                warn!("fold {i}: denominator {value:.3e} at test row {index}; scoring as +inf");
                f64::INFINITY
            }
            Err(e) => return Err(e),
        };
        info!("fold {}/{k}: held-out SSE {error:.6e}", i + 1);
        fold_errors.push(error);
    }
    Ok(CvScore::new(fold_errors))
}

/// One-standard-error rule over candidates ordered from most to least
/// regularized.
///
/// Errors
/// ------
/// - `InvalidSelection` if `scores` is empty, a mean is NaN, or no
///   candidate has a finite mean.
pub fn one_standard_error(scores: &[CvScore]) -> RationalResult<usize> {
    let best = best_index(scores)?;
    let bound = scores[best].mean + scores[best].std_error();
    // The best candidate satisfies the bound, so a match always exists.
    Ok(scores.iter().position(|s| s.mean <= bound).unwrap_or(best))
}

/// Sweep the L1 penalty weight under strategy 2.
///
/// Parameters
/// ----------
/// - `lambdas`: non-empty, finite, non-negative and non-increasing
///   (most regularized first).
///
/// Errors
/// ------
/// - `InvalidSelection` if `config.strategy != 2` or `lambdas` is empty,
///   unordered or not finite and non-negative.
/// - Any error from [`cross_validate`].
pub fn select_penalty(
    set: &TrainingSet, config: &SipConfig, lambdas: &[f64], k: usize,
) -> RationalResult<PenaltySelection> {
    if config.strategy != 2 {
        return Err(RationalError::InvalidSelection {
            reason: "Penalty selection requires fitting strategy 2.",
        });
    }
    if lambdas.is_empty() {
        return Err(RationalError::InvalidSelection { reason: "No penalty weights given." });
    }
    if lambdas.iter().any(|l| !l.is_finite() || *l < 0.0) {
        return Err(RationalError::InvalidSelection {
            reason: "Penalty weights must be finite and non-negative.",
        });
    }
    if lambdas.windows(2).any(|w| w[1] > w[0]) {
        return Err(RationalError::InvalidSelection {
            reason: "Penalty weights must be ordered from largest to smallest.",
        });
    }

    let mut scores = Vec::with_capacity(lambdas.len());
    for &lambda in lambdas {
        let candidate = SipConfig { lambda, ..config.clone() };
        let score = cross_validate(set, &candidate, k)?;
        info!("lambda = {lambda:.3e}: mean held-out SSE {:.6e}", score.mean);
        scores.push(score);
    }
    let best_index = best_index(&scores)?;
    let one_se_index = one_standard_error(&scores)?;
    Ok(PenaltySelection { lambdas: lambdas.to_vec(), scores, best_index, one_se_index })
}

// ---- Helper Methods ----

fn best_index(scores: &[CvScore]) -> RationalResult<usize> {
    if scores.is_empty() {
        return Err(RationalError::InvalidSelection { reason: "No candidates to compare." });
    }
    if scores.iter().any(|s| s.mean.is_nan()) {
        return Err(RationalError::InvalidSelection { reason: "A mean error is NaN." });
    }
    let best = scores
        .iter()
        .enumerate()
        .fold(0, |acc, (i, s)| if s.mean < scores[acc].mean { i } else { acc });
    if !scores[best].mean.is_finite() {
        return Err(RationalError::InvalidSelection {
            reason: "No candidate has a finite mean error.",
        });
    }
    Ok(best)
}

/// Fitted model for one training split; an exhausted run falls back to its
/// last iterate.
fn fold_model(train: &TrainingSet, config: &SipConfig) -> RationalResult<RationalModel> {
    match RationalModel::fit(train, config) {
        Ok(run) => Ok(run.model),
        Err(err @ RationalError::PositivityExhausted { .. }) => {
            let Some(last) = err.history().and_then(|h| h.last()) else {
                return Err(err);
            };
            warn!(
                "fold not certified after {} iterations; scoring last iterate (min q = {:.3e})",
                last.iteration, last.certification.value
            );
            let scaler = if config.rescale { Some(config.domain_box(train.dim())?) } else { None };
            RationalModel::new(
                train.dim(),
                config.m,
                config.n,
                Array1::from_vec(last.pcoeff.clone()),
                Array1::from_vec(last.qcoeff.clone()),
                scaler,
            )
        }
        Err(e) => Err(e),
    }
}
