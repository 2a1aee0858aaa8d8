//! Hyperparameters for SIP runs: fit strategy, penalty masks, training
//! size policy, fit-engine tuning, and the serde/TOML configuration record.
//!
//! Purpose
//! -------
//! Gather every knob of a SIP run in one validated place. [`SipConfig`] is
//! the serializable record (TOML via the `toml` crate); the typed pieces
//! ([`FitStrategy`], [`PenaltyMask`], [`TrainingScale`], [`FitOptions`]) are
//! what the fit engine and controller actually consume.
//!
//! Key behaviors
//! -------------
//! - [`PenaltyMask`] holds one flag per total degree `0..=deg`. A `false`
//!   flag selects every coefficient of that degree for pinning to zero
//!   (strategy 1) or for the L1 penalty (strategy 2); `true` keeps the
//!   degree free.
//! - [`FitStrategy::from_parts`] turns the numeric strategy code, `λ`, and
//!   optional masks into a typed strategy, validating all of them.
//! - [`TrainingScale::size`] resolves the training-size policy against the
//!   coefficient counts `M`, `N` and the available data.
//! - [`SipConfig::validate`] checks every field; [`SipConfig::from_toml_str`]
//!   parses and validates in one step.
//!
//! Invariants & assumptions
//! ------------------------
//! - Strategy 1 must leave at least one denominator degree free, otherwise
//!   `q ≡ 0` and `q(z) ≥ 1` is infeasible.
//! - `λ` is validated as finite and non-negative for every strategy, even
//!   though only strategy 2 uses it.
//!
//! Conventions
//! -----------
//! - Defaults: `m = n = 1`, training scale `One`, strategy 0, threshold
//!   0.02, 100 SIP iterations, multi-start certification with 10 restarts,
//!   box `[-1, 1]^D`, no rescaling, seed 0.
use crate::{
    optimization::smooth_optimizer::{LineSearcher, SolverOptions, Tolerances},
    rational::{
        certify::CertifierKind,
        core::{
            bounds::DomainBox,
            structure::{num_coeffs_poly, MonomialStructure},
            validation::{validate_budget, validate_penalty, validate_threshold},
        },
        errors::{RationalError, RationalResult},
    },
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

/// Default positivity threshold for certified `min q`.
pub const DEFAULT_THRESHOLD: f64 = 0.02;

/// Default SIP iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Per-degree selection of penalized (or pinned) coefficients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyMask {
    active: Vec<bool>,
}

impl PenaltyMask {
    /// Validated mask for a polynomial of total degree `degree`.
    ///
    /// # Errors
    /// - [`RationalError::InvalidPenaltyMask`] if `active.len() != degree + 1`.
    pub fn new(active: Vec<bool>, degree: usize, which: &'static str) -> RationalResult<Self> {
        if active.len() != degree + 1 {
            return Err(RationalError::InvalidPenaltyMask {
                which,
                expected: degree + 1,
                found: active.len(),
            });
        }
        Ok(Self { active })
    }

    /// Mask with every degree free.
    pub fn all_active(degree: usize) -> Self {
        Self { active: vec![true; degree + 1] }
    }

    pub fn active(&self) -> &[bool] {
        &self.active
    }

    /// `true` if no degree is selected.
    pub fn is_all_active(&self) -> bool {
        self.active.iter().all(|&a| a)
    }

    /// Coefficient indices of every degree whose flag is `false`.
    pub fn penalized_indices(&self, structure: &MonomialStructure) -> Vec<usize> {
        let mut out = Vec::new();
        for (degree, &active) in self.active.iter().enumerate() {
            if !active && degree <= structure.degree() {
                let start = if degree == 0 { 0 } else { num_coeffs_poly(structure.dim(), degree - 1) };
                out.extend(start..num_coeffs_poly(structure.dim(), degree));
            }
        }
        out
    }
}

/// Fitting strategy for the constrained least-squares subproblem.
#[derive(Debug, Clone, PartialEq)]
pub enum FitStrategy {
    /// Strategy 0: plain linearized least squares.
    Plain,
    /// Strategy 1: masked coefficients pinned to exactly zero.
    PinnedZero { numerator: PenaltyMask, denominator: PenaltyMask },
    /// Strategy 2: L1 penalty `λ Σ |c_k|` on masked coefficients via surrogates.
    L1Penalty { lambda: f64, numerator: PenaltyMask, denominator: PenaltyMask },
}

impl FitStrategy {
    /// Build and validate a strategy from its numeric code.
    ///
    /// Parameters
    /// ----------
    /// - `code`: `0`, `1` or `2`.
    /// - `lambda`: penalty weight; validated for all codes, used by `2`.
    /// - `numerator_mask`, `denominator_mask`: per-degree flags, required
    ///   for codes `1` and `2`, ignored for `0`.
    /// - `m`, `n`: numerator and denominator degrees.
    ///
    /// Errors
    /// ------
    /// - `InvalidStrategy`, `InvalidPenalty`, `MissingPenaltyMask`,
    ///   `InvalidPenaltyMask`, `DegeneratePenaltyMask`.
    pub fn from_parts(
        code: u8, lambda: f64, numerator_mask: Option<&[bool]>, denominator_mask: Option<&[bool]>,
        m: usize, n: usize,
    ) -> RationalResult<Self> {
        validate_penalty(lambda)?;
        let masks = |strategy: u8| -> RationalResult<(PenaltyMask, PenaltyMask)> {
            let num = numerator_mask
                .ok_or(RationalError::MissingPenaltyMask { strategy, which: "numerator" })?;
            let den = denominator_mask
                .ok_or(RationalError::MissingPenaltyMask { strategy, which: "denominator" })?;
            Ok((
                PenaltyMask::new(num.to_vec(), m, "numerator")?,
                PenaltyMask::new(den.to_vec(), n, "denominator")?,
            ))
        };
        match code {
            0 => Ok(FitStrategy::Plain),
            1 => {
                let (numerator, denominator) = masks(1)?;
                if denominator.active().iter().all(|&a| !a) {
                    return Err(RationalError::DegeneratePenaltyMask {
                        which: "denominator",
                        reason: "Pinning every denominator degree forces q = 0.",
                    });
                }
                Ok(FitStrategy::PinnedZero { numerator, denominator })
            }
            2 => {
                let (numerator, denominator) = masks(2)?;
                Ok(FitStrategy::L1Penalty { lambda, numerator, denominator })
            }
            strategy => Err(RationalError::InvalidStrategy { strategy }),
        }
    }

    /// Numeric code `0`, `1` or `2`.
    pub fn code(&self) -> u8 {
        match self {
            FitStrategy::Plain => 0,
            FitStrategy::PinnedZero { .. } => 1,
            FitStrategy::L1Penalty { .. } => 2,
        }
    }

    /// Penalty weight (`0` unless strategy 2).
    pub fn lambda(&self) -> f64 {
        match self {
            FitStrategy::L1Penalty { lambda, .. } => *lambda,
            _ => 0.0,
        }
    }

    /// Selected coefficient indices of the stacked vector `[p ; q]`.
    ///
    /// Empty for [`FitStrategy::Plain`]; denominator indices are offset by
    /// `p_structure.len()`.
    pub fn selected_indices(
        &self, p_structure: &MonomialStructure, q_structure: &MonomialStructure,
    ) -> Vec<usize> {
        let (num, den) = match self {
            FitStrategy::Plain => return Vec::new(),
            FitStrategy::PinnedZero { numerator, denominator }
            | FitStrategy::L1Penalty { numerator, denominator, .. } => (numerator, denominator),
        };
        let offset = p_structure.len();
        let mut out = num.penalized_indices(p_structure);
        out.extend(den.penalized_indices(q_structure).into_iter().map(|k| k + offset));
        out
    }

    /// Masks as plain flag vectors, for records.
    pub fn masks(&self) -> (Option<Vec<bool>>, Option<Vec<bool>>) {
        match self {
            FitStrategy::Plain => (None, None),
            FitStrategy::PinnedZero { numerator, denominator }
            | FitStrategy::L1Penalty { numerator, denominator, .. } => {
                (Some(numerator.active().to_vec()), Some(denominator.active().to_vec()))
            }
        }
    }
}

/// Training-size policy relative to the coefficient count `M + N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingScale {
    /// `⌊(M + N) / 2⌋` points.
    Half,
    /// `M + N` points.
    One,
    /// `2 (M + N)` points.
    Two,
    /// Every available point.
    Full,
}

impl TrainingScale {
    /// Number of leading training points to use.
    ///
    /// # Errors
    /// - [`RationalError::InsufficientTrainingData`] if the policy needs more
    ///   points than `available`, or resolves to zero points.
    pub fn size(self, num_p: usize, num_q: usize, available: usize) -> RationalResult<usize> {
        let total = num_p + num_q;
        let requested = match self {
            TrainingScale::Half => total / 2,
            TrainingScale::One => total,
            TrainingScale::Two => 2 * total,
            TrainingScale::Full => available,
        };
        if requested > available || requested == 0 {
            return Err(RationalError::InsufficientTrainingData { requested, available });
        }
        Ok(requested)
    }

    /// Short label used in records (`0.5x`, `1x`, `2x`, `Cp`).
    pub fn label(self) -> &'static str {
        match self {
            TrainingScale::Half => "0.5x",
            TrainingScale::One => "1x",
            TrainingScale::Two => "2x",
            TrainingScale::Full => "Cp",
        }
    }
}

impl FromStr for TrainingScale {
    type Err = RationalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "half" | "0.5x" | ".5x" => Ok(TrainingScale::Half),
            "one" | "1x" => Ok(TrainingScale::One),
            "two" | "2x" => Ok(TrainingScale::Two),
            "full" | "cp" => Ok(TrainingScale::Full),
            _ => Err(RationalError::InvalidConfig {
                text: format!("Unknown training scale '{s}'."),
            }),
        }
    }
}

/// Tuning of the augmented-Lagrangian fit engine.
///
/// Fields
/// ------
/// - `solver`: inner L-BFGS options.
/// - `max_outer`: multiplier updates before giving up.
/// - `feasibility_tol`: stop once `max_j |min(g_j, μ_j / ρ)| ≤ tol`.
/// - `stationarity_tol`: bound on the relative Lagrangian gradient required
///   alongside feasibility.
/// - `rho_init`, `rho_max`: initial and largest penalty parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub solver: SolverOptions,
    pub max_outer: usize,
    pub feasibility_tol: f64,
    pub stationarity_tol: f64,
    pub rho_init: f64,
    pub rho_max: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions {
                tols: Tolerances { tol_grad: Some(1e-9), tol_cost: Some(1e-15), max_iter: Some(2000) },
                line_searcher: LineSearcher::MoreThuente,
                verbose: false,
                lbfgs_mem: Some(10),
            },
            max_outer: 40,
            feasibility_tol: 1e-6,
            stationarity_tol: 1e-4,
            rho_init: 10.0,
            rho_max: 1e10,
        }
    }
}

impl FitOptions {
    /// # Errors
    /// - `InvalidBudget` for a zero `max_outer` or bad penalty parameters.
    /// - Optimizer errors for invalid inner tolerances.
    pub fn validate(&self) -> RationalResult<()> {
        validate_budget("max_outer", self.max_outer)?;
        validate_solver(&self.solver)?;
        let positive = [
            ("feasibility_tol", self.feasibility_tol),
            ("stationarity_tol", self.stationarity_tol),
            ("rho_init", self.rho_init),
            ("rho_max", self.rho_max),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RationalError::InvalidBudget {
                    name,
                    value,
                    reason: "Must be finite and strictly positive.",
                });
            }
        }
        if self.rho_max < self.rho_init {
            return Err(RationalError::InvalidBudget {
                name: "rho_max",
                value: self.rho_max,
                reason: "Must be at least rho_init.",
            });
        }
        Ok(())
    }
}

/// Default options for the bounded local searches run by certifiers.
pub fn default_local_solver() -> SolverOptions {
    SolverOptions {
        tols: Tolerances { tol_grad: Some(1e-10), tol_cost: Some(1e-14), max_iter: Some(500) },
        line_searcher: LineSearcher::MoreThuente,
        verbose: false,
        lbfgs_mem: None,
    }
}

/// Complete, serializable configuration of one SIP run.
///
/// Every field has a default, so a TOML document only needs the keys it
/// changes:
///
/// ```toml
/// m = 2
/// n = 1
/// training_scale = "full"
/// threshold = 0.02
///
/// [certifier]
/// kind = "multi_start"
/// restarts = 10
/// parallel = false
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SipConfig {
    /// Numerator total degree.
    pub m: usize,
    /// Denominator total degree.
    pub n: usize,
    pub training_scale: TrainingScale,
    /// Fitting strategy code (0, 1 or 2).
    pub strategy: u8,
    /// L1 penalty weight (strategy 2).
    pub lambda: f64,
    /// Per-degree numerator flags (strategies 1 and 2); `false` selects.
    pub numerator_mask: Option<Vec<bool>>,
    /// Per-degree denominator flags (strategies 1 and 2); `false` selects.
    pub denominator_mask: Option<Vec<bool>>,
    pub certifier: CertifierKind,
    /// Certified `min q` at or above this value ends the run.
    pub threshold: f64,
    /// `[lo, hi]` per dimension; `None` means `[-1, 1]^D`.
    pub domain: Option<Vec<[f64; 2]>>,
    /// Map raw coordinates onto `[-1, 1]^D` before evaluating monomials.
    pub rescale: bool,
    pub max_iterations: usize,
    /// Optional wall-clock budget in seconds.
    pub wall_clock_secs: Option<f64>,
    /// Base seed for certifier RNGs.
    pub seed: u64,
    /// Extra refits with the same constraints after a non-converged fit.
    pub retry_nonconverged: usize,
    pub fit: FitOptions,
    pub local_solver: SolverOptions,
}

impl Default for SipConfig {
    fn default() -> Self {
        Self {
            m: 1,
            n: 1,
            training_scale: TrainingScale::One,
            strategy: 0,
            lambda: 0.0,
            numerator_mask: None,
            denominator_mask: None,
            certifier: CertifierKind::default(),
            threshold: DEFAULT_THRESHOLD,
            domain: None,
            rescale: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            wall_clock_secs: None,
            seed: 0,
            retry_nonconverged: 0,
            fit: FitOptions::default(),
            local_solver: default_local_solver(),
        }
    }
}

impl SipConfig {
    /// Parse a TOML document and validate the result.
    ///
    /// # Errors
    /// - [`RationalError::InvalidConfig`] for malformed TOML or unknown keys.
    /// - Any error from [`SipConfig::validate`].
    pub fn from_toml_str(text: &str) -> RationalResult<Self> {
        let config: SipConfig =
            toml::from_str(text).map_err(|e| RationalError::InvalidConfig { text: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> RationalResult<String> {
        toml::to_string(self).map_err(|e| RationalError::InvalidConfig { text: e.to_string() })
    }

    /// Check every field.
    ///
    /// Errors
    /// ------
    /// - Strategy, penalty and mask errors from [`FitStrategy::from_parts`].
    /// - `InvalidThreshold`, `InvalidBudget`, `InvalidBounds`.
    /// - Certifier budget errors.
    pub fn validate(&self) -> RationalResult<()> {
        self.fit_strategy()?;
        validate_threshold(self.threshold)?;
        validate_budget("max_iterations", self.max_iterations)?;
        if let Some(secs) = self.wall_clock_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(RationalError::InvalidBudget {
                    name: "wall_clock_secs",
                    value: secs,
                    reason: "Must be finite and non-negative.",
                });
            }
        }
        if let Some(pairs) = &self.domain {
            DomainBox::from_pairs(pairs)?;
        }
        self.certifier.validate()?;
        self.fit.validate()?;
        validate_solver(&self.local_solver)?;
        Ok(())
    }

    /// Typed fitting strategy.
    pub fn fit_strategy(&self) -> RationalResult<FitStrategy> {
        FitStrategy::from_parts(
            self.strategy,
            self.lambda,
            self.numerator_mask.as_deref(),
            self.denominator_mask.as_deref(),
            self.m,
            self.n,
        )
    }

    /// Certification box for `dim` input dimensions.
    ///
    /// # Errors
    /// - [`RationalError::PointDimMismatch`] if a configured box has the
    ///   wrong dimension.
    pub fn domain_box(&self, dim: usize) -> RationalResult<DomainBox> {
        match &self.domain {
            Some(pairs) => {
                if pairs.len() != dim {
                    return Err(RationalError::PointDimMismatch { expected: dim, found: pairs.len() });
                }
                DomainBox::from_pairs(pairs)
            }
            None => DomainBox::unit(dim),
        }
    }

    pub fn wall_clock(&self) -> Option<Duration> {
        self.wall_clock_secs.map(Duration::from_secs_f64)
    }
}

// ---- Helper Methods ----

/// Re-run the optimizer-layer constructors so deserialized options obey
/// the same rules as programmatic ones.
fn validate_solver(opts: &SolverOptions) -> RationalResult<()> {
    let tols = Tolerances::new(opts.tols.tol_grad, opts.tols.tol_cost, opts.tols.max_iter)?;
    SolverOptions::new(tols, opts.line_searcher, opts.lbfgs_mem)?;
    Ok(())
}
