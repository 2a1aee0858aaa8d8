//! Bounded local minimization of the denominator, and the single- and
//! multi-start certifiers built on it.
//!
//! Purpose
//! -------
//! Minimize a smooth function over a box with the unconstrained L-BFGS
//! stack by reparameterizing every coordinate through a logistic:
//! `x_d = lo_d + (hi_d − lo_d) σ(t_d)`.
//!
//! Key behaviors
//! -------------
//! - [`BoxObjective`] is the narrow contract a box solver consumes: a value
//!   and an optional analytic gradient in box coordinates.
//! - [`LogisticLbfgs`] implements [`BoxMinimizer`]; the gradient in `t` is
//!   `∇f(x) ⊙ ∂x/∂t`, or finite differences when none is supplied.
//! - Results within a hair of a face are snapped onto it and kept if that
//!   does not increase the value, since the logistic only reaches faces
//!   asymptotically.
//! - [`MultiStart`] draws every start up front from a seeded RNG. In
//!   sequential mode it stops at the first start whose minimum falls below
//!   the threshold; in parallel mode all starts run on `rayon` and the
//!   lowest value wins, ties going to the lower start index.
//!
//! Invariants & assumptions
//! ------------------------
//! - A failed local search reports its starting point and value; it never
//!   aborts certification.
use crate::{
    optimization::{
        errors::{OptError, OptResult},
        numerical_stability::transformations::{from_box, to_box, to_box_jacobian},
        smooth_optimizer::{minimize_with_retry, Cost, Grad, Objective, SolverOptions, Theta},
    },
    rational::{
        certify::{Certification, CertificationEntry, Certify},
        core::{
            bounds::DomainBox,
            recurrence::{evaluate, evaluate_gradient},
            structure::MonomialStructure,
        },
    },
};
use log::debug;
use ndarray::{Array1, ArrayView1};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;

/// Relative distance to a face below which a coordinate is snapped onto it.
const FACE_SNAP_REL: f64 = 1e-6;

/// A function to be minimized over a box.
pub trait BoxObjective: Sync {
    fn value(&self, x: ArrayView1<f64>) -> f64;

    /// Analytic gradient; `None` selects finite differences.
    fn gradient(&self, _x: ArrayView1<f64>) -> Option<Array1<f64>> {
        None
    }
}

/// Best point of one bounded local search.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxMinimum {
    pub point: Array1<f64>,
    pub value: f64,
    pub status: String,
    pub converged: bool,
    pub iterations: usize,
}

/// Local minimization over a box from a given start.
pub trait BoxMinimizer {
    fn minimize_in_box<F: BoxObjective>(
        &self, f: &F, domain: &DomainBox, start: ArrayView1<f64>,
    ) -> BoxMinimum;
}

/// `q(x) = Σ_k qcoeff_k · x^{e_k}` with its analytic gradient.
#[derive(Debug, Clone, Copy)]
pub struct DenominatorSurface<'q, 's> {
    pub qcoeff: ArrayView1<'q, f64>,
    pub structure: &'s MonomialStructure,
}

impl BoxObjective for DenominatorSurface<'_, '_> {
    fn value(&self, x: ArrayView1<f64>) -> f64 {
        evaluate(x, self.structure).dot(&self.qcoeff)
    }

    fn gradient(&self, x: ArrayView1<f64>) -> Option<Array1<f64>> {
        let ones = Array1::ones(x.len());
        Some(evaluate_gradient(x, self.structure, ones.view()).dot(&self.qcoeff))
    }
}

/// `f(lo + (hi − lo) σ(t))` as an unconstrained [`Objective`].
struct Reparameterized<'a, F: BoxObjective> {
    surface: &'a F,
    domain: &'a DomainBox,
}

impl<F: BoxObjective> Reparameterized<'_, F> {
    fn point(&self, t: &Theta) -> Array1<f64> {
        to_box(t.view(), self.domain.lo(), self.domain.hi())
    }
}

impl<F: BoxObjective> Objective for Reparameterized<'_, F> {
    type Data = ();

    fn value(&self, theta: &Theta, _data: &()) -> OptResult<Cost> {
        let value = self.surface.value(self.point(theta).view());
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        Ok(value)
    }

    fn check(&self, theta: &Theta, _data: &()) -> OptResult<()> {
        if theta.len() != self.domain.dim() {
            return Err(OptError::GradientDimMismatch { expected: self.domain.dim(), found: theta.len() });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, _data: &()) -> OptResult<Grad> {
        let x = self.point(theta);
        match self.surface.gradient(x.view()) {
            Some(g) => Ok(g * to_box_jacobian(theta.view(), self.domain.lo(), self.domain.hi())),
            None => Err(OptError::GradientNotImplemented),
        }
    }
}

/// L-BFGS on logistic coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticLbfgs {
    pub options: SolverOptions,
}

impl LogisticLbfgs {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }
}

impl BoxMinimizer for LogisticLbfgs {
    fn minimize_in_box<F: BoxObjective>(
        &self, f: &F, domain: &DomainBox, start: ArrayView1<f64>,
    ) -> BoxMinimum {
        let start_value = f.value(start);
        let objective = Reparameterized { surface: f, domain };
        let t0 = from_box(start, domain.lo(), domain.hi());
        let mut best = match minimize_with_retry(&objective, t0, &(), &self.options) {
            Ok(out) => BoxMinimum {
                point: objective.point(&out.theta_hat),
                value: out.value,
                status: out.status,
                converged: out.converged,
                iterations: out.iterations,
            },
            Err(err) => BoxMinimum {
                point: start.to_owned(),
                value: start_value,
                status: format!("Local search failed: {err}"),
                converged: false,
                iterations: 0,
            },
        };
        if start_value < best.value {
            best.point = start.to_owned();
            best.value = start_value;
        }
        snap_to_faces(f, domain, &mut best);
        best
    }
}

/// Move coordinates lying within [`FACE_SNAP_REL`] of a face onto it if
/// that does not increase the value.
fn snap_to_faces<F: BoxObjective>(f: &F, domain: &DomainBox, best: &mut BoxMinimum) {
    let mut snapped = best.point.clone();
    let mut moved = false;
    for d in 0..domain.dim() {
        let (lo, hi) = (domain.lo()[d], domain.hi()[d]);
        let tol = FACE_SNAP_REL * (hi - lo);
        if snapped[d] - lo < tol {
            snapped[d] = lo;
            moved = true;
        } else if hi - snapped[d] < tol {
            snapped[d] = hi;
            moved = true;
        }
    }
    if moved {
        let value = f.value(snapped.view());
        if value <= best.value {
            best.point = snapped;
            best.value = value;
        }
    }
}

/// One local search from the box midpoint.
#[derive(Debug, Clone)]
pub struct SingleStart {
    pub local: LogisticLbfgs,
}

impl Certify for SingleStart {
    fn name(&self) -> &'static str {
        "single_start"
    }

    fn certify(
        &self, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
        _threshold: f64,
    ) -> Certification {
        let surface = DenominatorSurface { qcoeff: qcoeff.view(), structure };
        let start = domain.midpoint();
        let found = self.local.minimize_in_box(&surface, domain, start.view());
        let entry = CertificationEntry::new(
            "midpoint",
            found.point.view(),
            found.value,
            found.iterations,
            found.status.clone(),
        );
        Certification {
            point: found.point,
            value: found.value,
            strategy: self.name().to_string(),
            log: vec![entry],
        }
    }
}

/// Best of `restarts` local searches: the midpoint, then seeded uniform
/// starts.
#[derive(Debug, Clone)]
pub struct MultiStart {
    pub restarts: usize,
    pub parallel: bool,
    pub seed: u64,
    pub local: LogisticLbfgs,
}

impl MultiStart {
    /// Start points in the order they are tried.
    pub fn starts(&self, domain: &DomainBox) -> Vec<Array1<f64>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = Vec::with_capacity(self.restarts.max(1));
        out.push(domain.midpoint());
        while out.len() < self.restarts {
            out.push(domain.sample_uniform(&mut rng));
        }
        out
    }
}

impl Certify for MultiStart {
    fn name(&self) -> &'static str {
        "multi_start"
    }

    fn certify(
        &self, qcoeff: ArrayView1<f64>, structure: &MonomialStructure, domain: &DomainBox,
        threshold: f64,
    ) -> Certification {
        let surface = DenominatorSurface { qcoeff: qcoeff.view(), structure };
        let starts = self.starts(domain);
        let results: Vec<BoxMinimum> = if self.parallel {
            starts
                .par_iter()
                .map(|s| self.local.minimize_in_box(&surface, domain, s.view()))
                .collect()
        } else {
            let mut out = Vec::with_capacity(starts.len());
            for s in &starts {
                let found = self.local.minimize_in_box(&surface, domain, s.view());
                let stop = found.value < threshold;
                out.push(found);
                if stop {
                    break;
                }
            }
            out
        };

        let mut best = 0;
        let mut log = Vec::with_capacity(results.len());
        for (i, r) in results.iter().enumerate() {
            debug!("multi-start restart {i}: q = {:.6e} ({})", r.value, r.status);
            log.push(CertificationEntry::new(
                format!("restart {i}"),
                r.point.view(),
                r.value,
                r.iterations,
                r.status.clone(),
            ));
            if r.value < results[best].value {
                best = i;
            }
        }
        let (point, value) = match results.into_iter().nth(best) {
            Some(r) => (r.point, r.value),
            None => {
                let mid = domain.midpoint();
                let v = surface.value(mid.view());
                (mid, v)
            }
        };
        Certification { point, value, strategy: self.name().to_string(), log }
    }
}
