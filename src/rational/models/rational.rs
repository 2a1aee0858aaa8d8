//! Rational model `p(x) / q(x)` — evaluation, batched evaluation, gradients.
//!
//! Purpose
//! -------
//! Hold a fitted (or reconstructed) rational approximation: numerator and
//! denominator monomial structures with their coefficient vectors, plus an
//! optional box used to rescale raw inputs onto `[-1, 1]^D` before the
//! monomials are evaluated.
//!
//! Key behaviors
//! -------------
//! - [`RationalModel::numerator`], [`RationalModel::denominator`] and
//!   [`RationalModel::evaluate`] work on a single raw point;
//!   [`RationalModel::evaluate_many`] works row-wise on a point matrix via
//!   design matrices.
//! - [`RationalModel::gradient`] applies the quotient rule to the monomial
//!   gradients, including the scaler chain-rule factor `2 / (hi − lo)`.
//! - Evaluation fails with [`RationalError::DivisionDegenerate`] when
//!   `|q(x)| < DENOMINATOR_FLOOR`. This is a signal only; fitting is
//!   unaffected.
//! - Models come from a SIP run ([`RationalModel::fit`]) or from a stored
//!   record ([`RationalModel::from_record`]) without refitting.
//!
//! Invariants & assumptions
//! ------------------------
//! - `pcoeff.len() == C(D + m, m)` and `qcoeff.len() == C(D + n, n)`, all
//!   finite.
//! - If a scaler is attached, its dimension equals `D`.
//! - A model is read-only once constructed.
use crate::rational::{
    core::{
        bounds::DomainBox,
        data::TrainingSet,
        options::SipConfig,
        recurrence::{evaluate, evaluate_gradient, evaluate_many},
        structure::MonomialStructure,
        validation::{validate_coefficients, validate_point},
    },
    errors::{RationalError, RationalResult, DENOMINATOR_FLOOR},
    records::ModelRecord,
    sip::{SipController, SipRun},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Rational approximation `p(x) / q(x)` over `D` inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct RationalModel {
    p_structure: MonomialStructure,
    q_structure: MonomialStructure,
    pcoeff: Array1<f64>,
    qcoeff: Array1<f64>,
    scaler: Option<DomainBox>,
}

impl RationalModel {
    /// Construct a model from coefficients.
    ///
    /// Parameters
    /// ----------
    /// - `dim`: input dimension `D ≥ 1`.
    /// - `m`, `n`: numerator and denominator total degrees.
    /// - `pcoeff`, `qcoeff`: coefficients in canonical monomial order.
    /// - `scaler`: optional box; raw inputs are mapped onto `[-1, 1]^D`.
    ///
    /// Errors
    /// ------
    /// - `InvalidDimension` for `dim == 0`.
    /// - `CoeffLengthMismatch` / `NonFiniteCoefficient` for bad coefficients.
    /// - `PointDimMismatch` if the scaler dimension differs from `dim`.
    pub fn new(
        dim: usize, m: usize, n: usize, pcoeff: Array1<f64>, qcoeff: Array1<f64>,
        scaler: Option<DomainBox>,
    ) -> RationalResult<Self> {
        let p_structure = MonomialStructure::new(dim, m)?;
        let q_structure = MonomialStructure::new(dim, n)?;
        validate_coefficients(pcoeff.view(), p_structure.len())?;
        validate_coefficients(qcoeff.view(), q_structure.len())?;
        if let Some(b) = &scaler {
            if b.dim() != dim {
                return Err(RationalError::PointDimMismatch { expected: dim, found: b.dim() });
            }
        }
        Ok(Self { p_structure, q_structure, pcoeff, qcoeff, scaler })
    }

    /// Run the full SIP loop on `data` with `config`.
    ///
    /// Convenience wrapper around [`SipController::run`]; the returned
    /// [`SipRun`] holds the certified model and the iteration history.
    ///
    /// # Errors
    /// - Validation errors for `config` or `data`.
    /// - [`RationalError::PositivityExhausted`] when the budget runs out.
    pub fn fit(data: &TrainingSet, config: &SipConfig) -> RationalResult<SipRun> {
        SipController::new(config.clone())?.run(data)
    }

    /// Rebuild a model from a stored record without fitting.
    ///
    /// # Errors
    /// - [`RationalError::InvalidRecord`] when the record's box is malformed.
    /// - Any error from [`RationalModel::new`].
    pub fn from_record(record: &ModelRecord) -> RationalResult<Self> {
        let scaler = if record.rescale {
            let b = DomainBox::from_pairs(&record.domain).map_err(|e| {
                RationalError::InvalidRecord { reason: format!("domain: {e}") }
            })?;
            Some(b)
        } else {
            None
        };
        Self::new(
            record.dim,
            record.m,
            record.n,
            Array1::from(record.pcoeff.clone()),
            Array1::from(record.qcoeff.clone()),
            scaler,
        )
    }

    pub fn dim(&self) -> usize {
        self.p_structure.dim()
    }

    pub fn m(&self) -> usize {
        self.p_structure.degree()
    }

    pub fn n(&self) -> usize {
        self.q_structure.degree()
    }

    pub fn pcoeff(&self) -> ArrayView1<'_, f64> {
        self.pcoeff.view()
    }

    pub fn qcoeff(&self) -> ArrayView1<'_, f64> {
        self.qcoeff.view()
    }

    pub fn p_structure(&self) -> &MonomialStructure {
        &self.p_structure
    }

    pub fn q_structure(&self) -> &MonomialStructure {
        &self.q_structure
    }

    pub fn scaler(&self) -> Option<&DomainBox> {
        self.scaler.as_ref()
    }

    /// Map a raw point into the coordinates the monomials are evaluated in.
    pub fn model_coords(&self, x: ArrayView1<f64>) -> Array1<f64> {
        match &self.scaler {
            Some(b) => b.to_unit(x),
            None => x.to_owned(),
        }
    }

    /// `p(x)` at a raw point.
    ///
    /// # Errors
    /// - `PointDimMismatch` / `NonFiniteData` for a malformed point.
    pub fn numerator(&self, x: ArrayView1<f64>) -> RationalResult<f64> {
        validate_point(x, self.dim())?;
        let u = self.model_coords(x);
        Ok(evaluate(u.view(), &self.p_structure).dot(&self.pcoeff))
    }

    /// `q(x)` at a raw point.
    ///
    /// # Errors
    /// - `PointDimMismatch` / `NonFiniteData` for a malformed point.
    pub fn denominator(&self, x: ArrayView1<f64>) -> RationalResult<f64> {
        validate_point(x, self.dim())?;
        let u = self.model_coords(x);
        Ok(evaluate(u.view(), &self.q_structure).dot(&self.qcoeff))
    }

    /// `p(x) / q(x)` at a raw point.
    ///
    /// # Errors
    /// - `DivisionDegenerate { index: 0, .. }` when `|q(x)| < DENOMINATOR_FLOOR`.
    /// - Point validation errors.
    pub fn evaluate(&self, x: ArrayView1<f64>) -> RationalResult<f64> {
        let p = self.numerator(x)?;
        let q = self.denominator(x)?;
        if q.abs() < DENOMINATOR_FLOOR {
            return Err(RationalError::DivisionDegenerate { index: 0, value: q });
        }
        Ok(p / q)
    }

    /// `p / q` at every row of `points`.
    ///
    /// # Errors
    /// - `PointDimMismatch` if `points.ncols() != D`.
    /// - `NonFiniteData` for a non-finite coordinate.
    /// - `DivisionDegenerate { index, .. }` naming the first offending row.
    pub fn evaluate_many(&self, points: ArrayView2<f64>) -> RationalResult<Array1<f64>> {
        if points.ncols() != self.dim() {
            return Err(RationalError::PointDimMismatch {
                expected: self.dim(),
                found: points.ncols(),
            });
        }
        if let Some((index, &value)) = points.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(RationalError::NonFiniteData { index, value });
        }
        let scaled = self.scaled_points(points);
        let p = evaluate_many(scaled.view(), &self.p_structure).dot(&self.pcoeff);
        let q = evaluate_many(scaled.view(), &self.q_structure).dot(&self.qcoeff);
        if let Some((index, &value)) = q.iter().enumerate().find(|(_, v)| v.abs() < DENOMINATOR_FLOOR) {
            return Err(RationalError::DivisionDegenerate { index, value });
        }
        Ok(p / q)
    }

    /// Gradient `∇(p / q)` with respect to the raw coordinates.
    ///
    /// # Errors
    /// - Same as [`RationalModel::evaluate`].
    pub fn gradient(&self, x: ArrayView1<f64>) -> RationalResult<Array1<f64>> {
        validate_point(x, self.dim())?;
        let u = self.model_coords(x);
        let jac = match &self.scaler {
            Some(b) => b.unit_jacobian(),
            None => Array1::ones(self.dim()),
        };
        let p = evaluate(u.view(), &self.p_structure).dot(&self.pcoeff);
        let q = evaluate(u.view(), &self.q_structure).dot(&self.qcoeff);
        if q.abs() < DENOMINATOR_FLOOR {
            return Err(RationalError::DivisionDegenerate { index: 0, value: q });
        }
        let dp = evaluate_gradient(u.view(), &self.p_structure, jac.view()).dot(&self.pcoeff);
        let dq = evaluate_gradient(u.view(), &self.q_structure, jac.view()).dot(&self.qcoeff);
        Ok((dp * q - dq * p) / (q * q))
    }

    // ---- Helper Methods ----

    fn scaled_points(&self, points: ArrayView2<f64>) -> Array2<f64> {
        match &self.scaler {
            Some(b) => {
                let mut out = Array2::zeros(points.raw_dim());
                for (i, row) in points.outer_iter().enumerate() {
                    out.row_mut(i).assign(&b.to_unit(row));
                }
                out
            }
            None => points.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finitediff::FiniteDiff;
    use ndarray::array;

    // ---- Test plan ----
    //
    // Scope
    // -----
    // - Construction validation (coefficient lengths, scaler dimension).
    // - Point evaluation against a hand-written rational function.
    // - Batched evaluation equals point-wise evaluation.
    // - Gradient vs finitediff central differences, with and without scaler.
    // - DivisionDegenerate at a root of q.

    /// `(1 + x + x²) / (2 + x)` in one dimension.
    fn one_dim_model() -> RationalModel {
        RationalModel::new(1, 2, 1, array![1.0, 1.0, 1.0], array![2.0, 1.0], None).unwrap()
    }

    /// 2-D model `(1 + x − y + xy) / (3 + x² + y²)` on box [0, 2] × [-1, 3].
    fn two_dim_scaled_model() -> RationalModel {
        let b = DomainBox::from_pairs(&[[0.0, 2.0], [-1.0, 3.0]]).unwrap();
        RationalModel::new(
            2,
            2,
            2,
            array![1.0, 1.0, -1.0, 0.0, 1.0, 0.0],
            array![3.0, 0.0, 0.0, 1.0, 0.0, 1.0],
            Some(b),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Construction rejects wrong coefficient lengths and scaler dimensions.
    fn new_validates_coefficients_and_scaler() {
        assert_eq!(
            RationalModel::new(1, 2, 1, array![1.0, 1.0], array![2.0, 1.0], None),
            Err(RationalError::CoeffLengthMismatch { expected: 3, found: 2 })
        );
        let b = DomainBox::unit(2).unwrap();
        assert!(matches!(
            RationalModel::new(1, 0, 0, array![1.0], array![1.0], Some(b)),
            Err(RationalError::PointDimMismatch { expected: 1, found: 2 })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Point evaluation matches the closed form.
    fn evaluate_matches_closed_form() {
        let model = one_dim_model();
        for x in [-1.0, -0.3, 0.0, 0.7, 1.0] {
            let expected = (1.0 + x + x * x) / (2.0 + x);
            let got = model.evaluate(array![x].view()).unwrap();
            assert!((got - expected).abs() < 1e-14);
        }
        assert_eq!(model.numerator(array![1.0].view()).unwrap(), 3.0);
        assert_eq!(model.denominator(array![1.0].view()).unwrap(), 3.0);
    }

    #[test]
    // Purpose
    // -------
    // Batched evaluation agrees with point evaluation under rescaling.
    fn evaluate_many_matches_pointwise() {
        let model = two_dim_scaled_model();
        let pts = array![[0.0, -1.0], [1.0, 1.0], [2.0, 3.0], [0.4, 2.2]];
        let batch = model.evaluate_many(pts.view()).unwrap();
        for (i, row) in pts.outer_iter().enumerate() {
            assert!((batch[i] - model.evaluate(row).unwrap()).abs() < 1e-14);
        }
        // Box center maps to the origin: p = 1, q = 3.
        assert!((batch[1] - 1.0 / 3.0).abs() < 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // The analytic gradient matches central differences within 1e-5.
    //
    // Given
    // -----
    // - The 1-D model without scaler and the 2-D model with scaler.
    fn gradient_matches_central_differences() {
        let model = one_dim_model();
        let x0 = array![0.35];
        let fd = x0.central_diff(&|x: &Array1<f64>| model.evaluate(x.view()).unwrap());
        let g = model.gradient(x0.view()).unwrap();
        assert!((g[0] - fd[0]).abs() < 1e-5);

        let model = two_dim_scaled_model();
        for x0 in [array![0.3, 0.1], array![1.7, 2.4], array![1.0, -0.5]] {
            let fd = x0.central_diff(&|x: &Array1<f64>| model.evaluate(x.view()).unwrap());
            let g = model.gradient(x0.view()).unwrap();
            for d in 0..2 {
                assert!((g[d] - fd[d]).abs() < 1e-5, "x0 = {x0}, d = {d}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // A root of the denominator is reported, not divided through.
    //
    // Given
    // -----
    // - `q(x) = x`; points 0.5 and 0.0.
    //
    // Expect
    // ------
    // - Point evaluation at 0 fails; batched evaluation names row 1.
    fn evaluation_at_denominator_root_is_degenerate() {
        let model = RationalModel::new(1, 0, 1, array![1.0], array![0.0, 1.0], None).unwrap();
        assert!(matches!(
            model.evaluate(array![0.0].view()),
            Err(RationalError::DivisionDegenerate { index: 0, .. })
        ));
        assert!(matches!(
            model.evaluate_many(array![[0.5], [0.0]].view()),
            Err(RationalError::DivisionDegenerate { index: 1, .. })
        ));
        assert!(model.gradient(array![0.0].view()).is_err());
    }
}
