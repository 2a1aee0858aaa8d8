//! Positivity constraint points and fit-engine constraint descriptors.
//!
//! Purpose
//! -------
//! [`ConstraintSet`] is the growing, ordered list of points `z` at which the
//! denominator must satisfy `q(z) ≥ 1`. It is seeded with the training
//! points and only appended to by the SIP controller, between a fit and the
//! next certification. Each entry caches its denominator monomial row so
//! refits never re-evaluate old points.
//!
//! [`ConstraintDescriptor`] is the plain, ordered vocabulary the fit engine
//! consumes: positivity rows, pinned-zero coefficients, and L1 surrogate
//! pairs. The fit engine lowers these into linear inequality rows.
//!
//! Invariants & assumptions
//! ------------------------
//! - `len() ≥ seeded_len()` and never decreases.
//! - Every stored row has `structure.len()` entries for the denominator
//!   structure the set was built with.
//! - Points are stored in model coordinates (after optional rescaling).
use crate::rational::core::{recurrence::evaluate, structure::MonomialStructure};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Ordered positivity-constraint points with their denominator monomial rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSet {
    points: Vec<Array1<f64>>,
    rows: Vec<Array1<f64>>,
    seeded: usize,
}

impl ConstraintSet {
    /// Seed with the training points and their denominator design matrix.
    ///
    /// `q_design` must have one row per point in `points`.
    pub fn seeded(points: ArrayView2<f64>, q_design: ArrayView2<f64>) -> Self {
        let points: Vec<Array1<f64>> = points.outer_iter().map(|p| p.to_owned()).collect();
        let rows: Vec<Array1<f64>> = q_design.outer_iter().map(|r| r.to_owned()).collect();
        let seeded = points.len();
        Self { points, rows, seeded }
    }

    /// Append a certifier-found point.
    pub fn push(&mut self, point: ArrayView1<f64>, structure: &MonomialStructure) {
        self.rows.push(evaluate(point, structure));
        self.points.push(point.to_owned());
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of entries that came from the training set.
    pub fn seeded_len(&self) -> usize {
        self.seeded
    }

    pub fn points(&self) -> &[Array1<f64>] {
        &self.points
    }

    /// Points appended after seeding, in insertion order.
    pub fn added_points(&self) -> &[Array1<f64>] {
        &self.points[self.seeded..]
    }

    /// Stacked denominator rows, `[len × N]`.
    pub fn design_matrix(&self) -> Array2<f64> {
        let cols = self.rows.first().map_or(0, Array1::len);
        let mut out = Array2::zeros((self.rows.len(), cols));
        for (i, row) in self.rows.iter().enumerate() {
            out.row_mut(i).assign(row);
        }
        out
    }
}

/// One constraint understood by the fit engine.
///
/// Coefficient indices address the stacked vector `[p (M) ; q (N)]`;
/// surrogate indices address the auxiliary block that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintDescriptor {
    /// `q(z_row) ≥ 1` for row `row` of the constraint set.
    Positivity { row: usize },
    /// Coefficient fixed to exactly zero.
    PinnedZero { coeff: usize },
    /// `s − c ≥ 0`.
    AbsUpper { coeff: usize, surrogate: usize },
    /// `s + c ≥ 0`.
    AbsLower { coeff: usize, surrogate: usize },
}

impl ConstraintDescriptor {
    /// `true` for inequality descriptors.
    pub fn is_inequality(&self) -> bool {
        !matches!(self, ConstraintDescriptor::PinnedZero { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational::core::{recurrence::evaluate_many, structure::generate_structure};
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Seeding and appending keep rows aligned with points and grow monotonically.
    //
    // Given
    // -----
    // - Three 1-D training points with a degree-2 denominator structure.
    //
    // Expect
    // ------
    // - `seeded_len = 3`; after one push `len = 4`, the appended row equals
    //   `evaluate(z)`, and the design matrix is `[4 × 3]`.
    fn seeded_set_grows_with_matching_rows() {
        // Arrange
        let s = generate_structure(1, 2).unwrap();
        let pts = array![[-1.0], [0.0], [1.0]];
        let design = evaluate_many(pts.view(), &s);
        let mut set = ConstraintSet::seeded(pts.view(), design.view());

        // Act
        set.push(array![0.5].view(), &s);

        // Assert
        assert_eq!(set.seeded_len(), 3);
        assert_eq!(set.len(), 4);
        assert_eq!(set.added_points(), &[array![0.5]]);
        let m = set.design_matrix();
        assert_eq!(m.dim(), (4, 3));
        assert_eq!(m.row(3), array![1.0, 0.5, 0.25]);
        assert_eq!(m.row(0), array![1.0, -1.0, 1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Only pinned-zero descriptors are equalities.
    fn descriptor_classification() {
        assert!(ConstraintDescriptor::Positivity { row: 0 }.is_inequality());
        assert!(ConstraintDescriptor::AbsLower { coeff: 1, surrogate: 0 }.is_inequality());
        assert!(!ConstraintDescriptor::PinnedZero { coeff: 2 }.is_inequality());
    }
}
