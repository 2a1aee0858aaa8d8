//! Training data container for rational approximation.
//!
//! Purpose
//! -------
//! Provide a small, validated container of `(point, value)` pairs used by the
//! fit engine, the SIP controller, and model selection. Validation happens
//! once at construction so downstream numerics can assume clean input.
//!
//! Key behaviors
//! -------------
//! - [`TrainingSet::new`] enforces non-emptiness, `dim ≥ 1`, matching point
//!   and value counts, and finite coordinates and values.
//! - Subsetting never mutates: [`TrainingSet::head`], [`TrainingSet::select`]
//!   and [`TrainingSet::fold`] return new sets.
//!
//! Invariants & assumptions
//! ------------------------
//! - `points` is `[n × dim]` with `n ≥ 1` and `dim ≥ 1`.
//! - `values.len() == n`.
//!
//! Conventions
//! -----------
//! - Row `i` of `points` pairs with `values[i]`; order is significant
//!   (training-size policies take the leading rows).
//! - Folds are contiguous blocks: the first `n mod k` folds hold one extra
//!   row, matching the usual unshuffled k-fold split.
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction errors, head/select, and that the k
//!   test folds partition the rows.
use crate::rational::errors::{RationalError, RationalResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Validated, immutable set of training points and values.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    points: Array2<f64>,
    values: Array1<f64>,
}

impl TrainingSet {
    /// Construct a validated training set.
    ///
    /// Parameters
    /// ----------
    /// - `points`: `Array2<f64>`
    ///   One row per sample, one column per input dimension.
    /// - `values`: `Array1<f64>`
    ///   Target value for each row.
    ///
    /// Errors
    /// ------
    /// - `RationalError::EmptyTrainingSet` when there are no rows.
    /// - `RationalError::InvalidDimension` when there are no columns.
    /// - `RationalError::LengthMismatch` when row and value counts differ.
    /// - `RationalError::NonFiniteData { index, value }` for the first
    ///   non-finite entry; `index` is the flat row-major index for
    ///   coordinates, and `n_points · dim + i` for value `i`.
    pub fn new(points: Array2<f64>, values: Array1<f64>) -> RationalResult<Self> {
        if points.nrows() == 0 {
            return Err(RationalError::EmptyTrainingSet);
        }
        if points.ncols() == 0 {
            return Err(RationalError::InvalidDimension {
                dim: 0,
                reason: "Training points need at least one coordinate.",
            });
        }
        if points.nrows() != values.len() {
            return Err(RationalError::LengthMismatch {
                points: points.nrows(),
                values: values.len(),
            });
        }
        let offset = points.len();
        for (index, &value) in points.iter().enumerate() {
            if !value.is_finite() {
                return Err(RationalError::NonFiniteData { index, value });
            }
        }
        for (i, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(RationalError::NonFiniteData { index: offset + i, value });
            }
        }
        Ok(Self { points, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false` for a validated set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn point(&self, i: usize) -> ArrayView1<'_, f64> {
        self.points.row(i)
    }

    /// First `n` rows.
    ///
    /// # Errors
    /// - [`RationalError::InsufficientTrainingData`] if `n > self.len()`.
    /// - [`RationalError::EmptyTrainingSet`] if `n == 0`.
    pub fn head(&self, n: usize) -> RationalResult<Self> {
        if n > self.len() {
            return Err(RationalError::InsufficientTrainingData {
                requested: n,
                available: self.len(),
            });
        }
        if n == 0 {
            return Err(RationalError::EmptyTrainingSet);
        }
        Ok(Self {
            points: self.points.slice(ndarray::s![..n, ..]).to_owned(),
            values: self.values.slice(ndarray::s![..n]).to_owned(),
        })
    }

    /// Rows at `indices`, in the given order.
    ///
    /// # Errors
    /// - [`RationalError::EmptyTrainingSet`] if `indices` is empty.
    /// - [`RationalError::InvalidFold`] if an index is out of range.
    pub fn select(&self, indices: &[usize]) -> RationalResult<Self> {
        if indices.is_empty() {
            return Err(RationalError::EmptyTrainingSet);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(RationalError::InvalidFold {
                k: 0,
                index: bad,
                len: self.len(),
                reason: "Row index out of range.",
            });
        }
        Ok(Self {
            points: self.points.select(Axis(0), indices),
            values: self.values.select(Axis(0), indices),
        })
    }

    /// Contiguous k-fold split: returns `(train, test)` for fold `i`.
    ///
    /// # Errors
    /// - [`RationalError::InvalidFold`] if `k < 2`, `k > len`, or `i ≥ k`.
    pub fn fold(&self, k: usize, i: usize) -> RationalResult<(Self, Self)> {
        let len = self.len();
        if k < 2 || k > len {
            return Err(RationalError::InvalidFold {
                k,
                index: i,
                len,
                reason: "Need 2 <= k <= number of points.",
            });
        }
        if i >= k {
            return Err(RationalError::InvalidFold {
                k,
                index: i,
                len,
                reason: "Fold index must be below k.",
            });
        }
        let test_range = fold_range(len, k, i);
        let test: Vec<usize> = test_range.clone().collect();
        let train: Vec<usize> = (0..len).filter(|j| !test_range.contains(j)).collect();
        Ok((self.select(&train)?, self.select(&test)?))
    }
}

/// Row range of test fold `i` in a contiguous k-fold split of `len` rows.
pub fn fold_range(len: usize, k: usize, i: usize) -> std::ops::Range<usize> {
    let base = len / k;
    let extra = len % k;
    let start = i * base + i.min(extra);
    let size = base + usize::from(i < extra);
    start..start + size
}
