//! Input coercion for the estimators.

use nalgebra::{DMatrix, DVector};

use crate::error::{AppError, EXIT_INPUT, EXIT_NUMERICAL};

/// Variance-explaining regressors `Z`, as a single column or a full matrix.
///
/// Whatever the input shape, the estimators only ever see an `n × m` matrix.
#[derive(Debug, Clone)]
pub enum VarianceExog {
    Column(DVector<f64>),
    Matrix(DMatrix<f64>),
}

impl From<DVector<f64>> for VarianceExog {
    fn from(value: DVector<f64>) -> Self {
        VarianceExog::Column(value)
    }
}

impl From<Vec<f64>> for VarianceExog {
    fn from(value: Vec<f64>) -> Self {
        VarianceExog::Column(DVector::from_vec(value))
    }
}

impl From<&[f64]> for VarianceExog {
    fn from(value: &[f64]) -> Self {
        VarianceExog::Column(DVector::from_column_slice(value))
    }
}

impl From<DMatrix<f64>> for VarianceExog {
    fn from(value: DMatrix<f64>) -> Self {
        VarianceExog::Matrix(value)
    }
}

impl VarianceExog {
    /// Coerce to a two-dimensional `nobs × m` matrix.
    ///
    /// A column becomes an `n × 1` matrix.
    pub fn into_matrix(self, nobs: usize) -> Result<DMatrix<f64>, AppError> {
        let z = match self {
            VarianceExog::Column(v) => DMatrix::from_column_slice(v.len(), 1, v.as_slice()),
            VarianceExog::Matrix(m) => m,
        };
        if z.nrows() != nobs {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Variance regressors have {} rows but there are {nobs} observations.", z.nrows()),
            ));
        }
        if z.ncols() == 0 {
            return Err(AppError::new(EXIT_INPUT, "Variance regressors have no columns."));
        }
        if z.iter().any(|v| !v.is_finite()) {
            return Err(AppError::new(EXIT_NUMERICAL, "Variance regressors contain non-finite values."));
        }
        Ok(z)
    }
}

/// Check that `endog` and `exog` describe the same observations.
pub fn check_mean_data(endog: &DVector<f64>, exog: &DMatrix<f64>) -> Result<(), AppError> {
    if endog.is_empty() {
        return Err(AppError::new(EXIT_INPUT, "Response is empty."));
    }
    if endog.len() != exog.nrows() {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Response has {} rows but design has {}.", endog.len(), exog.nrows()),
        ));
    }
    if exog.ncols() == 0 {
        return Err(AppError::new(EXIT_INPUT, "Design matrix has no columns."));
    }
    Ok(())
}
