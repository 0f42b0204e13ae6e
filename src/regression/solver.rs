//! Least-squares solvers behind a common capability.
//!
//! All three solvers reduce their problem to OLS on a whitened design:
//!
//! - OLS: no whitening
//! - WLS: rows scaled by `√w_i`
//! - GLS: rows premultiplied by `L⁻¹`, where `Σ = L Lᵀ`

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{AppError, EXIT_INPUT, EXIT_NUMERICAL};
use crate::math::pseudo_inverse;
use crate::regression::cache::DecompositionCache;
use crate::regression::results::RegressionResults;

/// A mean-structure solver: `solve(y, X, weights?) -> {params, fittedvalues, resid}`.
pub trait LeastSquares {
    /// Fit `endog` on `exog`, optionally with per-observation weights.
    fn solve(
        &mut self,
        endog: &DVector<f64>,
        exog: &DMatrix<f64>,
        weights: Option<&DVector<f64>>,
    ) -> Result<RegressionResults, AppError>;

    /// Drop any decomposition cached from a previous solve.
    fn invalidate(&mut self) {}

    fn name(&self) -> &'static str;
}

/// Ordinary least squares.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ols;

impl LeastSquares for Ols {
    fn solve(
        &mut self,
        endog: &DVector<f64>,
        exog: &DMatrix<f64>,
        weights: Option<&DVector<f64>>,
    ) -> Result<RegressionResults, AppError> {
        if weights.is_some() {
            return Err(AppError::new(EXIT_INPUT, "OLS does not accept weights; use WLS."));
        }
        check_data(endog, exog)?;
        let pinv = pseudo_inverse(exog)?;
        Ok(RegressionResults::from_whitened(endog, exog, endog, exog, &pinv, None))
    }

    fn name(&self) -> &'static str {
        "OLS"
    }
}

/// Weighted least squares with a cached pseudo-inverse of the whitened design.
///
/// The cache is reused across calls until [`LeastSquares::invalidate`] is
/// called, so callers that change the weights must invalidate first.
#[derive(Debug, Clone, Default)]
pub struct Wls {
    cache: DecompositionCache,
}

impl Wls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of whitened-design decompositions this solver has computed.
    pub fn decompositions(&self) -> usize {
        self.cache.computed()
    }
}

impl LeastSquares for Wls {
    fn solve(
        &mut self,
        endog: &DVector<f64>,
        exog: &DMatrix<f64>,
        weights: Option<&DVector<f64>>,
    ) -> Result<RegressionResults, AppError> {
        check_data(endog, exog)?;
        let weights = match weights {
            Some(w) => {
                check_weights(w, endog.len())?;
                w.clone()
            }
            None => DVector::from_element(endog.len(), 1.0),
        };

        let sqrt_w = weights.map(f64::sqrt);
        let wendog = endog.component_mul(&sqrt_w);
        let mut wexog = exog.clone();
        for (i, mut row) in wexog.row_iter_mut().enumerate() {
            row *= sqrt_w[i];
        }

        let pinv = self.cache.get_or_compute(&wexog)?;
        Ok(RegressionResults::from_whitened(
            endog,
            exog,
            &wendog,
            &wexog,
            pinv,
            Some(weights),
        ))
    }

    fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    fn name(&self) -> &'static str {
        "WLS"
    }
}

/// Known error covariance for [`Gls`].
#[derive(Debug, Clone)]
pub enum Sigma {
    /// Independent errors with the given per-observation variances.
    Diagonal(DVector<f64>),
    /// Full `n × n` covariance matrix (must be positive definite).
    Full(DMatrix<f64>),
}

impl Sigma {
    /// Check the covariance is usable for `nobs` observations.
    pub fn validate(&self, nobs: usize) -> Result<(), AppError> {
        match self {
            Sigma::Diagonal(d) => {
                if d.len() != nobs {
                    return Err(AppError::new(
                        EXIT_INPUT,
                        format!("Sigma has {} entries but there are {nobs} observations.", d.len()),
                    ));
                }
                if let Some(i) = d.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
                    return Err(AppError::new(
                        EXIT_NUMERICAL,
                        format!("Sigma variance {} at observation {i} is not positive.", d[i]),
                    ));
                }
            }
            Sigma::Full(m) => {
                if m.shape() != (nobs, nobs) {
                    return Err(AppError::new(
                        EXIT_INPUT,
                        format!(
                            "Sigma is {}x{} but there are {nobs} observations.",
                            m.nrows(),
                            m.ncols()
                        ),
                    ));
                }
                if m.iter().any(|v| !v.is_finite()) {
                    return Err(AppError::new(EXIT_NUMERICAL, "Sigma contains non-finite values."));
                }
            }
        }
        Ok(())
    }

    /// Premultiply by the whitening operator `Σ^{-1/2}`.
    fn whiten(&self, m: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
        match self {
            Sigma::Diagonal(d) => {
                let mut out = m.clone();
                for (i, mut row) in out.row_iter_mut().enumerate() {
                    row /= d[i].sqrt();
                }
                Ok(out)
            }
            Sigma::Full(s) => {
                let chol = Cholesky::new(s.clone())
                    .ok_or_else(|| AppError::new(EXIT_NUMERICAL, "Sigma is not positive definite."))?;
                chol.l()
                    .solve_lower_triangular(m)
                    .ok_or_else(|| AppError::new(EXIT_NUMERICAL, "Sigma whitening solve failed."))
            }
        }
    }
}

/// Generalized least squares with a known covariance (OLS when `sigma` is `None`).
#[derive(Debug, Clone, Default)]
pub struct Gls {
    pub sigma: Option<Sigma>,
}

impl Gls {
    pub fn new(sigma: Option<Sigma>) -> Self {
        Self { sigma }
    }
}

impl LeastSquares for Gls {
    fn solve(
        &mut self,
        endog: &DVector<f64>,
        exog: &DMatrix<f64>,
        weights: Option<&DVector<f64>>,
    ) -> Result<RegressionResults, AppError> {
        if weights.is_some() {
            return Err(AppError::new(EXIT_INPUT, "GLS takes a covariance matrix, not weights."));
        }
        check_data(endog, exog)?;

        let Some(sigma) = &self.sigma else {
            return Ols.solve(endog, exog, None);
        };
        sigma.validate(endog.len())?;

        let wexog = sigma.whiten(exog)?;
        let wendog_m = sigma.whiten(&DMatrix::from_column_slice(endog.len(), 1, endog.as_slice()))?;
        let wendog = wendog_m.column(0).into_owned();
        let pinv = pseudo_inverse(&wexog)?;
        Ok(RegressionResults::from_whitened(endog, exog, &wendog, &wexog, &pinv, None))
    }

    fn name(&self) -> &'static str {
        "GLS"
    }
}

/// Fit `endog ~ exog` by OLS.
pub fn ols_fit(endog: &DVector<f64>, exog: &DMatrix<f64>) -> Result<RegressionResults, AppError> {
    Ols.solve(endog, exog, None)
}

/// Fit `endog ~ exog` by WLS with the given weights.
pub fn wls_fit(
    endog: &DVector<f64>,
    exog: &DMatrix<f64>,
    weights: &DVector<f64>,
) -> Result<RegressionResults, AppError> {
    Wls::new().solve(endog, exog, Some(weights))
}

/// Fit `endog ~ exog` by GLS with an optional known covariance.
pub fn gls_fit(
    endog: &DVector<f64>,
    exog: &DMatrix<f64>,
    sigma: Option<Sigma>,
) -> Result<RegressionResults, AppError> {
    Gls::new(sigma).solve(endog, exog, None)
}

fn check_data(endog: &DVector<f64>, exog: &DMatrix<f64>) -> Result<(), AppError> {
    if endog.len() != exog.nrows() {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Response has {} rows but design has {}.", endog.len(), exog.nrows()),
        ));
    }
    if let Some(i) = endog.iter().position(|v| !v.is_finite()) {
        return Err(AppError::new(
            EXIT_NUMERICAL,
            format!("Response value {} at observation {i} is not finite.", endog[i]),
        ));
    }
    Ok(())
}

fn check_weights(weights: &DVector<f64>, nobs: usize) -> Result<(), AppError> {
    if weights.len() != nobs {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Weights have {} entries but there are {nobs} observations.", weights.len()),
        ));
    }
    if let Some(i) = weights.iter().position(|w| !(w.is_finite() && *w > 0.0)) {
        return Err(AppError::new(
            EXIT_NUMERICAL,
            format!(
                "Weight {} at observation {i} is not positive; the fitted variance must be > 0.",
                weights[i]
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn trend_design(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { (i + 1) as f64 })
    }

    #[test]
    fn ols_recovers_exact_line() {
        let x = trend_design(5);
        let y = DVector::from_fn(5, |i, _| 1.0 + 2.0 * (i + 1) as f64);
        let res = ols_fit(&y, &x).unwrap();
        assert_abs_diff_eq!(res.params[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(res.params[1], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(res.ssr, 0.0, epsilon = 1e-18);
        assert_eq!(res.df_resid, 3);
        assert!(res.residual_regression.is_none());
    }

    #[test]
    fn ols_standard_errors_match_closed_form() {
        // Simple regression: se(slope) = sqrt(s² / Σ(x - x̄)²).
        let x = trend_design(4);
        let y = DVector::from_row_slice(&[1.0, 3.0, 2.0, 5.0]);
        let res = ols_fit(&y, &x).unwrap();
        let sxx = 5.0; // x = 1..4, x̄ = 2.5
        let expected = (res.scale / sxx).sqrt();
        assert_abs_diff_eq!(res.bse[1], expected, epsilon = 1e-12);
    }

    #[test]
    fn wls_with_unit_weights_matches_ols() {
        let x = trend_design(6);
        let y = DVector::from_row_slice(&[1.0, 2.5, 2.9, 4.2, 5.1, 5.8]);
        let ols = ols_fit(&y, &x).unwrap();
        let wls = wls_fit(&y, &x, &DVector::from_element(6, 1.0)).unwrap();
        assert_abs_diff_eq!(ols.params, wls.params, epsilon = 1e-12);
        assert_abs_diff_eq!(ols.resid, wls.resid, epsilon = 1e-12);
    }

    #[test]
    fn wls_matches_scaled_ols() {
        let x = trend_design(5);
        let y = DVector::from_row_slice(&[1.2, 1.9, 3.4, 3.8, 5.3]);
        let w = DVector::from_row_slice(&[1.0, 4.0, 0.5, 2.0, 1.0]);
        let wls = wls_fit(&y, &x, &w).unwrap();

        let sw = w.map(f64::sqrt);
        let mut xs = x.clone();
        for (i, mut row) in xs.row_iter_mut().enumerate() {
            row *= sw[i];
        }
        let ys = y.component_mul(&sw);
        let ols = ols_fit(&ys, &xs).unwrap();

        assert_abs_diff_eq!(wls.params, ols.params, epsilon = 1e-10);
        assert_abs_diff_eq!(wls.ssr, ols.ssr, epsilon = 1e-10);
        // Residuals are reported on the original scale.
        assert_abs_diff_eq!(wls.resid, &y - &x * &wls.params, epsilon = 1e-12);
    }

    #[test]
    fn wls_rejects_non_positive_weights() {
        let x = trend_design(3);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let w = DVector::from_row_slice(&[1.0, 0.0, 1.0]);
        let err = wls_fit(&y, &x, &w).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NUMERICAL);
        assert!(err.message().contains("observation 1"));

        let w = DVector::from_row_slice(&[1.0, -2.0, 1.0]);
        assert!(wls_fit(&y, &x, &w).is_err());
    }

    #[test]
    fn wls_rejects_wrong_weight_length() {
        let x = trend_design(3);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let err = wls_fit(&y, &x, &DVector::from_element(2, 1.0)).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn wls_reuses_stale_decomposition_until_invalidated() {
        let x = trend_design(5);
        let y = DVector::from_row_slice(&[1.0, 2.2, 2.7, 4.5, 4.9]);
        let w1 = DVector::from_element(5, 1.0);
        let w2 = DVector::from_row_slice(&[5.0, 1.0, 1.0, 1.0, 0.2]);

        let mut solver = Wls::new();
        solver.solve(&y, &x, Some(&w1)).unwrap();
        solver.solve(&y, &x, Some(&w2)).unwrap();
        assert_eq!(solver.decompositions(), 1);

        solver.invalidate();
        let fresh = solver.solve(&y, &x, Some(&w2)).unwrap();
        assert_eq!(solver.decompositions(), 2);
        let expected = wls_fit(&y, &x, &w2).unwrap();
        assert_abs_diff_eq!(fresh.params, expected.params, epsilon = 1e-12);
    }

    #[test]
    fn gls_with_diagonal_sigma_matches_wls() {
        let x = trend_design(5);
        let y = DVector::from_row_slice(&[1.1, 2.3, 2.8, 4.4, 5.2]);
        let variances = DVector::from_row_slice(&[1.0, 2.0, 4.0, 2.0, 1.0]);
        let gls = gls_fit(&y, &x, Some(Sigma::Diagonal(variances.clone()))).unwrap();
        let wls = wls_fit(&y, &x, &variances.map(|v| 1.0 / v)).unwrap();
        assert_abs_diff_eq!(gls.params, wls.params, epsilon = 1e-10);
        assert_abs_diff_eq!(gls.ssr, wls.ssr, epsilon = 1e-10);
    }

    #[test]
    fn gls_with_full_diagonal_sigma_matches_diagonal_form() {
        let x = trend_design(4);
        let y = DVector::from_row_slice(&[0.8, 2.1, 3.3, 3.9]);
        let d = DVector::from_row_slice(&[1.0, 3.0, 2.0, 0.5]);
        let full = gls_fit(&y, &x, Some(Sigma::Full(DMatrix::from_diagonal(&d)))).unwrap();
        let diag = gls_fit(&y, &x, Some(Sigma::Diagonal(d))).unwrap();
        assert_abs_diff_eq!(full.params, diag.params, epsilon = 1e-10);
        assert_abs_diff_eq!(full.resid, diag.resid, epsilon = 1e-10);
    }

    #[test]
    fn gls_without_sigma_is_ols() {
        let x = trend_design(4);
        let y = DVector::from_row_slice(&[0.8, 2.1, 3.3, 3.9]);
        let gls = gls_fit(&y, &x, None).unwrap();
        let ols = ols_fit(&y, &x).unwrap();
        assert_abs_diff_eq!(gls.params, ols.params, epsilon = 1e-12);
    }

    #[test]
    fn gls_rejects_indefinite_sigma() {
        let x = trend_design(2);
        let y = DVector::from_row_slice(&[1.0, 2.0]);
        let sigma = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let err = gls_fit(&y, &x, Some(Sigma::Full(sigma))).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NUMERICAL);
    }

    #[test]
    fn ols_rejects_weights() {
        let x = trend_design(3);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        let w = DVector::from_element(3, 1.0);
        assert_eq!(Ols.solve(&y, &x, Some(&w)).unwrap_err().exit_code(), EXIT_INPUT);
    }
}
