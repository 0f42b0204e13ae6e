//! Single-step heteroscedasticity correction.
//!
//! 1. preliminary GLS fit of `y` on `X` (with a known `Σ` if given)
//! 2. OLS of the squared residuals on `Z`
//! 3. WLS of `y` on `X` with weights `1 / fitted variance`
//!
//! The step-2 regression is attached to the step-3 result.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::fgls::design::{VarianceExog, check_mean_data};
use crate::regression::{Gls, LeastSquares, Ols, RegressionResults, Sigma, Wls};

/// Mean fits run by [`TwoStepHetGls::fit`]: the preliminary one and the weighted one.
pub const TWO_STEP_MEAN_FITS: usize = 2;

#[derive(Debug, Clone)]
pub struct TwoStepHetGls {
    endog: DVector<f64>,
    exog: DMatrix<f64>,
    exog_var: DMatrix<f64>,
    sigma: Option<Sigma>,
}

impl TwoStepHetGls {
    pub fn new(
        endog: DVector<f64>,
        exog: DMatrix<f64>,
        exog_var: impl Into<VarianceExog>,
    ) -> Result<Self, AppError> {
        check_mean_data(&endog, &exog)?;
        let exog_var = exog_var.into().into_matrix(endog.len())?;
        Ok(Self {
            endog,
            exog,
            exog_var,
            sigma: None,
        })
    }

    /// Use a known error covariance for the preliminary fit.
    pub fn with_sigma(mut self, sigma: Sigma) -> Result<Self, AppError> {
        sigma.validate(self.endog.len())?;
        self.sigma = Some(sigma);
        Ok(self)
    }

    pub fn endog(&self) -> &DVector<f64> {
        &self.endog
    }

    pub fn exog(&self) -> &DMatrix<f64> {
        &self.exog
    }

    pub fn exog_var(&self) -> &DMatrix<f64> {
        &self.exog_var
    }

    pub fn sigma(&self) -> Option<&Sigma> {
        self.sigma.as_ref()
    }

    /// Run the three-stage correction.
    ///
    /// `dampening` is accepted for API stability but has no effect: the weights
    /// are always the undamped `1 / fitted variance`.
    pub fn fit(&self, dampening: f64) -> Result<RegressionResults, AppError> {
        if dampening != 1.0 {
            log::warn!("dampening={dampening} is ignored; weights use the undamped variance fit");
        }

        let preliminary = Gls::new(self.sigma.clone())
            .solve(&self.endog, &self.exog, None)
            .map_err(|e| e.with_context("preliminary fit"))?;

        let squared = preliminary.resid.map(|r| r * r);
        let variance_fit = Ols
            .solve(&squared, &self.exog_var, None)
            .map_err(|e| e.with_context("variance fit"))?;

        let weights = variance_fit.fitted_values.map(|v| 1.0 / v);
        let mut results = Wls::new()
            .solve(&self.endog, &self.exog, Some(&weights))
            .map_err(|e| e.with_context("mean fit"))?;

        log::debug!(
            "two-step fit: variance params {:?}, mean params {:?}",
            variance_fit.params.as_slice(),
            results.params.as_slice()
        );

        results.residual_regression = Some(Box::new(variance_fit));
        Ok(results)
    }
}
