//! Regression results.

use nalgebra::{DMatrix, DVector};

/// Output of a single least-squares fit.
///
/// `resid` and `fitted_values` are on the original (unwhitened) scale; `wresid`
/// and `ssr` are on the whitened scale the solver actually minimized.
#[derive(Debug, Clone)]
pub struct RegressionResults {
    pub params: DVector<f64>,
    pub fitted_values: DVector<f64>,
    pub resid: DVector<f64>,
    pub wresid: DVector<f64>,
    /// Row weights used by the fit (`None` for OLS / GLS).
    pub weights: Option<DVector<f64>>,
    /// Standard errors of `params`, `√diag(scale · pinv · pinvᵀ)`.
    pub bse: DVector<f64>,
    pub nobs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    /// Whitened sum of squared residuals.
    pub ssr: f64,
    /// Error variance estimate `ssr / df_resid` (NaN when `df_resid == 0`).
    pub scale: f64,
    /// Variance-function regression attached by the heteroscedasticity
    /// estimators: the last squared-residual regression that produced the
    /// weights of this fit. `None` when no re-estimation took place.
    pub residual_regression: Option<Box<RegressionResults>>,
}

impl RegressionResults {
    /// Assemble results from a solved whitened problem.
    ///
    /// `pinv` must be the pseudo-inverse of `wexog`.
    pub(crate) fn from_whitened(
        endog: &DVector<f64>,
        exog: &DMatrix<f64>,
        wendog: &DVector<f64>,
        wexog: &DMatrix<f64>,
        pinv: &DMatrix<f64>,
        weights: Option<DVector<f64>>,
    ) -> Self {
        let params = pinv * wendog;
        let fitted_values = exog * &params;
        let resid = endog - &fitted_values;
        let wresid = wendog - wexog * &params;
        let ssr = wresid.dot(&wresid);

        let nobs = endog.len();
        let df_model = exog.ncols();
        let df_resid = nobs.saturating_sub(df_model);
        let scale = if df_resid > 0 { ssr / df_resid as f64 } else { f64::NAN };

        let normalized_cov = pinv * pinv.transpose();
        let bse = DVector::from_iterator(
            df_model,
            (0..df_model).map(|j| (scale * normalized_cov[(j, j)]).sqrt()),
        );

        Self {
            params,
            fitted_values,
            resid,
            wresid,
            weights,
            bse,
            nobs,
            df_model,
            df_resid,
            ssr,
            scale,
            residual_regression: None,
        }
    }
}
