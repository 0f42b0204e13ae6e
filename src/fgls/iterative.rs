//! Iterated feasible GLS with an estimated variance function.
//!
//! Each pass:
//!
//! 1. drop the mean solver's cached decomposition
//! 2. fit `y ~ X` with the current weights
//! 3. unless this is the last pass: regress `link(r²)` on `Z`, set
//!    `w = 1 / invlink(fitted)` and invalidate again
//!
//! There is no convergence test; the loop always runs `max_iterations` passes.
//!
//! - `max_iterations = 1`: a single weighted fit with the initial weights
//! - `max_iterations = 2`: classic two-step FGLS
//! - `max_iterations > 2`: repeated refinement of the weights
//!
//! The estimator is stateful: the weights left by one successful call are the
//! starting weights of the next. A failed call leaves them untouched.

use nalgebra::{DMatrix, DVector};

use crate::error::{AppError, EXIT_INPUT};
use crate::fgls::design::{VarianceExog, check_mean_data};
use crate::fgls::history::IterationHistory;
use crate::fgls::link::VarianceLink;
use crate::regression::{LeastSquares, Ols, RegressionResults, Wls};

/// Iteration budget used when the caller does not choose one.
pub const DEFAULT_MAX_ITERATIONS: usize = 3;

#[derive(Debug, Clone)]
pub struct IterativeHetGls<S: LeastSquares = Wls> {
    endog: DVector<f64>,
    exog: DMatrix<f64>,
    exog_var: Option<DMatrix<f64>>,
    weights: DVector<f64>,
    link: VarianceLink,
    solver: S,
    history: IterationHistory,
}

impl IterativeHetGls<Wls> {
    /// Create an estimator with unit initial weights, the identity link and no
    /// variance regressors yet.
    pub fn new(endog: DVector<f64>, exog: DMatrix<f64>) -> Result<Self, AppError> {
        check_mean_data(&endog, &exog)?;
        let weights = DVector::from_element(endog.len(), 1.0);
        Ok(Self {
            endog,
            exog,
            exog_var: None,
            weights,
            link: VarianceLink::Identity,
            solver: Wls::new(),
            history: IterationHistory::new(),
        })
    }
}

impl<S: LeastSquares> IterativeHetGls<S> {
    /// Set the variance regressors `Z` (a column is treated as `n × 1`).
    pub fn with_exog_var(mut self, exog_var: impl Into<VarianceExog>) -> Result<Self, AppError> {
        self.exog_var = Some(exog_var.into().into_matrix(self.endog.len())?);
        Ok(self)
    }

    /// Set the weights used by the first pass.
    pub fn with_weights(mut self, weights: DVector<f64>) -> Result<Self, AppError> {
        if weights.len() != self.endog.len() {
            return Err(AppError::new(
                EXIT_INPUT,
                format!(
                    "Initial weights have {} entries but there are {} observations.",
                    weights.len(),
                    self.endog.len()
                ),
            ));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn with_link(mut self, link: VarianceLink) -> Self {
        self.link = link;
        self
    }

    /// Replace the mean-structure solver.
    pub fn with_solver<T: LeastSquares>(self, solver: T) -> IterativeHetGls<T> {
        IterativeHetGls {
            endog: self.endog,
            exog: self.exog,
            exog_var: self.exog_var,
            weights: self.weights,
            link: self.link,
            solver,
            history: IterationHistory::new(),
        }
    }

    pub fn endog(&self) -> &DVector<f64> {
        &self.endog
    }

    pub fn exog(&self) -> &DMatrix<f64> {
        &self.exog
    }

    pub fn exog_var(&self) -> Option<&DMatrix<f64>> {
        self.exog_var.as_ref()
    }

    /// Current weights: the initial ones before any fit, afterwards those
    /// computed by the last variance regression of the last successful call.
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn link(&self) -> &VarianceLink {
        &self.link
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// History of the last successful `iterative_fit` call.
    pub fn history(&self) -> &IterationHistory {
        &self.history
    }

    /// Alternate mean and variance fits for exactly `max_iterations` passes.
    ///
    /// The returned result is the last mean fit, with the last variance
    /// regression attached (`None` when `max_iterations == 1`).
    ///
    /// On error the history is left empty and the weights are those the call
    /// started with.
    pub fn iterative_fit(&mut self, max_iterations: usize) -> Result<RegressionResults, AppError> {
        if max_iterations < 1 {
            return Err(AppError::new(EXIT_INPUT, "max_iterations must be >= 1."));
        }
        if max_iterations > 1 && self.exog_var.is_none() {
            return Err(AppError::new(
                EXIT_INPUT,
                "Variance regressors are required to re-estimate weights (max_iterations > 1).",
            ));
        }

        self.history = IterationHistory::new();
        let mut history = IterationHistory::new();
        // Weights are committed only if every pass succeeds.
        let mut weights = self.weights.clone();
        let mut last_variance_fit: Option<RegressionResults> = None;
        let mut last_fit: Option<RegressionResults> = None;

        for i in 0..max_iterations {
            let pass = i + 1;
            self.solver.invalidate();

            let results = self
                .solver
                .solve(&self.endog, &self.exog, Some(&weights))
                .map_err(|e| e.with_context(format!("mean fit (iteration {pass})")))?;
            history.self_params.push(results.params.clone());

            if pass < max_iterations {
                let (variance_fit, updated) = self.reestimate_weights(&results, pass)?;
                weights = updated;
                history.variance_params.push(variance_fit.params.clone());
                last_variance_fit = Some(variance_fit);
            }

            log::debug!(
                "iteration {pass}/{max_iterations}: params {:?}",
                results.params.as_slice()
            );
            last_fit = Some(results);
        }

        let mut results = last_fit
            .ok_or_else(|| AppError::new(EXIT_INPUT, "No iterations were run."))?;
        results.residual_regression = last_variance_fit.map(Box::new);

        log::info!(
            "iterative FGLS finished after {max_iterations} iteration(s) (link={}, ssr={:.6e})",
            self.link.name(),
            results.ssr
        );

        self.weights = weights;
        self.history = history;
        Ok(results)
    }

    /// Regress the linked squared residuals on `Z` and derive the next weights.
    fn reestimate_weights(
        &mut self,
        results: &RegressionResults,
        pass: usize,
    ) -> Result<(RegressionResults, DVector<f64>), AppError> {
        let exog_var = self.exog_var.as_ref().ok_or_else(|| {
            AppError::new(EXIT_INPUT, "Variance regressors are required to re-estimate weights.")
        })?;

        let target = self.link.apply(&results.resid.map(|r| r * r));
        let variance_fit = Ols
            .solve(&target, exog_var, None)
            .map_err(|e| e.with_context(format!("variance fit (iteration {pass})")))?;

        let variances = self
            .link
            .apply_inverse(&variance_fit.fitted_values)
            .map_err(|e| e.with_context(format!("weight update (iteration {pass})")))?;
        let weights = variances.map(|v| 1.0 / v);
        self.solver.invalidate();

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "iteration {pass}: weights in [{:.6e}, {:.6e}]",
                weights.min(),
                weights.max()
            );
        }

        Ok((variance_fit, weights))
    }
}
