//! Reporting utilities: serializable fit reports and terminal output.

pub mod format;

pub use format::*;

use chrono::Utc;

use crate::app::pipeline::RunOutput;
use crate::domain::{
    Coefficient, FitConfig, FitReport, HistoryReport, ObservationRow, VarianceModel,
};
use crate::regression::RegressionResults;

/// Pair coefficient names with a fit's params and standard errors.
pub fn coefficients(names: &[String], results: &RegressionResults) -> Vec<Coefficient> {
    results
        .params
        .iter()
        .zip(results.bse.iter())
        .enumerate()
        .map(|(j, (&param, &bse))| Coefficient {
            name: names.get(j).cloned().unwrap_or_else(|| format!("b{j}")),
            param,
            bse,
        })
        .collect()
}

/// Build the portable JSON report for a run.
pub fn build_fit_report(run: &RunOutput, config: &FitConfig) -> FitReport {
    let results = &run.results;
    let variance_model = results.residual_regression.as_deref().map(|aux| VarianceModel {
        coefficients: coefficients(&run.dataset.z_names, aux),
        ssr: aux.ssr,
    });
    let history = run.history.as_ref().map(|h| HistoryReport {
        self_params: h.self_params.iter().map(|p| p.iter().copied().collect()).collect(),
        variance_params: h.variance_params.iter().map(|p| p.iter().copied().collect()).collect(),
        param_changes: h.param_changes(),
    });

    FitReport {
        tool: "hetfit".to_string(),
        generated_at: Utc::now(),
        source: config.data.csv_path.clone(),
        estimator: config.estimator,
        link: config.link,
        iterations: run.iterations,
        nobs: results.nobs,
        df_resid: results.df_resid,
        coefficients: coefficients(&run.dataset.x_names, results),
        ssr: results.ssr,
        scale: results.scale,
        weights: run.weights.iter().copied().collect(),
        variance_model,
        history,
    }
}

/// Per-observation fitted values, residuals and weights (1-based row index).
pub fn observation_rows(run: &RunOutput) -> Vec<ObservationRow> {
    let r = &run.results;
    (0..r.nobs)
        .map(|i| ObservationRow {
            row: i + 1,
            y: run.dataset.y[i],
            fitted: r.fitted_values[i],
            resid: r.resid[i],
            weight: run.weights[i],
        })
        .collect()
}
