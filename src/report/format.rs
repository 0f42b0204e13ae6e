//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the estimation code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{Coefficient, EstimatorKind, FitConfig};
use crate::report::coefficients;

/// Format the full run summary (dataset, coefficients, variance model, history).
pub fn format_fit_summary(run: &RunOutput, config: &FitConfig) -> String {
    let mut out = String::new();
    let results = &run.results;

    out.push_str("=== hetfit - Heteroscedasticity-corrected regression ===\n");
    out.push_str(&format!("Estimator: {}\n", config.estimator.display_name()));
    if config.estimator == EstimatorKind::Iterative {
        out.push_str(&format!(
            "Link: {:?} | iterations: {}\n",
            config.link, run.iterations
        ));
    } else {
        out.push_str(&format!("Mean fits: {}\n", run.iterations));
    }
    out.push_str(&format!(
        "Data: {} | rows used={} of {}\n",
        config.data.csv_path.display(),
        run.dataset.nobs(),
        run.dataset.rows_read
    ));
    out.push_str(&format!(
        "Fit: nobs={} df_resid={} ssr={:.6} scale={:.6}\n",
        results.nobs, results.df_resid, results.ssr, results.scale
    ));
    out.push_str(&format!(
        "Weights: min={:.6} max={:.6}\n",
        run.weights.min(),
        run.weights.max()
    ));

    out.push_str("\nMean model:\n");
    out.push_str(&format_table(&coefficients(&run.dataset.x_names, results)));

    match results.residual_regression.as_deref() {
        Some(aux) => {
            out.push_str("\nVariance model (last re-estimation):\n");
            out.push_str(&format_table(&coefficients(&run.dataset.z_names, aux)));
        }
        None => out.push_str("\nVariance model: not re-estimated (single weighted fit)\n"),
    }

    if let Some(history) = &run.history {
        let changes = history.param_changes();
        if !changes.is_empty() {
            out.push_str("\nParameter change per iteration:\n");
            for (i, c) in changes.iter().enumerate() {
                out.push_str(&format!("  {} -> {}: {c:.6e}\n", i + 1, i + 2));
            }
        }
    }

    out
}

fn format_table(rows: &[Coefficient]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<16} {:>14} {:>14}\n", "name", "param", "std err"));
    out.push_str(&format!("{:-<16} {:-<14} {:-<14}\n", "", "", ""));
    for c in rows {
        out.push_str(&format!(
            "{:<16} {:>14.6} {:>14.6}\n",
            truncate(&c.name, 16),
            c.param,
            c.bse
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
