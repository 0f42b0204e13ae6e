//! Shared "fit pipeline" logic used by every estimator subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> estimator construction -> fit -> outputs
//!
//! The command handlers can then focus on presentation and exports.

use nalgebra::DVector;

use crate::domain::{EstimatorKind, FitConfig};
use crate::error::AppError;
use crate::fgls::{IterationHistory, IterativeHetGls, TWO_STEP_MEAN_FITS, TwoStepHetGls};
use crate::io::ingest::{Dataset, load_dataset};
use crate::regression::RegressionResults;

/// All computed outputs of a single fit run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    pub results: RegressionResults,
    /// Weights used by the final mean fit.
    pub weights: DVector<f64>,
    /// Number of mean fits performed.
    pub iterations: usize,
    /// Per-iteration coefficients (iterative estimator only).
    pub history: Option<IterationHistory>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let dataset = load_dataset(&config.data)?;
    log::info!(
        "loaded {} observations from '{}' ({} rows skipped)",
        dataset.nobs(),
        config.data.csv_path.display(),
        dataset.row_errors.len()
    );
    run_fit_with_dataset(config, dataset)
}

/// Execute the fitting pipeline on an already loaded dataset.
pub fn run_fit_with_dataset(config: &FitConfig, dataset: Dataset) -> Result<RunOutput, AppError> {
    let (results, history) = match config.estimator {
        EstimatorKind::Iterative => {
            let mut model = IterativeHetGls::new(dataset.y.clone(), dataset.x.clone())?
                .with_exog_var(dataset.z.clone())?
                .with_link(config.link.to_link());
            if let Some(w) = &dataset.weights {
                model = model.with_weights(w.clone())?;
            }
            let results = model.iterative_fit(config.max_iterations)?;
            (results, Some(model.history().clone()))
        }
        EstimatorKind::TwoStep => {
            if dataset.weights.is_some() {
                log::warn!("initial weights are ignored by the two-step estimator");
            }
            let model = TwoStepHetGls::new(dataset.y.clone(), dataset.x.clone(), dataset.z.clone())?;
            (model.fit(config.dampening)?, None)
        }
    };
    let iterations = history.as_ref().map_or(TWO_STEP_MEAN_FITS, |h| h.iterations());

    let weights = results
        .weights
        .clone()
        .unwrap_or_else(|| DVector::from_element(dataset.nobs(), 1.0));

    Ok(RunOutput {
        dataset,
        results,
        weights,
        iterations,
        history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataConfig, LinkKind};
    use crate::io::ingest::read_dataset;
    use std::path::PathBuf;

    fn config(estimator: EstimatorKind, max_iterations: usize) -> FitConfig {
        FitConfig {
            data: DataConfig {
                csv_path: PathBuf::from("inline.csv"),
                y_col: "y".to_string(),
                x_cols: vec!["x".to_string()],
                z_cols: vec!["z".to_string()],
                weights_col: None,
                intercept: true,
                var_intercept: false,
            },
            estimator,
            link: LinkKind::Identity,
            max_iterations,
            dampening: 1.0,
            export_results: None,
            export_observations: None,
        }
    }

    const CSV: &str = "y,x,z\n1.05,1,1\n1.9,2,1\n3.05,3,1\n4.6,4,4\n4.2,5,4\n6.7,6,4\n";

    #[test]
    fn iterative_pipeline_keeps_history() {
        let cfg = config(EstimatorKind::Iterative, 3);
        let data = read_dataset(CSV.as_bytes(), &cfg.data).unwrap();
        let run = run_fit_with_dataset(&cfg, data).unwrap();
        let history = run.history.unwrap();
        assert_eq!(history.self_params.len(), 3);
        assert_eq!(history.variance_params.len(), 2);
        assert_eq!(run.iterations, 3);
        assert_eq!(run.weights.len(), 6);
        assert!(run.weights[0] > run.weights[5]);
    }

    #[test]
    fn two_step_pipeline_attaches_variance_fit() {
        let cfg = config(EstimatorKind::TwoStep, 3);
        let data = read_dataset(CSV.as_bytes(), &cfg.data).unwrap();
        let run = run_fit_with_dataset(&cfg, data).unwrap();
        assert!(run.history.is_none());
        assert!(run.results.residual_regression.is_some());
        assert_eq!(run.iterations, 2);
    }

    #[test]
    fn zero_iterations_fail_validation() {
        let cfg = config(EstimatorKind::Iterative, 0);
        let data = read_dataset(CSV.as_bytes(), &cfg.data).unwrap();
        let err = run_fit_with_dataset(&cfg, data).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
