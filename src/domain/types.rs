//! Shared domain types.
//!
//! Configuration structs are plain data resolved from CLI flags; report types
//! are serializable so a fit can be exported to JSON/CSV and reloaded later.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::fgls::VarianceLink;

/// Which heteroscedasticity estimator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    /// Alternating mean / variance fits for a fixed number of iterations.
    Iterative,
    /// Preliminary fit, one variance regression, one weighted refit.
    TwoStep,
}

impl EstimatorKind {
    pub fn display_name(self) -> &'static str {
        match self {
            EstimatorKind::Iterative => "iterative FGLS",
            EstimatorKind::TwoStep => "two-step FGLS",
        }
    }
}

/// Built-in variance links selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Regress squared residuals directly.
    Identity,
    /// Regress log squared residuals; variances are `exp(fitted)`.
    Log,
}

impl LinkKind {
    pub fn to_link(self) -> VarianceLink {
        match self {
            LinkKind::Identity => VarianceLink::Identity,
            LinkKind::Log => VarianceLink::Log,
        }
    }
}

/// Where the data comes from and which columns play which role.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub csv_path: PathBuf,
    /// Response column.
    pub y_col: String,
    /// Mean-structure regressors.
    pub x_cols: Vec<String>,
    /// Variance regressors.
    pub z_cols: Vec<String>,
    /// Optional column of initial weights.
    pub weights_col: Option<String>,
    /// Prepend a constant column to `X`.
    pub intercept: bool,
    /// Prepend a constant column to `Z`.
    pub var_intercept: bool,
}

/// A full fit run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults and `.env`).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data: DataConfig,
    pub estimator: EstimatorKind,
    pub link: LinkKind,
    pub max_iterations: usize,
    /// Accepted by the two-step estimator; currently has no effect.
    pub dampening: f64,
    pub export_results: Option<PathBuf>,
    pub export_observations: Option<PathBuf>,
}

/// Parameters of the synthetic two-regime dataset.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub n: usize,
    pub seed: u64,
    pub intercept: f64,
    pub slope: f64,
    /// Error standard deviation of the first half of the sample.
    pub low_sd: f64,
    /// Error standard deviation of the second half of the sample.
    pub high_sd: f64,
    pub out: PathBuf,
}

/// One estimated coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub param: f64,
    pub bse: f64,
}

/// Variance-function regression attached to the final fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceModel {
    pub coefficients: Vec<Coefficient>,
    pub ssr: f64,
}

/// Per-iteration coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub self_params: Vec<Vec<f64>>,
    pub variance_params: Vec<Vec<f64>>,
    pub param_changes: Vec<f64>,
}

/// A saved fit (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub source: PathBuf,
    pub estimator: EstimatorKind,
    pub link: LinkKind,
    /// Iteration budget (1 for the two-step estimator's single weighted fit).
    pub iterations: usize,
    pub nobs: usize,
    pub df_resid: usize,
    pub coefficients: Vec<Coefficient>,
    pub ssr: f64,
    pub scale: f64,
    pub weights: Vec<f64>,
    pub variance_model: Option<VarianceModel>,
    pub history: Option<HistoryReport>,
}

/// Per-observation output row (CSV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub row: usize,
    pub y: f64,
    pub fitted: f64,
    pub resid: f64,
    pub weight: f64,
}
