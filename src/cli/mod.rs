//! Command-line parsing for the heteroscedasticity-corrected regression tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the estimation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::LinkKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "hetfit",
    version,
    about = "Linear regression with an estimated heteroscedastic variance function (FGLS)"
)]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Iterated FGLS: alternate mean and variance fits for a fixed number of passes.
    Fit(FitArgs),
    /// Single-step correction: preliminary fit, variance regression, weighted refit.
    TwoStep(TwoStepArgs),
    /// Write a synthetic dataset with two variance regimes.
    Simulate(SimulateArgs),
}

/// Input data and output options shared by the estimators.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Input CSV with a header row.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Response column.
    #[arg(long = "y", value_name = "COL", default_value = "y")]
    pub y: String,

    /// Mean regressor column (repeatable).
    #[arg(long = "x", value_name = "COL", default_value = "x")]
    pub x: Vec<String>,

    /// Variance regressor column (repeatable).
    #[arg(long = "z", value_name = "COL", default_value = "z")]
    pub z: Vec<String>,

    /// Column of initial weights (iterative estimator only; default: all ones).
    #[arg(long, value_name = "COL")]
    pub weights: Option<String>,

    /// Do not add a constant column to the mean regressors.
    #[arg(long)]
    pub no_intercept: bool,

    /// Add a constant column to the variance regressors.
    #[arg(long)]
    pub var_intercept: bool,

    /// Export the fit (coefficients, weights, history) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Export per-observation fitted values, residuals and weights to CSV.
    #[arg(long = "export-obs", value_name = "CSV")]
    pub export_obs: Option<PathBuf>,
}

/// Options for the iterative estimator.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Link applied to squared residuals before the variance regression.
    #[arg(long, value_enum, default_value_t = LinkKind::Identity)]
    pub link: LinkKind,

    /// Number of mean fits (1 = weighted fit only, 2 = two-step FGLS).
    ///
    /// Falls back to `HETFIT_MAX_ITER`, then to 3.
    #[arg(long = "max-iter", value_name = "N")]
    pub max_iter: Option<usize>,
}

/// Options for the single-step estimator.
#[derive(Debug, Args, Clone)]
pub struct TwoStepArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Accepted for compatibility; the variance update is not damped.
    #[arg(long, default_value_t = 1.0)]
    pub dampening: f64,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Number of observations.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub n: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// True intercept.
    #[arg(long, default_value_t = 1.0)]
    pub intercept: f64,

    /// True slope on `x`.
    #[arg(long, default_value_t = 0.5)]
    pub slope: f64,

    /// Error standard deviation of the low-variance regime.
    #[arg(long, default_value_t = 0.5)]
    pub low_sd: f64,

    /// Error standard deviation of the high-variance regime.
    #[arg(long, default_value_t = 2.0)]
    pub high_sd: f64,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}
