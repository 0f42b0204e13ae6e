//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - runs the requested estimator or the sample generator
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, DataArgs, FitArgs, SimulateArgs, TwoStepArgs};
use crate::domain::{DataConfig, EstimatorKind, FitConfig, LinkKind, SimulationConfig};
use crate::error::{AppError, EXIT_INPUT};
use crate::fgls::DEFAULT_MAX_ITERATIONS;

pub mod pipeline;

/// Environment variable consulted when `--max-iter` is not given.
pub const MAX_ITER_ENV: &str = "HETFIT_MAX_ITER";

const SUBCOMMANDS: [&str; 4] = ["fit", "two-step", "simulate", "help"];

/// Entry point for the `hetfit` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `hetfit --csv data.csv` behaves like `hetfit fit --csv data.csv`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::TwoStep(args) => handle_two_step(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let env_max_iter = std::env::var(MAX_ITER_ENV).ok();
    let config = fit_config_from_args(&args, env_max_iter.as_deref())?;
    run_and_report(&config)
}

fn handle_two_step(args: TwoStepArgs) -> Result<(), AppError> {
    let config = two_step_config_from_args(&args);
    run_and_report(&config)
}

fn run_and_report(config: &FitConfig) -> Result<(), AppError> {
    let run = pipeline::run_fit(config)?;

    println!("{}", crate::report::format_fit_summary(&run, config));

    for e in &run.dataset.row_errors {
        log::warn!("line {}: {}", e.line, e.message);
    }

    if let Some(path) = &config.export_results {
        let report = crate::report::build_fit_report(&run, config);
        crate::io::export::write_report_json(path, &report)?;
        log::info!("wrote fit report to '{}'", path.display());
    }
    if let Some(path) = &config.export_observations {
        let rows = crate::report::observation_rows(&run);
        crate::io::export::write_observations_csv(path, &rows)?;
        log::info!("wrote {} observation rows to '{}'", rows.len(), path.display());
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = simulation_config_from_args(&args);
    let sample = crate::data::generate_sample(&config)?;
    crate::data::write_sample_csv(&config.out, &sample)?;
    println!(
        "Wrote {} rows (low_sd={}, high_sd={}) to {}",
        sample.rows.len(),
        config.low_sd,
        config.high_sd,
        config.out.display()
    );
    Ok(())
}

pub fn data_config_from_args(args: &DataArgs) -> DataConfig {
    DataConfig {
        csv_path: args.csv.clone(),
        y_col: args.y.clone(),
        x_cols: args.x.clone(),
        z_cols: args.z.clone(),
        weights_col: args.weights.clone(),
        intercept: !args.no_intercept,
        var_intercept: args.var_intercept,
    }
}

pub fn fit_config_from_args(args: &FitArgs, env_max_iter: Option<&str>) -> Result<FitConfig, AppError> {
    Ok(FitConfig {
        data: data_config_from_args(&args.data),
        estimator: EstimatorKind::Iterative,
        link: args.link,
        max_iterations: resolve_max_iterations(args.max_iter, env_max_iter)?,
        dampening: 1.0,
        export_results: args.data.export.clone(),
        export_observations: args.data.export_obs.clone(),
    })
}

pub fn two_step_config_from_args(args: &TwoStepArgs) -> FitConfig {
    FitConfig {
        data: data_config_from_args(&args.data),
        estimator: EstimatorKind::TwoStep,
        link: LinkKind::Identity,
        max_iterations: 2,
        dampening: args.dampening,
        export_results: args.data.export.clone(),
        export_observations: args.data.export_obs.clone(),
    }
}

pub fn simulation_config_from_args(args: &SimulateArgs) -> SimulationConfig {
    SimulationConfig {
        n: args.n,
        seed: args.seed,
        intercept: args.intercept,
        slope: args.slope,
        low_sd: args.low_sd,
        high_sd: args.high_sd,
        out: args.out.clone(),
    }
}

/// Resolve the iteration budget: flag, then environment, then the default.
///
/// The value itself is validated by the estimator (`0` is rejected there).
pub fn resolve_max_iterations(flag: Option<usize>, env: Option<&str>) -> Result<usize, AppError> {
    if let Some(n) = flag {
        return Ok(n);
    }
    match env {
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            AppError::new(EXIT_INPUT, format!("{MAX_ITER_ENV} must be a non-negative integer, got '{raw}'."))
        }),
        None => Ok(DEFAULT_MAX_ITERATIONS),
    }
}

/// Rewrite argv so flag-only invocations default to `hetfit fit`.
///
/// Rules:
/// - `hetfit --csv d.csv ...`       -> `hetfit fit --csv d.csv ...`
/// - any explicit subcommand        -> unchanged
/// - `hetfit`, `--help/--version`   -> unchanged (clap shows help/version)
///
/// Only the first token after the global `--log-level` option decides; flag
/// values such as a column named `help` are never read as subcommands.
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(first) = first_command_token(&argv) else {
        return argv;
    };

    let is_top_level_help_or_version = matches!(first, "-h" | "--help" | "-V" | "--version");
    if is_top_level_help_or_version || SUBCOMMANDS.contains(&first) {
        return argv;
    }

    if first.starts_with('-') {
        argv.insert(1, "fit".to_string());
    }
    argv
}

/// First argument that is not the global `--log-level` option or its value.
fn first_command_token(argv: &[String]) -> Option<&str> {
    let mut rest = argv.iter().skip(1);
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--log-level" => {
                rest.next();
            }
            a if a.starts_with("--log-level=") => {}
            a => return Some(a),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_only_default_to_fit() {
        let out = rewrite_args(args(&["hetfit", "--csv", "d.csv"]));
        assert_eq!(out, args(&["hetfit", "fit", "--csv", "d.csv"]));
    }

    #[test]
    fn explicit_subcommands_are_untouched() {
        let input = args(&["hetfit", "--log-level", "debug", "two-step", "--csv", "d.csv"]);
        assert_eq!(rewrite_args(input.clone()), input);
        let input = args(&["hetfit", "--help"]);
        assert_eq!(rewrite_args(input.clone()), input);
        let input = args(&["hetfit"]);
        assert_eq!(rewrite_args(input.clone()), input);
    }

    #[test]
    fn column_named_like_a_subcommand_still_defaults_to_fit() {
        let out = rewrite_args(args(&["hetfit", "--csv", "d.csv", "--x", "help"]));
        assert_eq!(out, args(&["hetfit", "fit", "--csv", "d.csv", "--x", "help"]));

        let out = rewrite_args(args(&["hetfit", "--log-level", "debug", "--csv", "d.csv", "--z", "fit"]));
        assert_eq!(out[1], "fit");
        let cli = crate::cli::Cli::parse_from(out);
        let Command::Fit(fit) = cli.command else {
            panic!("expected fit subcommand");
        };
        assert_eq!(fit.data.z, args(&["fit"]));
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn variance_intercept_is_opt_in() {
        let base = ["hetfit", "two-step", "--csv", "d.csv"];
        let cli = crate::cli::Cli::parse_from(args(&base));
        let Command::TwoStep(plain) = cli.command else {
            panic!("expected two-step subcommand");
        };
        assert!(!two_step_config_from_args(&plain).data.var_intercept);

        let cli = crate::cli::Cli::parse_from(args(&[&base[..], &["--var-intercept"][..]].concat()));
        let Command::TwoStep(with_const) = cli.command else {
            panic!("expected two-step subcommand");
        };
        let config = two_step_config_from_args(&with_const);
        assert!(config.data.var_intercept);
        assert!(config.data.intercept);

        let rejected = crate::cli::Cli::try_parse_from(args(&[&base[..], &["--no-var-intercept"][..]].concat()));
        assert!(rejected.is_err());
    }

    #[test]
    fn max_iterations_resolution_order() {
        assert_eq!(resolve_max_iterations(Some(5), Some("7")).unwrap(), 5);
        assert_eq!(resolve_max_iterations(None, Some(" 7 ")).unwrap(), 7);
        assert_eq!(resolve_max_iterations(None, None).unwrap(), DEFAULT_MAX_ITERATIONS);
        assert_eq!(resolve_max_iterations(None, Some("many")).unwrap_err().exit_code(), EXIT_INPUT);
    }

    #[test]
    fn cli_parses_repeated_columns() {
        let cli = crate::cli::Cli::parse_from(args(&[
            "hetfit", "fit", "--csv", "d.csv", "--x", "a", "--x", "b", "--z", "s", "--link", "log",
            "--max-iter", "4",
        ]));
        let Command::Fit(fit) = cli.command else {
            panic!("expected fit subcommand");
        };
        let config = fit_config_from_args(&fit, None).unwrap();
        assert_eq!(config.data.x_cols, args(&["a", "b"]));
        assert_eq!(config.data.z_cols, args(&["s"]));
        assert_eq!(config.link, LinkKind::Log);
        assert_eq!(config.max_iterations, 4);
        assert!(config.data.intercept);
        assert!(!config.data.var_intercept);
    }
}
