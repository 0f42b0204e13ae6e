//! Synthetic heteroscedastic samples.
//!
//! The generated data follows
//!
//! ```text
//! y_i = intercept + slope · x_i + ε_i,    ε_i ~ N(0, σ²_i)
//! ```
//!
//! with two variance regimes: the first half of the sample uses `low_sd`, the
//! second half `high_sd`. The `z` column holds `σ²_i`, so regressing squared
//! residuals on `z` (without a constant) is correctly specified.

use std::fs::File;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::Serialize;

use crate::domain::SimulationConfig;
use crate::error::{AppError, EXIT_INPUT};

/// Range of the regressor `x`.
const X_RANGE: (f64, f64) = (0.0, 10.0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRow {
    pub y: f64,
    pub x: f64,
    pub z: f64,
}

#[derive(Debug, Clone)]
pub struct SampleData {
    pub rows: Vec<SampleRow>,
}

pub fn generate_sample(config: &SimulationConfig) -> Result<SampleData, AppError> {
    if config.n < 4 {
        return Err(AppError::new(EXIT_INPUT, "Sample size must be >= 4."));
    }
    for (name, sd) in [("low_sd", config.low_sd), ("high_sd", config.high_sd)] {
        if !(sd.is_finite() && sd > 0.0) {
            return Err(AppError::new(EXIT_INPUT, format!("{name} must be finite and > 0, got {sd}.")));
        }
    }
    if !(config.intercept.is_finite() && config.slope.is_finite()) {
        return Err(AppError::new(EXIT_INPUT, "Intercept and slope must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Noise distribution error: {e}")))?;

    let half = config.n / 2;
    let rows = (0..config.n)
        .map(|i| {
            let sd = if i < half { config.low_sd } else { config.high_sd };
            let x = rng.gen_range(X_RANGE.0..=X_RANGE.1);
            let eps = sd * normal.sample(&mut rng);
            SampleRow {
                y: config.intercept + config.slope * x + eps,
                x,
                z: sd * sd,
            }
        })
        .collect();

    Ok(SampleData { rows })
}

/// Write the sample as CSV with columns `y,x,z`.
pub fn write_sample_csv(path: &Path, sample: &SampleData) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("Failed to create sample CSV '{}': {e}", path.display()))
    })?;
    let mut writer = csv::Writer::from_writer(file);
    for row in &sample.rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write sample CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush sample CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(seed: u64) -> SimulationConfig {
        SimulationConfig {
            n: 40,
            seed,
            intercept: 1.0,
            slope: 0.5,
            low_sd: 0.5,
            high_sd: 2.0,
            out: PathBuf::from("unused.csv"),
        }
    }

    #[test]
    fn sample_is_deterministic_per_seed() {
        let a = generate_sample(&config(7)).unwrap();
        let b = generate_sample(&config(7)).unwrap();
        let c = generate_sample(&config(8)).unwrap();
        assert_eq!(a.rows, b.rows);
        assert_ne!(a.rows, c.rows);
    }

    #[test]
    fn regimes_split_the_sample() {
        let sample = generate_sample(&config(1)).unwrap();
        assert_eq!(sample.rows.len(), 40);
        assert!(sample.rows[..20].iter().all(|r| r.z == 0.25));
        assert!(sample.rows[20..].iter().all(|r| r.z == 4.0));
        assert!(sample.rows.iter().all(|r| (0.0..=10.0).contains(&r.x)));
    }

    #[test]
    fn invalid_sd_is_rejected() {
        let mut cfg = config(1);
        cfg.high_sd = 0.0;
        assert!(generate_sample(&cfg).is_err());
    }
}
