//! Export fits to JSON and per-observation CSV.
//!
//! The JSON report is the portable representation of a fit (schema:
//! `domain::FitReport`); the CSV is meant for spreadsheets and downstream
//! scripts.

use std::fs::File;
use std::path::Path;

use crate::domain::{FitReport, ObservationRow};
use crate::error::{AppError, EXIT_INPUT};

/// Write a fit report as pretty JSON.
pub fn write_report_json(path: &Path, report: &FitReport) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("Failed to create report JSON '{}': {e}", path.display()))
    })?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}

/// Read a fit report written by [`write_report_json`].
pub fn read_report_json(path: &Path) -> Result<FitReport, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("Failed to open report JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Invalid report JSON: {e}")))
}

/// Write per-observation results to a CSV file.
pub fn write_observations_csv(path: &Path, rows: &[ObservationRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        AppError::new(EXIT_INPUT, format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
