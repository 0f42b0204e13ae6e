//! CSV ingest and normalization.
//!
//! This module turns a header-based CSV into the three numeric inputs of the
//! estimators: the response `y`, the mean design `X` and the variance design `Z`
//! (plus optional initial weights).
//!
//! Design goals:
//! - **Strict schema** for the requested columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (rows keep their file order)
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use csv::StringRecord;
use nalgebra::{DMatrix, DVector};

use crate::domain::DataConfig;
use crate::error::{AppError, EXIT_INPUT, EXIT_INSUFFICIENT};

/// Name used for prepended constant columns.
pub const CONST_NAME: &str = "const";

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: estimator inputs + column names + row bookkeeping.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub y: DVector<f64>,
    pub x: DMatrix<f64>,
    pub z: DMatrix<f64>,
    pub weights: Option<DVector<f64>>,
    pub x_names: Vec<String>,
    pub z_names: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl Dataset {
    pub fn nobs(&self) -> usize {
        self.y.len()
    }
}

/// Load the dataset described by `config`.
pub fn load_dataset(config: &DataConfig) -> Result<Dataset, AppError> {
    let file = File::open(&config.csv_path).map_err(|e| {
        AppError::new(
            EXIT_INPUT,
            format!("Failed to open CSV '{}': {e}", config.csv_path.display()),
        )
    })?;
    read_dataset(file, config)
}

/// Parse a dataset from any CSV source.
pub fn read_dataset<R: Read>(source: R, config: &DataConfig) -> Result<Dataset, AppError> {
    if config.x_cols.is_empty() && !config.intercept {
        return Err(AppError::new(EXIT_INPUT, "No mean regressors: pass --x or keep the intercept."));
    }
    if config.z_cols.is_empty() && !config.var_intercept {
        return Err(AppError::new(
            EXIT_INPUT,
            "No variance regressors: pass --z or --var-intercept.",
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let columns = Columns {
        y: column_index(&header_map, &config.y_col)?,
        x: config
            .x_cols
            .iter()
            .map(|c| column_index(&header_map, c))
            .collect::<Result<Vec<_>, _>>()?,
        z: config
            .z_cols
            .iter()
            .map(|c| column_index(&header_map, c))
            .collect::<Result<Vec<_>, _>>()?,
        weights: config
            .weights_col
            .as_ref()
            .map(|c| column_index(&header_map, c))
            .transpose()?,
    };

    let mut y = Vec::new();
    let mut x_rows: Vec<Vec<f64>> = Vec::new();
    let mut z_rows: Vec<Vec<f64>> = Vec::new();
    let mut w = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let parsed = parse_row(&record, &columns, config);

        match parsed {
            Ok((yi, xi, zi, wi)) => {
                y.push(yi);
                x_rows.push(xi);
                z_rows.push(zi);
                if let Some(wi) = wi {
                    w.push(wi);
                }
            }
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if y.is_empty() {
        return Err(AppError::new(EXIT_INSUFFICIENT, "No valid rows remain after parsing."));
    }
    if !row_errors.is_empty() {
        log::warn!("skipped {} of {rows_read} CSV rows", row_errors.len());
    }

    let (x, x_names) = assemble_design(&x_rows, &config.x_cols, config.intercept);
    let (z, z_names) = assemble_design(&z_rows, &config.z_cols, config.var_intercept);

    Ok(Dataset {
        y: DVector::from_vec(y),
        x,
        z,
        weights: columns.weights.map(|_| DVector::from_vec(w)),
        x_names,
        z_names,
        row_errors,
        rows_read,
    })
}

/// Resolved column positions for one run.
struct Columns {
    y: usize,
    x: Vec<usize>,
    z: Vec<usize>,
    weights: Option<usize>,
}

/// One parsed row: `(y, x, z, weight)`.
type ParsedRow = (f64, Vec<f64>, Vec<f64>, Option<f64>);

fn parse_row(record: &StringRecord, columns: &Columns, config: &DataConfig) -> Result<ParsedRow, String> {
    let yi = parse_field(record, columns.y, &config.y_col)?;
    let xi = columns
        .x
        .iter()
        .zip(&config.x_cols)
        .map(|(&i, name)| parse_field(record, i, name))
        .collect::<Result<Vec<_>, _>>()?;
    let zi = columns
        .z
        .iter()
        .zip(&config.z_cols)
        .map(|(&i, name)| parse_field(record, i, name))
        .collect::<Result<Vec<_>, _>>()?;
    let wi = match (columns.weights, &config.weights_col) {
        (Some(i), Some(name)) => {
            let w = parse_field(record, i, name)?;
            if w <= 0.0 {
                return Err(format!("weight must be > 0, got {w}"));
            }
            Some(w)
        }
        _ => None,
    };
    Ok((yi, xi, zi, wi))
}

fn assemble_design(rows: &[Vec<f64>], names: &[String], constant: bool) -> (DMatrix<f64>, Vec<String>) {
    let offset = usize::from(constant);
    let k = names.len() + offset;
    let m = DMatrix::from_fn(rows.len(), k, |i, j| {
        if j < offset { 1.0 } else { rows[i][j - offset] }
    });

    let mut out_names = Vec::with_capacity(k);
    if constant {
        out_names.push(CONST_NAME.to_string());
    }
    out_names.extend(names.iter().cloned());
    (m, out_names)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn column_index(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(name))
        .copied()
        .ok_or_else(|| AppError::new(EXIT_INPUT, format!("Missing required column: `{name}`")))
}

fn parse_field(record: &StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing value for `{name}`"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("invalid number for `{name}`: '{raw}'"))?;
    if !value.is_finite() {
        return Err(format!("non-finite value for `{name}`: '{raw}'"));
    }
    Ok(value)
}
