//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`FitConfig`, `DataConfig`, `SimulationConfig`)
//! - CLI-facing enums (`EstimatorKind`, `LinkKind`)
//! - serializable outputs (`FitReport`, `ObservationRow`)

pub mod types;

pub use types::*;
