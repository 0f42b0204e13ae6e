//! Input/output helpers.
//!
//! - CSV ingest + validation (`ingest`)
//! - fit exports (JSON report, per-observation CSV) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
