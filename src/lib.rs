//! `hetfit` library crate.
//!
//! Linear regression with heteroscedastic errors whose variance depends on a
//! separate set of explanatory variables, estimated by feasible GLS.
//!
//! The binary (`hetfit`) is a thin wrapper around this library so that:
//!
//! - the estimators are testable without spawning processes
//! - the least-squares solvers and FGLS loop are reusable from other crates

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fgls;
pub mod io;
pub mod math;
pub mod regression;
pub mod report;
