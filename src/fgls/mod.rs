//! Feasible GLS under heteroscedasticity that depends on explanatory variables.
//!
//! The error variance of observation `i` is modelled as `σ²_i = invlink(z_iᵀ γ)`.
//! `γ` is estimated by regressing `link(r_i²)` on `Z`, where `r` are residuals
//! of the current mean fit, and the mean is refit with weights `1 / σ̂²_i`.
//!
//! Two estimators are provided:
//!
//! - [`TwoStepHetGls`]: one preliminary fit, one variance regression, one
//!   weighted refit
//! - [`IterativeHetGls`]: a fixed number of alternating mean / variance passes
//!   with a per-iteration history

pub mod design;
pub mod history;
pub mod iterative;
pub mod link;
pub mod two_step;

pub use design::*;
pub use history::*;
pub use iterative::*;
pub use link::*;
pub use two_step::*;
