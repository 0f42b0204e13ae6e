//! Ordinary, weighted and generalized least squares.
//!
//! The heteroscedasticity estimators in [`crate::fgls`] only depend on the
//! [`LeastSquares`] capability defined here:
//!
//! - [`Ols`]: plain least squares, used for the variance regression
//! - [`Wls`]: row-weighted least squares with a cached decomposition
//! - [`Gls`]: least squares under a known error covariance `Σ`

pub mod cache;
pub mod results;
pub mod solver;

pub use cache::*;
pub use results::*;
pub use solver::*;
