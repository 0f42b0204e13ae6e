//! Link functions for the variance regression.
//!
//! `link` is applied to squared residuals before they are regressed on `Z`;
//! `inverse` maps fitted values of that regression back to variances.

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

use crate::error::{AppError, EXIT_INPUT};

/// Elementwise transform `ℝ → ℝ`.
pub type LinkFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Transform pair used by the variance regression, resolved once at construction.
#[derive(Clone, Default)]
pub enum VarianceLink {
    /// No transform: `σ²` is linear in `Z`.
    #[default]
    Identity,
    /// `ln(r²)` is regressed on `Z`; variances are recovered with `exp`.
    Log,
    /// Caller-supplied transform.
    ///
    /// An unresolved `inverse` is a configuration error that surfaces the first
    /// time weights are recomputed.
    Custom { link: LinkFn, inverse: Option<LinkFn> },
}

impl VarianceLink {
    /// A custom link without an inverse.
    pub fn custom(link: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        VarianceLink::Custom {
            link: Arc::new(link),
            inverse: None,
        }
    }

    /// A custom link together with its inverse.
    pub fn custom_with_inverse(
        link: impl Fn(f64) -> f64 + Send + Sync + 'static,
        inverse: impl Fn(f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        VarianceLink::Custom {
            link: Arc::new(link),
            inverse: Some(Arc::new(inverse)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VarianceLink::Identity => "identity",
            VarianceLink::Log => "log",
            VarianceLink::Custom { .. } => "custom",
        }
    }

    pub fn has_inverse(&self) -> bool {
        match self {
            VarianceLink::Identity | VarianceLink::Log => true,
            VarianceLink::Custom { inverse, .. } => inverse.is_some(),
        }
    }

    /// Apply the link elementwise.
    pub fn apply(&self, values: &DVector<f64>) -> DVector<f64> {
        match self {
            VarianceLink::Identity => values.clone(),
            VarianceLink::Log => values.map(f64::ln),
            VarianceLink::Custom { link, .. } => values.map(|v| (**link)(v)),
        }
    }

    /// Apply the inverse link elementwise.
    pub fn apply_inverse(&self, values: &DVector<f64>) -> Result<DVector<f64>, AppError> {
        match self {
            VarianceLink::Identity => Ok(values.clone()),
            VarianceLink::Log => Ok(values.map(f64::exp)),
            VarianceLink::Custom {
                inverse: Some(inverse),
                ..
            } => Ok(values.map(|v| (**inverse)(v))),
            VarianceLink::Custom { inverse: None, .. } => Err(AppError::new(
                EXIT_INPUT,
                "Custom variance link has no inverse; supply one with VarianceLink::custom_with_inverse.",
            )),
        }
    }
}

impl fmt::Debug for VarianceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarianceLink::Custom { inverse, .. } => f
                .debug_struct("Custom")
                .field("has_inverse", &inverse.is_some())
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_is_default_and_round_trips() {
        let link = VarianceLink::default();
        let v = DVector::from_row_slice(&[0.5, 2.0]);
        assert_eq!(link.name(), "identity");
        assert_eq!(link.apply_inverse(&link.apply(&v)).unwrap(), v);
    }

    #[test]
    fn log_link_inverts() {
        let link = VarianceLink::Log;
        let v = DVector::from_row_slice(&[0.25, 1.0, 9.0]);
        let back = link.apply_inverse(&link.apply(&v)).unwrap();
        assert_relative_eq!(back, v, max_relative = 1e-12);
    }

    #[test]
    fn custom_link_without_inverse_fails_loudly() {
        let link = VarianceLink::custom(f64::sqrt);
        assert!(!link.has_inverse());
        let v = DVector::from_row_slice(&[4.0]);
        assert_eq!(link.apply(&v)[0], 2.0);
        let err = link.apply_inverse(&v).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn custom_link_with_inverse_is_used() {
        let link = VarianceLink::custom_with_inverse(f64::sqrt, |s| s * s);
        let v = DVector::from_row_slice(&[3.0]);
        assert_eq!(link.apply_inverse(&v).unwrap()[0], 9.0);
    }
}
