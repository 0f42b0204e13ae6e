//! Per-iteration coefficient history.

use nalgebra::DVector;

/// Coefficients recorded by one call to
/// [`IterativeHetGls::iterative_fit`](crate::fgls::IterativeHetGls::iterative_fit).
///
/// After `k` iterations `self_params` holds `k` entries and `variance_params`
/// holds `k - 1` (the last pass does not re-estimate the variance).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IterationHistory {
    /// Mean-structure coefficients, one entry per weighted fit.
    pub self_params: Vec<DVector<f64>>,
    /// Variance-function coefficients, one entry per variance regression.
    pub variance_params: Vec<DVector<f64>>,
}

impl IterationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iterations(&self) -> usize {
        self.self_params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.self_params.is_empty() && self.variance_params.is_empty()
    }

    /// Euclidean distance between successive mean-coefficient vectors.
    ///
    /// Not used for stopping; reported so users can judge whether the fixed
    /// iteration budget was enough.
    pub fn param_changes(&self) -> Vec<f64> {
        self.self_params
            .windows(2)
            .map(|pair| (&pair[1] - &pair[0]).norm())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_changes_are_successive_distances() {
        let history = IterationHistory {
            self_params: vec![
                DVector::from_row_slice(&[0.0, 0.0]),
                DVector::from_row_slice(&[3.0, 4.0]),
                DVector::from_row_slice(&[3.0, 4.0]),
            ],
            variance_params: vec![],
        };
        assert_eq!(history.iterations(), 3);
        assert_eq!(history.param_changes(), vec![5.0, 0.0]);
    }

    #[test]
    fn empty_history_has_no_changes() {
        let history = IterationHistory::new();
        assert!(history.is_empty());
        assert!(history.param_changes().is_empty());
    }
}
