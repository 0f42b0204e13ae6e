//! Cached decomposition of a whitened design matrix.
//!
//! The weighted solver keeps the pseudo-inverse of `diag(√w) X` between calls.
//! The cache has no notion of which weights it was built from: whoever changes
//! the weights must call [`DecompositionCache::invalidate`] before the next
//! solve.

use nalgebra::DMatrix;

use crate::error::AppError;
use crate::math::pseudo_inverse;

#[derive(Debug, Clone, Default)]
pub struct DecompositionCache {
    pinv: Option<DMatrix<f64>>,
    computed: usize,
}

impl DecompositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached pseudo-inverse, computing it from `wexog` if the cache is empty.
    ///
    /// A cached factor whose shape does not match `wexog` is recomputed.
    pub fn get_or_compute(&mut self, wexog: &DMatrix<f64>) -> Result<&DMatrix<f64>, AppError> {
        let expected = (wexog.ncols(), wexog.nrows());
        let pinv = match self.pinv.take() {
            Some(p) if p.shape() == expected => p,
            _ => {
                let p = pseudo_inverse(wexog)?;
                self.computed += 1;
                p
            }
        };
        Ok(&*self.pinv.insert(pinv))
    }

    /// Drop the cached factor.
    pub fn invalidate(&mut self) {
        self.pinv = None;
    }

    /// Number of decompositions computed over the cache's lifetime.
    pub fn computed(&self) -> usize {
        self.computed
    }
}
