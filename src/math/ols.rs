//! Least squares via the Moore–Penrose inverse.
//!
//! Every regression in this crate reduces to an ordinary problem on a whitened
//! design:
//!
//! ```text
//! minimize ‖ỹ - X̃ β‖²
//! ```
//!
//! We solve it with `β = pinv(X̃) ỹ`, where the pseudo-inverse comes from an SVD.
//! Keeping the pseudo-inverse (rather than only β) lets the caller cache it per
//! weight vector and reuse it for the normalized covariance `pinv · pinvᵀ`.
//!
//! Unlike a plain `pinv`, rank-deficient designs are rejected: a singular design
//! in any of the sub-fits must surface as an error rather than as a
//! minimum-norm solution.

use nalgebra::DMatrix;

use crate::error::{AppError, EXIT_INSUFFICIENT, EXIT_NUMERICAL};

/// Relative singular value threshold below which a design is treated as rank deficient.
pub const RANK_TOL: f64 = 1e-10;

/// Compute the pseudo-inverse of a full-column-rank design matrix.
pub fn pseudo_inverse(x: &DMatrix<f64>) -> Result<DMatrix<f64>, AppError> {
    let (n, k) = x.shape();
    if n == 0 || k == 0 {
        return Err(AppError::new(EXIT_INSUFFICIENT, "Design matrix is empty."));
    }
    if n < k {
        return Err(AppError::new(
            EXIT_INSUFFICIENT,
            format!("Underdetermined design: n={n} observations < k={k} columns."),
        ));
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(EXIT_NUMERICAL, "Design matrix contains non-finite values."));
    }

    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    if !(s_max > 0.0) || s_min <= RANK_TOL * s_max {
        return Err(AppError::new(
            EXIT_NUMERICAL,
            format!("Design matrix is singular (singular values {s_min:.3e}..{s_max:.3e})."),
        ));
    }

    svd.pseudo_inverse(RANK_TOL * s_max)
        .map_err(|e| AppError::new(EXIT_NUMERICAL, format!("Pseudo-inverse failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::DVector;

    #[test]
    fn pseudo_inverse_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = pseudo_inverse(&x).unwrap() * y;
        assert_abs_diff_eq!(beta[0], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(beta[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn pseudo_inverse_is_left_inverse() {
        let x = DMatrix::from_row_slice(4, 2, &[1.0, 1.0, 1.0, 2.0, 1.0, 3.0, 1.0, 5.0]);
        let pinv = pseudo_inverse(&x).unwrap();
        let eye = &pinv * &x;
        assert_abs_diff_eq!(eye, DMatrix::<f64>::identity(2, 2), epsilon = 1e-10);
    }

    #[test]
    fn collinear_design_is_rejected() {
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
        let err = pseudo_inverse(&x).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_NUMERICAL);
        assert!(err.message().contains("singular"));
    }

    #[test]
    fn underdetermined_design_is_rejected() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let err = pseudo_inverse(&x).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INSUFFICIENT);
    }
}
