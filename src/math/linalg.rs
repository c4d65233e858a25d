//! Covariance factorization for Gaussian log-densities.
//!
//! Every component density needs two quantities derived from its covariance `Σ`:
//!
//! ```text
//! ln |Σ|                    (log-determinant)
//! (x - μ)^T Σ^{-1} (x - μ)  (squared Mahalanobis distance)
//! ```
//!
//! Both come from the lower Cholesky factor `Σ = L L^T`:
//! `ln |Σ| = 2 Σ_j ln L_jj`, and the Mahalanobis term is `||L^{-1}(x - μ)||²`,
//! computed by forward substitution. `Σ^{-1}` is never formed.

use nalgebra::{DMatrix, DVector};

/// Relative tolerance below which a variance (or squared Cholesky pivot) is
/// treated as zero.
///
/// The scale comes from the data (see [`variance_scale`]), so the check does not
/// depend on the units of the data.
pub const REL_SINGULAR_TOL: f64 = 1e-12;

/// Lower bound on the reference scale, relative to the largest squared coordinate.
///
/// Coordinates of magnitude `M` leave rounding noise of order `(M ε)²` in a
/// variance estimate; this floor keeps that noise below the singular threshold.
pub const MAGNITUDE_SCALE_FLOOR: f64 = 1e-8;

/// Reference variance for singularity checks on `points`.
///
/// The largest per-coordinate variance of the data, floored at
/// `MAGNITUDE_SCALE_FLOOR * max |x_j|²`.
pub fn variance_scale(points: &[DVector<f64>]) -> f64 {
    let Some(first) = points.first() else {
        return f64::MIN_POSITIVE;
    };
    let n = points.len() as f64;
    let d = first.len();

    let mut mean = DVector::<f64>::zeros(d);
    for x in points {
        mean += x;
    }
    mean /= n;

    let mut var = DVector::<f64>::zeros(d);
    let mut max_sq = 0.0f64;
    for x in points {
        let diff = x - &mean;
        var += diff.component_mul(&diff);
        max_sq = x.iter().fold(max_sq, |acc, v| acc.max(v * v));
    }
    var /= n;

    let max_var = var.iter().copied().fold(0.0, f64::max);
    max_var
        .max(max_sq * MAGNITUDE_SCALE_FLOOR)
        .max(f64::MIN_POSITIVE)
}

/// `true` if `variance` is unusable relative to `scale`.
pub fn is_degenerate_variance(variance: f64, scale: f64) -> bool {
    !(variance.is_finite() && variance > 0.0 && variance > scale * REL_SINGULAR_TOL)
}

/// Lower Cholesky factor of a covariance matrix with its log-determinant.
#[derive(Debug, Clone)]
pub struct CholeskyFactor {
    l: DMatrix<f64>,
    log_det: f64,
}

impl CholeskyFactor {
    /// Factor a symmetric covariance matrix.
    ///
    /// Returns `None` when the matrix is not (numerically) positive definite, i.e.
    /// when a squared pivot is degenerate relative to `scale`.
    pub fn new(cov: &DMatrix<f64>, scale: f64) -> Option<Self> {
        if !cov.is_square() || cov.nrows() == 0 {
            return None;
        }
        if cov.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let l = cov.clone().cholesky()?.l();

        let mut log_det = 0.0;
        for j in 0..l.nrows() {
            let pivot = l[(j, j)];
            if is_degenerate_variance(pivot * pivot, scale) {
                return None;
            }
            log_det += 2.0 * pivot.ln();
        }

        Some(Self { l, log_det })
    }

    /// `ln |Σ|`.
    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    /// `(x - μ)^T Σ^{-1} (x - μ)` for `diff = x - μ`.
    pub fn mahalanobis_sq(&self, diff: &DVector<f64>) -> f64 {
        let d = self.l.nrows();
        let mut z = vec![0.0; d];
        let mut total = 0.0;
        for i in 0..d {
            let mut acc = diff[i];
            for j in 0..i {
                acc -= self.l[(i, j)] * z[j];
            }
            z[i] = acc / self.l[(i, i)];
            total += z[i] * z[i];
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_det_and_mahalanobis_match_closed_form() {
        // Σ = [[4, 2], [2, 3]] -> |Σ| = 8, Σ^{-1} = [[3, -2], [-2, 4]] / 8
        let cov = DMatrix::from_row_slice(2, 2, &[4.0, 2.0, 2.0, 3.0]);
        let chol = CholeskyFactor::new(&cov, 4.0).unwrap();
        assert!((chol.log_det() - 8f64.ln()).abs() < 1e-12);

        let diff = DVector::from_row_slice(&[1.0, 1.0]);
        // [1 1] Σ^{-1} [1 1]^T = (3 - 2 - 2 + 4) / 8
        assert!((chol.mahalanobis_sq(&diff) - 3.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn zero_and_rank_deficient_matrices_are_rejected() {
        let zero = DMatrix::<f64>::zeros(2, 2);
        assert!(CholeskyFactor::new(&zero, 1.0).is_none());

        // Perfectly correlated coordinates: rank 1.
        let rank1 = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(CholeskyFactor::new(&rank1, 1.0).is_none());
    }

    #[test]
    fn degenerate_variance_is_scale_relative() {
        assert!(is_degenerate_variance(0.0, 1.0));
        assert!(is_degenerate_variance(1e-20, 1.0));
        assert!(!is_degenerate_variance(1e-20, 1e-16));
        assert!(is_degenerate_variance(f64::NAN, 1.0));
    }

    #[test]
    fn rounding_noise_is_singular_against_data_scale() {
        // Identical points whose coordinates are not exact in binary.
        let points = vec![DVector::from_row_slice(&[0.1, 0.7]); 10];
        let scale = variance_scale(&points);
        assert!(scale >= 0.49 * MAGNITUDE_SCALE_FLOOR);

        let noise = DMatrix::from_row_slice(1, 1, &[1.9e-34]);
        assert!(CholeskyFactor::new(&noise, scale).is_none());
        assert!(is_degenerate_variance(1.9e-34, scale));
    }

    #[test]
    fn variance_scale_tracks_spread() {
        let points: Vec<DVector<f64>> = [-2.0, 0.0, 2.0]
            .iter()
            .map(|&v| DVector::from_row_slice(&[v, 0.0]))
            .collect();
        // Population variance of {-2, 0, 2}.
        assert!((variance_scale(&points) - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn offset_data_keeps_real_variance() {
        // Unit spread far from the origin is not degenerate.
        let points: Vec<DVector<f64>> = [1e6 - 1.0, 1e6, 1e6 + 1.0]
            .iter()
            .map(|&v| DVector::from_row_slice(&[v]))
            .collect();
        let scale = variance_scale(&points);
        assert!(!is_degenerate_variance(2.0 / 3.0, scale));
    }
}
