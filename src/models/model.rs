//! Gaussian mixture evaluation for the four covariance families.
//!
//! The fitter relies on three primitive operations:
//! - count the free parameters of a `(k, family, d)` configuration
//! - turn working-form parameters into a density that can be evaluated per point
//! - convert between working form (`nalgebra`) and the serializable `FittedModel`
//!
//! These are implemented here for each covariance family.

use nalgebra::{DMatrix, DVector};

use crate::domain::{CovarianceFamily, CovarianceParams, Dataset, FittedModel};
use crate::error::FitFailure;
use crate::math::{CholeskyFactor, LN_2PI, is_degenerate_variance, log_sum_exp, variance_scale};

/// Number of free parameters of a mixture with `k` components in `d` dimensions.
///
/// Means contribute `k*d`, mixing weights `k-1`, and covariances depend on the family:
///
/// | family    | covariance parameters |
/// |-----------|-----------------------|
/// | full      | `k * d(d+1)/2`        |
/// | tied      | `d(d+1)/2`            |
/// | diag      | `k * d`               |
/// | spherical | `k`                   |
pub fn param_count(k: usize, family: CovarianceFamily, d: usize) -> usize {
    let cov = match family {
        CovarianceFamily::Full => k * d * (d + 1) / 2,
        CovarianceFamily::Tied => d * (d + 1) / 2,
        CovarianceFamily::Diag => k * d,
        CovarianceFamily::Spherical => k,
    };
    k * d + k.saturating_sub(1) + cov
}

/// Covariances in working form.
#[derive(Debug, Clone)]
pub enum Covariances {
    Full(Vec<DMatrix<f64>>),
    Tied(DMatrix<f64>),
    Diag(Vec<DVector<f64>>),
    Spherical(Vec<f64>),
}

/// Mixture parameters in working form.
#[derive(Debug, Clone)]
pub struct MixtureParams {
    pub weights: Vec<f64>,
    pub means: Vec<DVector<f64>>,
    pub covariances: Covariances,
}

impl MixtureParams {
    /// Serializable covariance parameters.
    pub fn covariance_params(&self) -> CovarianceParams {
        match &self.covariances {
            Covariances::Full(mats) => CovarianceParams::Full(mats.iter().map(matrix_rows).collect()),
            Covariances::Tied(mat) => CovarianceParams::Tied(matrix_rows(mat)),
            Covariances::Diag(vars) => {
                CovarianceParams::Diag(vars.iter().map(|v| v.iter().copied().collect()).collect())
            }
            Covariances::Spherical(vars) => CovarianceParams::Spherical(vars.clone()),
        }
    }

    /// Rebuild working-form parameters from a fitted model.
    pub fn from_fitted(model: &FittedModel) -> Result<Self, FitFailure> {
        let d = model.dim;
        let k = model.k;
        let malformed = |what: &str| FitFailure::Degenerate(format!("malformed model: {what}"));

        if model.weights.len() != k || model.means.len() != k {
            return Err(malformed("weights/means do not match k"));
        }
        if model.means.iter().any(|m| m.len() != d) {
            return Err(malformed("mean dimension mismatch"));
        }
        let means = model
            .means
            .iter()
            .map(|m| DVector::from_column_slice(m))
            .collect();

        let covariances = match &model.covariances {
            CovarianceParams::Full(mats) => {
                if mats.len() != k {
                    return Err(malformed("expected one covariance per component"));
                }
                let mut out = Vec::with_capacity(k);
                for rows in mats {
                    out.push(rows_matrix(rows, d).ok_or_else(|| malformed("covariance shape"))?);
                }
                Covariances::Full(out)
            }
            CovarianceParams::Tied(rows) => {
                Covariances::Tied(rows_matrix(rows, d).ok_or_else(|| malformed("covariance shape"))?)
            }
            CovarianceParams::Diag(vars) => {
                if vars.len() != k || vars.iter().any(|v| v.len() != d) {
                    return Err(malformed("diagonal variance shape"));
                }
                Covariances::Diag(vars.iter().map(|v| DVector::from_column_slice(v)).collect())
            }
            CovarianceParams::Spherical(vars) => {
                if vars.len() != k {
                    return Err(malformed("spherical variance count"));
                }
                Covariances::Spherical(vars.clone())
            }
        };

        Ok(Self {
            weights: model.weights.clone(),
            means,
            covariances,
        })
    }
}

#[derive(Debug, Clone)]
enum Precision {
    Cholesky(CholeskyFactor),
    Diagonal { inv_var: DVector<f64>, log_det: f64 },
}

impl Precision {
    fn from_diagonal(var: &DVector<f64>, scale: f64, component: usize) -> Result<Self, FitFailure> {
        if var.iter().any(|&v| is_degenerate_variance(v, scale)) {
            return Err(FitFailure::SingularCovariance { component });
        }
        Ok(Precision::Diagonal {
            inv_var: var.map(|v| 1.0 / v),
            log_det: var.iter().map(|v| v.ln()).sum(),
        })
    }

    fn log_density(&self, diff: &DVector<f64>) -> f64 {
        let d = diff.len() as f64;
        let (log_det, maha) = match self {
            Precision::Cholesky(chol) => (chol.log_det(), chol.mahalanobis_sq(diff)),
            Precision::Diagonal { inv_var, log_det } => {
                let maha = diff.iter().zip(inv_var.iter()).map(|(x, w)| x * x * w).sum();
                (*log_det, maha)
            }
        };
        -0.5 * (d * LN_2PI + log_det + maha)
    }
}

/// A mixture ready for per-point evaluation.
///
/// Construction factors every covariance once, so it fails with
/// [`FitFailure::SingularCovariance`] when any estimate is degenerate relative to
/// `scale` (the data's [`variance_scale`](crate::math::variance_scale)).
#[derive(Debug, Clone)]
pub struct MixtureDensity {
    log_weights: Vec<f64>,
    means: Vec<DVector<f64>>,
    precisions: Vec<Precision>,
    shared: bool,
}

impl MixtureDensity {
    pub fn new(params: &MixtureParams, scale: f64) -> Result<Self, FitFailure> {
        let (precisions, shared) = match &params.covariances {
            Covariances::Full(mats) => {
                let mut out = Vec::with_capacity(mats.len());
                for (component, cov) in mats.iter().enumerate() {
                    let chol = CholeskyFactor::new(cov, scale)
                        .ok_or(FitFailure::SingularCovariance { component })?;
                    out.push(Precision::Cholesky(chol));
                }
                (out, false)
            }
            Covariances::Tied(cov) => {
                let chol = CholeskyFactor::new(cov, scale)
                    .ok_or(FitFailure::SingularCovariance { component: 0 })?;
                (vec![Precision::Cholesky(chol)], true)
            }
            Covariances::Diag(vars) => {
                let mut out = Vec::with_capacity(vars.len());
                for (component, var) in vars.iter().enumerate() {
                    out.push(Precision::from_diagonal(var, scale, component)?);
                }
                (out, false)
            }
            Covariances::Spherical(vars) => {
                let mut out = Vec::with_capacity(vars.len());
                for (component, &v) in vars.iter().enumerate() {
                    let d = params.means.get(component).map(|m| m.len()).unwrap_or(0);
                    let var = DVector::from_element(d, v);
                    out.push(Precision::from_diagonal(&var, scale, component)?);
                }
                (out, false)
            }
        };

        Ok(Self {
            log_weights: params.weights.iter().map(|w| w.ln()).collect(),
            means: params.means.clone(),
            precisions,
            shared,
        })
    }

    pub fn k(&self) -> usize {
        self.means.len()
    }

    /// `ln N(x | μ_c, Σ_c)`.
    pub fn component_log_density(&self, c: usize, x: &DVector<f64>) -> f64 {
        let precision = if self.shared {
            &self.precisions[0]
        } else {
            &self.precisions[c]
        };
        let diff = x - &self.means[c];
        precision.log_density(&diff)
    }

    /// Fill `out[c] = ln π_c + ln N(x | μ_c, Σ_c)` for every component.
    pub fn weighted_log_densities(&self, x: &DVector<f64>, out: &mut [f64]) {
        for (c, slot) in out.iter_mut().enumerate().take(self.k()) {
            *slot = self.log_weights[c] + self.component_log_density(c, x);
        }
    }

    /// `ln p(x)` under the mixture.
    pub fn log_prob(&self, x: &DVector<f64>) -> f64 {
        let mut buf = vec![0.0; self.k()];
        self.weighted_log_densities(x, &mut buf);
        log_sum_exp(&buf)
    }
}

/// Total log-likelihood of `data` under a fitted model.
pub fn log_likelihood(model: &FittedModel, data: &Dataset) -> Result<f64, FitFailure> {
    let scale = variance_scale(data.points());
    let density = MixtureDensity::new(&MixtureParams::from_fitted(model)?, scale)?;
    let total: f64 = data.points().iter().map(|x| density.log_prob(x)).sum();
    if total.is_finite() {
        Ok(total)
    } else {
        Err(FitFailure::NonFiniteLikelihood)
    }
}

/// Hard component assignment (maximum posterior) for each point.
pub fn predict_labels(model: &FittedModel, data: &Dataset) -> Result<Vec<usize>, FitFailure> {
    let scale = variance_scale(data.points());
    let density = MixtureDensity::new(&MixtureParams::from_fitted(model)?, scale)?;
    let mut buf = vec![0.0; density.k()];
    Ok(data
        .points()
        .iter()
        .map(|x| {
            density.weighted_log_densities(x, &mut buf);
            argmax(&buf)
        })
        .collect())
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn matrix_rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..m.nrows())
        .map(|i| (0..m.ncols()).map(|j| m[(i, j)]).collect())
        .collect()
}

fn rows_matrix(rows: &[Vec<f64>], d: usize) -> Option<DMatrix<f64>> {
    if rows.len() != d || rows.iter().any(|r| r.len() != d) {
        return None;
    }
    Some(DMatrix::from_fn(d, d, |i, j| rows[i][j]))
}
