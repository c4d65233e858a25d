//! Expectation-maximization for Gaussian mixtures.
//!
//! Given:
//! - a dataset `x_1..x_n`
//! - a component count `k`
//! - a covariance family
//!
//! we alternate, per restart:
//! - E-step: responsibilities `r_ic ∝ π_c N(x_i | μ_c, Σ_c)` and the total log-likelihood
//! - M-step: re-estimate `π`, `μ`, `Σ` from the responsibilities
//!
//! and return the restart with the highest log-likelihood.
//!
//! A configuration the data cannot support (collapsed component, singular
//! covariance) fails with [`FitFailure`]; the selector records it and moves on.

use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::trace;

use crate::domain::{CovarianceFamily, Dataset, FitDiagnostics, FittedModel};
use crate::error::FitFailure;
use crate::fit::kmeans::{LLOYD_ITERS, kmeans_plus_plus, lloyd};
use crate::math::{log_sum_exp, variance_scale};
use crate::models::{Covariances, MixtureDensity, MixtureParams};

/// Minimum responsibility mass a component must keep.
const MIN_COMPONENT_MASS: f64 = 1e-8;

/// Anything that can fit a mixture for one grid point.
///
/// Implementations must be deterministic for a fixed configuration if the sweep
/// is to be reproducible; seeding is the implementation's concern.
pub trait MixtureFitter: Sync {
    fn fit(
        &self,
        data: &Dataset,
        k: usize,
        family: CovarianceFamily,
    ) -> Result<FittedModel, FitFailure>;
}

/// EM options.
#[derive(Debug, Clone)]
pub struct EmOptions {
    /// Maximum E/M rounds per restart.
    pub max_iter: usize,
    /// Convergence threshold on the change of the mean per-sample log-likelihood.
    pub tol: f64,
    /// Number of k-means++ restarts; the best log-likelihood wins.
    pub n_init: usize,
    /// Non-negative value added to every variance / covariance diagonal.
    pub reg_covar: f64,
    /// Base seed; restart `r` uses `seed + r`.
    pub seed: u64,
}

impl Default for EmOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-3,
            n_init: 1,
            reg_covar: 0.0,
            seed: 0,
        }
    }
}

/// The EM mixture fitter.
#[derive(Debug, Clone, Default)]
pub struct EmFitter {
    pub opts: EmOptions,
}

impl EmFitter {
    pub fn new(opts: EmOptions) -> Self {
        Self { opts }
    }
}

impl MixtureFitter for EmFitter {
    fn fit(
        &self,
        data: &Dataset,
        k: usize,
        family: CovarianceFamily,
    ) -> Result<FittedModel, FitFailure> {
        let n = data.n_points();
        if k == 0 || n < k {
            return Err(FitFailure::TooFewPoints { n, k });
        }

        // Covariance estimates are judged against the spread of the data.
        let scale = variance_scale(data.points());
        let mut best: Option<(MixtureParams, f64, FitDiagnostics)> = None;
        let mut last_err = None;

        for init_index in 0..self.opts.n_init.max(1) {
            let seed = self.opts.seed.wrapping_add(init_index as u64);
            match run_em(data, k, family, &self.opts, seed, scale) {
                Ok((params, ll, n_iter, converged)) => {
                    let diagnostics = FitDiagnostics {
                        n_iter,
                        converged,
                        init_index,
                    };
                    // Strictly greater: ties keep the earlier restart.
                    let better = best.as_ref().is_none_or(|(_, best_ll, _)| ll > *best_ll);
                    if better {
                        best = Some((params, ll, diagnostics));
                    }
                }
                Err(e) => {
                    trace!(k, family = family.display_name(), init_index, error = %e, "EM restart failed");
                    last_err = Some(e);
                }
            }
        }

        let Some((params, log_likelihood, diagnostics)) = best else {
            return Err(last_err.unwrap_or(FitFailure::NonFiniteLikelihood));
        };

        Ok(FittedModel {
            k,
            family,
            dim: data.dim(),
            weights: params.weights.clone(),
            means: params.means.iter().map(|m| m.iter().copied().collect()).collect(),
            covariances: params.covariance_params(),
            log_likelihood,
            diagnostics,
        })
    }
}

/// One EM run from a k-means++ start.
///
/// Returns `(params, log_likelihood, n_iter, converged)` where the log-likelihood
/// is evaluated at the returned parameters.
fn run_em(
    data: &Dataset,
    k: usize,
    family: CovarianceFamily,
    opts: &EmOptions,
    seed: u64,
    scale: f64,
) -> Result<(MixtureParams, f64, usize, bool), FitFailure> {
    let points = data.points();
    let n = points.len();

    let mut rng = StdRng::seed_from_u64(seed);
    let centers = kmeans_plus_plus(points, k, &mut rng);
    let labels = lloyd(points, centers, LLOYD_ITERS);

    let mut resp = DMatrix::<f64>::zeros(n, k);
    for (i, &c) in labels.iter().enumerate() {
        resp[(i, c)] = 1.0;
    }

    let mut params = m_step(data, &resp, family, opts.reg_covar)?;
    let max_iter = opts.max_iter.max(1);
    let mut prev_ll = f64::NEG_INFINITY;

    for iter in 1..=max_iter {
        let density = MixtureDensity::new(&params, scale)?;
        let ll = e_step(data, &density, &mut resp)?;

        if (ll - prev_ll).abs() / n as f64 <= opts.tol {
            return Ok((params, ll, iter, true));
        }
        if iter == max_iter {
            return Ok((params, ll, iter, false));
        }

        prev_ll = ll;
        params = m_step(data, &resp, family, opts.reg_covar)?;
    }

    // `max_iter >= 1`, so the loop always returns.
    Err(FitFailure::NonFiniteLikelihood)
}

/// Fill `resp` with posterior responsibilities and return the total log-likelihood.
fn e_step(data: &Dataset, density: &MixtureDensity, resp: &mut DMatrix<f64>) -> Result<f64, FitFailure> {
    let k = density.k();
    let mut buf = vec![0.0; k];
    let mut total = 0.0;

    for (i, x) in data.points().iter().enumerate() {
        density.weighted_log_densities(x, &mut buf);
        let lse = log_sum_exp(&buf);
        if !lse.is_finite() {
            return Err(FitFailure::NonFiniteLikelihood);
        }
        for c in 0..k {
            resp[(i, c)] = (buf[c] - lse).exp();
        }
        total += lse;
    }

    Ok(total)
}

/// Re-estimate mixture parameters from responsibilities.
fn m_step(
    data: &Dataset,
    resp: &DMatrix<f64>,
    family: CovarianceFamily,
    reg_covar: f64,
) -> Result<MixtureParams, FitFailure> {
    let points = data.points();
    let n = points.len();
    let d = data.dim();
    let k = resp.ncols();

    let mut masses = Vec::with_capacity(k);
    let mut means = Vec::with_capacity(k);
    for c in 0..k {
        let mass: f64 = resp.column(c).sum();
        if !(mass.is_finite() && mass > MIN_COMPONENT_MASS) {
            return Err(FitFailure::EmptyComponent { component: c, mass });
        }
        let mut mean = DVector::<f64>::zeros(d);
        for (i, x) in points.iter().enumerate() {
            mean.axpy(resp[(i, c)], x, 1.0);
        }
        means.push(mean / mass);
        masses.push(mass);
    }

    let weights: Vec<f64> = masses.iter().map(|m| m / n as f64).collect();

    let covariances = match family {
        CovarianceFamily::Full => {
            let mut mats = Vec::with_capacity(k);
            for c in 0..k {
                let mut cov = scatter(points, resp, c, &means[c]);
                cov /= masses[c];
                add_to_diagonal(&mut cov, reg_covar);
                mats.push(cov);
            }
            Covariances::Full(mats)
        }
        CovarianceFamily::Tied => {
            let mut cov = DMatrix::<f64>::zeros(d, d);
            for c in 0..k {
                cov += scatter(points, resp, c, &means[c]);
            }
            cov /= n as f64;
            add_to_diagonal(&mut cov, reg_covar);
            Covariances::Tied(cov)
        }
        CovarianceFamily::Diag => Covariances::Diag(
            (0..k)
                .map(|c| diagonal_variances(points, resp, c, &means[c], masses[c], reg_covar))
                .collect(),
        ),
        CovarianceFamily::Spherical => Covariances::Spherical(
            (0..k)
                .map(|c| diagonal_variances(points, resp, c, &means[c], masses[c], reg_covar).mean())
                .collect(),
        ),
    };

    Ok(MixtureParams {
        weights,
        means,
        covariances,
    })
}

/// `Σ_i r_ic (x_i - μ_c)(x_i - μ_c)^T`
fn scatter(points: &[DVector<f64>], resp: &DMatrix<f64>, c: usize, mean: &DVector<f64>) -> DMatrix<f64> {
    let d = mean.len();
    let mut out = DMatrix::<f64>::zeros(d, d);
    for (i, x) in points.iter().enumerate() {
        let diff = x - mean;
        out.ger(resp[(i, c)], &diff, &diff, 1.0);
    }
    out
}

fn diagonal_variances(
    points: &[DVector<f64>],
    resp: &DMatrix<f64>,
    c: usize,
    mean: &DVector<f64>,
    mass: f64,
    reg_covar: f64,
) -> DVector<f64> {
    let mut var = DVector::<f64>::zeros(mean.len());
    for (i, x) in points.iter().enumerate() {
        let diff = x - mean;
        var.axpy(resp[(i, c)], &diff.component_mul(&diff), 1.0);
    }
    var.map(|v| v / mass + reg_covar)
}

fn add_to_diagonal(m: &mut DMatrix<f64>, value: f64) {
    for j in 0..m.nrows() {
        m[(j, j)] += value;
    }
}
