//! Information criteria.
//!
//! A criterion turns a fitted model into a single penalized score (lower is better):
//!
//! ```text
//! BIC = -2 ln L + p ln n
//! AIC = -2 ln L + 2 p
//! ```
//!
//! where `ln L` is the maximized log-likelihood, `p` the free-parameter count and
//! `n` the number of points. The search code only sees the [`Criterion`] trait, so
//! any scoring closure can be swapped in.

use crate::domain::{CriterionKind, Dataset, FittedModel};

/// Pluggable scoring function `score(model, data) -> real`.
///
/// Must be a deterministic function of its inputs.
pub trait Criterion: Sync {
    fn score(&self, model: &FittedModel, data: &Dataset) -> f64;

    /// Label for reports.
    fn name(&self) -> &str {
        "custom"
    }
}

pub fn bic(model: &FittedModel, data: &Dataset) -> f64 {
    let n = data.n_points() as f64;
    -2.0 * model.log_likelihood + model.n_params() as f64 * n.ln()
}

pub fn aic(model: &FittedModel, _data: &Dataset) -> f64 {
    -2.0 * model.log_likelihood + 2.0 * model.n_params() as f64
}

impl Criterion for CriterionKind {
    fn score(&self, model: &FittedModel, data: &Dataset) -> f64 {
        match self {
            CriterionKind::Bic => bic(model, data),
            CriterionKind::Aic => aic(model, data),
        }
    }

    fn name(&self) -> &str {
        self.display_name()
    }
}

impl<F> Criterion for F
where
    F: Fn(&FittedModel, &Dataset) -> f64 + Sync,
{
    fn score(&self, model: &FittedModel, data: &Dataset) -> f64 {
        self(model, data)
    }
}
