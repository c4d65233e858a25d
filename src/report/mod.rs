//! Reporting utilities: cluster summaries and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{Dataset, FittedModel};
use crate::error::AppError;
use crate::models::predict_labels;

/// Per-component summary of the selected model on its data.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub component: usize,
    pub weight: f64,
    pub mean: Vec<f64>,
    /// Points whose most probable component is this one.
    pub assigned: usize,
}

/// Assign every point to its most probable component and summarize.
pub fn summarize_clusters(model: &FittedModel, data: &Dataset) -> Result<Vec<ClusterSummary>, AppError> {
    let labels = predict_labels(model, data)?;
    let mut counts = vec![0usize; model.k];
    for label in labels {
        counts[label] += 1;
    }

    Ok((0..model.k)
        .map(|c| ClusterSummary {
            component: c,
            weight: model.weights[c],
            mean: model.means[c].clone(),
            assigned: counts[c],
        })
        .collect())
}
