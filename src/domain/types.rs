//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during the grid sweep
//! - exported to JSON/CSV
//! - reloaded later for inspection

use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// An ordered, immutable collection of points in `R^d`.
///
/// Points have no identity beyond their position in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    points: Vec<DVector<f64>>,
    dim: usize,
}

impl Dataset {
    /// Build a dataset from row vectors, validating shape and finiteness.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, DatasetError> {
        let first = rows.first().ok_or(DatasetError::Empty)?;
        let dim = first.len();
        if dim == 0 {
            return Err(DatasetError::ZeroDimension);
        }

        let mut points = Vec::with_capacity(rows.len());
        for (row, values) in rows.iter().enumerate() {
            if values.len() != dim {
                return Err(DatasetError::RaggedRow {
                    row,
                    expected: dim,
                    found: values.len(),
                });
            }
            if let Some(col) = values.iter().position(|v| !v.is_finite()) {
                return Err(DatasetError::NonFinite { row, col });
            }
            points.push(DVector::from_column_slice(values));
        }

        Ok(Self { points, dim })
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn points(&self) -> &[DVector<f64>] {
        &self.points
    }

    /// Per-dimension bounds of the data.
    pub fn stats(&self) -> DatasetStats {
        let mut min = vec![f64::INFINITY; self.dim];
        let mut max = vec![f64::NEG_INFINITY; self.dim];
        for p in &self.points {
            for j in 0..self.dim {
                min[j] = min[j].min(p[j]);
                max[j] = max[j].max(p[j]);
            }
        }
        DatasetStats {
            n_points: self.points.len(),
            dim: self.dim,
            min,
            max,
        }
    }
}

/// Summary stats about the points used for selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub dim: usize,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

/// Constraint on the shape of each component's covariance.
///
/// The declaration order is the enumeration order used by the grid sweep.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CovarianceFamily {
    /// One unconstrained matrix per component.
    Full,
    /// One matrix shared by all components.
    Tied,
    /// One variance vector per component (axis-aligned).
    #[serde(alias = "diagonal")]
    #[value(alias = "diagonal")]
    Diag,
    /// One scalar variance per component.
    Spherical,
}

impl CovarianceFamily {
    pub const ALL: [CovarianceFamily; 4] = [
        CovarianceFamily::Full,
        CovarianceFamily::Tied,
        CovarianceFamily::Diag,
        CovarianceFamily::Spherical,
    ];

    /// Label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            CovarianceFamily::Full => "full",
            CovarianceFamily::Tied => "tied",
            CovarianceFamily::Diag => "diag",
            CovarianceFamily::Spherical => "spherical",
        }
    }

    /// Single-character marker used by the ASCII chart.
    pub fn marker(self) -> char {
        match self {
            CovarianceFamily::Full => 'F',
            CovarianceFamily::Tied => 'T',
            CovarianceFamily::Diag => 'D',
            CovarianceFamily::Spherical => 'S',
        }
    }
}

/// Which information criterion scores the fitted models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CriterionKind {
    /// `-2 ln L + p ln n`
    Bic,
    /// `-2 ln L + 2 p`
    Aic,
}

impl CriterionKind {
    pub fn display_name(self) -> &'static str {
        match self {
            CriterionKind::Bic => "BIC",
            CriterionKind::Aic => "AIC",
        }
    }
}

/// One grid point: component count and covariance family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub k: usize,
    pub family: CovarianceFamily,
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "k={} {}", self.k, self.family.display_name())
    }
}

/// Covariance parameters; the shape depends on the family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "values", rename_all = "lowercase")]
pub enum CovarianceParams {
    /// `k` matrices, each `d x d` (row-major nested vectors).
    Full(Vec<Vec<Vec<f64>>>),
    /// One shared `d x d` matrix.
    Tied(Vec<Vec<f64>>),
    /// `k` variance vectors of length `d`.
    Diag(Vec<Vec<f64>>),
    /// `k` scalar variances.
    Spherical(Vec<f64>),
}

impl CovarianceParams {
    pub fn family(&self) -> CovarianceFamily {
        match self {
            CovarianceParams::Full(_) => CovarianceFamily::Full,
            CovarianceParams::Tied(_) => CovarianceFamily::Tied,
            CovarianceParams::Diag(_) => CovarianceFamily::Diag,
            CovarianceParams::Spherical(_) => CovarianceFamily::Spherical,
        }
    }
}

/// A Gaussian mixture fitted to a dataset.
///
/// Created once per grid point and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub k: usize,
    pub family: CovarianceFamily,
    pub dim: usize,
    pub weights: Vec<f64>,
    pub means: Vec<Vec<f64>>,
    pub covariances: CovarianceParams,
    /// Total (not per-sample) log-likelihood reached by EM.
    pub log_likelihood: f64,
    pub diagnostics: FitDiagnostics,
}

impl FittedModel {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            k: self.k,
            family: self.family,
        }
    }

    /// Number of free parameters implied by `(k, family, dim)`.
    pub fn n_params(&self) -> usize {
        crate::models::param_count(self.k, self.family, self.dim)
    }
}

/// EM run diagnostics for a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub n_iter: usize,
    pub converged: bool,
    /// Index of the initialization that won among `n_init` restarts.
    pub init_index: usize,
}

/// Result of scoring one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ScoreOutcome {
    Scored {
        score: f64,
        log_likelihood: f64,
        diagnostics: FitDiagnostics,
    },
    Failed {
        reason: String,
    },
}

/// One row of the selection table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    /// Position in the deterministic enumeration order.
    pub index: usize,
    pub candidate: Candidate,
    pub n_params: usize,
    pub outcome: ScoreOutcome,
}

impl ScoreRow {
    pub fn score(&self) -> Option<f64> {
        match self.outcome {
            ScoreOutcome::Scored { score, .. } => Some(score),
            ScoreOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ScoreOutcome::Failed { .. })
    }
}

/// Output of a grid sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionResult {
    pub best: Candidate,
    pub best_score: f64,
    pub best_model: FittedModel,
    /// Every attempted candidate, in enumeration order.
    pub table: Vec<ScoreRow>,
}

impl SelectionResult {
    pub fn n_failed(&self) -> usize {
        self.table.iter().filter(|r| r.is_failed()).count()
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// CSV dataset; when absent a synthetic two-blob dataset is generated.
    pub input: Option<PathBuf>,
    pub samples_per_cluster: usize,
    pub sample_seed: u64,
    pub separation: f64,

    pub k_min: usize,
    pub k_max: usize,
    pub families: Vec<CovarianceFamily>,
    pub criterion: CriterionKind,
    pub max_fits: Option<usize>,

    pub max_iter: usize,
    pub tol: f64,
    pub n_init: usize,
    pub reg_covar: f64,
    pub em_seed: u64,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_table: Option<PathBuf>,
    pub export_model: Option<PathBuf>,
    pub debug_bundle: bool,
}

/// A saved model file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub generated: chrono::DateTime<chrono::Utc>,
    pub criterion: CriterionKind,
    pub best: Candidate,
    pub score: f64,
    pub n_points: usize,
    pub model: FittedModel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_rejects_ragged_rows() {
        let err = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn dataset_rejects_empty_and_non_finite() {
        assert_eq!(Dataset::from_rows(&[]).unwrap_err(), DatasetError::Empty);
        assert_eq!(
            Dataset::from_rows(&[vec![]]).unwrap_err(),
            DatasetError::ZeroDimension
        );
        assert_eq!(
            Dataset::from_rows(&[vec![0.0, f64::NAN]]).unwrap_err(),
            DatasetError::NonFinite { row: 0, col: 1 }
        );
    }

    #[test]
    fn stats_track_bounds() {
        let data = Dataset::from_rows(&[vec![1.0, -2.0], vec![-1.0, 5.0]]).unwrap();
        let stats = data.stats();
        assert_eq!(stats.n_points, 2);
        assert_eq!(stats.min, vec![-1.0, -2.0]);
        assert_eq!(stats.max, vec![1.0, 5.0]);
    }

    #[test]
    fn family_order_is_declaration_order() {
        let mut shuffled = vec![
            CovarianceFamily::Spherical,
            CovarianceFamily::Full,
            CovarianceFamily::Diag,
            CovarianceFamily::Tied,
        ];
        shuffled.sort();
        assert_eq!(shuffled, CovarianceFamily::ALL.to_vec());
    }

    #[test]
    fn diagonal_alias_parses() {
        let fam: CovarianceFamily = serde_json::from_str("\"diagonal\"").unwrap();
        assert_eq!(fam, CovarianceFamily::Diag);
        let fam = <CovarianceFamily as ValueEnum>::from_str("diagonal", true).unwrap();
        assert_eq!(fam, CovarianceFamily::Diag);
    }
}
