//! Shared "select pipeline" logic used by the `select` and `table` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset (CSV or synthetic) -> grid sweep -> selection -> cluster summary
//!
//! The commands can then focus on presentation.

use tracing::info;

use crate::data::{generate_blobs, two_blob_spec};
use crate::domain::{Dataset, DatasetStats, SelectConfig, SelectionResult};
use crate::error::AppError;
use crate::fit::{EmFitter, EmOptions, SweepOptions, k_range, select_with};
use crate::io::{RowError, load_dataset};
use crate::report::{ClusterSummary, summarize_clusters};

/// All computed outputs of a single sweep.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: Dataset,
    /// Human-readable description of where the data came from.
    pub source: String,
    pub stats: DatasetStats,
    /// CSV rows skipped during ingest (empty for synthetic data).
    pub row_errors: Vec<RowError>,
    pub selection: SelectionResult,
    pub clusters: Vec<ClusterSummary>,
}

/// Execute the full selection pipeline and return the computed outputs.
pub fn run_selection(config: &SelectConfig) -> Result<RunOutput, AppError> {
    validate_em_config(config)?;

    // 1) Load or generate the dataset.
    let (dataset, stats, source, row_errors) = match &config.input {
        Some(path) => {
            let ingested = load_dataset(path)?;
            let source = format!(
                "{} ({} of {} rows, columns: {})",
                path.display(),
                ingested.rows_used,
                ingested.rows_read,
                ingested.columns.join(",")
            );
            (ingested.dataset, ingested.stats, source, ingested.row_errors)
        }
        None => {
            let blobs = two_blob_spec(config.samples_per_cluster, config.separation);
            let sample = generate_blobs(&blobs, config.sample_seed)?;
            let source = format!(
                "synthetic two-blob (n={} per blob, separation={:.2}, seed={})",
                config.samples_per_cluster, config.separation, config.sample_seed
            );
            let stats = sample.dataset.stats();
            (sample.dataset, stats, source, Vec::new())
        }
    };
    info!(n_points = stats.n_points, dim = stats.dim, source = %source, "dataset ready");

    sweep(config, dataset, stats, source, row_errors)
}

/// Run the sweep on an already-built dataset.
pub fn run_selection_on(
    config: &SelectConfig,
    dataset: Dataset,
    source: String,
    row_errors: Vec<RowError>,
) -> Result<RunOutput, AppError> {
    let stats = dataset.stats();
    sweep(config, dataset, stats, source, row_errors)
}

fn sweep(
    config: &SelectConfig,
    dataset: Dataset,
    stats: DatasetStats,
    source: String,
    row_errors: Vec<RowError>,
) -> Result<RunOutput, AppError> {
    // 2) Fit every candidate and select the minimum-criterion model.
    let k_values = k_range(config.k_min, config.k_max)?;
    let fitter = EmFitter::new(em_options(config));
    let opts = SweepOptions {
        max_fits: config.max_fits,
    };
    let selection = select_with(
        &dataset,
        &k_values,
        &config.families,
        &fitter,
        &config.criterion,
        &opts,
    )?;

    // 3) Summarize the chosen model on the data.
    let clusters = summarize_clusters(&selection.best_model, &dataset)?;

    Ok(RunOutput {
        dataset,
        source,
        stats,
        row_errors,
        selection,
        clusters,
    })
}

pub fn em_options(config: &SelectConfig) -> EmOptions {
    EmOptions {
        max_iter: config.max_iter,
        tol: config.tol,
        n_init: config.n_init,
        reg_covar: config.reg_covar,
        seed: config.em_seed,
    }
}

fn validate_em_config(config: &SelectConfig) -> Result<(), AppError> {
    if config.max_iter == 0 {
        return Err(AppError::new(2, "--max-iter must be >= 1."));
    }
    if config.n_init == 0 {
        return Err(AppError::new(2, "--n-init must be >= 1."));
    }
    if !(config.tol.is_finite() && config.tol >= 0.0) {
        return Err(AppError::new(2, "--tol must be a finite, non-negative number."));
    }
    if !(config.reg_covar.is_finite() && config.reg_covar >= 0.0) {
        return Err(AppError::new(2, "--reg-covar must be a finite, non-negative number."));
    }
    if config.input.is_none() && config.samples_per_cluster == 0 {
        return Err(AppError::new(2, "--samples-per-cluster must be >= 1."));
    }
    if config.input.is_none() && !config.separation.is_finite() {
        return Err(AppError::new(2, "--separation must be finite."));
    }
    Ok(())
}
