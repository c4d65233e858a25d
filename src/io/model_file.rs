//! Read/write model JSON files.
//!
//! Model JSON is the "portable" representation of a selection:
//! - the winning `(k, family)` and its score
//! - the full fitted parameters (weights, means, covariances)
//! - run metadata (criterion, point count, generation time)
//!
//! The schema is defined by `domain::ModelFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CriterionKind, ModelFile, SelectionResult};
use crate::error::AppError;

/// Build the file payload for a selection.
pub fn model_file(result: &SelectionResult, criterion: CriterionKind, n_points: usize) -> ModelFile {
    ModelFile {
        tool: "gmmsel".to_string(),
        generated: Utc::now(),
        criterion,
        best: result.best,
        score: result.best_score,
        n_points,
        model: result.best_model.clone(),
    }
}

/// Write a model JSON file.
pub fn write_model_json(path: &Path, file: &ModelFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::new(4, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Read a model JSON file.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(4, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(4, format!("Invalid model JSON: {e}")))?;
    if model.model.candidate() != model.best {
        return Err(AppError::new(4, "Invalid model JSON: best candidate does not match model."));
    }
    Ok(model)
}
