//! Export the selection table to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or plotting scripts:
//! one row per grid point, in enumeration order.

use std::io::Write;
use std::path::Path;

use crate::domain::{ScoreOutcome, SelectionResult};
use crate::error::AppError;

const HEADER: [&str; 11] = [
    "index", "k", "family", "n_params", "status", "score", "log_likelihood", "n_iter",
    "converged", "reason", "selected",
];

/// Write the selection table to a CSV file.
pub fn write_table_csv(path: &Path, result: &SelectionResult) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_table(file, result)
}

/// Write the selection table to any writer.
pub fn write_table<W: Write>(sink: W, result: &SelectionResult) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record(HEADER)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV header: {e}")))?;

    for row in &result.table {
        let selected = row.candidate == result.best;
        let mut record = vec![
            row.index.to_string(),
            row.candidate.k.to_string(),
            row.candidate.family.display_name().to_string(),
            row.n_params.to_string(),
        ];
        match &row.outcome {
            ScoreOutcome::Scored {
                score,
                log_likelihood,
                diagnostics,
            } => record.extend([
                "ok".to_string(),
                format!("{score:.6}"),
                format!("{log_likelihood:.6}"),
                diagnostics.n_iter.to_string(),
                diagnostics.converged.to_string(),
                String::new(),
            ]),
            ScoreOutcome::Failed { reason } => record.extend([
                "failed".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                reason.clone(),
            ]),
        }
        record.push(selected.to_string());

        writer
            .write_record(&record)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}
