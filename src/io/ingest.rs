//! CSV ingest.
//!
//! Turns a numeric CSV (header row, one point per row, every column a coordinate)
//! into a `Dataset`.
//!
//! Design goals:
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior**: row order is preserved
//! - **Separation of concerns**: no fitting logic here

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::domain::{Dataset, DatasetStats};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: dataset + stats + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub dataset: Dataset,
    pub columns: Vec<String>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<IngestedData, AppError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::new(4, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_dataset(file)
}

/// Load a dataset from any CSV reader.
pub fn read_dataset<R: Read>(source: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(4, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(AppError::new(4, "CSV has no columns."));
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        if record.len() != columns.len() {
            row_errors.push(RowError {
                line,
                message: format!("expected {} fields, found {}", columns.len(), record.len()),
            });
            continue;
        }

        match parse_row(&record, &columns) {
            Ok(values) => rows.push(values),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for err in &row_errors {
        debug!(line = err.line, message = %err.message, "skipped CSV row");
    }
    if !row_errors.is_empty() {
        warn!(skipped = row_errors.len(), rows_read, "some CSV rows were skipped");
    }

    if rows.is_empty() {
        return Err(AppError::new(
            4,
            format!("No usable rows in CSV ({rows_read} read, {} rejected).", row_errors.len()),
        ));
    }

    let rows_used = rows.len();
    let dataset = Dataset::from_rows(&rows)?;
    let stats = dataset.stats();

    Ok(IngestedData {
        dataset,
        columns,
        stats,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn parse_row(record: &csv::StringRecord, columns: &[String]) -> Result<Vec<f64>, String> {
    let mut values = Vec::with_capacity(record.len());
    for (field, name) in record.iter().zip(columns) {
        let v: f64 = field
            .parse()
            .map_err(|_| format!("column '{name}': '{field}' is not a number"))?;
        if !v.is_finite() {
            return Err(format!("column '{name}': value is not finite"));
        }
        values.push(v);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_numeric_columns() {
        let csv = "x,y\n1.0,2.0\n-3, 4.5\n";
        let data = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(data.columns, vec!["x", "y"]);
        assert_eq!(data.rows_used, 2);
        assert_eq!(data.dataset.dim(), 2);
        assert_eq!(data.dataset.points()[1][1], 4.5);
        assert_eq!(data.stats.n_points, 2);
        assert_eq!(data.stats.min, vec![-3.0, 2.0]);
        assert_eq!(data.stats.max, vec![1.0, 4.5]);
    }

    #[test]
    fn bad_rows_are_skipped_and_reported() {
        let csv = "x,y\n1,2\nfoo,3\n4\n5,inf\n6,7\n";
        let data = read_dataset(csv.as_bytes()).unwrap();
        assert_eq!(data.rows_read, 5);
        assert_eq!(data.rows_used, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn no_usable_rows_is_an_error() {
        let err = read_dataset("x\nnope\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
