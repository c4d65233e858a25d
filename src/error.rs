//! Error types.
//!
//! Library code returns the typed errors below. The binary folds everything
//! into [`AppError`], which carries the process exit code:
//!
//! - `2`: usage / configuration error
//! - `3`: no viable model
//! - `4`: data or I/O error

use thiserror::Error;

/// A single grid point could not be fitted.
///
/// Recovered locally by the selector: the candidate is recorded as failed and
/// the sweep continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("too few points: n={n} < k={k}")]
    TooFewPoints { n: usize, k: usize },

    #[error("component {component} collapsed (responsibility mass {mass:.3e})")]
    EmptyComponent { component: usize, mass: f64 },

    #[error("singular covariance estimate for component {component}")]
    SingularCovariance { component: usize },

    #[error("non-finite log-likelihood")]
    NonFiniteLikelihood,

    /// Catch-all for fitters outside this crate.
    #[error("{0}")]
    Degenerate(String),
}

/// Errors surfaced by [`crate::fit::select`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("no viable model: all {attempted} candidate configurations failed to fit")]
    NoViableModel { attempted: usize },
}

/// Dataset construction errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("dataset is empty")]
    Empty,

    #[error("points must have at least one coordinate")]
    ZeroDimension,

    #[error("row {row} has {found} coordinates, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}, column {col} is not finite")]
    NonFinite { row: usize, col: usize },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<SelectError> for AppError {
    fn from(err: SelectError) -> Self {
        let code = match err {
            SelectError::InvalidConfiguration(_) => 2,
            SelectError::NoViableModel { .. } => 3,
        };
        AppError::new(code, err.to_string())
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        AppError::new(4, format!("Invalid dataset: {err}"))
    }
}

impl From<FitFailure> for AppError {
    fn from(err: FitFailure) -> Self {
        AppError::new(4, format!("Model evaluation failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_errors_map_to_exit_codes() {
        let invalid: AppError = SelectError::InvalidConfiguration("empty".into()).into();
        assert_eq!(invalid.exit_code(), 2);

        let none: AppError = SelectError::NoViableModel { attempted: 4 }.into();
        assert_eq!(none.exit_code(), 3);
        assert!(none.to_string().contains("all 4 candidate"));
    }
}
