//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - configuration enums (`CovarianceFamily`, `CriterionKind`)
//! - the immutable input `Dataset`
//! - fit and selection outputs (`FittedModel`, `ScoreRow`, `SelectionResult`)

pub mod types;

pub use types::*;
