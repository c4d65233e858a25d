//! Mixture fitting and model selection.
//!
//! Responsibilities:
//!
//! - enumerate the `(k, covariance family)` grid
//! - fit each candidate with EM (parallel across candidates)
//! - score fits with an information criterion and select the minimum

pub mod criterion;
pub mod fitter;
pub mod grid;
pub mod kmeans;
pub mod selection;

pub use criterion::*;
pub use fitter::*;
pub use grid::*;
pub use selection::*;
