//! Gaussian mixture model evaluation.
//!
//! Models are evaluated through small, pure functions so that fitting/search code can
//! stay generic over the covariance family.

pub mod model;

pub use model::*;
