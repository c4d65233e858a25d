//! Mathematical utilities: Cholesky factorization and log-space reductions.

pub mod linalg;
pub mod logspace;

pub use linalg::*;
pub use logspace::*;
