//! `gmm-select` library crate.
//!
//! The binary (`gmmsel`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the selector can be reused with other fitters and criteria
//! - code stays easy to navigate as the project grows
//!
//! The entry point for library users is [`fit::select`].

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
