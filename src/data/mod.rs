//! Dataset sources: synthetic blob generation.

pub mod sample;

pub use sample::*;
