//! Terminal charts.

pub mod ascii;

pub use ascii::render_score_chart;
