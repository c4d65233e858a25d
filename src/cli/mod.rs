//! Command-line parsing for the Gaussian mixture selector.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.
//!
//! Every selection option can also come from a `GMMSEL_*` environment variable
//! (a `.env` file is loaded first).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{CovarianceFamily, CriterionKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gmmsel",
    version,
    about = "Gaussian mixture model selection by information criterion"
)]
pub struct Cli {
    /// Log filter when `RUST_LOG` is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, env = "GMMSEL_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the grid sweep, print the summary, score table and chart, and optionally export.
    Select(SelectArgs),
    /// Print the score table only (useful for scripting).
    Table(SelectArgs),
    /// Summarize a previously exported model JSON.
    Show(ShowArgs),
}

/// Common options for a selection sweep.
#[derive(Debug, Args, Clone)]
pub struct SelectArgs {
    /// Dataset CSV (header row, numeric columns). Omit to generate two synthetic blobs.
    #[arg(short = 'i', long, value_name = "CSV", env = "GMMSEL_INPUT")]
    pub input: Option<PathBuf>,

    /// Synthetic points per blob.
    #[arg(short = 'n', long, default_value_t = 500, env = "GMMSEL_SAMPLES_PER_CLUSTER")]
    pub samples_per_cluster: usize,

    /// Random seed for synthetic data.
    #[arg(long, default_value_t = 0, env = "GMMSEL_SEED")]
    pub seed: u64,

    /// Distance between the two synthetic blob centers.
    #[arg(long, default_value_t = 6.7, env = "GMMSEL_SEPARATION")]
    pub separation: f64,

    /// Smallest component count in the grid.
    #[arg(long, default_value_t = 1, env = "GMMSEL_K_MIN")]
    pub k_min: usize,

    /// Largest component count in the grid.
    #[arg(long, default_value_t = 6, env = "GMMSEL_K_MAX")]
    pub k_max: usize,

    /// Covariance family to include (repeatable; default all four).
    #[arg(
        short = 'f',
        long = "family",
        value_enum,
        ignore_case = true,
        value_delimiter = ',',
        env = "GMMSEL_FAMILIES"
    )]
    pub families: Vec<CovarianceFamily>,

    /// Information criterion used to score candidates.
    #[arg(long, value_enum, ignore_case = true, default_value_t = CriterionKind::Bic, env = "GMMSEL_CRITERION")]
    pub criterion: CriterionKind,

    /// Fit at most this many candidates, in enumeration order.
    #[arg(long, env = "GMMSEL_MAX_FITS")]
    pub max_fits: Option<usize>,

    /// EM iteration cap per initialization.
    #[arg(long, default_value_t = 100, env = "GMMSEL_MAX_ITER")]
    pub max_iter: usize,

    /// EM convergence threshold on the per-point log-likelihood change.
    #[arg(long, default_value_t = 1e-3, env = "GMMSEL_TOL")]
    pub tol: f64,

    /// Number of EM initializations; the best log-likelihood is kept.
    #[arg(long, default_value_t = 1, env = "GMMSEL_N_INIT")]
    pub n_init: usize,

    /// Non-negative value added to covariance diagonals.
    #[arg(long, default_value_t = 0.0, env = "GMMSEL_REG_COVAR")]
    pub reg_covar: f64,

    /// Random seed for EM initialization.
    #[arg(long, default_value_t = 0, env = "GMMSEL_EM_SEED")]
    pub em_seed: u64,

    /// Disable the terminal chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the score table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_table: Option<PathBuf>,

    /// Export the chosen model to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_model: Option<PathBuf>,

    /// Write a markdown debug bundle under `./debug/`.
    #[arg(long)]
    pub debug_bundle: bool,
}

/// Options for summarizing a saved model.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Model JSON file produced by `gmmsel select --export-model`.
    #[arg(long, value_name = "JSON")]
    pub model: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn families_parse_repeated_and_aliased() {
        let cli = Cli::try_parse_from([
            "gmmsel", "select", "--family", "FULL", "-f", "diagonal,spherical",
        ])
        .unwrap();
        let Command::Select(args) = cli.command else {
            panic!("expected select");
        };
        assert_eq!(
            args.families,
            vec![
                CovarianceFamily::Full,
                CovarianceFamily::Diag,
                CovarianceFamily::Spherical
            ]
        );
    }

    #[test]
    fn defaults_match_em_defaults() {
        let cli = Cli::try_parse_from(["gmmsel", "table"]).unwrap();
        let Command::Table(args) = cli.command else {
            panic!("expected table");
        };
        assert_eq!(args.k_min, 1);
        assert_eq!(args.criterion, CriterionKind::Bic);
        assert_eq!(args.reg_covar, 0.0);
        assert!(args.families.is_empty());
        assert!(args.max_fits.is_none());
    }
}
