//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` defaults and parses CLI arguments
//! - installs the log subscriber
//! - runs the selection pipeline
//! - prints reports/charts
//! - writes optional exports

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, SelectArgs, ShowArgs};
use crate::domain::{CovarianceFamily, SelectConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `gmmsel` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is fine; GMMSEL_* variables may come from the shell.
    dotenvy::dotenv().ok();

    // We want `gmmsel` and `gmmsel --k-max 4` to behave like `gmmsel select ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(&cli.log_level);

    match cli.command {
        Command::Select(args) => handle_select(args, OutputMode::Full),
        Command::Table(args) => handle_select(args, OutputMode::TableOnly),
        Command::Show(args) => handle_show(args),
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so stdout stays clean for tables.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    TableOnly,
}

fn handle_select(args: SelectArgs, mode: OutputMode) -> Result<(), AppError> {
    let config = select_config_from_args(&args);
    let run = pipeline::run_selection(&config)?;
    let criterion = config.criterion.display_name();

    for err in &run.row_errors {
        warn!(line = err.line, "{}", err.message);
    }

    match mode {
        OutputMode::Full => {
            println!(
                "{}",
                crate::report::format_run_summary(
                    &run.source,
                    &run.stats,
                    &run.selection,
                    &run.clusters,
                    &config
                )
            );
            println!("{}", crate::report::format_score_table(&run.selection, criterion));
        }
        OutputMode::TableOnly => {
            print!("{}", crate::report::format_score_table(&run.selection, criterion));
        }
    }

    if mode == OutputMode::Full && config.plot {
        let chart = crate::plot::render_score_chart(
            &run.selection.table,
            Some(run.selection.best),
            criterion,
            config.plot_width,
            config.plot_height,
        );
        println!("{chart}");
    }

    // Optional exports.
    if let Some(path) = &config.export_table {
        crate::io::write_table_csv(path, &run.selection)?;
        info!(path = %path.display(), "wrote score table");
    }
    if let Some(path) = &config.export_model {
        let file = crate::io::model_file(&run.selection, config.criterion, run.stats.n_points);
        crate::io::write_model_json(path, &file)?;
        info!(path = %path.display(), "wrote model file");
    }
    if config.debug_bundle {
        let path = crate::debug::write_debug_bundle(&run.source, &run.stats, &run.selection, &config)?;
        eprintln!("Debug bundle: {}", path.display());
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let file = crate::io::read_model_json(&args.model)?;
    print!("{}", crate::report::format_model_file(&file));
    Ok(())
}

pub fn select_config_from_args(args: &SelectArgs) -> SelectConfig {
    let families = if args.families.is_empty() {
        CovarianceFamily::ALL.to_vec()
    } else {
        args.families.clone()
    };

    SelectConfig {
        input: args.input.clone(),
        samples_per_cluster: args.samples_per_cluster,
        sample_seed: args.seed,
        separation: args.separation,

        k_min: args.k_min,
        k_max: args.k_max,
        families,
        criterion: args.criterion,
        max_fits: args.max_fits,

        max_iter: args.max_iter,
        tol: args.tol,
        n_init: args.n_init,
        reg_covar: args.reg_covar,
        em_seed: args.em_seed,

        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,

        export_table: args.export_table.clone(),
        export_model: args.export_model.clone(),
        debug_bundle: args.debug_bundle,
    }
}

/// Rewrite argv so `gmmsel` defaults to `gmmsel select`.
///
/// Rules:
/// - `gmmsel`                      -> `gmmsel select`
/// - `gmmsel --k-max 4 ...`        -> `gmmsel select --k-max 4 ...`
/// - `gmmsel --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("select".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "select" | "table" | "show");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "select flags".
    if arg1.starts_with('-') {
        argv.insert(1, "select".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
