//! Debug bundle writer for inspecting a selection sweep.
//!
//! The bundle is a markdown file with the run configuration, dataset stats and one
//! table row per candidate (including failure reasons and EM diagnostics).

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::domain::{DatasetStats, ScoreOutcome, SelectConfig, SelectionResult};
use crate::error::AppError;

/// Write a bundle under `./debug/` and return its path.
pub fn write_debug_bundle(
    source: &str,
    stats: &DatasetStats,
    result: &SelectionResult,
    config: &SelectConfig,
) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), source, stats, result, config)
}

/// Write a bundle into `dir` (created if missing) and return its path.
pub fn write_debug_bundle_in(
    dir: &Path,
    source: &str,
    stats: &DatasetStats,
    result: &SelectionResult,
    config: &SelectConfig,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "gmmsel_debug_k{}-{}_seed{}_{}.md",
        config.k_min, config.k_max, config.em_seed, ts
    ));

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    write_bundle(&mut file, source, stats, result, config)
        .map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;

    Ok(path)
}

fn write_bundle<W: Write>(
    out: &mut W,
    source: &str,
    stats: &DatasetStats,
    result: &SelectionResult,
    config: &SelectConfig,
) -> std::io::Result<()> {
    writeln!(out, "# gmmsel debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- data: {source}")?;
    writeln!(out, "- n_points: {} | dim: {}", stats.n_points, stats.dim)?;
    writeln!(
        out,
        "- grid: k={}..={} | families={} | max_fits={}",
        config.k_min,
        config.k_max,
        config
            .families
            .iter()
            .map(|f| f.display_name())
            .collect::<Vec<_>>()
            .join(","),
        config
            .max_fits
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".to_string())
    )?;
    writeln!(out, "- criterion: {}", config.criterion.display_name())?;
    writeln!(
        out,
        "- em: max_iter={} tol={:e} n_init={} reg_covar={:e} seed={}",
        config.max_iter, config.tol, config.n_init, config.reg_covar, config.em_seed
    )?;

    writeln!(out, "\n## Data ranges")?;
    writeln!(out, "| axis | min | max |")?;
    writeln!(out, "| - | - | - |")?;
    for j in 0..stats.dim {
        writeln!(out, "| x{j} | {:.6} | {:.6} |", stats.min[j], stats.max[j])?;
    }

    writeln!(out, "\n## Candidates")?;
    writeln!(out, "| # | k | family | params | score | loglik | iter | converged | restart | note |")?;
    writeln!(out, "| - | - | - | - | - | - | - | - | - | - |")?;
    for row in &result.table {
        let chosen = if row.candidate == result.best { "chosen" } else { "" };
        match &row.outcome {
            ScoreOutcome::Scored {
                score,
                log_likelihood,
                diagnostics,
            } => writeln!(
                out,
                "| {} | {} | {} | {} | {:.6} | {:.6} | {} | {} | {} | {} |",
                row.index,
                row.candidate.k,
                row.candidate.family.display_name(),
                row.n_params,
                score,
                log_likelihood,
                diagnostics.n_iter,
                diagnostics.converged,
                diagnostics.init_index,
                chosen
            )?,
            ScoreOutcome::Failed { reason } => writeln!(
                out,
                "| {} | {} | {} | {} | - | - | - | - | - | failed: {} |",
                row.index,
                row.candidate.k,
                row.candidate.family.display_name(),
                row.n_params,
                reason
            )?,
        }
    }

    let model = &result.best_model;
    writeln!(out, "\n## Chosen model: {}", result.best)?;
    writeln!(out, "| component | weight | mean |")?;
    writeln!(out, "| - | - | - |")?;
    for (c, (w, mean)) in model.weights.iter().zip(&model.means).enumerate() {
        writeln!(out, "| {c} | {w:.6} | {} |", fmt_vec(mean))?;
    }

    Ok(())
}

fn fmt_vec(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Candidate, CovarianceFamily, CovarianceParams, CriterionKind, FitDiagnostics, FittedModel,
        ScoreRow,
    };

    fn config() -> SelectConfig {
        SelectConfig {
            input: None,
            samples_per_cluster: 10,
            sample_seed: 1,
            separation: 5.0,
            k_min: 1,
            k_max: 2,
            families: vec![CovarianceFamily::Diag],
            criterion: CriterionKind::Bic,
            max_fits: None,
            max_iter: 100,
            tol: 1e-3,
            n_init: 1,
            reg_covar: 0.0,
            em_seed: 7,
            plot: false,
            plot_width: 60,
            plot_height: 15,
            export_table: None,
            export_model: None,
            debug_bundle: true,
        }
    }

    #[test]
    fn bundle_lists_every_candidate() {
        let best = Candidate {
            k: 1,
            family: CovarianceFamily::Diag,
        };
        let diagnostics = FitDiagnostics {
            n_iter: 2,
            converged: true,
            init_index: 0,
        };
        let result = SelectionResult {
            best,
            best_score: 3.0,
            best_model: FittedModel {
                k: 1,
                family: CovarianceFamily::Diag,
                dim: 1,
                weights: vec![1.0],
                means: vec![vec![0.5]],
                covariances: CovarianceParams::Diag(vec![vec![1.0]]),
                log_likelihood: -1.0,
                diagnostics,
            },
            table: vec![
                ScoreRow {
                    index: 0,
                    candidate: best,
                    n_params: 2,
                    outcome: ScoreOutcome::Scored {
                        score: 3.0,
                        log_likelihood: -1.0,
                        diagnostics,
                    },
                },
                ScoreRow {
                    index: 1,
                    candidate: Candidate {
                        k: 2,
                        family: CovarianceFamily::Diag,
                    },
                    n_params: 5,
                    outcome: ScoreOutcome::Failed {
                        reason: "component 1 has no support".into(),
                    },
                },
            ],
        };
        let stats = DatasetStats {
            n_points: 4,
            dim: 1,
            min: vec![0.0],
            max: vec![1.0],
        };

        let mut buf = Vec::new();
        write_bundle(&mut buf, "synthetic", &stats, &result, &config()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("- grid: k=1..=2 | families=diag | max_fits=-"));
        assert!(text.contains("| 0 | 1 | diag | 2 | 3.000000 | -1.000000 | 2 | true | 0 | chosen |"));
        assert!(text.contains("| 1 | 2 | diag | 5 | - | - | - | - | - | failed: component 1 has no support |"));
        assert!(text.contains("| 0 | 1.000000 | [0.500000] |"));
    }
}
