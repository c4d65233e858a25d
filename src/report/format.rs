//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting/selection code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{CovarianceParams, DatasetStats, ModelFile, ScoreOutcome, SelectConfig, SelectionResult};
use crate::report::ClusterSummary;

/// Format the full run summary (dataset stats + chosen model + cluster summary).
pub fn format_run_summary(
    source: &str,
    stats: &DatasetStats,
    result: &SelectionResult,
    clusters: &[ClusterSummary],
    config: &SelectConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== gmmsel - Gaussian mixture selection ===\n");
    out.push_str(&format!("Data: {source}\n"));
    out.push_str(&format!("Points: n={} | dim={}\n", stats.n_points, stats.dim));
    for j in 0..stats.dim {
        out.push_str(&format!(
            "  x{j}: [{:.3}, {:.3}]\n",
            stats.min[j], stats.max[j]
        ));
    }
    let families: Vec<&str> = config.families.iter().map(|f| f.display_name()).collect();
    out.push_str(&format!(
        "Grid: k={}..={} | families={} | criterion={}\n",
        config.k_min,
        config.k_max,
        families.join(","),
        config.criterion.display_name(),
    ));
    out.push_str(&format!(
        "EM: max_iter={} tol={:e} n_init={} reg_covar={:e} seed={}\n",
        config.max_iter, config.tol, config.n_init, config.reg_covar, config.em_seed
    ));

    out.push_str("\nChosen model:\n");
    out.push_str(&format!(
        "- {} ({}={:.3}, params={})\n",
        result.best,
        config.criterion.display_name(),
        result.best_score,
        result.best_model.n_params()
    ));
    out.push_str(&format!(
        "- log-likelihood: {:.3} ({} iterations{})\n",
        result.best_model.log_likelihood,
        result.best_model.diagnostics.n_iter,
        if result.best_model.diagnostics.converged { "" } else { ", not converged" }
    ));
    if result.n_failed() > 0 {
        out.push_str(&format!(
            "- {} of {} candidates failed to fit\n",
            result.n_failed(),
            result.table.len()
        ));
    }

    out.push_str("\nComponents:\n");
    for c in clusters {
        out.push_str(&format!(
            "  #{:<2} weight={:.3} n={:<6} mean={}\n",
            c.component,
            c.weight,
            c.assigned,
            fmt_vec(&c.mean)
        ));
    }
    out.push('\n');

    out
}

/// Format the score table, one row per candidate in enumeration order.
pub fn format_score_table(result: &SelectionResult, criterion: &str) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:>3} {:<10} {:>7} {:>14} {:>14} {:>5}\n",
            "k", "family", "params", criterion, "loglik", "iter"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "  {:-<3} {:-<10} {:-<7} {:-<14} {:-<14} {:-<5}\n",
            "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for row in &result.table {
        let chosen = if row.candidate == result.best { "*" } else { " " };
        let line = match &row.outcome {
            ScoreOutcome::Scored {
                score,
                log_likelihood,
                diagnostics,
            } => format!(
                "{chosen} {:>3} {:<10} {:>7} {:>14.3} {:>14.3} {:>5}",
                row.candidate.k,
                row.candidate.family.display_name(),
                row.n_params,
                score,
                log_likelihood,
                diagnostics.n_iter
            ),
            ScoreOutcome::Failed { reason } => format!(
                "{chosen} {:>3} {:<10} {:>7} {:>14} ({reason})",
                row.candidate.k,
                row.candidate.family.display_name(),
                row.n_params,
                "failed",
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Summarize a saved model file.
pub fn format_model_file(file: &ModelFile) -> String {
    let mut out = String::new();
    let model = &file.model;

    out.push_str(&format!("Model file ({} @ {})\n", file.tool, file.generated.to_rfc3339()));
    out.push_str(&format!(
        "- {} | {}={:.3} | n={} | dim={}\n",
        file.best,
        file.criterion.display_name(),
        file.score,
        file.n_points,
        model.dim
    ));
    out.push_str(&format!("- log-likelihood: {:.3}\n", model.log_likelihood));

    for c in 0..model.k {
        out.push_str(&format!(
            "  #{c:<2} weight={:.3} mean={}\n",
            model.weights.get(c).copied().unwrap_or(f64::NAN),
            model.means.get(c).map(|m| fmt_vec(m)).unwrap_or_default()
        ));
        if let Some(cov) = covariance_line(&model.covariances, c) {
            out.push_str(&format!("      cov={cov}\n"));
        }
    }

    out
}

fn covariance_line(cov: &CovarianceParams, c: usize) -> Option<String> {
    match cov {
        CovarianceParams::Full(mats) => mats.get(c).map(|m| fmt_matrix(m)),
        CovarianceParams::Tied(m) => (c == 0).then(|| format!("{} (shared)", fmt_matrix(m))),
        CovarianceParams::Diag(vars) => vars.get(c).map(|v| format!("diag{}", fmt_vec(v))),
        CovarianceParams::Spherical(vars) => vars.get(c).map(|v| format!("{v:.4} * I")),
    }
}

fn fmt_matrix(m: &[Vec<f64>]) -> String {
    let rows: Vec<String> = m.iter().map(|r| fmt_vec(r)).collect();
    format!("[{}]", rows.join(", "))
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, CovarianceFamily, FitDiagnostics, FittedModel, ScoreRow};

    fn diagnostics() -> FitDiagnostics {
        FitDiagnostics {
            n_iter: 3,
            converged: true,
            init_index: 0,
        }
    }

    fn result() -> SelectionResult {
        let best = Candidate {
            k: 2,
            family: CovarianceFamily::Full,
        };
        SelectionResult {
            best,
            best_score: 10.0,
            best_model: FittedModel {
                k: 2,
                family: CovarianceFamily::Full,
                dim: 1,
                weights: vec![0.5, 0.5],
                means: vec![vec![-1.0], vec![1.0]],
                covariances: CovarianceParams::Full(vec![vec![vec![1.0]], vec![vec![2.0]]]),
                log_likelihood: -3.0,
                diagnostics: diagnostics(),
            },
            table: vec![
                ScoreRow {
                    index: 0,
                    candidate: Candidate {
                        k: 1,
                        family: CovarianceFamily::Full,
                    },
                    n_params: 2,
                    outcome: ScoreOutcome::Scored {
                        score: 12.25,
                        log_likelihood: -4.5,
                        diagnostics: diagnostics(),
                    },
                },
                ScoreRow {
                    index: 1,
                    candidate: best,
                    n_params: 5,
                    outcome: ScoreOutcome::Scored {
                        score: 10.0,
                        log_likelihood: -3.0,
                        diagnostics: diagnostics(),
                    },
                },
                ScoreRow {
                    index: 2,
                    candidate: Candidate {
                        k: 3,
                        family: CovarianceFamily::Full,
                    },
                    n_params: 8,
                    outcome: ScoreOutcome::Failed {
                        reason: "singular covariance estimate for component 2".into(),
                    },
                },
            ],
        }
    }

    #[test]
    fn score_table_marks_choice_and_failures() {
        let txt = format_score_table(&result(), "BIC");
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("BIC"));
        assert!(lines[2].starts_with("    1 full"));
        assert!(lines[3].starts_with("*   2 full"));
        assert!(lines[4].contains("failed (singular covariance estimate for component 2)"));
    }

    #[test]
    fn model_file_summary_lists_components() {
        let r = result();
        let file = ModelFile {
            tool: "gmmsel".into(),
            generated: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            criterion: crate::domain::CriterionKind::Bic,
            best: r.best,
            score: r.best_score,
            n_points: 10,
            model: r.best_model,
        };
        let txt = format_model_file(&file);
        assert!(txt.contains("k=2 full | BIC=10.000 | n=10 | dim=1"));
        assert!(txt.contains("#0  weight=0.500 mean=[-1.0000]"));
        assert!(txt.contains("cov=[[2.0000]]"));
    }
}
