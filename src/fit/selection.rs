//! Model selection over the `(k, covariance family)` grid.
//!
//! The selector fits every candidate, scores each success with the criterion and
//! returns the minimum. Selection rules:
//!
//! 1. A candidate whose fit fails is recorded as failed and excluded; the sweep continues.
//! 2. A non-finite score is treated like a failed fit.
//! 3. Minimum score wins; exact ties prefer fewer parameters, then earlier enumeration.
//!
//! Candidates are fitted in parallel. Results are collected in enumeration order and
//! reduced with a total order, so the outcome does not depend on scheduling.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{Candidate, CovarianceFamily, Dataset, FittedModel, ScoreOutcome, ScoreRow, SelectionResult};
use crate::error::SelectError;
use crate::fit::criterion::Criterion;
use crate::fit::fitter::MixtureFitter;
use crate::fit::grid::enumerate_grid;
use crate::models::param_count;

/// Sweep options.
#[derive(Debug, Clone, Default)]
pub struct SweepOptions {
    /// Fit at most this many candidates (in enumeration order).
    pub max_fits: Option<usize>,
}

/// Select the minimum-criterion mixture over `k_values x families`.
pub fn select<F, C>(
    data: &Dataset,
    k_values: &[usize],
    families: &[CovarianceFamily],
    fitter: &F,
    criterion: &C,
) -> Result<SelectionResult, SelectError>
where
    F: MixtureFitter + ?Sized,
    C: Criterion + ?Sized,
{
    select_with(data, k_values, families, fitter, criterion, &SweepOptions::default())
}

/// [`select`] with explicit sweep options.
pub fn select_with<F, C>(
    data: &Dataset,
    k_values: &[usize],
    families: &[CovarianceFamily],
    fitter: &F,
    criterion: &C,
    opts: &SweepOptions,
) -> Result<SelectionResult, SelectError>
where
    F: MixtureFitter + ?Sized,
    C: Criterion + ?Sized,
{
    let mut grid = enumerate_grid(k_values, families)?;
    if let Some(max_fits) = opts.max_fits {
        if max_fits == 0 {
            return Err(SelectError::InvalidConfiguration(
                "max_fits must be >= 1".to_string(),
            ));
        }
        grid.truncate(max_fits);
    }

    let evaluated: Vec<Evaluated> = grid
        .par_iter()
        .enumerate()
        .map(|(index, &candidate)| evaluate(index, candidate, data, fitter, criterion))
        .collect();

    let attempted = evaluated.len();
    let mut table = Vec::with_capacity(attempted);
    let mut best: Option<(Ranked, FittedModel)> = None;

    for Evaluated { row, model } in evaluated {
        if let (Some(score), Some(model)) = (row.score(), model) {
            let ranked = Ranked {
                score,
                n_params: row.n_params,
                index: row.index,
            };
            let replace = match &best {
                None => true,
                Some((current, _)) => ranked.precedes(current),
            };
            if replace {
                best = Some((ranked, model));
            }
        }
        table.push(row);
    }

    let Some((ranked, best_model)) = best else {
        warn!(attempted, "every candidate configuration failed");
        return Err(SelectError::NoViableModel { attempted });
    };

    let best = table[ranked.index].candidate;
    info!(
        k = best.k,
        family = best.family.display_name(),
        score = ranked.score,
        criterion = criterion.name(),
        failed = table.iter().filter(|r| r.is_failed()).count(),
        "selected model"
    );

    Ok(SelectionResult {
        best,
        best_score: ranked.score,
        best_model,
        table,
    })
}

struct Evaluated {
    row: ScoreRow,
    model: Option<FittedModel>,
}

/// Sort key for the minimum: `(score, n_params, index)`.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f64,
    n_params: usize,
    index: usize,
}

impl Ranked {
    fn precedes(&self, other: &Ranked) -> bool {
        if self.score != other.score {
            return self.score < other.score;
        }
        if self.n_params != other.n_params {
            return self.n_params < other.n_params;
        }
        self.index < other.index
    }
}

fn evaluate<F, C>(
    index: usize,
    candidate: Candidate,
    data: &Dataset,
    fitter: &F,
    criterion: &C,
) -> Evaluated
where
    F: MixtureFitter + ?Sized,
    C: Criterion + ?Sized,
{
    let n_params = param_count(candidate.k, candidate.family, data.dim());
    let failed = |reason: String| Evaluated {
        row: ScoreRow {
            index,
            candidate,
            n_params,
            outcome: ScoreOutcome::Failed { reason },
        },
        model: None,
    };

    let model = match fitter.fit(data, candidate.k, candidate.family) {
        Ok(model) => model,
        Err(e) => {
            warn!(%candidate, error = %e, "fit failed; excluding candidate");
            return failed(e.to_string());
        }
    };

    let score = criterion.score(&model, data);
    if !score.is_finite() {
        warn!(%candidate, score, "non-finite criterion value; excluding candidate");
        return failed(format!("non-finite {} value", criterion.name()));
    }

    debug!(
        %candidate,
        score,
        log_likelihood = model.log_likelihood,
        n_iter = model.diagnostics.n_iter,
        converged = model.diagnostics.converged,
        "scored candidate"
    );

    Evaluated {
        row: ScoreRow {
            index,
            candidate,
            n_params,
            outcome: ScoreOutcome::Scored {
                score,
                log_likelihood: model.log_likelihood,
                diagnostics: model.diagnostics,
            },
        },
        model: Some(model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample::{generate_blobs, two_blob_spec};
    use crate::domain::{CovarianceParams, CriterionKind, FitDiagnostics};
    use crate::error::FitFailure;
    use crate::fit::fitter::EmFitter;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use CovarianceFamily::*;

    /// A fitter that never looks at the data: log-likelihood is a lookup on `(k, family)`.
    struct StubFitter<L: Fn(usize, CovarianceFamily) -> Option<f64> + Sync> {
        ll: L,
        calls: AtomicUsize,
    }

    impl<L: Fn(usize, CovarianceFamily) -> Option<f64> + Sync> StubFitter<L> {
        fn new(ll: L) -> Self {
            Self {
                ll,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<L: Fn(usize, CovarianceFamily) -> Option<f64> + Sync> MixtureFitter for StubFitter<L> {
        fn fit(&self, data: &Dataset, k: usize, family: CovarianceFamily) -> Result<FittedModel, FitFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let ll = (self.ll)(k, family).ok_or(FitFailure::SingularCovariance { component: 0 })?;
            Ok(FittedModel {
                k,
                family,
                dim: data.dim(),
                weights: vec![1.0 / k as f64; k],
                means: vec![vec![0.0; data.dim()]; k],
                covariances: CovarianceParams::Spherical(vec![1.0; k]),
                log_likelihood: ll,
                diagnostics: FitDiagnostics {
                    n_iter: 1,
                    converged: true,
                    init_index: 0,
                },
            })
        }
    }

    fn line(n: usize) -> Dataset {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        Dataset::from_rows(&rows).unwrap()
    }

    #[test]
    fn selected_score_is_minimal() {
        let fitter = StubFitter::new(|k, f| Some(-(k as f64) * 10.0 - f as usize as f64));
        let data = line(30);
        let result = select(&data, &[1, 2, 3], &CovarianceFamily::ALL, &fitter, &CriterionKind::Bic).unwrap();

        for row in &result.table {
            if let Some(s) = row.score() {
                assert!(result.best_score <= s);
            }
        }
        assert_eq!(result.table.len(), 12);
        assert_eq!(result.best_model.candidate(), result.best);
    }

    #[test]
    fn failures_are_recorded_and_skipped() {
        let fitter = StubFitter::new(|k, f| if k == 2 && f == Full { None } else { Some(-1.0) });
        let data = line(10);
        let result = select(&data, &[1, 2], &[Full, Spherical], &fitter, &CriterionKind::Bic).unwrap();

        assert_eq!(fitter.calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.n_failed(), 1);
        let failed = &result.table[2];
        assert_eq!(failed.candidate, Candidate { k: 2, family: Full });
        assert!(failed.is_failed());
        assert_ne!(result.best, failed.candidate);
    }

    #[test]
    fn ties_prefer_fewer_parameters() {
        let fitter = StubFitter::new(|_, _| Some(0.0));
        let data = line(10);
        // Constant criterion: every candidate ties on score.
        let flat = |_: &FittedModel, _: &Dataset| 1.0;
        let result = select(&data, &[1, 2], &[Full, Spherical], &fitter, &flat).unwrap();

        // k=1 spherical (2 means + 1 variance) has the fewest parameters.
        assert_eq!(result.best, Candidate { k: 1, family: Spherical });
    }

    #[test]
    fn equal_score_and_parameters_prefer_enumeration_order() {
        let fitter = StubFitter::new(|_, _| Some(0.0));
        // In 1-D, diag and spherical have identical parameter counts.
        let data = Dataset::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
        let flat = |_: &FittedModel, _: &Dataset| 5.0;
        let result = select(&data, &[2], &[Spherical, Diag], &fitter, &flat).unwrap();
        assert_eq!(result.best, Candidate { k: 2, family: Diag });
    }

    #[test]
    fn all_failures_is_no_viable_model() {
        let fitter = StubFitter::new(|_, _| None);
        let err = select(&line(5), &[1, 2], &[Full], &fitter, &CriterionKind::Bic).unwrap_err();
        assert_eq!(err, SelectError::NoViableModel { attempted: 2 });
    }

    #[test]
    fn invalid_grid_fails_before_fitting() {
        let fitter = StubFitter::new(|_, _| Some(0.0));
        let data = line(5);

        for (ks, fams) in [(vec![], vec![Full]), (vec![1], vec![]), (vec![0], vec![Full])] {
            let err = select(&data, &ks, &fams, &fitter, &CriterionKind::Bic).unwrap_err();
            assert!(matches!(err, SelectError::InvalidConfiguration(_)));
        }
        assert_eq!(fitter.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn non_finite_scores_are_excluded() {
        let fitter = StubFitter::new(|_, _| Some(0.0));
        let nan_for_k1 = |m: &FittedModel, _: &Dataset| if m.k == 1 { f64::NAN } else { 3.0 };
        let result = select(&line(6), &[1, 2], &[Full], &fitter, &nan_for_k1).unwrap();
        assert_eq!(result.best.k, 2);
        assert!(result.table[0].is_failed());
    }

    #[test]
    fn budget_truncates_grid() {
        let fitter = StubFitter::new(|k, _| Some(-(k as f64)));
        let opts = SweepOptions { max_fits: Some(3) };
        let result = select_with(&line(8), &[1, 2, 3], &[Full, Tied], &fitter, &CriterionKind::Aic, &opts).unwrap();
        assert_eq!(result.table.len(), 3);
        assert_eq!(fitter.calls.load(Ordering::SeqCst), 3);

        let zero = SweepOptions { max_fits: Some(0) };
        assert!(select_with(&line(8), &[1], &[Full], &fitter, &CriterionKind::Aic, &zero).is_err());
    }

    #[test]
    fn two_blob_dataset_selects_two_components() {
        let data = generate_blobs(&two_blob_spec(200, 8.0), 0).unwrap().dataset;
        let fitter = EmFitter::default();
        let result = select(&data, &[1, 2], &[Full], &fitter, &CriterionKind::Bic).unwrap();
        assert_eq!(result.best, Candidate { k: 2, family: Full });
    }

    #[test]
    fn sweep_is_deterministic() {
        let data = generate_blobs(&two_blob_spec(80, 8.0), 3).unwrap().dataset;
        let fitter = EmFitter::default();
        let a = select(&data, &[1, 2, 3], &CovarianceFamily::ALL, &fitter, &CriterionKind::Bic).unwrap();
        let b = select(&data, &[1, 2, 3], &CovarianceFamily::ALL, &fitter, &CriterionKind::Bic).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn identical_points_fail_per_candidate_not_whole_sweep() {
        let mut rows = vec![vec![1.0, 1.0]; 20];
        // One extra distinct point keeps a single diag/spherical component viable.
        rows.push(vec![2.0, 3.0]);
        let data = Dataset::from_rows(&rows).unwrap();

        let fitter = EmFitter::default();
        let result = select(&data, &[1, 2], &[Full, Spherical], &fitter, &CriterionKind::Bic).unwrap();
        assert!(result.n_failed() >= 1);
        assert!(result.table.iter().any(|r| !r.is_failed()));
    }

    #[test]
    fn degenerate_dataset_has_no_viable_model() {
        let data = Dataset::from_rows(&vec![vec![4.0, -1.0]; 12]).unwrap();
        let err = select(&data, &[1, 2], &[Full], &EmFitter::default(), &CriterionKind::Bic).unwrap_err();
        assert_eq!(err, SelectError::NoViableModel { attempted: 2 });
    }

    #[test]
    fn inexact_identical_points_have_no_viable_model() {
        let data = Dataset::from_rows(&vec![vec![0.1, 0.7]; 10]).unwrap();
        let families = CovarianceFamily::ALL;
        let err = select(&data, &[1, 2], &families, &EmFitter::default(), &CriterionKind::Bic)
            .unwrap_err();
        assert_eq!(err, SelectError::NoViableModel { attempted: 8 });
    }
}
