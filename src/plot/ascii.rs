//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - one `-` line per covariance family, connecting its scores across `k`
//! - family markers at scored grid points: `F`, `T`, `D`, `S`
//! - the chosen candidate: `*`
//!
//! Failed candidates are not drawn.

use crate::domain::{Candidate, CovarianceFamily, ScoreRow};

/// Render the criterion score against `k` for every family in the table.
pub fn render_score_chart(
    table: &[ScoreRow],
    best: Option<Candidate>,
    criterion: &str,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (k_min, k_max) = k_range(table).unwrap_or((1.0, 2.0));
    let (y_min, y_max) = score_range(table).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so markers overlay them.
    for family in CovarianceFamily::ALL {
        let mut prev: Option<(usize, usize)> = None;
        for row in table.iter().filter(|r| r.candidate.family == family) {
            let Some(score) = row.score() else {
                continue;
            };
            let x = map_x(row.candidate.k as f64, k_min, k_max, width);
            let y = map_y(score, y_min, y_max, height);
            if let Some((x0, y0)) = prev {
                draw_line(&mut grid, x0, y0, x, y, '-');
            }
            prev = Some((x, y));
        }
    }

    for row in table {
        let Some(score) = row.score() else {
            continue;
        };
        let x = map_x(row.candidate.k as f64, k_min, k_max, width);
        let y = map_y(score, y_min, y_max, height);
        grid[y][x] = if Some(row.candidate) == best {
            '*'
        } else {
            row.candidate.family.marker()
        };
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Chart: k=[{}, {}] | {criterion}=[{y_min:.2}, {y_max:.2}]\n",
        k_min as usize, k_max as usize
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn k_range(table: &[ScoreRow]) -> Option<(f64, f64)> {
    let min_k = table.iter().map(|r| r.candidate.k).min()?;
    let max_k = table.iter().map(|r| r.candidate.k).max()?;
    if max_k > min_k {
        Some((min_k as f64, max_k as f64))
    } else {
        // Single k: center it.
        Some(((min_k as f64 - 1.0).max(0.0), min_k as f64 + 1.0))
    }
}

fn score_range(table: &[ScoreRow]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for score in table.iter().filter_map(ScoreRow::score) {
        min_y = min_y.min(score);
        max_y = max_y.max(score);
    }

    if !(min_y.is_finite() && max_y.is_finite()) {
        None
    } else if max_y > min_y {
        Some((min_y, max_y))
    } else {
        Some((min_y - 1.0, max_y + 1.0))
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitDiagnostics, ScoreOutcome};
    use pretty_assertions::assert_eq;

    fn row(index: usize, k: usize, family: CovarianceFamily, score: Option<f64>) -> ScoreRow {
        let outcome = match score {
            Some(score) => ScoreOutcome::Scored {
                score,
                log_likelihood: -score / 2.0,
                diagnostics: FitDiagnostics {
                    n_iter: 1,
                    converged: true,
                    init_index: 0,
                },
            },
            None => ScoreOutcome::Failed {
                reason: "singular".into(),
            },
        };
        ScoreRow {
            index,
            candidate: Candidate { k, family },
            n_params: k,
            outcome,
        }
    }

    #[test]
    fn chart_golden_snapshot_small() {
        use CovarianceFamily::{Full, Spherical};
        let table = vec![
            row(0, 1, Full, Some(130.0)),
            row(1, 1, Spherical, Some(120.0)),
            row(2, 2, Full, Some(100.0)),
            row(3, 2, Spherical, None),
            row(4, 3, Full, Some(110.0)),
        ];
        let best = Some(Candidate { k: 2, family: Full });

        let txt = render_score_chart(&table, best, "BIC", 12, 5);
        let expected = concat!(
            "Chart: k=[1, 3] | BIC=[98.50, 131.50]\n",
            "F           \n",
            "S--         \n",
            "   -        \n",
            "    --   --F\n",
            "      *--   \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn all_failed_table_renders_empty_grid() {
        let table = vec![row(0, 1, CovarianceFamily::Full, None)];
        let txt = render_score_chart(&table, None, "AIC", 10, 5);
        assert_eq!(txt.lines().count(), 6);
        assert!(txt.lines().skip(1).all(|l| l.trim().is_empty()));
    }
}
