//! Candidate grid generation.
//!
//! The sweep enumerates the Cartesian product `k_values x families`:
//! - `k` ascending (duplicates collapse)
//! - families in their declared order (`full, tied, diag, spherical`)
//!
//! The order does not affect which model wins, but it fixes the table layout and
//! the last-resort tie-break, so the output is reproducible.

use crate::domain::{Candidate, CovarianceFamily};
use crate::error::SelectError;

/// Validate the grid inputs before anything is fitted.
pub fn validate_grid(k_values: &[usize], families: &[CovarianceFamily]) -> Result<(), SelectError> {
    if k_values.is_empty() {
        return Err(SelectError::InvalidConfiguration(
            "k_values must not be empty".to_string(),
        ));
    }
    if families.is_empty() {
        return Err(SelectError::InvalidConfiguration(
            "families must not be empty".to_string(),
        ));
    }
    if k_values.contains(&0) {
        return Err(SelectError::InvalidConfiguration(
            "component counts must be >= 1".to_string(),
        ));
    }
    Ok(())
}

/// Enumerate the grid in deterministic order.
pub fn enumerate_grid(
    k_values: &[usize],
    families: &[CovarianceFamily],
) -> Result<Vec<Candidate>, SelectError> {
    validate_grid(k_values, families)?;

    let mut ks = k_values.to_vec();
    ks.sort_unstable();
    ks.dedup();

    let mut fams = families.to_vec();
    fams.sort();
    fams.dedup();

    let mut out = Vec::with_capacity(ks.len() * fams.len());
    for &k in &ks {
        for &family in &fams {
            out.push(Candidate { k, family });
        }
    }
    Ok(out)
}

/// Inclusive `k` range as used by the CLI.
pub fn k_range(k_min: usize, k_max: usize) -> Result<Vec<usize>, SelectError> {
    if k_min == 0 || k_max < k_min {
        return Err(SelectError::InvalidConfiguration(format!(
            "invalid k range: min={k_min}, max={k_max} (must satisfy 1 <= min <= max)"
        )));
    }
    Ok((k_min..=k_max).collect())
}
