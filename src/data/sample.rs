//! Synthetic Gaussian blob generation.
//!
//! Each blob draws `z ~ N(0, I)` and maps it through a linear transform `A`
//! before shifting by the center, so the blob has covariance `A A^T`:
//!
//! ```text
//! x = center + A z
//! ```
//!
//! The default two-blob layout pairs a sheared, elongated cluster (which only the
//! `full` family models well) with a small isotropic one.

use nalgebra::{DMatrix, DVector};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::domain::Dataset;
use crate::error::AppError;

/// Direction of the second blob's center relative to the first.
const SECOND_BLOB_DIRECTION: [f64; 2] = [-6.0, 3.0];

/// Spread of the isotropic second blob.
const SECOND_BLOB_STD: f64 = 0.7;

/// One Gaussian cluster to sample.
#[derive(Debug, Clone)]
pub struct BlobSpec {
    pub center: Vec<f64>,
    /// Row-major `d x d` transform applied to standard normal draws.
    pub transform: Vec<Vec<f64>>,
    pub n: usize,
}

impl BlobSpec {
    /// An axis-aligned blob with the same standard deviation in every direction.
    pub fn isotropic(center: Vec<f64>, std: f64, n: usize) -> Self {
        let d = center.len();
        let transform = (0..d)
            .map(|i| (0..d).map(|j| if i == j { std } else { 0.0 }).collect())
            .collect();
        Self { center, transform, n }
    }
}

/// Generated points plus the blob each point came from.
#[derive(Debug, Clone)]
pub struct SampleData {
    pub dataset: Dataset,
    pub labels: Vec<usize>,
}

/// The two-cluster demonstration layout.
///
/// `separation` is the distance between the two centers.
pub fn two_blob_spec(samples_per_cluster: usize, separation: f64) -> Vec<BlobSpec> {
    let [dx, dy] = SECOND_BLOB_DIRECTION;
    let norm = (dx * dx + dy * dy).sqrt();
    let second = vec![dx / norm * separation, dy / norm * separation];

    vec![
        BlobSpec {
            center: vec![0.0, 0.0],
            // x = z^T C with C = [[0, -0.1], [1.7, 0.4]], i.e. A = C^T.
            transform: vec![vec![0.0, 1.7], vec![-0.1, 0.4]],
            n: samples_per_cluster,
        },
        BlobSpec::isotropic(second, SECOND_BLOB_STD, samples_per_cluster),
    ]
}

/// Sample every blob in order with a seeded RNG.
pub fn generate_blobs(blobs: &[BlobSpec], seed: u64) -> Result<SampleData, AppError> {
    let Some(first) = blobs.first() else {
        return Err(AppError::new(2, "At least one blob is required."));
    };
    let d = first.center.len();
    if d == 0 {
        return Err(AppError::new(2, "Blob centers must have at least one coordinate."));
    }

    let mut transforms = Vec::with_capacity(blobs.len());
    for (b, blob) in blobs.iter().enumerate() {
        if blob.n == 0 {
            return Err(AppError::new(2, format!("Blob {b} has no samples.")));
        }
        if blob.center.len() != d {
            return Err(AppError::new(2, format!("Blob {b} center has the wrong dimension.")));
        }
        if blob.transform.len() != d || blob.transform.iter().any(|r| r.len() != d) {
            return Err(AppError::new(2, format!("Blob {b} transform must be {d}x{d}.")));
        }
        if !blob.center.iter().chain(blob.transform.iter().flatten()).all(|v| v.is_finite()) {
            return Err(AppError::new(2, format!("Blob {b} has non-finite parameters.")));
        }
        transforms.push(DMatrix::from_fn(d, d, |i, j| blob.transform[i][j]));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let total: usize = blobs.iter().map(|b| b.n).sum();
    let mut rows = Vec::with_capacity(total);
    let mut labels = Vec::with_capacity(total);

    for (b, (blob, transform)) in blobs.iter().zip(&transforms).enumerate() {
        let center = DVector::from_column_slice(&blob.center);
        for _ in 0..blob.n {
            let z = DVector::from_fn(d, |_, _| rng.sample::<f64, _>(StandardNormal));
            let x = &center + transform * z;
            rows.push(x.iter().copied().collect::<Vec<f64>>());
            labels.push(b);
        }
    }

    let dataset = Dataset::from_rows(&rows)?;
    Ok(SampleData { dataset, labels })
}
