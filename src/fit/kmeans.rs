//! k-means initialization for EM.
//!
//! EM converges to a local optimum, so the starting point matters. We seed with
//! k-means++ (distance-squared sampling) and refine with a few Lloyd iterations;
//! the resulting hard labels become the first responsibilities.

use nalgebra::DVector;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Lloyd iterations applied after seeding.
pub const LLOYD_ITERS: usize = 10;

/// Pick `k` initial centers with k-means++.
///
/// When every remaining distance is zero (duplicated points) the next center is
/// drawn uniformly, which keeps the routine total on degenerate inputs.
pub fn kmeans_plus_plus<R: Rng + ?Sized>(
    points: &[DVector<f64>],
    k: usize,
    rng: &mut R,
) -> Vec<DVector<f64>> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    if n == 0 || k == 0 {
        return centers;
    }

    centers.push(points[rng.gen_range(0..n)].clone());
    let mut d2: Vec<f64> = points
        .iter()
        .map(|p| (p - &centers[0]).norm_squared())
        .collect();

    while centers.len() < k {
        let idx = match WeightedIndex::new(&d2) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..n),
        };
        let next = points[idx].clone();
        for (dist, p) in d2.iter_mut().zip(points) {
            *dist = dist.min((p - &next).norm_squared());
        }
        centers.push(next);
    }

    centers
}

/// Assign each point to its nearest center. Ties go to the lower index.
pub fn assign(points: &[DVector<f64>], centers: &[DVector<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (c, center) in centers.iter().enumerate() {
                let d = (p - center).norm_squared();
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Run Lloyd's algorithm from the given centers and return the final labels.
///
/// Empty clusters keep their previous center.
pub fn lloyd(points: &[DVector<f64>], mut centers: Vec<DVector<f64>>, iters: usize) -> Vec<usize> {
    let mut labels = assign(points, &centers);
    let Some(dim) = points.first().map(|p| p.len()) else {
        return labels;
    };

    for _ in 0..iters {
        let mut sums = vec![DVector::<f64>::zeros(dim); centers.len()];
        let mut counts = vec![0usize; centers.len()];
        for (p, &c) in points.iter().zip(&labels) {
            sums[c] += p;
            counts[c] += 1;
        }
        for (c, center) in centers.iter_mut().enumerate() {
            if counts[c] > 0 {
                *center = &sums[c] / counts[c] as f64;
            }
        }

        let next = assign(points, &centers);
        if next == labels {
            break;
        }
        labels = next;
    }

    labels
}
