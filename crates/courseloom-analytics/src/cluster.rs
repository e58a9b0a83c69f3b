//! Centroid-based clustering of query vectors.
//!
//! Plain k-means with deterministic seeding so identical inputs always
//! produce identical assignments (the enclosing run must be retryable).
//! Auto-detection scores a small candidate range of cluster counts by
//! mean silhouette and keeps the best.

use courseloom_core::{Error, Result};
use ndarray::Array1;
use tracing::{debug, warn};

const MAX_ITERATIONS: usize = 100;
const MAX_AUTO_CLUSTERS: usize = 10;

/// Requested cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterCount {
    Fixed(usize),
    Auto,
}

/// Result of a clustering run: one cluster index per input vector, plus
/// the final centroid of each cluster.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub assignments: Vec<usize>,
    pub centroids: Vec<Array1<f32>>,
}

impl Clustering {
    pub fn num_clusters(&self) -> usize {
        self.centroids.len()
    }
}

/// Partition vectors into clusters.
///
/// Degenerate inputs never fail: zero vectors yield zero clusters and a
/// single vector yields one trivial cluster. Auto-detection needs at
/// least two distinct vectors and otherwise fails with
/// `InsufficientData`, leaving the fallback to the caller. All vectors
/// must share one dimension; mixed input is a caller bug and errors
/// instead of panicking mid-iteration.
pub fn cluster_vectors(vectors: &[Array1<f32>], k: ClusterCount) -> Result<Clustering> {
    if vectors.is_empty() {
        return Ok(Clustering {
            assignments: Vec::new(),
            centroids: Vec::new(),
        });
    }

    let dim = vectors[0].len();
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::Internal(format!(
            "mixed vector dimensions: {dim} and {}",
            bad.len()
        )));
    }

    let distinct = distinct_vectors(vectors);

    let k = match k {
        ClusterCount::Fixed(requested) => {
            let k = requested.max(1);
            if k > distinct.len() {
                warn!(
                    "Requested {} clusters but only {} distinct vectors; clamping",
                    k,
                    distinct.len()
                );
                distinct.len()
            } else {
                k
            }
        }
        ClusterCount::Auto => auto_detect_k(vectors, &distinct)?,
    };

    Ok(kmeans(vectors, &distinct, k))
}

/// Pick the candidate cluster count with the best mean silhouette.
fn auto_detect_k(vectors: &[Array1<f32>], distinct: &[Array1<f32>]) -> Result<usize> {
    if distinct.len() < 2 {
        return Err(Error::InsufficientData(
            "auto-detect needs at least 2 distinct query vectors".into(),
        ));
    }

    let upper = MAX_AUTO_CLUSTERS.min(distinct.len() - 1);
    if upper < 2 {
        // Exactly two distinct vectors: nothing to score, two clusters.
        return Ok(2);
    }

    let mut best = (2, f32::NEG_INFINITY);
    for candidate in 2..=upper {
        let clustering = kmeans(vectors, distinct, candidate);
        let score = silhouette(vectors, &clustering);
        debug!("k={candidate}: silhouette={score:.4}");
        if score > best.1 {
            best = (candidate, score);
        }
    }
    debug!("Auto-detected k={} (silhouette={:.4})", best.0, best.1);
    Ok(best.0)
}

/// Standard iterative k-means with deterministic seeding: centroids start
/// at evenly spaced distinct vectors, so reruns over the same input are
/// bit-identical.
fn kmeans(vectors: &[Array1<f32>], distinct: &[Array1<f32>], k: usize) -> Clustering {
    let mut centroids: Vec<Array1<f32>> = (0..k)
        .map(|i| distinct[i * distinct.len() / k].clone())
        .collect();

    let mut assignments = assign(vectors, &centroids);
    for _ in 0..MAX_ITERATIONS {
        recompute_centroids(vectors, &assignments, &mut centroids);
        let next = assign(vectors, &centroids);
        if next == assignments {
            break;
        }
        assignments = next;
    }

    Clustering {
        assignments,
        centroids,
    }
}

fn assign(vectors: &[Array1<f32>], centroids: &[Array1<f32>]) -> Vec<usize> {
    vectors
        .iter()
        .map(|v| {
            let mut best = (0, f32::INFINITY);
            for (i, c) in centroids.iter().enumerate() {
                let d = distance_sq(v, c);
                if d < best.1 {
                    best = (i, d);
                }
            }
            best.0
        })
        .collect()
}

/// Mean of each cluster's members; an empty cluster keeps its previous
/// centroid.
fn recompute_centroids(
    vectors: &[Array1<f32>],
    assignments: &[usize],
    centroids: &mut [Array1<f32>],
) {
    for (cluster, centroid) in centroids.iter_mut().enumerate() {
        let members: Vec<&Array1<f32>> = vectors
            .iter()
            .zip(assignments)
            .filter(|(_, a)| **a == cluster)
            .map(|(v, _)| v)
            .collect();
        if members.is_empty() {
            continue;
        }
        let mut sum = Array1::<f32>::zeros(centroid.len());
        for member in &members {
            sum += *member;
        }
        *centroid = sum / members.len() as f32;
    }
}

fn distance_sq(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

fn distance(a: &Array1<f32>, b: &Array1<f32>) -> f32 {
    distance_sq(a, b).sqrt()
}

/// Mean silhouette coefficient over all points. Points in singleton
/// clusters score zero by convention.
fn silhouette(vectors: &[Array1<f32>], clustering: &Clustering) -> f32 {
    let k = clustering.num_clusters();
    let n = vectors.len();
    if n == 0 || k < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for (i, v) in vectors.iter().enumerate() {
        let own = clustering.assignments[i];

        // Mean distance to each cluster, excluding self from its own.
        let mut sums = vec![0.0f32; k];
        let mut counts = vec![0usize; k];
        for (j, other) in vectors.iter().enumerate() {
            if i == j {
                continue;
            }
            let cluster = clustering.assignments[j];
            sums[cluster] += distance(v, other);
            counts[cluster] += 1;
        }

        if counts[own] == 0 {
            continue; // singleton: contributes 0
        }
        let a = sums[own] / counts[own] as f32;
        let b = (0..k)
            .filter(|c| *c != own && counts[*c] > 0)
            .map(|c| sums[c] / counts[c] as f32)
            .fold(f32::INFINITY, f32::min);
        if !b.is_finite() {
            continue;
        }
        total += (b - a) / a.max(b);
    }
    total / n as f32
}

/// First occurrence of each distinct vector, in input order.
fn distinct_vectors(vectors: &[Array1<f32>]) -> Vec<Array1<f32>> {
    let mut distinct: Vec<Array1<f32>> = Vec::new();
    for v in vectors {
        if !distinct.iter().any(|d| d == v) {
            distinct.push(v.clone());
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_vectors_yield_zero_clusters() {
        let clustering = cluster_vectors(&[], ClusterCount::Fixed(3)).unwrap();
        assert!(clustering.assignments.is_empty());
        assert_eq!(clustering.num_clusters(), 0);
    }

    #[test]
    fn test_single_vector_is_one_trivial_cluster() {
        let clustering =
            cluster_vectors(&[array![0.5, 0.5]], ClusterCount::Fixed(4)).unwrap();
        assert_eq!(clustering.assignments, vec![0]);
        assert_eq!(clustering.num_clusters(), 1);
        assert_eq!(clustering.centroids[0], array![0.5, 0.5]);
    }

    #[test]
    fn test_fixed_k_groups_near_identical_pairs() {
        let vectors = vec![
            array![0.10, 0.20],
            array![0.11, 0.21],
            array![0.90, 0.80],
            array![0.91, 0.81],
            array![0.12, 0.19],
        ];
        let clustering = cluster_vectors(&vectors, ClusterCount::Fixed(2)).unwrap();
        assert_eq!(clustering.num_clusters(), 2);
        let a = &clustering.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[2], a[3]);
        assert_eq!(a[0], a[4]);
        assert_ne!(a[0], a[2]);
    }

    #[test]
    fn test_fixed_k_is_deterministic() {
        let vectors = vec![
            array![0.1, 0.2],
            array![0.9, 0.8],
            array![0.4, 0.5],
            array![0.7, 0.6],
        ];
        let first = cluster_vectors(&vectors, ClusterCount::Fixed(2)).unwrap();
        let second = cluster_vectors(&vectors, ClusterCount::Fixed(2)).unwrap();
        assert_eq!(first.assignments, second.assignments);
    }

    #[test]
    fn test_auto_detects_two_well_separated_groups() {
        let vectors = vec![
            array![0.0, 0.0],
            array![0.1, 0.0],
            array![0.0, 0.1],
            array![5.0, 5.0],
            array![5.1, 5.0],
            array![5.0, 5.1],
        ];
        let clustering = cluster_vectors(&vectors, ClusterCount::Auto).unwrap();
        assert_eq!(clustering.num_clusters(), 2);
        let a = &clustering.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[4], a[5]);
        assert_ne!(a[0], a[3]);
    }

    #[test]
    fn test_auto_with_identical_vectors_is_insufficient() {
        let vectors = vec![array![0.5, 0.5]; 4];
        let err = cluster_vectors(&vectors, ClusterCount::Auto).unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }

    #[test]
    fn test_mixed_dimensions_are_rejected() {
        let vectors = vec![
            array![0.1, 0.2, 0.3],
            array![0.4, 0.5],
            array![0.6, 0.7, 0.8],
            array![0.9, 1.0],
        ];
        let err = cluster_vectors(&vectors, ClusterCount::Fixed(2)).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_fixed_k_clamped_to_distinct_count() {
        let vectors = vec![array![0.1, 0.1], array![0.1, 0.1], array![0.9, 0.9]];
        let clustering = cluster_vectors(&vectors, ClusterCount::Fixed(5)).unwrap();
        assert_eq!(clustering.num_clusters(), 2);
        assert_eq!(clustering.assignments[0], clustering.assignments[1]);
    }
}
