//! K-Means training, majority labelling and nearest-centroid validation

use crate::config::TrainConfig;
use crate::data::PlayerDataset;
use crate::error::{Error, Result};
use linfa_nn::distance::{Distance, L2Dist};
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use std::collections::HashMap;

/// Label given to a cluster that received no training rows.
pub const UNCLASSIFIED: i64 = -1;

/// Centroids and row partition produced by Lloyd iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// One centroid per row, `k x n_features`.
    pub centroids: Array2<f64>,
    /// Training-row indices per cluster, aligned with `centroids`.
    pub clusters: Vec<Vec<usize>>,
    /// Assign/update rounds performed.
    pub iterations: usize,
}

/// A trained model: centroids plus one majority price label per cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster centroids in raw feature space
    pub centroids: Array2<f64>,
    /// Training-row indices per cluster
    pub clusters: Vec<Vec<usize>>,
    /// Majority label per cluster, `UNCLASSIFIED` for empty clusters
    pub labels: Vec<i64>,
    /// Iterations the trainer needed to converge
    pub iterations: usize,
}

impl KMeansModel {
    /// Predict the cluster index for a feature vector
    pub fn predict(&self, features: &Array1<f64>) -> Result<usize> {
        nearest_centroid(&self.centroids, features.view()).map(|(idx, _)| idx)
    }

    /// Get cluster sizes
    pub fn cluster_sizes(&self) -> Vec<usize> {
        self.clusters.iter().map(Vec::len).collect()
    }

    /// Count validation rows whose true label matches their cluster's label.
    pub fn validate(&self, validation: &PlayerDataset) -> Result<usize> {
        classify(validation, &self.centroids, &self.labels)
    }
}

/// Euclidean distance between two feature vectors.
#[inline]
pub fn euclidean_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    L2Dist.distance(a, b)
}

/// Index of the closest centroid, ties going to the lowest index.
fn nearest_index(centroids: &Array2<f64>, point: ArrayView1<f64>) -> (usize, f64) {
    let mut closest = 0;
    let mut min_distance = f64::INFINITY;

    for (idx, centroid) in centroids.outer_iter().enumerate() {
        let distance = euclidean_distance(point, centroid);
        if distance < min_distance {
            min_distance = distance;
            closest = idx;
        }
    }

    (closest, min_distance)
}

/// Find the nearest centroid to `point`, returning its index and distance.
pub fn nearest_centroid(centroids: &Array2<f64>, point: ArrayView1<f64>) -> Result<(usize, f64)> {
    if centroids.nrows() == 0 {
        return Err(Error::EmptyInput);
    }
    if centroids.ncols() != point.len() {
        return Err(Error::DimensionMismatch {
            expected: centroids.ncols(),
            found: point.len(),
        });
    }
    Ok(nearest_index(centroids, point))
}

fn assign_clusters(records: &Array2<f64>, centroids: &Array2<f64>) -> Vec<Vec<usize>> {
    let mut clusters = vec![Vec::new(); centroids.nrows()];
    for (i, row) in records.outer_iter().enumerate() {
        let (idx, _) = nearest_index(centroids, row);
        clusters[idx].push(i);
    }
    clusters
}

/// Recompute centroids as member means. Empty clusters keep their previous centroid.
fn update_centroids(
    records: &Array2<f64>,
    clusters: &[Vec<usize>],
    previous: &Array2<f64>,
) -> Array2<f64> {
    let mut updated = previous.clone();

    for (idx, members) in clusters.iter().enumerate() {
        match records.select(Axis(0), members).mean_axis(Axis(0)) {
            Some(mean) => updated.row_mut(idx).assign(&mean),
            None => log::debug!("cluster {} is empty, keeping its centroid", idx),
        }
    }

    updated
}

fn max_abs_delta(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Run Lloyd's k-means over a feature matrix.
///
/// Centroids start at the first `k` rows. Each iteration assigns every row
/// to its nearest centroid and moves each non-empty cluster's centroid to
/// the mean of its rows. Training stops once no coordinate moves by more
/// than `config.tolerance`, and fails with [`Error::DidNotConverge`] after
/// `config.max_iters` iterations.
pub fn fit_kmeans(records: &Array2<f64>, config: &TrainConfig) -> Result<KMeansFit> {
    config.validate()?;

    let n_rows = records.nrows();
    if n_rows == 0 || records.ncols() == 0 {
        return Err(Error::EmptyInput);
    }
    if config.k == 0 || config.k > n_rows {
        return Err(Error::InvalidClusterCount {
            requested: config.k,
            n_rows,
        });
    }

    let mut centroids = records.slice(s![..config.k, ..]).to_owned();
    let mut max_delta = f64::INFINITY;

    for iteration in 1..=config.max_iters {
        let clusters = assign_clusters(records, &centroids);
        let updated = update_centroids(records, &clusters, &centroids);
        max_delta = max_abs_delta(&updated, &centroids);
        centroids = updated;

        log::debug!("iteration {}: max centroid delta {:e}", iteration, max_delta);

        if max_delta <= config.tolerance {
            log::info!(
                "k-means converged after {} iterations (k={}, rows={})",
                iteration,
                config.k,
                n_rows
            );
            return Ok(KMeansFit {
                centroids,
                clusters,
                iterations: iteration,
            });
        }
    }

    Err(Error::DidNotConverge {
        iterations: config.max_iters,
        max_delta,
    })
}

/// Majority label of one cluster: highest count, smallest label on ties.
pub fn majority_label(labels: impl IntoIterator<Item = i64>) -> Option<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(label_a, count_a), (label_b, count_b)| {
            count_a.cmp(count_b).then_with(|| label_b.cmp(label_a))
        })
        .map(|(label, _)| label)
}

/// One majority label per cluster, `UNCLASSIFIED` where a cluster is empty.
pub fn assign_labels(clusters: &[Vec<usize>], targets: &Array1<i64>) -> Vec<i64> {
    clusters
        .iter()
        .enumerate()
        .map(|(idx, members)| {
            majority_label(members.iter().map(|&i| targets[i])).unwrap_or_else(|| {
                log::warn!("cluster {} received no training rows", idx);
                UNCLASSIFIED
            })
        })
        .collect()
}

/// Count validation rows whose nearest centroid carries their true label.
pub fn classify(validation: &PlayerDataset, centroids: &Array2<f64>, labels: &[i64]) -> Result<usize> {
    if labels.len() != centroids.nrows() {
        return Err(Error::DimensionMismatch {
            expected: centroids.nrows(),
            found: labels.len(),
        });
    }

    let mut correct = 0;
    for (row, &truth) in validation
        .records()
        .outer_iter()
        .zip(validation.targets().iter())
    {
        let (idx, _) = nearest_centroid(centroids, row)?;
        if labels[idx] == truth {
            correct += 1;
        }
    }

    Ok(correct)
}

/// Fraction of `total` rows classified correctly; zero for an empty set.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64
    }
}

/// Fit k-means on a training matrix and label its clusters.
pub fn train(training: &PlayerDataset, config: &TrainConfig) -> Result<KMeansModel> {
    let fit = fit_kmeans(training.records(), config)?;
    let labels = assign_labels(&fit.clusters, training.targets());

    Ok(KMeansModel {
        n_clusters: config.k,
        centroids: fit.centroids,
        clusters: fit.clusters,
        labels,
        iterations: fit.iterations,
    })
}
