//! K-means over cosine distance.
//!
//! Points and centroids live on the unit sphere, so "nearest" is "largest dot
//! product" and a step's score is the within-cluster sum of squared distances
//! between unit points and their unit centroids (`2 * (1 - cos)` per point).
//!
//! Refinement stops early on diminishing returns: after each step the previous
//! score is divided by the current one, and iteration only continues while that
//! ratio exceeds [`IMPROVEMENT_RATIO`] (or no step has completed yet).

use ndarray::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::error::{Result, TopicError};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_SEED: u64 = 32;

/// Keep refining while `previous / current` is above this.
pub const IMPROVEMENT_RATIO: f32 = 1.1;

/// Unit rows closer than this in every component count as one direction.
const DIRECTION_TOLERANCE: f32 = 1e-6;

/// Output of one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster index in `[0, k)` for every input point, in input order.
    pub assignments: Vec<usize>,
    /// `k` unit-length centroids, one per row.
    pub centroids: Array2<f32>,
    /// Refinement steps actually run.
    pub iterations: usize,
    /// Score of the last step.
    pub score: f32,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CosineKMeans {
    k: usize,
    max_iterations: usize,
    seed: u64,
}

impl CosineKMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Partition the rows of `points` into exactly `k` clusters.
    pub fn fit(&self, points: ArrayView2<f32>) -> Result<Clustering> {
        if self.k == 0 {
            return Err(TopicError::configuration("k must be at least 1"));
        }
        if self.max_iterations == 0 {
            return Err(TopicError::configuration(
                "max_iterations must be at least 1",
            ));
        }
        let unit = normalize_rows(points);
        let distinct = count_distinct_directions(unit.view());
        if distinct < self.k {
            return Err(TopicError::configuration(format!(
                "cannot form {} clusters from {} distinct directions",
                self.k, distinct
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = self.init_centroids(unit.view(), &mut rng);

        let mut stop = EarlyStop::default();
        let mut score = 0.0f32;
        let mut iterations = 0;
        for i in 0..self.max_iterations {
            let assignments = assign(unit.view(), centroids.view());
            centroids = update_centroids(unit.view(), &assignments, centroids);
            score = within_cluster_score(unit.view(), &assignments, centroids.view());
            iterations = i + 1;
            debug!(k = self.k, iteration = i, score, "Sum of squared distances");

            if !stop.keep_going(score) {
                debug!(k = self.k, iteration = i, "Improvement below threshold, stopping");
                break;
            }
        }

        Ok(Clustering {
            assignments: assign(unit.view(), centroids.view()),
            centroids,
            iterations,
            score,
        })
    }

    /// k-means++ seeding with cosine distance.
    fn init_centroids(&self, unit: ArrayView2<f32>, rng: &mut StdRng) -> Array2<f32> {
        let n = unit.nrows();
        let mut centroids = Array2::zeros((self.k, unit.ncols()));

        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&unit.row(first));

        for c in 1..self.k {
            let weights = unit
                .outer_iter()
                .map(|p| {
                    (0..c)
                        .map(|j| cosine_distance(p, centroids.row(j)).powi(2))
                        .fold(f32::MAX, f32::min)
                })
                .collect::<Vec<f32>>();

            let total: f32 = weights.iter().sum();
            let chosen = if total > 0.0 {
                let threshold = rng.random::<f32>() * total;
                let mut cumulative = 0.0;
                weights
                    .iter()
                    .position(|w| {
                        cumulative += w;
                        cumulative >= threshold && *w > 0.0
                    })
                    .unwrap_or_else(|| weights.iter().rposition(|w| *w > 0.0).unwrap_or(0))
            } else {
                rng.random_range(0..n)
            };
            centroids.row_mut(c).assign(&unit.row(chosen));
        }
        centroids
    }
}

/// Diminishing-returns rule over successive step scores.
#[derive(Debug, Default)]
struct EarlyStop {
    previous: f32,
}

impl EarlyStop {
    /// Record `score`. False once it improves on the last recorded score by a
    /// ratio of [`IMPROVEMENT_RATIO`] or less.
    fn keep_going(&mut self, score: f32) -> bool {
        if self.previous == 0.0 || self.previous / score > IMPROVEMENT_RATIO {
            self.previous = score;
            true
        } else {
            false
        }
    }
}

/// Index of the most similar centroid for every row of `unit`. Ties go to the
/// lowest centroid index.
pub fn assign(unit: ArrayView2<f32>, centroids: ArrayView2<f32>) -> Vec<usize> {
    unit.dot(&centroids.t())
        .outer_iter()
        .map(argmax)
        .collect()
}

/// Mean of each cluster's members, renormalized. A cluster with no members
/// keeps its previous centroid.
fn update_centroids(
    unit: ArrayView2<f32>,
    assignments: &[usize],
    previous: Array2<f32>,
) -> Array2<f32> {
    let mut sums = Array2::<f32>::zeros(previous.raw_dim());
    let mut counts = vec![0usize; previous.nrows()];
    for (point, &cluster) in unit.outer_iter().zip(assignments) {
        let mut row = sums.row_mut(cluster);
        row += &point;
        counts[cluster] += 1;
    }

    let mut centroids = previous;
    for (cluster, count) in counts.into_iter().enumerate() {
        if count > 0 {
            let mean = sums.row(cluster).mapv(|v| v / count as f32);
            centroids.row_mut(cluster).assign(&normalized(mean.view()));
        }
    }
    centroids
}

fn within_cluster_score(
    unit: ArrayView2<f32>,
    assignments: &[usize],
    centroids: ArrayView2<f32>,
) -> f32 {
    unit.outer_iter()
        .zip(assignments)
        .map(|(point, &cluster)| {
            let diff = &point - &centroids.row(cluster);
            diff.dot(&diff)
        })
        .sum()
}

/// Position of the first maximum. NaN never wins.
pub(crate) fn argmax(values: ArrayView1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

pub(crate) fn normalized(v: ArrayView1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v.mapv(|x| x / norm)
    } else {
        v.to_owned()
    }
}

/// Each row scaled to unit length; all-zero rows stay zero.
pub(crate) fn normalize_rows(points: ArrayView2<f32>) -> Array2<f32> {
    let mut unit = points.to_owned();
    for mut row in unit.outer_iter_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|x| x / norm);
        }
    }
    unit
}

fn cosine_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f32 {
    1.0 - a.dot(&b)
}

/// Rows of `unit` that point in different directions. Parallel vectors of
/// different lengths normalize to the same row and count once.
fn count_distinct_directions(unit: ArrayView2<f32>) -> usize {
    let mut distinct: Vec<ArrayView1<f32>> = Vec::new();
    for row in unit.outer_iter() {
        let seen = distinct.iter().any(|d| {
            d.iter()
                .zip(row.iter())
                .all(|(a, b)| (a - b).abs() <= DIRECTION_TOLERANCE)
        });
        if !seen {
            distinct.push(row);
        }
    }
    distinct.len()
}
