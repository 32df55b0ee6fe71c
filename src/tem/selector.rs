use ndarray::prelude::*;
use tracing::info;

use super::kmeans::{Clustering, CosineKMeans, DEFAULT_MAX_ITERATIONS, DEFAULT_SEED};
use crate::error::{Result, TopicError};

/// Cluster counts tried when nothing else is configured.
pub const DEFAULT_CANDIDATE_CLUSTER_COUNTS: [usize; 2] = [5, 10];

/// The winning cluster count and the run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub k: usize,
    pub score: f32,
    /// Silhouette score of every candidate, in candidate order.
    pub scores: Vec<(usize, f32)>,
    pub clustering: Clustering,
}

/// Runs [`CosineKMeans`] for each candidate k and keeps the one with the best
/// silhouette coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSelector {
    candidates: Vec<usize>,
    max_iterations: usize,
    seed: u64,
}

impl Default for ClusterSelector {
    fn default() -> Self {
        Self {
            candidates: DEFAULT_CANDIDATE_CLUSTER_COUNTS.to_vec(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
        }
    }
}

impl ClusterSelector {
    /// Fails if `candidates` is empty or holds a k below 2, since a
    /// silhouette needs at least two clusters to compare.
    pub fn new(candidates: Vec<usize>) -> Result<Self> {
        validate_candidates(&candidates)?;
        Ok(Self {
            candidates,
            ..Default::default()
        })
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn candidates(&self) -> &[usize] {
        &self.candidates
    }

    /// Cluster `points` with every candidate k. Runs are deterministic for a
    /// given seed, so the winner's run is returned as-is rather than repeated.
    /// Equal scores resolve to the earliest candidate. A run the silhouette
    /// can't score fails the whole selection.
    pub fn select(&self, points: ArrayView2<f32>) -> Result<Selection> {
        let mut scores = Vec::with_capacity(self.candidates.len());
        let mut best: Option<(usize, f32, Clustering)> = None;

        for &k in &self.candidates {
            let clustering = CosineKMeans::new(k)
                .with_max_iterations(self.max_iterations)
                .with_seed(self.seed)
                .fit(points)?;
            let score = silhouette(points, &clustering.assignments)?;
            info!(k, score, "{} clusters yields {} silhouette score", k, score);
            scores.push((k, score));

            let better = match &best {
                None => true,
                Some((_, best_score, _)) => rank(score) > rank(*best_score),
            };
            if better {
                best = Some((k, score, clustering));
            }
        }

        let (k, score, clustering) =
            best.ok_or_else(|| TopicError::configuration("no candidate cluster counts"))?;
        info!(k, score, "Optimal clusters is {} with silhouette score {}", k, score);
        Ok(Selection {
            k,
            score,
            scores,
            clustering,
        })
    }
}

pub(crate) fn validate_candidates(candidates: &[usize]) -> Result<()> {
    if candidates.is_empty() {
        return Err(TopicError::configuration(
            "candidate cluster counts must not be empty",
        ));
    }
    if let Some(k) = candidates.iter().find(|&&k| k < 2) {
        return Err(TopicError::configuration(format!(
            "candidate cluster count {} is below 2",
            k
        )));
    }
    Ok(())
}

/// Mean silhouette coefficient (Euclidean) of `assignments` over `points`.
///
/// A point alone in its cluster scores 0. The score is only defined for 2 to
/// `n - 1` occupied clusters; anything else is a configuration error.
pub fn silhouette(points: ArrayView2<f32>, assignments: &[usize]) -> Result<f32> {
    let n = points.nrows();
    if assignments.len() != n {
        return Err(TopicError::configuration(format!(
            "{} assignments for {} points",
            assignments.len(),
            n
        )));
    }
    let clusters = assignments.iter().max().map_or(0, |&c| c + 1);
    let mut sizes = vec![0usize; clusters];
    for &c in assignments {
        sizes[c] += 1;
    }
    let occupied = sizes.iter().filter(|&&size| size > 0).count();
    if occupied < 2 || occupied >= n {
        return Err(TopicError::configuration(format!(
            "silhouette needs 2 to {} occupied clusters, got {}",
            n.saturating_sub(1),
            occupied
        )));
    }

    let mut total = 0.0f32;
    for (point, &own) in points.outer_iter().zip(assignments) {
        if sizes[own] == 1 {
            continue;
        }
        let mut sums = vec![0.0f32; clusters];
        for (other, &cluster) in points.outer_iter().zip(assignments) {
            let diff = &point - &other;
            sums[cluster] += diff.dot(&diff).sqrt();
        }
        let a = sums[own] / (sizes[own] - 1) as f32;
        let b = sums
            .iter()
            .zip(&sizes)
            .enumerate()
            .filter(|&(cluster, (_, &size))| cluster != own && size > 0)
            .map(|(_, (sum, &size))| sum / size as f32)
            .fold(f32::INFINITY, f32::min);
        let spread = a.max(b);
        if spread > 0.0 {
            total += (b - a) / spread;
        }
    }
    Ok(total / n as f32)
}

// NaN sorts below everything.
fn rank(score: f32) -> f32 {
    if score.is_nan() {
        f32::NEG_INFINITY
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two well separated groups of five points each, every point distinct.
    fn two_groups() -> Array2<f32> {
        array![
            [1.0, 0.1, 0.0, 0.0],
            [0.9, 0.0, 0.1, 0.0],
            [1.0, 0.0, 0.0, 0.1],
            [0.8, 0.1, 0.1, 0.0],
            [1.0, 0.05, 0.0, 0.05],
            [0.0, 0.0, 1.0, 0.1],
            [0.1, 0.0, 0.9, 0.0],
            [0.0, 0.1, 1.0, 0.0],
            [0.0, 0.0, 0.8, 0.1],
            [0.05, 0.05, 1.0, 0.0],
        ]
    }

    /// Two arcs of ten unit vectors, at 0..27 and 90..117 degrees.
    fn two_arcs() -> Array2<f32> {
        Array2::from_shape_fn((20, 2), |(i, j)| {
            let degrees = if i < 10 {
                3.0 * i as f32
            } else {
                90.0 + 3.0 * (i - 10) as f32
            };
            let radians = degrees.to_radians();
            if j == 0 { radians.cos() } else { radians.sin() }
        })
    }

    #[test]
    fn test_rejects_bad_candidates() {
        assert!(matches!(
            ClusterSelector::new(vec![]),
            Err(TopicError::Configuration(_))
        ));
        assert!(matches!(
            ClusterSelector::new(vec![2, 1]),
            Err(TopicError::Configuration(_))
        ));
        assert!(ClusterSelector::new(vec![2, 3]).is_ok());
    }

    #[test]
    fn test_default_candidates() {
        assert_eq!(ClusterSelector::default().candidates(), &[5, 10]);
    }

    #[test]
    fn test_selects_best_silhouette() {
        let points = two_groups();
        let selection = ClusterSelector::new(vec![2, 3, 4])
            .unwrap()
            .select(points.view())
            .unwrap();

        assert_eq!(selection.k, 2);
        assert_eq!(selection.scores.len(), 3);
        assert!(selection.scores.iter().all(|(_, s)| selection.score >= *s));
        assert_eq!(selection.clustering.k(), 2);
        assert_eq!(selection.clustering.assignments.len(), points.nrows());

        let a = &selection.clustering.assignments;
        assert!(a[..5].iter().all(|&c| c == a[0]));
        assert!(a[5..].iter().all(|&c| c == a[5]));
        assert_ne!(a[0], a[5]);
    }

    #[test]
    fn test_selected_k_is_a_candidate() {
        let points = two_groups();
        let candidates = vec![3, 5];
        let selection = ClusterSelector::new(candidates.clone())
            .unwrap()
            .select(points.view())
            .unwrap();
        assert!(candidates.contains(&selection.k));
        let (_, best) = selection
            .scores
            .iter()
            .find(|(k, _)| *k == selection.k)
            .unwrap();
        assert!(selection.scores.iter().all(|(_, s)| best >= s));
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let points = two_groups();
        let selection = ClusterSelector::new(vec![2, 2])
            .unwrap()
            .select(points.view())
            .unwrap();
        assert_eq!(selection.scores[0].1, selection.scores[1].1);
        assert_eq!(selection.k, 2);
    }

    #[test]
    fn test_too_many_clusters_fails() {
        let points = two_groups();
        let result = ClusterSelector::new(vec![2, 11])
            .unwrap()
            .select(points.view());
        assert!(matches!(result, Err(TopicError::Configuration(_))));
    }

    #[test]
    fn test_silhouette_prefers_true_split() {
        let points = two_groups();
        let good = silhouette(points.view(), &[0, 0, 0, 0, 0, 1, 1, 1, 1, 1]).unwrap();
        let bad = silhouette(points.view(), &[0, 1, 0, 1, 0, 1, 0, 1, 0, 1]).unwrap();
        assert!(good > 0.5, "good split scored {}", good);
        assert!(good > bad);
    }

    #[test]
    fn test_singleton_clusters_score_zero() {
        let points = array![[0.0], [1.0], [10.0], [11.0]];
        let pairs = silhouette(points.view(), &[0, 0, 1, 1]).unwrap();
        let singletons = silhouette(points.view(), &[0, 0, 1, 2]).unwrap();
        assert!((pairs - 0.899749).abs() < 1e-5, "{}", pairs);
        // (0.9 + 8/9 + 0 + 0) / 4
        assert!((singletons - 0.447222).abs() < 1e-5, "{}", singletons);
    }

    #[test]
    fn test_silhouette_undefined_cluster_counts() {
        let points = array![[0.0], [1.0], [10.0], [11.0]];
        for assignments in [[0, 0, 0, 0], [3, 3, 3, 3], [0, 1, 2, 3]] {
            assert!(
                matches!(
                    silhouette(points.view(), &assignments),
                    Err(TopicError::Configuration(_))
                ),
                "{:?}",
                assignments
            );
        }
        assert!(matches!(
            silhouette(points.view(), &[0, 1]),
            Err(TopicError::Configuration(_))
        ));
    }

    #[test]
    fn test_many_singleton_clusters_do_not_win() {
        // With nineteen clusters over twenty points at most two points share a
        // cluster, so the score is at most 2/20 and the two arcs win.
        let points = two_arcs();
        let selection = ClusterSelector::new(vec![19, 2])
            .unwrap()
            .select(points.view())
            .unwrap();
        assert_eq!(selection.k, 2, "{:?}", selection.scores);
        assert!(selection.scores[0].1 <= 0.1 + 1e-6, "{:?}", selection.scores);
        assert!(selection.score > 0.5, "{:?}", selection.scores);
    }

    #[test]
    fn test_parallel_points_fail_selection() {
        let points = array![
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [4.0, 4.0],
            [5.0, 5.0],
            [6.0, 6.0],
        ];
        let result = ClusterSelector::new(vec![2, 5])
            .unwrap()
            .select(points.view());
        assert!(matches!(result, Err(TopicError::Configuration(_))));
    }
}
