use derive_more::{From, Into, IntoIterator};
use ndarray::prelude::*;
use tracing::{debug, warn};

use super::kmeans::{argmax, normalize_rows};
use crate::error::{Result, TopicError};

/// Per-cluster topic names, indexed by cluster. `None` marks a cluster whose
/// best label fell below the similarity floor.
#[derive(Debug, Clone, Default, PartialEq, From, Into, IntoIterator)]
#[into_iterator(owned, ref)]
pub struct ClusterNames(Vec<Option<String>>);

impl ClusterNames {
    pub fn get(&self, cluster: usize) -> Option<&str> {
        self.0.get(cluster).and_then(|n| n.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Cosine similarity of every row of `a` against every row of `b`
/// (`a.nrows() x b.nrows()`). Zero rows are similar to nothing.
pub fn cosine_similarity(a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f32> {
    normalize_rows(a).dot(&normalize_rows(b).t())
}

/// For each row of `a`, the index of the most similar row of `b`, first
/// maximum winning. With a positive `min_similarity`, rows whose best
/// similarity is below it get `None`.
pub fn most_similar_indices(
    a: ArrayView2<f32>,
    b: ArrayView2<f32>,
    min_similarity: f32,
) -> Vec<Option<usize>> {
    cosine_similarity(a, b)
        .outer_iter()
        .map(|similarities| {
            let best = argmax(similarities);
            let similarity = similarities[best];
            if min_similarity > 0.0 && (similarity.is_nan() || similarity < min_similarity) {
                None
            } else {
                Some(best)
            }
        })
        .collect()
}

/// Name each centroid after its most similar label.
/// - `centroids`: one row per cluster.
/// - `label_vectors`: embeddings of `labels`, in the same order.
/// - `min_similarity`: similarity floor; `0.0` disables it.
pub fn name_clusters(
    centroids: ArrayView2<f32>,
    label_vectors: ArrayView2<f32>,
    labels: &[String],
    min_similarity: f32,
) -> Result<ClusterNames> {
    if labels.is_empty() {
        warn!(
            clusters = centroids.nrows(),
            "No candidate labels; clusters stay unnamed"
        );
        return Ok(vec![None; centroids.nrows()].into());
    }
    if label_vectors.nrows() != labels.len() {
        return Err(TopicError::model(format!(
            "{} label embeddings for {} labels",
            label_vectors.nrows(),
            labels.len()
        )));
    }
    if label_vectors.ncols() != centroids.ncols() {
        return Err(TopicError::model(format!(
            "label embeddings have {} dimensions, centroids have {}",
            label_vectors.ncols(),
            centroids.ncols()
        )));
    }

    let names = most_similar_indices(centroids, label_vectors, min_similarity)
        .into_iter()
        .map(|i| i.map(|i| labels[i].clone()))
        .collect::<Vec<Option<String>>>();
    debug!(?names, "Named clusters");
    Ok(names.into())
}
