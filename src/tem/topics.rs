use tracing::{debug, info};

use super::{
    catalog::LabelCatalog,
    embeddings::{Embedder, SentenceEmbedder},
    model::{NounDocument, Review},
    namer::name_clusters,
    nouns::extract_nouns,
    selector::ClusterSelector,
};
use crate::{
    config::TopicConfig,
    error::{Result, TopicError},
};

/// End-to-end topic assignment: reviews in, reviews with a `topic` out.
///
/// The embedder is loaded once and reused for every batch. The label catalog
/// is derived from the first batch if nothing was persisted, then kept.
pub struct TopicModeller {
    embedder: Box<dyn Embedder>,
    catalog: LabelCatalog,
    selector: ClusterSelector,
    min_label_similarity: f32,
}

impl TopicModeller {
    pub fn new(
        embedder: Box<dyn Embedder>,
        catalog: LabelCatalog,
        selector: ClusterSelector,
    ) -> Self {
        Self {
            embedder,
            catalog,
            selector,
            min_label_similarity: 0.0,
        }
    }

    /// Name clusters only when their best label is at least this similar.
    pub fn with_min_label_similarity(mut self, min_label_similarity: f32) -> Self {
        self.min_label_similarity = min_label_similarity;
        self
    }

    /// Wire up the sentence-embedding backend, label catalog and selector
    /// described by `config`.
    pub fn from_config(config: &TopicConfig) -> Result<Self> {
        config.validate()?;
        let catalog = LabelCatalog::open(config.labels_file()?, config.label_cap)?;
        let embedder = SentenceEmbedder::load(config.model, config.device)?;
        Self::with_embedder(config, Box::new(embedder), catalog)
    }

    /// Like [`from_config`](Self::from_config) with a caller-supplied embedder and catalog.
    pub fn with_embedder(
        config: &TopicConfig,
        embedder: Box<dyn Embedder>,
        catalog: LabelCatalog,
    ) -> Result<Self> {
        let selector = ClusterSelector::new(config.candidate_cluster_counts.clone())?
            .with_max_iterations(config.max_iterations)
            .with_seed(config.seed);
        Ok(Self::new(embedder, catalog, selector)
            .with_min_label_similarity(config.min_label_similarity))
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    /// Cluster `reviews` and write each one's topic. Either every review gets
    /// its topic or the error is returned and no review is touched.
    pub fn determine_topics(&mut self, reviews: &mut [Review]) -> Result<()> {
        if reviews.is_empty() {
            return Ok(());
        }

        let nouns = reviews
            .iter()
            .enumerate()
            .map(|(i, review)| {
                review.tokens().map(extract_nouns).map_err(|e| match e {
                    TopicError::UpstreamData(msg) => {
                        TopicError::upstream(format!("review {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<NounDocument>>>()?;

        self.catalog.ensure(&nouns)?;

        let documents = nouns.iter().map(NounDocument::as_str).collect::<Vec<&str>>();
        let points = self.embedder.embed(&documents)?;
        if points.len() != reviews.len() {
            return Err(TopicError::model(format!(
                "{} embeddings for {} reviews",
                points.len(),
                reviews.len()
            )));
        }
        let points = points.as_ndarray()?;

        let selection = self.selector.select(points.view())?;

        let labels = self.catalog.labels();
        let label_refs = labels.iter().map(String::as_str).collect::<Vec<&str>>();
        let label_vectors = self.embedder.embed(&label_refs)?.as_ndarray()?;
        let names = name_clusters(
            selection.clustering.centroids.view(),
            label_vectors.view(),
            labels,
            self.min_label_similarity,
        )?;

        for (review, cluster) in reviews.iter_mut().zip(&selection.clustering.assignments) {
            review.topic = names.get(*cluster).map(str::to_owned);
        }
        info!(
            reviews = reviews.len(),
            k = selection.k,
            "Assigned topics"
        );
        debug!(?names, "Cluster names");
        Ok(())
    }
}
