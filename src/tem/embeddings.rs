use derive_more::{Display, From};
use ndarray::prelude::*;
use rust_bert::pipelines::sentence_embeddings::{self, SentenceEmbeddingsModel};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use tch::Device;
use tracing::{debug, info};

use crate::error::{Result, TopicError};

/// Maps text to fixed-width vectors. Implementations are loaded once and
/// shared across every batch the process handles.
pub trait Embedder {
    /// One vector per input text, in input order.
    fn embed(&self, texts: &[&str]) -> Result<Embeddings>;
}

/// [`Embedder`] backed by a `rust_bert` sentence-embeddings pipeline.
pub struct SentenceEmbedder {
    model: SentenceEmbeddingsModel,
    model_type: SentenceEmbeddingsModelType,
}

impl SentenceEmbedder {
    /// Fetch (or reuse the cached copy of) `model_type` and load it on `device`.
    pub fn load(model_type: SentenceEmbeddingsModelType, device: ComputeDevice) -> Result<Self> {
        let model = sentence_embeddings::SentenceEmbeddingsBuilder::remote(model_type.into())
            .with_device(device.into())
            .create_model()
            .map_err(|e| TopicError::model(format!("loading {}: {}", model_type, e)))?;
        info!(model = %model_type, device = %device, "Loaded sentence embedding model");
        Ok(Self { model, model_type })
    }
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Embeddings> {
        if texts.is_empty() {
            return Ok(Embeddings::default());
        }
        let embeddings: Embeddings = self
            .model
            .encode(texts)
            .map(Embeddings::from)
            .map_err(|e| TopicError::model(format!("encoding with {}: {}", self.model_type, e)))?;
        debug!(
            count = texts.len(),
            shape = %embeddings.shape()?,
            "Computed sentence embeddings"
        );
        Ok(embeddings)
    }
}

// ========================================================================
// Types

#[derive(Debug, Clone, Copy, PartialEq, Eq, From, Display)]
#[display("{{ rows:{} columns:{} }}", self.0.0, self.0.1)]
pub struct Shape((usize, usize));

impl Shape {
    pub fn rows(&self) -> usize {
        self.0.0
    }

    pub fn columns(&self) -> usize {
        self.0.1
    }
}

/// Newtype wrapper around Embeddings.
/// Wraps a [`Vec<Vec<f32>>`], one row per embedded text.
#[derive(Debug, Clone, Default, From, PartialEq)]
pub struct Embeddings(Vec<Vec<f32>>);

impl Embeddings {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The shape of this Embeddings instance. Ragged rows are an error: the
    /// backend is expected to produce fixed-width vectors.
    pub fn shape(&self) -> Result<Shape> {
        let columns = self.0.first().map(Vec::len).unwrap_or(0);
        if let Some(row) = self.0.iter().position(|e| e.len() != columns) {
            return Err(TopicError::model(format!(
                "embedding {} has {} dimensions, expected {}",
                row,
                self.0[row].len(),
                columns
            )));
        }
        Ok((self.0.len(), columns).into())
    }

    /// Convert into an `Array2` with one row per embedding.
    pub fn as_ndarray(&self) -> Result<Array2<f32>> {
        let shape = self.shape()?;
        let flattened = self.0.iter().flatten().copied().collect::<Vec<f32>>();
        Ok(Array2::from_shape_vec(shape.0, flattened)?)
    }
}

/// Where the embedding model runs.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    IntoStaticStr,
    EnumString,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComputeDevice {
    #[default]
    Cpu,
    /// First CUDA device, falling back to CPU if none is available.
    Cuda,
}

impl From<ComputeDevice> for Device {
    fn from(value: ComputeDevice) -> Self {
        match value {
            ComputeDevice::Cpu => Device::Cpu,
            ComputeDevice::Cuda => Device::cuda_if_available(),
        }
    }
}

/// Native enum that maps to a [`sentence_embeddings::SentenceEmbeddingsModelType`].
/// The foreign enum can't carry our serde / clap derives, so we mirror it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    Default,
    IntoStaticStr,
    EnumString,
    Display,
)]
pub enum SentenceEmbeddingsModelType {
    /// Multilingual; reviews come in whatever language the customer wrote.
    #[default]
    DistiluseBaseMultilingualCased,
    BertBaseNliMeanTokens,
    AllMiniLmL12V2,
    AllMiniLmL6V2,
    AllDistilrobertaV1,
    ParaphraseAlbertSmallV2,
    SentenceT5Base,
}

impl From<SentenceEmbeddingsModelType> for sentence_embeddings::SentenceEmbeddingsModelType {
    fn from(val: SentenceEmbeddingsModelType) -> Self {
        match val {
            SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased => {
                sentence_embeddings::SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased
            }
            SentenceEmbeddingsModelType::BertBaseNliMeanTokens => {
                sentence_embeddings::SentenceEmbeddingsModelType::BertBaseNliMeanTokens
            }
            SentenceEmbeddingsModelType::AllMiniLmL12V2 => {
                sentence_embeddings::SentenceEmbeddingsModelType::AllMiniLmL12V2
            }
            SentenceEmbeddingsModelType::AllMiniLmL6V2 => {
                sentence_embeddings::SentenceEmbeddingsModelType::AllMiniLmL6V2
            }
            SentenceEmbeddingsModelType::AllDistilrobertaV1 => {
                sentence_embeddings::SentenceEmbeddingsModelType::AllDistilrobertaV1
            }
            SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2 => {
                sentence_embeddings::SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2
            }
            SentenceEmbeddingsModelType::SentenceT5Base => {
                sentence_embeddings::SentenceEmbeddingsModelType::SentenceT5Base
            }
        }
    }
}

/// Deterministic stand-in embedder for tests: bag-of-words counts over a
/// fixed vocabulary, one dimension per word. Unknown words are ignored.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) struct VocabularyEmbedder {
        vocabulary: Vec<String>,
    }

    impl VocabularyEmbedder {
        pub(crate) fn new(vocabulary: &[&str]) -> Self {
            Self {
                vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            }
        }
    }

    impl Embedder for VocabularyEmbedder {
        fn embed(&self, texts: &[&str]) -> Result<Embeddings> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; self.vocabulary.len()];
                    for word in text.split_whitespace() {
                        if let Some(i) = self.vocabulary.iter().position(|w| w == word) {
                            v[i] += 1.0;
                        }
                    }
                    v
                })
                .collect::<Vec<Vec<f32>>>()
                .into())
        }
    }

    /// Always fails, as a backend that can't be reached would.
    pub(crate) struct UnavailableEmbedder;

    impl Embedder for UnavailableEmbedder {
        fn embed(&self, _texts: &[&str]) -> Result<Embeddings> {
            Err(TopicError::model("backend offline"))
        }
    }
}
