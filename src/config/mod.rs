mod paths;

use std::{
    fs,
    path::{Path, PathBuf},
};

use paths::{AppData, UserConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, TopicError},
    tem::{
        catalog::{CLUSTER_LABELS_FILE, DEFAULT_LABEL_CAP},
        embeddings::{ComputeDevice, SentenceEmbeddingsModelType},
        kmeans::{DEFAULT_MAX_ITERATIONS, DEFAULT_SEED},
        selector::{DEFAULT_CANDIDATE_CLUSTER_COUNTS, validate_candidates},
    },
};

pub const APP_NAME: &str = "temas";
pub const CONFIG_FILE: &str = "temas.toml";

/// Get or create a subdirectory under user config.
/// - [`subpath`]: If Some(P), a subdirectory will be created if necessary
///   and returned. If None, the root config directory will be returned.
pub fn get_or_create_user_config_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
    UserConfig::get_config_path(subpath)
}

/// Get or create a subdirectory in the app data dir.
/// - [`subpath`]: If Some(P), a subdirectory will be created if necessary
///   and returned. If None, the root app data directory will be returned.
pub fn get_or_create_app_data_path<P: AsRef<Path>>(subpath: Option<P>) -> Result<PathBuf> {
    AppData::get_data_path(subpath)
}

/// Tunables for topic assignment. Every field has a default, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    /// Cluster counts tried per batch; the best silhouette wins.
    pub candidate_cluster_counts: Vec<usize>,
    pub max_iterations: usize,
    pub seed: u64,
    /// Maximum number of candidate labels derived from a batch.
    pub label_cap: usize,
    /// Clusters less similar than this to every label stay unnamed. `0.0` disables.
    pub min_label_similarity: f32,
    /// Candidate label file. Defaults to `cluster_labels.txt` in the app data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels_file: Option<PathBuf>,
    pub model: SentenceEmbeddingsModelType,
    pub device: ComputeDevice,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            candidate_cluster_counts: DEFAULT_CANDIDATE_CLUSTER_COUNTS.to_vec(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            label_cap: DEFAULT_LABEL_CAP,
            min_label_similarity: 0.0,
            labels_file: None,
            model: SentenceEmbeddingsModelType::default(),
            device: ComputeDevice::default(),
        }
    }
}

impl TopicConfig {
    /// Load from `path` if given (it must exist), else from `temas.toml` in the
    /// user config dir if present, else defaults. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Some(get_or_create_user_config_path::<&Path>(None)?.join(CONFIG_FILE))
                .filter(|p| p.is_file()),
        };
        let config = match path {
            Some(p) => {
                debug!(path = %p.display(), "Loading configuration");
                Self::from_toml_str(&fs::read_to_string(&p)?)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TopicError::configuration(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        validate_candidates(&self.candidate_cluster_counts)?;
        if self.max_iterations == 0 {
            return Err(TopicError::configuration("max_iterations must be at least 1"));
        }
        if self.label_cap == 0 {
            return Err(TopicError::configuration("label_cap must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_label_similarity) {
            return Err(TopicError::configuration(format!(
                "min_label_similarity {} is outside [0, 1]",
                self.min_label_similarity
            )));
        }
        Ok(())
    }

    /// The configured label file, or the default one in the app data dir.
    pub fn labels_file(&self) -> Result<PathBuf> {
        match &self.labels_file {
            Some(p) => Ok(p.clone()),
            None => Ok(get_or_create_app_data_path::<&Path>(None)?.join(CLUSTER_LABELS_FILE)),
        }
    }
}
