use thiserror::Error;

/// Result alias for the topic subsystem.
pub type Result<T> = std::result::Result<T, TopicError>;

/// Everything that can abort a topic-assignment batch.
#[derive(Debug, Error)]
pub enum TopicError {
    /// Bad candidate cluster counts, k larger than the number of distinct
    /// points, or an otherwise unusable configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A review is missing the annotation fields we cluster on.
    #[error("upstream data error: {0}")]
    UpstreamData(String),

    /// The embedding backend failed to load or to encode.
    #[error("embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("embedding shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("unable to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl TopicError {
    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub(crate) fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamData(msg.into())
    }

    pub(crate) fn model(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }
}
