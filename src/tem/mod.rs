pub mod catalog;
pub mod embeddings;
pub mod kmeans;
pub mod model;
pub mod namer;
pub mod nouns;
pub mod selector;
pub mod topics;
