//! Topic clustering for business reviews.
//!
//! Reviews arrive already annotated with part-of-speech tagged tokens. The
//! [`tem`] module turns each review into a noun document, embeds it, clusters
//! the batch with cosine k-means, and names every cluster after the closest
//! label from a persisted candidate catalog.

pub mod config;
pub mod error;
pub mod tem;

pub use error::{Result, TopicError};
