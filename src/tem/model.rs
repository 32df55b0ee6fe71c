use derive_more::{AsRef, Deref, Display, From, Into, IntoIterator};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TopicError};

/// Part-of-speech tag the noun extractor selects on.
pub const NOUN_TAG: &str = "NOUN";

/// A business review as handed over by the annotation step.
///
/// Only the annotation tokens are interpreted here; every other field is kept
/// verbatim in `extra` so the record can be passed on to storage unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,

    /// Written by [`super::topics::TopicModeller::determine_topics`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Review {
    pub fn new(tokens: Tokens) -> Self {
        Self {
            annotation: Some(Annotation {
                tokens: Some(tokens),
                extra: Map::new(),
            }),
            ..Default::default()
        }
    }

    /// The syntax tokens of this review, or an upstream error if the
    /// annotation step didn't attach them.
    pub fn tokens(&self) -> Result<&Tokens> {
        self.annotation
            .as_ref()
            .ok_or_else(|| TopicError::upstream("review has no annotation"))?
            .tokens
            .as_ref()
            .ok_or_else(|| TopicError::upstream("review annotation has no tokens"))
    }
}

/// Parse a JSON array of reviews. Anything that isn't one, including tokens
/// without a lemma or tag, is an upstream error.
pub fn parse_reviews(json: &str) -> Result<Vec<Review>> {
    serde_json::from_str(json)
        .map_err(|e| TopicError::upstream(format!("not a JSON array of reviews: {}", e)))
}

/// Annotation record attached by the language service. Sentiment, entities
/// and friends ride along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Tokens>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub lemma: String,
    pub part_of_speech: PartOfSpeech,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    pub fn new(lemma: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            lemma: lemma.into(),
            part_of_speech: PartOfSpeech {
                tag: tag.into(),
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.part_of_speech.tag
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOfSpeech {
    pub tag: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    From,
    IntoIterator,
    AsRef,
    Deref,
)]
#[serde(transparent)]
#[into_iterator(owned, ref)]
#[deref(forward)]
#[as_ref(forward)]
pub struct Tokens(Vec<Token>);

impl FromIterator<Token> for Tokens {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Space-joined lowercased noun lemmas of one review.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Display, From, Into, AsRef, Deref, Serialize,
)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct NounDocument(String);

impl From<&str> for NounDocument {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl NounDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
