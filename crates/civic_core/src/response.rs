//! Typed responses produced by the governed clients.

use crate::FallbackReason;
use serde::{Deserialize, Serialize};

/// An answer to a chat request, real or substituted.
///
/// `model` names the provider model, or `mock-fallback-<category>` when the
/// fallback engine produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Answer text
    pub text: String,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Source labels of the grounding documents
    pub sources: Vec<String>,
    /// Tokens consumed (estimated for mocks)
    pub tokens_used: u64,
    /// Model that produced the answer
    pub model: String,
    /// Served from the response cache
    pub from_cache: bool,
    /// Set when the fallback engine produced the answer
    pub fallback_reason: Option<FallbackReason>,
    /// Fallback responses served since the last activation
    pub fallback_count: u64,
}

impl Completion {
    /// True when the fallback engine produced this answer.
    pub fn is_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Embedding vectors for a batch of texts.
///
/// Indices listed in `dropped` had malformed vectors and are absent from
/// `vectors`; the remaining vectors keep their input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingBatch {
    /// One vector per accepted input
    pub vectors: Vec<Vec<f32>>,
    /// Input positions whose vectors were rejected
    pub dropped: Vec<usize>,
    /// Model that produced the vectors
    pub model: String,
    /// Tokens consumed
    pub tokens_used: u64,
    /// Served from the response cache
    pub from_cache: bool,
    /// Set when the fallback engine produced the vectors
    pub fallback_reason: Option<FallbackReason>,
}

impl EmbeddingBatch {
    /// True when some inputs had no usable vector.
    pub fn is_partial(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Either kind of governed response, as stored in the response cache.
///
/// # Examples
///
/// ```
/// use civic_core::{Completion, GovernedResponse};
///
/// let response = GovernedResponse::Completion(Completion {
///     text: "Apply online.".to_string(),
///     confidence: 0.5,
///     sources: vec![],
///     tokens_used: 12,
///     model: "gpt-4o-mini".to_string(),
///     from_cache: false,
///     fallback_reason: None,
///     fallback_count: 0,
/// });
///
/// assert!(response.mark_cached().from_cache());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernedResponse {
    /// Chat completion
    Completion(Completion),
    /// Embedding batch
    Embeddings(EmbeddingBatch),
}

impl GovernedResponse {
    /// Returns the response with its cache flag set.
    pub fn mark_cached(mut self) -> Self {
        match &mut self {
            GovernedResponse::Completion(c) => c.from_cache = true,
            GovernedResponse::Embeddings(e) => e.from_cache = true,
        }
        self
    }

    /// Whether this response was served from the cache.
    pub fn from_cache(&self) -> bool {
        match self {
            GovernedResponse::Completion(c) => c.from_cache,
            GovernedResponse::Embeddings(e) => e.from_cache,
        }
    }

    /// Whether the fallback engine produced this response.
    pub fn is_fallback(&self) -> bool {
        match self {
            GovernedResponse::Completion(c) => c.fallback_reason.is_some(),
            GovernedResponse::Embeddings(e) => e.fallback_reason.is_some(),
        }
    }

    /// Unwraps into a completion, if this is one.
    pub fn into_completion(self) -> Option<Completion> {
        match self {
            GovernedResponse::Completion(c) => Some(c),
            GovernedResponse::Embeddings(_) => None,
        }
    }

    /// Unwraps into an embedding batch, if this is one.
    pub fn into_embeddings(self) -> Option<EmbeddingBatch> {
        match self {
            GovernedResponse::Embeddings(e) => Some(e),
            GovernedResponse::Completion(_) => None,
        }
    }
}
