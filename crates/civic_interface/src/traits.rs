//! Provider and collaborator traits.

use crate::{MetadataFilter, ProviderCompletion, ProviderEmbeddings};
use async_trait::async_trait;
use civic_core::{ChatRequest, RetrievedDocument};
use civic_error::{ProviderError, RetrievalError};

/// A metered chat-completion provider.
///
/// Implementations must report provider rate limiting as
/// `ProviderErrorKind::RateLimited` so it can be told apart from other
/// failures.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Perform one chat completion call.
    async fn complete(&self, request: &ChatRequest) -> Result<ProviderCompletion, ProviderError>;

    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &'static str;
}

/// A metered embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed each text with the given model.
    async fn embed(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<ProviderEmbeddings, ProviderError>;

    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &'static str;
}

/// Finds documents near a query embedding.
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Return at most `top_k` documents matching every filter entry,
    /// best first.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError>;
}

/// Scores how well a set of documents grounds an answer.
pub trait ConfidenceScorer: Send + Sync {
    /// Confidence in `[0, 1]`.
    fn score(&self, documents: &[RetrievedDocument]) -> f64;
}
