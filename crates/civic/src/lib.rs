//! Civic - governed answers about municipal services.
//!
//! Civic answers questions about city benefit programs (unemployment, SNAP,
//! Medicaid, cash assistance, child care) from retrieved documents, while
//! keeping every call to a metered LLM provider inside rate ceilings and
//! token budgets. When the provider is unavailable or a budget runs out,
//! answers come from a deterministic mock engine instead of an error.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use civic::{
//!     Governance, GovernanceConfig, GovernedEmbeddingClient, GovernedLlmClient,
//!     InMemoryRetriever, MetadataFilter, OpenAiProvider, RagRouter,
//! };
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let governance = Governance::from_config(GovernanceConfig::load()?);
//! let provider = Arc::new(OpenAiProvider::from_env());
//! let router = RagRouter::new(
//!     GovernedLlmClient::new(governance.clone(), provider.clone()),
//!     GovernedEmbeddingClient::new(governance, provider),
//!     Arc::new(InMemoryRetriever::new()),
//! );
//!
//! let answer = router
//!     .answer("How do I apply for SNAP?", 5, &MetadataFilter::new())
//!     .await?;
//! println!("{}", answer.answer);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `civic_error` - Error types
//! - `civic_core` - Messages, documents, responses, token estimation
//! - `civic_interface` - Provider and retriever traits
//! - `civic_rate_limit` - Usage tracking, budget gate, backoff, configuration
//! - `civic_cache` - Development response cache
//! - `civic_fallback` - Mock fallback engine
//! - `civic_models` - Governed chat and embedding clients
//!
//! This crate re-exports the public surface and adds the RAG router.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod retriever;
mod router;

pub use retriever::{InMemoryRetriever, cosine_similarity};
pub use router::{
    NO_RESULTS_ANSWER, RagAnswer, RagMeta, RagRouter, SOURCE_PREVIEW_CHARS, SourceInfo,
    estimate_cost,
};

pub use civic_cache::{CacheStats, ResponseCache, ResponseCacheConfig, key_for};
pub use civic_core::{
    ChatRequest, Completion, EmbeddingBatch, FallbackReason, GovernedResponse, Message,
    RetrievedDocument, Role, ServiceCategory, TokenUsage, estimate_message_tokens,
    estimate_tokens, init_tracing,
};
pub use civic_error::{
    CivicError, CivicErrorKind, CivicResult, ConfigError, GovernanceError, GovernanceErrorKind,
    ProviderError, ProviderErrorKind, RetrievalError,
};
pub use civic_fallback::{FallbackStatus, MockFallback};
pub use civic_interface::{
    CompletionProvider, ConfidenceScorer, DocumentRetriever, EmbeddingProvider, MetadataFilter,
    ProviderCompletion, ProviderEmbeddings,
};
pub use civic_models::{
    Governance, GovernanceStatus, GovernedEmbeddingClient, GovernedLlmClient, OpenAiProvider,
    RagRequest,
};
pub use civic_rate_limit::{
    BackoffPolicy, BudgetGate, BudgetSettings, Environment, GovernanceConfig, ModelProfile, UsageStats,
    UsageTracker,
};
