//! Trait definitions for the Civic pipeline.
//!
//! The governed clients talk to the outside world only through these
//! traits: a metered chat provider, a metered embedding provider, a document
//! retriever and a confidence scorer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

pub use traits::{CompletionProvider, ConfidenceScorer, DocumentRetriever, EmbeddingProvider};
pub use types::{MetadataFilter, ProviderCompletion, ProviderEmbeddings};
