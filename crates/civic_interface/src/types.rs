//! Values exchanged across the provider and retrieval boundaries.

use civic_core::TokenUsage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw chat completion returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCompletion {
    /// Generated text
    pub text: String,
    /// Provider-reported usage; `None` when the provider does not report it
    pub usage: Option<TokenUsage>,
}

/// Raw embedding vectors returned by a provider, one per input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEmbeddings {
    /// Vectors in input order
    pub vectors: Vec<Vec<f32>>,
    /// Provider-reported usage
    pub usage: Option<TokenUsage>,
}

/// Exact-match metadata constraints for retrieval.
pub type MetadataFilter = BTreeMap<String, String>;
