//! Retrieved document type.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A document returned by the retrieval collaborator.
///
/// The governance layer only reads these; metadata keys of interest are
/// `source` and `service`.
///
/// # Examples
///
/// ```
/// use civic_core::RetrievedDocument;
///
/// let doc = RetrievedDocument::new("Apply online at the state portal.")
///     .with_metadata("source", "snap_guide.pdf")
///     .with_metadata("service", "snap");
///
/// assert_eq!(doc.source(), "snap_guide.pdf");
/// assert_eq!(doc.service(), Some("snap"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Chunk text
    pub text: String,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Similarity score assigned by the retriever
    #[serde(default)]
    pub score: Option<f32>,
}

impl RetrievedDocument {
    /// Creates a document with no metadata.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Adds one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the similarity score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Source label, or `"unknown"`.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Service tag, when present and non-empty.
    pub fn service(&self) -> Option<&str> {
        self.metadata
            .get("service")
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}
