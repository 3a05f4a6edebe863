//! In-memory vector retriever.

use async_trait::async_trait;
use civic_core::RetrievedDocument;
use civic_error::RetrievalError;
use civic_interface::{DocumentRetriever, MetadataFilter};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Cosine similarity of two vectors; `0.0` for mismatched or zero vectors.
///
/// # Examples
///
/// ```
/// use civic::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Brute-force retriever over documents held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRetriever {
    entries: Mutex<Vec<(Vec<f32>, RetrievedDocument)>>,
}

impl InMemoryRetriever {
    /// Empty retriever.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document under its embedding.
    pub fn insert(&self, embedding: Vec<f32>, document: RetrievedDocument) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((embedding, document));
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentRetriever for InMemoryRetriever {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        if embedding.is_empty() {
            return Err(RetrievalError::new("query embedding is empty"));
        }

        let mut scored: Vec<RetrievedDocument> = {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries
                .iter()
                .filter(|(_, doc)| {
                    filter
                        .iter()
                        .all(|(key, value)| doc.metadata.get(key) == Some(value))
                })
                .map(|(vector, doc)| doc.clone().with_score(cosine_similarity(embedding, vector)))
                .collect()
        };

        scored.sort_by(|a, b| b.score.unwrap_or(0.0).total_cmp(&a.score.unwrap_or(0.0)));
        scored.truncate(top_k);
        debug!(matched = scored.len(), top_k, "Retrieved documents");
        Ok(scored)
    }
}
