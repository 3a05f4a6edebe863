//! Default confidence heuristic.

use civic_core::RetrievedDocument;
use civic_interface::ConfidenceScorer;

/// Confidence from how many documents ground the answer.
///
/// `min(n / 3, 1)`, boosted by 20% when any document carries a service tag,
/// capped at 1. No documents means no confidence.
///
/// # Examples
///
/// ```
/// use civic_core::RetrievedDocument;
/// use civic_interface::ConfidenceScorer;
/// use civic_models::DocumentCountScorer;
///
/// let docs = vec![RetrievedDocument::new("a"), RetrievedDocument::new("b")];
/// let score = DocumentCountScorer.score(&docs);
/// assert!((score - 2.0 / 3.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCountScorer;

impl ConfidenceScorer for DocumentCountScorer {
    fn score(&self, documents: &[RetrievedDocument]) -> f64 {
        if documents.is_empty() {
            return 0.0;
        }
        let mut confidence = (documents.len() as f64 / 3.0).min(1.0);
        if documents.iter().any(|d| d.service().is_some()) {
            confidence *= 1.2;
        }
        confidence.min(1.0)
    }
}
