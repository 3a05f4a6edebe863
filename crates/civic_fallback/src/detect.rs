//! Keyword heuristics for service detection.

use civic_core::{RetrievedDocument, ServiceCategory};
use std::str::FromStr;

const QUERY_KEYWORDS: &[(ServiceCategory, &[&str])] = &[
    (ServiceCategory::Unemployment, &["unemployment", "job loss", "benefits"]),
    (ServiceCategory::Snap, &["snap", "food stamps", "ebt"]),
    (ServiceCategory::Medicaid, &["medicaid", "health", "medical"]),
    (ServiceCategory::CashAssistance, &["cash assistance", "financial aid"]),
    (ServiceCategory::Childcare, &["childcare", "daycare", "child care"]),
];

const EMBEDDING_KEYWORDS: &[&[&str]] = &[
    &["unemployment", "job", "work"],
    &["snap", "food", "ebt"],
    &["medicaid", "health", "medical"],
    &["cash", "assistance", "financial"],
    &["childcare", "daycare", "child"],
];

/// Service category for a question.
///
/// Query keywords win; otherwise the first document whose `service`
/// metadata names a known category; otherwise `General`.
///
/// # Examples
///
/// ```
/// use civic_core::ServiceCategory;
/// use civic_fallback::detect_category;
///
/// assert_eq!(detect_category("How long do unemployment benefits last?", &[]), ServiceCategory::Unemployment);
/// assert_eq!(detect_category("Where is the office?", &[]), ServiceCategory::General);
/// ```
pub fn detect_category(query: &str, documents: &[RetrievedDocument]) -> ServiceCategory {
    let query = query.to_lowercase();
    for (category, keywords) in QUERY_KEYWORDS {
        if keywords.iter().any(|k| query.contains(k)) {
            return *category;
        }
    }

    documents
        .iter()
        .filter_map(|doc| doc.service())
        .find_map(|service| ServiceCategory::from_str(service).ok())
        .unwrap_or(ServiceCategory::General)
}

/// Embedding dimension (0-4) that marks a text's service category, if any.
pub fn embedding_indicator(text: &str) -> Option<usize> {
    let text = text.to_lowercase();
    EMBEDDING_KEYWORDS
        .iter()
        .position(|keywords| keywords.iter().any(|k| text.contains(k)))
}

/// Lead-in phrase for the intent a question expresses, if recognized.
pub fn intent_prefix(query: &str) -> Option<&'static str> {
    let query = query.to_lowercase();
    if query.contains("apply") {
        Some("To answer your question about applying: ")
    } else if query.contains("documents") || query.contains("paperwork") {
        Some("Regarding required documentation: ")
    } else if query.contains("status") || query.contains("check") {
        Some("To check your status: ")
    } else if query.contains("renew") {
        Some("For renewal information: ")
    } else {
        None
    }
}
