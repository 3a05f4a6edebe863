//! Prompt construction for grounded answers.

use civic_core::{Message, RetrievedDocument};

/// Longest system prompt sent, in characters.
pub const SYSTEM_PROMPT_LIMIT: usize = 2000;

/// Instructions framing every grounded answer.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for NYC government services. Your role is to provide accurate, clear, and actionable information about NYC services including:

- Unemployment Benefits
- SNAP (Food Stamps)
- Medicaid (Health Coverage)
- Cash Assistance
- Child Care Subsidy

Guidelines:
1. Base your responses ONLY on the provided context documents
2. If the context doesn't contain enough information, say so clearly
3. Provide step-by-step instructions when possible
4. Include relevant contact information or next steps
5. Be concise but comprehensive
6. Use plain, accessible language
7. If you're unsure about something, acknowledge the limitation

Your goal is to help users self-serve without needing human intervention.";

/// Renders retrieved documents as numbered context blocks.
///
/// # Examples
///
/// ```
/// use civic_core::RetrievedDocument;
/// use civic_models::format_context;
///
/// assert_eq!(format_context(&[]), "No relevant documents found.");
///
/// let doc = RetrievedDocument::new("Bring ID.").with_metadata("source", "snap.pdf");
/// assert_eq!(
///     format_context(&[doc]),
///     "Document 1 (Source: snap.pdf, Service: unknown):\nBring ID.\n"
/// );
/// ```
pub fn format_context(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return "No relevant documents found.".to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Document {} (Source: {}, Service: {}):\n{}\n",
                i + 1,
                doc.source(),
                doc.service().unwrap_or("unknown"),
                doc.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The user turn: question plus rendered context.
pub fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "User Query: {}\n\nRelevant Information:\n{}\n\nPlease provide a helpful, accurate response based on the information above. If the information is insufficient, clearly state what additional information would be needed.",
        query, context
    )
}

/// System and user messages for a grounded question.
pub fn build_messages(query: &str, documents: &[RetrievedDocument]) -> Vec<Message> {
    let system: String = SYSTEM_PROMPT.chars().take(SYSTEM_PROMPT_LIMIT).collect();
    vec![
        Message::system(system),
        Message::user(user_prompt(query, &format_context(documents))),
    ]
}
