//! The `ask` command.

use civic::{
    Governance, GovernanceConfig, GovernedEmbeddingClient, GovernedLlmClient, InMemoryRetriever,
    MetadataFilter, OpenAiProvider, RagRouter, RetrievedDocument,
};
use std::path::Path;
use std::sync::Arc;

/// Indexes the documents file and answers `question` from it.
pub async fn run_ask(
    config: GovernanceConfig,
    question: &str,
    documents: &Path,
    top_k: usize,
    filters: Vec<(String, String)>,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(documents)?;
    let documents: Vec<RetrievedDocument> = serde_json::from_str(&raw)?;
    tracing::info!(count = documents.len(), "Loaded documents");

    let governance = Governance::from_config(config);
    let provider = Arc::new(OpenAiProvider::from_env());
    let llm = GovernedLlmClient::new(governance.clone(), provider.clone());
    let embeddings = GovernedEmbeddingClient::new(governance, provider);

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let batch = embeddings.embed(&texts).await?;

    let retriever = InMemoryRetriever::new();
    let kept = documents
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !batch.dropped.contains(i))
        .map(|(_, doc)| doc);
    for (vector, doc) in batch.vectors.into_iter().zip(kept) {
        retriever.insert(vector, doc);
    }
    tracing::debug!(indexed = retriever.len(), "Indexed documents");

    let router = RagRouter::new(llm, embeddings, Arc::new(retriever));
    let filter: MetadataFilter = filters.into_iter().collect();
    let answer = router.answer(question, top_k, &filter).await?;

    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}
