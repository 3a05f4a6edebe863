//! Retrieval-augmented answering over the governed clients.

use civic_core::{FallbackReason, RetrievedDocument};
use civic_error::CivicResult;
use civic_interface::{DocumentRetriever, MetadataFilter};
use civic_models::{GovernedEmbeddingClient, GovernedLlmClient};
use civic_rate_limit::ModelProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Answer given when retrieval finds nothing.
pub const NO_RESULTS_ANSWER: &str = "I couldn't find specific information about that. Please try rephrasing your question about NYC services.";

/// Characters of document text shown in a source preview.
pub const SOURCE_PREVIEW_CHARS: usize = 200;

/// Completion token limit for routed questions.
const ANSWER_MAX_TOKENS: u32 = 300;

/// Share of total tokens assumed to be input when only a total is known.
const INPUT_SHARE: f64 = 0.7;

/// A document as shown alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Text preview, truncated with `...`
    pub text: String,
    /// Service tag, or `Unknown`
    pub service: String,
    /// Source label, or `Unknown document`
    pub source: String,
    /// Retrieval similarity
    pub score: f32,
}

impl From<&RetrievedDocument> for SourceInfo {
    fn from(doc: &RetrievedDocument) -> Self {
        let text = if doc.text.chars().count() > SOURCE_PREVIEW_CHARS {
            let preview: String = doc.text.chars().take(SOURCE_PREVIEW_CHARS).collect();
            format!("{}...", preview)
        } else {
            doc.text.clone()
        };
        Self {
            text,
            service: doc.service().unwrap_or("Unknown").to_string(),
            source: doc
                .metadata
                .get("source")
                .cloned()
                .unwrap_or_else(|| "Unknown document".to_string()),
            score: doc.score.unwrap_or(0.0),
        }
    }
}

/// Timing and accounting for one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagMeta {
    /// Wall time for the whole answer
    pub latency_ms: u64,
    /// Model that answered, `mock-fallback-*`, or `no_results`
    pub model: String,
    /// Documents requested from the retriever
    pub top_k: usize,
    /// Tokens charged for the answer
    pub tokens_used: u64,
    /// Estimated spend in USD
    pub cost_estimate: f64,
    /// Served from the response cache
    pub from_cache: bool,
    /// Set when the fallback engine answered
    pub fallback_reason: Option<FallbackReason>,
}

/// Answer plus the documents behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    /// Answer text
    pub answer: String,
    /// Grounding documents, best first
    pub sources: Vec<SourceInfo>,
    /// Timing and accounting
    pub meta: RagMeta,
}

/// Cost of `tokens` assuming a 70/30 input/output split.
///
/// # Examples
///
/// ```
/// use civic::{ModelProfile, estimate_cost};
///
/// let profile = ModelProfile::new(300, 180_000)
///     .with_input_cost_per_1k(0.15)
///     .with_output_cost_per_1k(0.60);
/// let cost = estimate_cost(1000, &profile);
/// assert!((cost - 0.285).abs() < 1e-9);
/// ```
pub fn estimate_cost(tokens: u64, profile: &ModelProfile) -> f64 {
    let tokens = tokens as f64;
    (tokens * INPUT_SHARE * profile.input_cost_per_1k
        + tokens * (1.0 - INPUT_SHARE) * profile.output_cost_per_1k)
        / 1000.0
}

/// Embeds a question, retrieves documents and answers from them.
pub struct RagRouter {
    llm: GovernedLlmClient,
    embeddings: GovernedEmbeddingClient,
    retriever: Arc<dyn DocumentRetriever>,
}

impl RagRouter {
    /// Creates a router.
    pub fn new(
        llm: GovernedLlmClient,
        embeddings: GovernedEmbeddingClient,
        retriever: Arc<dyn DocumentRetriever>,
    ) -> Self {
        Self {
            llm,
            embeddings,
            retriever,
        }
    }

    /// The chat client.
    pub fn llm(&self) -> &GovernedLlmClient {
        &self.llm
    }

    /// The embedding client.
    pub fn embeddings(&self) -> &GovernedEmbeddingClient {
        &self.embeddings
    }

    /// Answers `question` from at most `top_k` documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Capacity-wait timeouts, unconfigured models and retriever failures.
    #[instrument(skip(self, question, filter))]
    pub async fn answer(
        &self,
        question: &str,
        top_k: usize,
        filter: &MetadataFilter,
    ) -> CivicResult<RagAnswer> {
        let start = Instant::now();

        let batch = self.embeddings.embed(&[question.to_string()]).await?;
        let documents = match batch.vectors.first() {
            Some(vector) => self.retriever.query(vector, top_k, filter).await?,
            None => Vec::new(),
        };

        if documents.is_empty() {
            info!("No documents retrieved");
            return Ok(RagAnswer {
                answer: NO_RESULTS_ANSWER.to_string(),
                sources: Vec::new(),
                meta: RagMeta {
                    latency_ms: start.elapsed().as_millis() as u64,
                    model: "no_results".to_string(),
                    top_k,
                    tokens_used: 0,
                    cost_estimate: 0.0,
                    from_cache: false,
                    fallback_reason: None,
                },
            });
        }

        let completion = self
            .llm
            .generate(question, &documents, ANSWER_MAX_TOKENS, None)
            .await?;

        let cost_estimate = if completion.is_fallback() {
            0.0
        } else {
            self.llm
                .governance()
                .config()
                .profile(&completion.model)
                .map(|profile| estimate_cost(completion.tokens_used, profile))
                .unwrap_or(0.0)
        };

        let meta = RagMeta {
            latency_ms: start.elapsed().as_millis() as u64,
            model: completion.model,
            top_k,
            tokens_used: completion.tokens_used,
            cost_estimate,
            from_cache: completion.from_cache,
            fallback_reason: completion.fallback_reason,
        };
        info!(model = %meta.model, latency_ms = meta.latency_ms, "Answered question");

        Ok(RagAnswer {
            answer: completion.text,
            sources: documents.iter().map(SourceInfo::from).collect(),
            meta,
        })
    }
}
