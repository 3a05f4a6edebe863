//! Governed chat client.

use crate::{
    Admission, DocumentCountScorer, Governance, GovernanceMetrics, GovernedRequest, build_messages,
};
use civic_cache::key_for;
use civic_core::{
    ChatRequest, Completion, FallbackReason, GovernedResponse, RetrievedDocument, TokenUsage,
    estimate_message_tokens, estimate_tokens,
};
use civic_error::CivicResult;
use civic_interface::{CompletionProvider, ConfidenceScorer};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Task-hint words that justify the premium model.
pub const PREMIUM_HINT_KEYWORDS: [&str; 6] = [
    "deep",
    "legal",
    "multi-step",
    "strategy",
    "analysis",
    "complex",
];

/// One grounded question.
///
/// # Examples
///
/// ```
/// use civic_models::RagRequest;
///
/// let request = RagRequest::builder()
///     .query("What documents do I need for Medicaid?")
///     .task_hint("legal analysis")
///     .build()
///     .unwrap();
///
/// assert_eq!(request.max_tokens, 300);
/// assert!(request.documents.is_empty());
/// assert_eq!(request.allow_premium, None);
/// ```
#[derive(Debug, Clone, PartialEq, derive_builder::Builder)]
#[builder(setter(into))]
pub struct RagRequest {
    /// The user's question
    pub query: String,
    /// Retrieved grounding documents
    #[builder(default)]
    pub documents: Vec<RetrievedDocument>,
    /// Completion token limit
    #[builder(default = "300")]
    pub max_tokens: u32,
    /// Free-text description of the task, used for model choice
    #[builder(default, setter(into, strip_option))]
    pub task_hint: Option<String>,
    /// Overrides the configured premium permission
    #[builder(default, setter(into, strip_option))]
    pub allow_premium: Option<bool>,
}

impl RagRequest {
    /// Creates a new request builder.
    pub fn builder() -> RagRequestBuilder {
        RagRequestBuilder::default()
    }
}

/// Chat client that routes every call through [`Governance`].
pub struct GovernedLlmClient {
    governance: Governance,
    provider: Arc<dyn CompletionProvider>,
    scorer: Arc<dyn ConfidenceScorer>,
}

impl GovernedLlmClient {
    /// Creates a client scoring confidence by document count.
    pub fn new(governance: Governance, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            governance,
            provider,
            scorer: Arc::new(DocumentCountScorer),
        }
    }

    /// Replaces the confidence scorer.
    pub fn with_scorer(mut self, scorer: Arc<dyn ConfidenceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    /// The shared governance state.
    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    /// Picks the fast model unless premium is allowed and the hint asks
    /// for a complex task.
    pub fn choose_model(&self, task_hint: Option<&str>, allow_premium: Option<bool>) -> &str {
        let config = self.governance.config();
        let allowed = allow_premium.unwrap_or(config.allow_premium);
        let complex = task_hint.is_some_and(|hint| {
            let hint = hint.to_lowercase();
            PREMIUM_HINT_KEYWORDS.iter().any(|k| hint.contains(k))
        });
        if allowed && complex {
            &config.premium_model
        } else {
            &config.fast_model
        }
    }

    /// Answers `query` from `documents`.
    ///
    /// # Errors
    ///
    /// Only a capacity-wait timeout or an unconfigured model. Provider
    /// failures and exhausted budgets produce a fallback completion.
    pub async fn generate(
        &self,
        query: &str,
        documents: &[RetrievedDocument],
        max_tokens: u32,
        task_hint: Option<&str>,
    ) -> CivicResult<Completion> {
        let request = RagRequest {
            query: query.to_string(),
            documents: documents.to_vec(),
            max_tokens,
            task_hint: task_hint.map(str::to_string),
            allow_premium: None,
        };
        self.generate_request(&request).await
    }

    /// Answers a [`RagRequest`].
    ///
    /// # Errors
    ///
    /// See [`GovernedLlmClient::generate`].
    #[instrument(
        skip(self, request),
        fields(documents = request.documents.len(), max_tokens = request.max_tokens)
    )]
    pub async fn generate_request(&self, request: &RagRequest) -> CivicResult<Completion> {
        let config = self.governance.config();
        let model = self
            .choose_model(request.task_hint.as_deref(), request.allow_premium)
            .to_string();
        let messages = build_messages(&request.query, &request.documents);
        let prompt_tokens = estimate_message_tokens(&messages);
        let estimated = prompt_tokens + u64::from(request.max_tokens);

        let governed = GovernedRequest::new(model.clone(), "chat", estimated);
        let metrics = GovernanceMetrics::get();
        metrics.record_request(governed.kind, &model);
        debug!(model = %model, estimated, "Estimated chat request");

        let permit = match self.governance.admit(&model, estimated).await? {
            Admission::Proceed(permit) => permit,
            Admission::Fallback(reason) => return Ok(self.fallback(request, reason)),
        };

        let chat = ChatRequest {
            model: model.clone(),
            messages,
            max_tokens: request.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        };

        let key = key_for(&model, &chat.messages, &chat.params())?;
        if let Some(cached) = self
            .governance
            .cache()
            .get(&key)
            .and_then(GovernedResponse::into_completion)
        {
            permit.release();
            metrics.record_cache_hit(&model);
            debug!(model = %model, "Serving completion from cache");
            return Ok(cached);
        }

        let provider = self.provider.clone();
        let outcome = self
            .governance
            .call_provider(&governed, provider.provider_name(), || provider.complete(&chat))
            .await;

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                permit.release();
                let reason = self.governance.escalate(&e);
                return Ok(self.fallback(request, reason));
            }
        };

        let usage = reply
            .usage
            .unwrap_or_else(|| TokenUsage::new(prompt_tokens, estimate_tokens(&reply.text)));
        self.governance
            .settle_usage(permit, *usage.input_tokens(), *usage.output_tokens());

        let mut sources: Vec<String> = Vec::new();
        for doc in &request.documents {
            let source = doc.source();
            if !sources.iter().any(|s| s == source) {
                sources.push(source.to_string());
            }
        }

        let completion = Completion {
            text: reply.text,
            confidence: self.scorer.score(&request.documents),
            sources,
            tokens_used: usage.total(),
            model,
            from_cache: false,
            fallback_reason: None,
            fallback_count: 0,
        };

        self.governance
            .cache()
            .put(&key, completion.clone().into(), None);
        Ok(completion)
    }

    fn fallback(&self, request: &RagRequest, reason: FallbackReason) -> Completion {
        GovernanceMetrics::get().record_fallback("chat", reason.as_ref());
        self.governance
            .fallback()
            .mock_completion(&request.query, &request.documents, reason)
    }
}
