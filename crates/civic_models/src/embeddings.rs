//! Governed embedding client.

use crate::{Admission, Governance, GovernanceMetrics, GovernedRequest};
use civic_cache::key_for;
use civic_core::{EmbeddingBatch, GovernedResponse, TokenUsage, estimate_tokens};
use civic_error::{CivicResult, ProviderError, ProviderErrorKind};
use civic_interface::{EmbeddingProvider, ProviderEmbeddings};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Vectors that passed validation, with the positions that did not.
struct Screened {
    vectors: Vec<Vec<f32>>,
    dropped: Vec<usize>,
    usage: Option<TokenUsage>,
}

/// Keeps vectors of the expected length with only finite components.
///
/// Inputs without a vector count as dropped. An all-dropped batch is an
/// invalid response.
fn screen(
    raw: ProviderEmbeddings,
    inputs: usize,
    dimensions: usize,
) -> Result<Screened, ProviderError> {
    let mut vectors = Vec::with_capacity(inputs);
    let mut dropped = Vec::new();
    let mut raw_vectors = raw.vectors.into_iter();

    for index in 0..inputs {
        match raw_vectors.next() {
            Some(v) if v.len() == dimensions && v.iter().all(|x| x.is_finite()) => vectors.push(v),
            Some(v) => {
                warn!(index, len = v.len(), expected = dimensions, "Dropping malformed embedding");
                dropped.push(index);
            }
            None => {
                warn!(index, "Provider returned no embedding for input");
                dropped.push(index);
            }
        }
    }

    if vectors.is_empty() {
        return Err(ProviderError::new(ProviderErrorKind::InvalidResponse(format!(
            "all {} embeddings malformed",
            inputs
        ))));
    }

    Ok(Screened {
        vectors,
        dropped,
        usage: raw.usage,
    })
}

/// Embedding client that routes every call through [`Governance`].
pub struct GovernedEmbeddingClient {
    governance: Governance,
    provider: Arc<dyn EmbeddingProvider>,
}

impl GovernedEmbeddingClient {
    /// Creates a client for the configured embedding model.
    pub fn new(governance: Governance, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            governance,
            provider,
        }
    }

    /// The shared governance state.
    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    /// Embeds `texts` in order.
    ///
    /// Malformed vectors are dropped and listed in
    /// [`EmbeddingBatch::dropped`].
    ///
    /// # Errors
    ///
    /// Only a capacity-wait timeout or an unconfigured embedding model.
    #[instrument(skip(self, texts), fields(texts = texts.len()))]
    pub async fn embed(&self, texts: &[String]) -> CivicResult<EmbeddingBatch> {
        let config = self.governance.config();
        let model = config.embedding_model.clone();

        if texts.is_empty() {
            return Ok(EmbeddingBatch {
                vectors: Vec::new(),
                dropped: Vec::new(),
                model,
                tokens_used: 0,
                from_cache: false,
                fallback_reason: None,
            });
        }

        let estimated: u64 = texts.iter().map(|t| estimate_tokens(t)).sum();
        let governed = GovernedRequest::new(model.clone(), "embeddings", estimated);
        let metrics = GovernanceMetrics::get();
        metrics.record_request(governed.kind, &model);

        let permit = match self.governance.admit(&model, estimated).await? {
            Admission::Proceed(permit) => permit,
            Admission::Fallback(reason) => {
                metrics.record_fallback("embeddings", reason.as_ref());
                return Ok(self.governance.fallback().mock_embeddings(texts, reason));
            }
        };

        let params = serde_json::json!({ "dimensions": config.embedding_dimensions });
        let key = key_for(&model, texts, &params)?;
        if let Some(cached) = self
            .governance
            .cache()
            .get(&key)
            .and_then(GovernedResponse::into_embeddings)
        {
            permit.release();
            metrics.record_cache_hit(&model);
            debug!(model = %model, "Serving embeddings from cache");
            return Ok(cached);
        }

        let dimensions = config.embedding_dimensions;
        let provider = self.provider.clone();
        let outcome = self
            .governance
            .call_provider(&governed, provider.provider_name(), || {
                let provider = provider.clone();
                let model = model.as_str();
                async move {
                    let raw = provider.embed(model, texts).await?;
                    screen(raw, texts.len(), dimensions)
                }
            })
            .await;

        let screened = match outcome {
            Ok(screened) => screened,
            Err(e) => {
                permit.release();
                let reason = self.governance.escalate(&e);
                metrics.record_fallback("embeddings", reason.as_ref());
                return Ok(self.governance.fallback().mock_embeddings(texts, reason));
            }
        };

        let usage = screened
            .usage
            .unwrap_or_else(|| TokenUsage::new(estimated, 0));
        self.governance
            .settle_usage(permit, *usage.input_tokens(), *usage.output_tokens());

        if !screened.dropped.is_empty() {
            warn!(dropped = ?screened.dropped, "Returning partial embedding batch");
        }

        let batch = EmbeddingBatch {
            vectors: screened.vectors,
            dropped: screened.dropped,
            model,
            tokens_used: usage.total(),
            from_cache: false,
            fallback_reason: None,
        };

        self.governance.cache().put(&key, batch.clone().into(), None);
        Ok(batch)
    }
}
