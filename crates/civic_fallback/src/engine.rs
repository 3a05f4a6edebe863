//! Fallback state machine and mock response generation.

use crate::{detect_category, embedding_indicator, intent_prefix, templates_for};
use chrono::{DateTime, Utc};
use civic_core::{
    Completion, EmbeddingBatch, FallbackReason, RetrievedDocument, estimate_tokens,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

/// Confidence attached to every mock completion.
pub const MOCK_CONFIDENCE: f64 = 0.85;

/// Model tag for mock embeddings.
const MOCK_EMBEDDING_MODEL: &str = "mock-fallback-embeddings";

/// Source label used when no document names one.
const MOCK_SOURCE: &str = "mock_source";

/// Snapshot of the fallback state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStatus {
    /// Whether mock responses are being served
    pub active: bool,
    /// Why the fallback was last activated
    pub reason: Option<FallbackReason>,
    /// Mock responses served since the last activation
    pub count: u64,
    /// When the fallback was last activated
    pub activated_at: Option<DateTime<Utc>>,
    /// When this snapshot was taken
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct FallbackState {
    active: bool,
    reason: Option<FallbackReason>,
    count: u64,
    activated_at: Option<DateTime<Utc>>,
}

/// Process-wide fallback engine.
///
/// Transitions: `activate` sets the reason and zeroes the counter;
/// `deactivate` clears the reason and leaves the counter alone. There is no
/// automatic recovery.
///
/// # Examples
///
/// ```
/// use civic_core::FallbackReason;
/// use civic_fallback::MockFallback;
///
/// let fallback = MockFallback::new(1536).with_seed(1);
/// fallback.activate(FallbackReason::DailyBudgetExceeded);
///
/// let answer = fallback.mock_completion(
///     "How do I apply for SNAP?",
///     &[],
///     FallbackReason::DailyBudgetExceeded,
/// );
/// assert_eq!(answer.model, "mock-fallback-snap");
/// assert_eq!(answer.fallback_count, 1);
/// assert!(answer.text.starts_with("To answer your question about applying: "));
/// ```
#[derive(Debug)]
pub struct MockFallback {
    state: Mutex<FallbackState>,
    rng: Mutex<StdRng>,
    dimensions: usize,
}

impl MockFallback {
    /// Creates an inactive engine producing vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self {
            state: Mutex::new(FallbackState::default()),
            rng: Mutex::new(StdRng::from_entropy()),
            dimensions,
        }
    }

    /// Makes template selection deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn state(&self) -> MutexGuard<'_, FallbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Embedding dimensionality of mock vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Switches to mock responses for `reason`.
    pub fn activate(&self, reason: FallbackReason) {
        let mut state = self.state();
        let was_active = state.active;
        state.active = true;
        state.reason = Some(reason);
        state.count = 0;
        state.activated_at = Some(Utc::now());
        if was_active {
            debug!(%reason, "Mock fallback re-activated");
        } else {
            warn!(%reason, "Mock fallback activated; serving mock responses");
        }
    }

    /// Stops serving mock responses.
    pub fn deactivate(&self) {
        let mut state = self.state();
        if state.active {
            info!(served = state.count, "Mock fallback deactivated");
        }
        state.active = false;
        state.reason = None;
    }

    /// Whether mock responses are being served.
    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// Reason of the current activation, if active.
    pub fn reason(&self) -> Option<FallbackReason> {
        let state = self.state();
        if state.active { state.reason } else { None }
    }

    /// Current state snapshot.
    pub fn status(&self) -> FallbackStatus {
        let state = self.state();
        FallbackStatus {
            active: state.active,
            reason: state.reason,
            count: state.count,
            activated_at: state.activated_at,
            timestamp: Utc::now(),
        }
    }

    fn bump(&self) -> u64 {
        let mut state = self.state();
        state.count += 1;
        state.count
    }

    /// A canned answer shaped like a real completion.
    ///
    /// `reason` is the one the caller acted on; the response always carries
    /// it, even if the engine was deactivated in the meantime.
    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    pub fn mock_completion(
        &self,
        query: &str,
        documents: &[RetrievedDocument],
        reason: FallbackReason,
    ) -> Completion {
        let count = self.bump();
        let category = detect_category(query, documents);

        let template = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            templates_for(category)
                .choose(&mut *rng)
                .copied()
                .unwrap_or_default()
        };
        let text = match intent_prefix(query) {
            Some(prefix) => format!("{}{}", prefix, template),
            None => template.to_string(),
        };

        let mut sources: Vec<String> = Vec::new();
        for doc in documents.iter().take(3) {
            let source = doc
                .metadata
                .get("source")
                .map(String::as_str)
                .unwrap_or(MOCK_SOURCE);
            if !sources.iter().any(|s| s == source) {
                sources.push(source.to_string());
            }
        }
        if sources.is_empty() {
            sources.push(MOCK_SOURCE.to_string());
        }

        debug!(%category, count, "Served mock completion");

        Completion {
            tokens_used: estimate_tokens(&text),
            text,
            confidence: MOCK_CONFIDENCE,
            sources,
            model: format!("mock-fallback-{}", category),
            from_cache: false,
            fallback_reason: Some(reason),
            fallback_count: count,
        }
    }

    /// Deterministic pseudo-embeddings, one per text.
    ///
    /// Identical texts always get identical vectors. Components lie in
    /// `[-0.1, 0.1]` except one category dimension set to `0.5` when the
    /// text mentions a known service.
    #[instrument(skip(self, texts), fields(texts = texts.len()))]
    pub fn mock_embeddings(&self, texts: &[String], reason: FallbackReason) -> EmbeddingBatch {
        let count = self.bump();
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.mock_vector(t)).collect();
        debug!(count, vectors = vectors.len(), "Served mock embeddings");

        EmbeddingBatch {
            vectors,
            dropped: Vec::new(),
            model: MOCK_EMBEDDING_MODEL.to_string(),
            tokens_used: 0,
            from_cache: false,
            fallback_reason: Some(reason),
        }
    }

    fn mock_vector(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest[..8]);
        let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(seed));

        let mut vector: Vec<f32> = (0..self.dimensions)
            .map(|_| rng.gen_range(-0.1f32..=0.1f32))
            .collect();
        if let Some(index) = embedding_indicator(text)
            && index < vector.len()
        {
            vector[index] = 0.5;
        }
        vector
    }
}
