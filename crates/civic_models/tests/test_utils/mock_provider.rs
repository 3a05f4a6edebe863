//! Scripted provider for governed client tests.

use async_trait::async_trait;
use civic_core::{ChatRequest, TokenUsage};
use civic_error::{ProviderError, ProviderErrorKind};
use civic_interface::{CompletionProvider, EmbeddingProvider, ProviderCompletion, ProviderEmbeddings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Chat text, or embeddings of the given vectors
    Success,
    /// Fail with this error
    Error(ProviderErrorKind),
}

/// How the mock answers successive calls.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always succeed
    Success,
    /// Always answer with a provider rate limit
    AlwaysRateLimited,
    /// Always fail with this error
    Error(ProviderErrorKind),
    /// Fail `n` times, then succeed
    FailThenSucceed(usize, ProviderErrorKind),
    /// Follow the script; succeed once it runs out
    Sequence(Vec<MockResponse>),
}

/// Provider double counting every call.
#[derive(Debug, Clone)]
pub struct MockProvider {
    behavior: MockBehavior,
    text: String,
    usage: Option<TokenUsage>,
    vectors: Arc<Mutex<Option<Vec<Vec<f32>>>>>,
    dimensions: usize,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    call_times: Arc<Mutex<Vec<Instant>>>,
}

#[allow(dead_code)]
impl MockProvider {
    /// Mock following `behavior`.
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            text: "Visit your local SNAP center with proof of income.".to_string(),
            usage: Some(TokenUsage::new(120, 30)),
            vectors: Arc::new(Mutex::new(None)),
            dimensions: 4,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            call_times: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Mock that always succeeds.
    pub fn new_success() -> Self {
        Self::new(MockBehavior::Success)
    }

    /// Mock that always fails with `kind`.
    pub fn new_error(kind: ProviderErrorKind) -> Self {
        Self::new(MockBehavior::Error(kind))
    }

    /// Sets the reported usage; `None` simulates a provider without usage.
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    /// Returns these vectors from `embed` instead of generated ones.
    pub fn with_vectors(self, vectors: Vec<Vec<f32>>) -> Self {
        *self.vectors.lock().unwrap() = Some(vectors);
        self
    }

    /// Holds every reply for `delay`, yielding to other tasks.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// When each call started, in order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    /// Calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn next_outcome(&self) -> Result<(), ProviderError> {
        self.call_times.lock().unwrap().push(Instant::now());
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            MockBehavior::Success => Ok(()),
            MockBehavior::AlwaysRateLimited => Err(ProviderError::new(
                ProviderErrorKind::RateLimited {
                    retry_after_secs: Some(1),
                },
            )),
            MockBehavior::Error(kind) => Err(ProviderError::new(kind.clone())),
            MockBehavior::FailThenSucceed(failures, kind) => {
                if call < *failures {
                    Err(ProviderError::new(kind.clone()))
                } else {
                    Ok(())
                }
            }
            MockBehavior::Sequence(script) => match script.get(call) {
                Some(MockResponse::Error(kind)) => Err(ProviderError::new(kind.clone())),
                Some(MockResponse::Success) | None => Ok(()),
            },
        }
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, _request: &ChatRequest) -> Result<ProviderCompletion, ProviderError> {
        self.next_outcome().await?;
        Ok(ProviderCompletion {
            text: self.text.clone(),
            usage: self.usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    async fn embed(
        &self,
        _model: &str,
        texts: &[String],
    ) -> Result<ProviderEmbeddings, ProviderError> {
        self.next_outcome().await?;
        let scripted = self.vectors.lock().unwrap().clone();
        let vectors = scripted.unwrap_or_else(|| {
            texts
                .iter()
                .enumerate()
                .map(|(i, _)| vec![i as f32 * 0.1; self.dimensions])
                .collect()
        });
        Ok(ProviderEmbeddings {
            vectors,
            usage: self.usage,
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
