//! Shared governance state and the checkpoints every governed call passes.

use crate::{GovernanceMetrics, GovernedRequest, classify_error};
use civic_cache::{CacheStats, ResponseCache};
use civic_core::FallbackReason;
use civic_error::{CivicResult, ProviderError, ProviderErrorKind, RetryableError};
use civic_fallback::{FallbackStatus, MockFallback};
use civic_rate_limit::{
    BackoffPolicy, BudgetGate, CapacityGrant, CapacityPermit, GovernanceConfig, UsageRecord,
    UsageStats, UsageTracker,
};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, info, instrument, warn};

/// Whether a governed call may reach the provider.
#[derive(Debug)]
pub enum Admission {
    /// Capacity reserved; continue to the cache and provider
    Proceed(CapacityPermit),
    /// Serve a mock response for this reason
    Fallback(FallbackReason),
}

/// Everything an operator dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceStatus {
    /// Window and budget usage
    pub usage: UsageStats,
    /// Response cache counters
    pub cache: CacheStats,
    /// Fallback engine state
    pub fallback: FallbackStatus,
}

/// Maps a final provider failure onto the reason reported with mock answers.
pub(crate) fn fallback_reason_for(error: &ProviderError) -> FallbackReason {
    match &error.kind {
        kind if kind.is_rate_limit() => FallbackReason::RateLimitExceeded,
        ProviderErrorKind::InvalidResponse(_) => FallbackReason::UnknownError,
        _ => FallbackReason::ApiError,
    }
}

/// The governance components shared by the chat and embedding clients.
///
/// Cloning is cheap; clones share the same tracker, cache and fallback
/// engine, so budgets and rate windows are enforced across all of them.
///
/// # Examples
///
/// ```
/// use civic_models::Governance;
/// use civic_rate_limit::GovernanceConfig;
///
/// let governance = Governance::from_config(GovernanceConfig::default());
/// let status = governance.status();
/// assert!(!status.fallback.active);
/// assert_eq!(status.usage.budget.daily_used, 0);
/// ```
#[derive(Debug, Clone, Getters)]
pub struct Governance {
    config: Arc<GovernanceConfig>,
    tracker: Arc<UsageTracker>,
    gate: Arc<BudgetGate>,
    cache: Arc<ResponseCache>,
    fallback: Arc<MockFallback>,
    backoff: Arc<BackoffPolicy>,
}

impl Governance {
    /// Builds fresh governance state from configuration.
    pub fn from_config(config: GovernanceConfig) -> Self {
        let tracker = Arc::new(UsageTracker::new(config.models.clone()));
        let gate = Arc::new(BudgetGate::from_config(tracker.clone(), &config));
        let cache = Arc::new(ResponseCache::from_config(&config));
        let fallback = Arc::new(MockFallback::new(config.embedding_dimensions));
        let backoff = Arc::new(BackoffPolicy::from_settings(&config.retry));
        debug!(
            environment = %config.environment,
            cache_enabled = cache.is_enabled(),
            "Governance initialized"
        );
        Self {
            config: Arc::new(config),
            tracker,
            gate,
            cache,
            fallback,
            backoff,
        }
    }

    /// Replaces the usage tracker, rebuilding the gate around it.
    pub fn with_tracker(mut self, tracker: UsageTracker) -> Self {
        self.tracker = Arc::new(tracker);
        self.gate = Arc::new(BudgetGate::from_config(self.tracker.clone(), &self.config));
        self
    }

    /// Replaces the backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Replaces the fallback engine.
    pub fn with_fallback(mut self, fallback: MockFallback) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    /// Replaces the response cache.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Arc::new(cache);
        self
    }

    /// Usage, cache and fallback state in one snapshot.
    pub fn status(&self) -> GovernanceStatus {
        GovernanceStatus {
            usage: self.gate.stats(),
            cache: self.cache.stats(),
            fallback: self.fallback.status(),
        }
    }

    /// Activates the fallback if `estimated_tokens` would breach a calendar
    /// budget. Returns whether it did.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` for an unconfigured model.
    pub fn activate_fallback_if_budget_exceeded(
        &self,
        model: &str,
        estimated_tokens: u64,
    ) -> CivicResult<bool> {
        let decision = self.gate.check_capacity(model, estimated_tokens)?;
        match decision.budget_reason() {
            Some(reason) => {
                self.fallback.activate(reason);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs the fallback check and the capacity wait for one request.
    ///
    /// A `Proceed` admission holds the estimate against every ceiling and
    /// budget until its permit is settled or dropped.
    ///
    /// # Errors
    ///
    /// Returns `CapacityTimeout` when rate ceilings stay saturated for
    /// `capacity_wait_secs`, or `UnknownModel`.
    #[instrument(skip(self), fields(model = %model))]
    pub async fn admit(&self, model: &str, estimated_tokens: u64) -> CivicResult<Admission> {
        if self.fallback.is_active() {
            let reason = self.fallback.reason().unwrap_or(FallbackReason::UnknownError);
            debug!(%reason, "Fallback active, skipping provider");
            return Ok(Admission::Fallback(reason));
        }

        let grant = self
            .gate
            .wait_for_capacity(model, estimated_tokens, self.config.capacity_wait())
            .await?;

        match grant {
            CapacityGrant::Granted(permit) => Ok(Admission::Proceed(permit)),
            CapacityGrant::BudgetExhausted(reason) => {
                self.fallback.activate(reason);
                Ok(Admission::Fallback(reason))
            }
        }
    }

    /// Activates the fallback after a provider failure and returns the reason.
    pub(crate) fn escalate(&self, error: &ProviderError) -> FallbackReason {
        let reason = fallback_reason_for(error);
        warn!(%error, %reason, "Provider call failed, switching to fallback");
        self.fallback.activate(reason);
        reason
    }

    /// Charges a successful call's actual usage in place of its reservation.
    pub(crate) fn settle_usage(
        &self,
        permit: CapacityPermit,
        input_tokens: u64,
        output_tokens: u64,
    ) -> UsageRecord {
        let record = permit.settle(input_tokens, output_tokens);
        GovernanceMetrics::get().record_usage(&record.model, record.total_tokens(), record.cost_usd);
        record
    }

    /// Calls the provider, retrying transient failures on the backoff
    /// schedule.
    ///
    /// Makes at most `max_retries + 1` attempts. Permanent failures end the
    /// loop at once.
    pub(crate) async fn call_provider<T, F, Fut>(
        &self,
        request: &GovernedRequest,
        provider: &'static str,
        mut operation: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let metrics = GovernanceMetrics::get();
        let max_retries = self.backoff.max_retries();

        let result = Retry::spawn(self.backoff.schedule(), || {
            let attempt = request.next_attempt();
            metrics.record_attempt(provider, &request.model);
            debug!(model = %request.model, kind = request.kind, attempt, "Calling provider");
            let call = operation();
            async move {
                match call.await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        metrics.record_error(provider, &request.model, classify_error(&e));
                        if e.is_retryable() {
                            if let ProviderErrorKind::RateLimited {
                                retry_after_secs: Some(secs),
                            } = e.kind
                            {
                                debug!(retry_after_secs = secs, "Provider suggested a retry delay");
                            }
                            warn!(error = %e, attempt, max_retries, "Provider call failed, will retry");
                            Err(RetryError::Transient {
                                err: e,
                                retry_after: None,
                            })
                        } else {
                            warn!(error = %e, attempt, "Permanent provider error, failing immediately");
                            Err(RetryError::Permanent(e))
                        }
                    }
                }
            }
        })
        .await;

        if result.is_ok() && request.attempts() > 1 {
            info!(attempts = request.attempts(), "Provider call succeeded after retry");
        }
        result
    }
}
