//! Metrics for governed provider calls.
//!
//! OpenTelemetry counters for governed requests, provider attempts and
//! errors, cache hits, fallback responses and recorded usage. Instruments
//! come from the global meter, so they are no-ops until the host installs
//! a meter provider.

use civic_error::{ProviderError, ProviderErrorKind};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Meter},
};
use std::sync::OnceLock;

static METRICS: OnceLock<GovernanceMetrics> = OnceLock::new();

/// Counters for governed calls.
#[derive(Clone)]
pub struct GovernanceMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Governed requests started
    pub requests: Counter<u64>,
    /// Provider attempts, including retries
    pub attempts: Counter<u64>,
    /// Failed provider attempts
    pub errors: Counter<u64>,
    /// Requests answered from the response cache
    pub cache_hits: Counter<u64>,
    /// Requests answered by the fallback engine
    pub fallbacks: Counter<u64>,
    /// Tokens recorded against budgets
    pub tokens: Counter<u64>,
    /// Estimated spend in USD
    pub cost_usd: Counter<f64>,
}

impl GovernanceMetrics {
    fn init() -> Self {
        let meter = global::meter("civic_governance");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("civic.requests")
                .with_description("Governed requests started")
                .build(),
            attempts: meter
                .u64_counter("civic.provider.attempts")
                .with_description("Provider attempts including retries")
                .build(),
            errors: meter
                .u64_counter("civic.provider.errors")
                .with_description("Failed provider attempts")
                .build(),
            cache_hits: meter
                .u64_counter("civic.cache.hits")
                .with_description("Requests answered from the response cache")
                .build(),
            fallbacks: meter
                .u64_counter("civic.fallbacks")
                .with_description("Requests answered by the fallback engine")
                .build(),
            tokens: meter
                .u64_counter("civic.tokens")
                .with_description("Tokens recorded against budgets")
                .build(),
            cost_usd: meter
                .f64_counter("civic.cost")
                .with_unit("USD")
                .with_description("Estimated provider spend")
                .build(),
        }
    }

    /// Get the global metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record the start of a governed request.
    pub fn record_request(&self, kind: &str, model: &str) {
        self.requests.add(
            1,
            &[
                KeyValue::new("kind", kind.to_string()),
                KeyValue::new("model", model.to_string()),
            ],
        );
    }

    /// Record one provider attempt.
    pub fn record_attempt(&self, provider: &str, model: &str) {
        self.attempts.add(
            1,
            &[
                KeyValue::new("provider", provider.to_string()),
                KeyValue::new("model", model.to_string()),
            ],
        );
    }

    /// Record a failed provider attempt.
    pub fn record_error(&self, provider: &str, model: &str, error_type: &str) {
        self.errors.add(
            1,
            &[
                KeyValue::new("provider", provider.to_string()),
                KeyValue::new("model", model.to_string()),
                KeyValue::new("error_type", error_type.to_string()),
            ],
        );
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self, model: &str) {
        self.cache_hits
            .add(1, &[KeyValue::new("model", model.to_string())]);
    }

    /// Record a fallback response.
    pub fn record_fallback(&self, kind: &str, reason: &str) {
        self.fallbacks.add(
            1,
            &[
                KeyValue::new("kind", kind.to_string()),
                KeyValue::new("reason", reason.to_string()),
            ],
        );
    }

    /// Record usage charged to the budgets.
    pub fn record_usage(&self, model: &str, tokens: u64, cost_usd: f64) {
        let labels = &[KeyValue::new("model", model.to_string())];
        self.tokens.add(tokens, labels);
        self.cost_usd.add(cost_usd, labels);
    }
}

impl Default for GovernanceMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}

/// Classify a provider error for metrics labeling.
///
/// Returns one of: "rate_limit", "auth", "network", "invalid_response", "http"
pub fn classify_error(error: &ProviderError) -> &'static str {
    match &error.kind {
        kind if kind.is_rate_limit() => "rate_limit",
        ProviderErrorKind::MissingApiKey(_) => "auth",
        ProviderErrorKind::Http { status, .. } if matches!(*status, 401 | 403) => "auth",
        ProviderErrorKind::Request(_) => "network",
        ProviderErrorKind::InvalidResponse(_) => "invalid_response",
        _ => "http",
    }
}
