//! Test utilities for governed client tests.

use civic_rate_limit::{BackoffPolicy, GovernanceConfig, RetrySettings};
use civic_models::Governance;
use std::time::Duration;

pub mod mock_provider;

#[allow(unused_imports)]
pub use mock_provider::{MockBehavior, MockProvider, MockResponse};

/// Development config with fast retries and a short capacity wait.
#[allow(dead_code)]
pub fn test_config() -> GovernanceConfig {
    GovernanceConfig::default()
        .with_embedding_dimensions(4)
        .with_capacity_wait_secs(1)
        .with_poll_interval_ms(10)
        .with_retry(RetrySettings {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 50,
        })
}

/// Governance over `config` with deterministic jitter.
#[allow(dead_code)]
pub fn governance(config: GovernanceConfig) -> Governance {
    let backoff = BackoffPolicy::from_settings(&config.retry).with_seed(7);
    Governance::from_config(config).with_backoff(backoff)
}

/// Upper bound on any governed call under test.
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);
