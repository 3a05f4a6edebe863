//! Exponential backoff with jitter.

use crate::RetrySettings;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Computes retry delays.
///
/// The delay for attempt `n >= 1` is `min(max, base * 2^n)` scaled by a
/// uniform factor in `[1 - jitter, 1 + jitter]` and clamped to `[0, max]`.
/// Attempts `<= 0` never wait.
///
/// # Examples
///
/// ```
/// use civic_rate_limit::BackoffPolicy;
/// use std::time::Duration;
///
/// let policy = BackoffPolicy::new(Duration::from_millis(300), Duration::from_secs(60), 4);
/// assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
/// assert_eq!(policy.base_delay_for_attempt(1), Duration::from_millis(600));
/// assert_eq!(policy.schedule().len(), 4);
/// ```
#[derive(Debug)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    max_retries: u32,
    jitter: f64,
    rng: Mutex<StdRng>,
}

impl BackoffPolicy {
    /// Jitter applied when none is specified.
    pub const DEFAULT_JITTER: f64 = 0.2;

    /// Creates a policy seeded from system entropy.
    pub fn new(base: Duration, max: Duration, max_retries: u32) -> Self {
        Self {
            base,
            max,
            max_retries,
            jitter: Self::DEFAULT_JITTER,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a policy from retry settings.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.base_delay(), settings.max_delay(), settings.max_retries)
    }

    /// Makes jitter deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Sets the jitter fraction, clamped to `[0, 1]`.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Retries permitted after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on any delay.
    pub fn max_delay(&self) -> Duration {
        self.max
    }

    /// Delay before `attempt` without jitter.
    pub fn base_delay_for_attempt(&self, attempt: i32) -> Duration {
        if attempt <= 0 {
            return Duration::ZERO;
        }
        let factor = 1u128.checked_shl(attempt as u32).unwrap_or(u128::MAX);
        let nanos = self
            .base
            .as_nanos()
            .saturating_mul(factor)
            .min(self.max.as_nanos());
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Delay before `attempt` with jitter applied.
    pub fn delay_for_attempt(&self, attempt: i32) -> Duration {
        let base = self.base_delay_for_attempt(attempt);
        if base.is_zero() || self.jitter == 0.0 {
            return base;
        }
        let factor = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter))
        };
        let jittered = (base.as_secs_f64() * factor).clamp(0.0, self.max.as_secs_f64());
        Duration::from_secs_f64(jittered)
    }

    /// Delays for retries `1..=max_retries`, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_retries as i32)
            .map(|attempt| self.delay_for_attempt(attempt))
            .collect()
    }
}
