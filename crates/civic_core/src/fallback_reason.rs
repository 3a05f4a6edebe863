//! Why a response came from the mock fallback engine.

use serde::{Deserialize, Serialize};

/// Reason the fallback engine was activated.
///
/// # Examples
///
/// ```
/// use civic_core::FallbackReason;
///
/// assert_eq!(FallbackReason::RateLimitExceeded.to_string(), "rate_limit_exceeded");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FallbackReason {
    /// The daily token cap would be breached
    DailyBudgetExceeded,
    /// The monthly token cap would be breached
    MonthlyBudgetExceeded,
    /// Retries ran out while the provider kept rate limiting
    RateLimitExceeded,
    /// Retries ran out (or were skipped) on a provider error
    ApiError,
    /// Anything not classified above
    UnknownError,
}

impl FallbackReason {
    /// True for the two budget-exhaustion reasons.
    pub fn is_budget(&self) -> bool {
        matches!(
            self,
            FallbackReason::DailyBudgetExceeded | FallbackReason::MonthlyBudgetExceeded
        )
    }
}
