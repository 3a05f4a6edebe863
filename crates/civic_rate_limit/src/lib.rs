//! Rate limiting, token budgets and backoff for metered LLM providers.
//!
//! This crate keeps the books for every provider call in the process:
//!
//! - [`UsageTracker`] holds a 60-second sliding window per model and the
//!   daily/monthly token counters, rolling them over on calendar change.
//! - [`BudgetGate`] answers "may this request go out now?", reserves the
//!   estimate for admitted calls and waits for rate ceilings to clear.
//! - [`BackoffPolicy`] produces jittered exponential retry delays.
//! - [`GovernanceConfig`] loads ceilings, prices and caps from layered TOML.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod backoff;
mod config;
mod gate;
mod tracker;

pub use backoff::BackoffPolicy;
pub use config::{
    BudgetSettings, CacheSettings, Environment, GovernanceConfig, ModelProfile, RetrySettings,
};
pub use gate::{
    BudgetGate, BudgetUsage, CapacityDecision, CapacityGrant, CapacityPermit, ModelUsage,
    UsageStats,
};
pub use tracker::{
    BudgetState, Reservation, USAGE_WINDOW, UsageRecord, UsageTracker, WindowSnapshot, YearMonth,
};
