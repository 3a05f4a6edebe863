//! Capacity decisions against rate ceilings and token budgets.

use crate::{
    BudgetSettings, BudgetState, GovernanceConfig, ModelProfile, Reservation, UsageRecord,
    UsageTracker, WindowSnapshot,
};
use civic_core::FallbackReason;
use civic_error::{GovernanceError, GovernanceErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Outcome of a single capacity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapacityDecision {
    /// The request fits every ceiling and budget
    Allowed,
    /// The window already holds `rpm` requests
    RequestCeiling,
    /// The window's tokens plus the estimate exceed `tpm`
    TokenCeiling,
    /// The estimate would breach the daily cap
    DailyBudgetExceeded,
    /// The estimate would breach the monthly cap
    MonthlyBudgetExceeded,
}

impl CapacityDecision {
    /// True for [`CapacityDecision::Allowed`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, CapacityDecision::Allowed)
    }

    /// Fallback reason for budget refusals; `None` otherwise.
    ///
    /// Budget refusals cannot clear by waiting, rate ceilings can.
    pub fn budget_reason(&self) -> Option<FallbackReason> {
        match self {
            CapacityDecision::DailyBudgetExceeded => Some(FallbackReason::DailyBudgetExceeded),
            CapacityDecision::MonthlyBudgetExceeded => Some(FallbackReason::MonthlyBudgetExceeded),
            _ => None,
        }
    }
}

/// Capacity held for one admitted call.
///
/// The estimate counts against the window and both calendar budgets until
/// the permit is settled with actual usage. Dropping an unsettled permit
/// releases the hold.
#[derive(Debug)]
#[must_use = "dropping a permit releases its reservation"]
pub struct CapacityPermit {
    tracker: Arc<UsageTracker>,
    reservation: Reservation,
    settled: bool,
}

impl CapacityPermit {
    /// Model the capacity is held on.
    pub fn model(&self) -> &str {
        self.reservation.model()
    }

    /// Estimated tokens held.
    pub fn reserved_tokens(&self) -> u64 {
        self.reservation.tokens()
    }

    /// Replaces the hold with the call's actual usage and prices it.
    pub fn settle(mut self, input_tokens: u64, output_tokens: u64) -> UsageRecord {
        self.settled = true;
        self.tracker
            .settle(&self.reservation, input_tokens, output_tokens)
    }

    /// Gives the held capacity back without recording usage.
    pub fn release(self) {}
}

impl Drop for CapacityPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.tracker.release(&self.reservation);
        }
    }
}

/// Result of waiting for capacity.
#[derive(Debug)]
pub enum CapacityGrant {
    /// Capacity is reserved for the caller
    Granted(CapacityPermit),
    /// A calendar budget is exhausted; the caller should fall back
    BudgetExhausted(FallbackReason),
}

/// Per-model window usage for the stats surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Requests in the window
    pub requests: u32,
    /// Configured requests per minute
    pub rpm: u32,
    /// Tokens in the window
    pub tokens: u64,
    /// Configured tokens per minute
    pub tpm: u64,
    /// `requests / rpm` as a percentage
    pub requests_pct: f64,
    /// `tokens / tpm` as a percentage
    pub tokens_pct: f64,
}

/// Calendar budget usage for the stats surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetUsage {
    /// Tokens used today
    pub daily_used: u64,
    /// Daily cap
    pub daily_cap: u64,
    /// `daily_used / daily_cap` as a percentage
    pub daily_pct: f64,
    /// Tokens used this month
    pub monthly_used: u64,
    /// Monthly cap
    pub monthly_cap: u64,
    /// `monthly_used / monthly_cap` as a percentage
    pub monthly_pct: f64,
}

/// Read-only usage report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Window usage keyed by model name
    pub models: BTreeMap<String, ModelUsage>,
    /// Calendar budget usage
    pub budget: BudgetUsage,
}

fn decide(
    profile: &ModelProfile,
    caps: &BudgetSettings,
    window: WindowSnapshot,
    budget: &BudgetState,
    estimated_tokens: u64,
) -> CapacityDecision {
    if window.requests >= profile.rpm {
        CapacityDecision::RequestCeiling
    } else if window.tokens + estimated_tokens > profile.tpm {
        CapacityDecision::TokenCeiling
    } else if budget.daily_tokens_used + estimated_tokens > caps.daily_tokens {
        CapacityDecision::DailyBudgetExceeded
    } else if budget.monthly_tokens_used + estimated_tokens > caps.monthly_tokens {
        CapacityDecision::MonthlyBudgetExceeded
    } else {
        CapacityDecision::Allowed
    }
}

fn pct(used: u64, cap: u64) -> f64 {
    if cap == 0 {
        0.0
    } else {
        used as f64 / cap as f64 * 100.0
    }
}

/// Decides whether a request may go to the provider now.
///
/// [`BudgetGate::check_capacity`] is a pure query: it purges stale window
/// entries and applies calendar rollover, but never changes fallback state
/// or records usage. Capacity is only taken by [`BudgetGate::try_reserve`]
/// and [`BudgetGate::wait_for_capacity`], which check and reserve in one
/// step.
#[derive(Debug, Clone)]
pub struct BudgetGate {
    tracker: Arc<UsageTracker>,
    budget: BudgetSettings,
    poll_interval: Duration,
}

impl BudgetGate {
    /// Creates a gate over a shared tracker.
    pub fn new(tracker: Arc<UsageTracker>, budget: BudgetSettings, poll_interval: Duration) -> Self {
        Self {
            tracker,
            budget,
            poll_interval,
        }
    }

    /// Creates a gate using the budget and poll interval from configuration.
    pub fn from_config(tracker: Arc<UsageTracker>, config: &GovernanceConfig) -> Self {
        Self::new(tracker, config.budget, config.poll_interval())
    }

    /// The shared tracker.
    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Configured calendar caps.
    pub fn budget(&self) -> &BudgetSettings {
        &self.budget
    }

    /// Checks whether `estimated_tokens` more would fit right now.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if no profile is configured for `model`.
    pub fn check_capacity(
        &self,
        model: &str,
        estimated_tokens: u64,
    ) -> Result<CapacityDecision, GovernanceError> {
        let profile = self.profile(model)?;
        let budget = self.tracker.budget_state();
        let window = self.tracker.snapshot(model);
        Ok(decide(&profile, &self.budget, window, &budget, estimated_tokens))
    }

    fn profile(&self, model: &str) -> Result<ModelProfile, GovernanceError> {
        self.tracker.profile(model).copied().ok_or_else(|| {
            GovernanceError::new(GovernanceErrorKind::UnknownModel(model.to_string()))
        })
    }

    /// Reserves `estimated_tokens` if they fit right now.
    ///
    /// The check and the reservation happen under the tracker's locks, so
    /// concurrent callers cannot jointly overrun a ceiling or budget.
    /// Returns the refusing decision when the estimate does not fit.
    ///
    /// # Errors
    ///
    /// Returns `UnknownModel` if no profile is configured for `model`.
    pub fn try_reserve(
        &self,
        model: &str,
        estimated_tokens: u64,
    ) -> Result<Result<CapacityPermit, CapacityDecision>, GovernanceError> {
        let profile = self.profile(model)?;
        let mut decision = CapacityDecision::Allowed;
        let reservation = self.tracker.reserve_if(model, estimated_tokens, |window, budget| {
            decision = decide(&profile, &self.budget, window, budget, estimated_tokens);
            decision.is_allowed()
        });

        Ok(match reservation {
            Some(reservation) => Ok(CapacityPermit {
                tracker: Arc::clone(&self.tracker),
                reservation,
                settled: false,
            }),
            None => Err(decision),
        })
    }

    /// Convenience form of [`BudgetGate::check_capacity`].
    pub fn can_proceed(&self, model: &str, estimated_tokens: u64) -> Result<bool, GovernanceError> {
        Ok(self.check_capacity(model, estimated_tokens)?.is_allowed())
    }

    /// Waits until capacity is available and reserves it, polling shared state.
    ///
    /// Returns immediately with `BudgetExhausted` when a calendar cap is the
    /// obstacle.
    ///
    /// # Errors
    ///
    /// Returns `CapacityTimeout` if rate ceilings do not clear within
    /// `max_wait`, or `UnknownModel` for an unconfigured model.
    #[instrument(skip(self), fields(model = %model))]
    pub async fn wait_for_capacity(
        &self,
        model: &str,
        estimated_tokens: u64,
        max_wait: Duration,
    ) -> Result<CapacityGrant, GovernanceError> {
        let start = Instant::now();
        loop {
            let decision = match self.try_reserve(model, estimated_tokens)? {
                Ok(permit) => return Ok(CapacityGrant::Granted(permit)),
                Err(decision) => decision,
            };
            if let Some(reason) = decision.budget_reason() {
                warn!(%reason, "Token budget exhausted");
                return Ok(CapacityGrant::BudgetExhausted(reason));
            }

            let waited = start.elapsed();
            if waited >= max_wait {
                warn!(waited_ms = waited.as_millis() as u64, %decision, "Gave up waiting for capacity");
                return Err(GovernanceError::new(GovernanceErrorKind::CapacityTimeout {
                    model: model.to_string(),
                    waited_ms: waited.as_millis() as u64,
                }));
            }

            debug!(%decision, "Rate ceiling reached, waiting");
            tokio::time::sleep(self.poll_interval.min(max_wait - waited)).await;
        }
    }

    /// Current usage for every configured model plus the calendar budgets.
    pub fn stats(&self) -> UsageStats {
        let budget = self.tracker.budget_state();
        let models = self
            .tracker
            .models()
            .filter_map(|model| {
                let profile = self.tracker.profile(model)?;
                let snapshot = self.tracker.snapshot(model);
                Some((
                    model.to_string(),
                    ModelUsage {
                        requests: snapshot.requests,
                        rpm: profile.rpm,
                        tokens: snapshot.tokens,
                        tpm: profile.tpm,
                        requests_pct: pct(snapshot.requests as u64, profile.rpm as u64),
                        tokens_pct: pct(snapshot.tokens, profile.tpm),
                    },
                ))
            })
            .collect();

        UsageStats {
            models,
            budget: BudgetUsage {
                daily_used: budget.daily_tokens_used,
                daily_cap: self.budget.daily_tokens,
                daily_pct: pct(budget.daily_tokens_used, self.budget.daily_tokens),
                monthly_used: budget.monthly_tokens_used,
                monthly_cap: self.budget.monthly_tokens,
                monthly_pct: pct(budget.monthly_tokens_used, self.budget.monthly_tokens),
            },
        }
    }
}
