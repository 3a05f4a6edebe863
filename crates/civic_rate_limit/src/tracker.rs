//! Sliding-window usage and calendar budget bookkeeping.

use crate::ModelProfile;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Length of the per-model rate window.
pub const USAGE_WINDOW: Duration = Duration::from_secs(60);

/// Calendar month marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    /// Calendar year
    pub year: i32,
    /// Month, 1-12
    pub month: u32,
}

impl YearMonth {
    /// Month containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

/// Token spend against the calendar caps.
///
/// Kept in memory only; a restart resets usage but not the caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetState {
    /// Tokens used since the start of `current_day`
    pub daily_tokens_used: u64,
    /// Tokens used since the start of `current_month`
    pub monthly_tokens_used: u64,
    /// Day the daily counter belongs to
    pub current_day: NaiveDate,
    /// Month the monthly counter belongs to
    pub current_month: YearMonth,
}

impl BudgetState {
    /// Zeroed state anchored at the given date.
    pub fn starting(date: NaiveDate) -> Self {
        Self {
            daily_tokens_used: 0,
            monthly_tokens_used: 0,
            current_day: date,
            current_month: YearMonth::of(date),
        }
    }
}

/// Request and token counts inside the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Requests recorded in the window
    pub requests: u32,
    /// Tokens recorded in the window
    pub tokens: u64,
}

/// Result of recording one completed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Model the call went to
    pub model: String,
    /// Prompt tokens
    pub input_tokens: u64,
    /// Completion tokens
    pub output_tokens: u64,
    /// Estimated cost in USD
    pub cost_usd: f64,
}

impl UsageRecord {
    /// Input plus output tokens.
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Estimated usage held for an admitted call that has not finished.
///
/// While outstanding it occupies one window slot and `tokens` of every
/// calendar counter, so concurrent admissions see each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    model: String,
    id: u64,
    tokens: u64,
    day: NaiveDate,
    month: YearMonth,
}

impl Reservation {
    /// Model the reservation was made for.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Tokens held.
    pub fn tokens(&self) -> u64 {
        self.tokens
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    at: Instant,
    tokens: u64,
    id: u64,
}

/// Shared ledger of recent calls and calendar spend.
///
/// One instance is shared (via `Arc`) by every governed client in the
/// process. Each structure sits behind its own mutex and no lock is held
/// across an await point. When both are needed the window lock is taken
/// first.
#[derive(Debug)]
pub struct UsageTracker {
    profiles: HashMap<String, ModelProfile>,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<WindowEntry>>>,
    budget: Mutex<BudgetState>,
    next_id: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn purge(entries: &mut VecDeque<WindowEntry>, window: Duration, now: Instant) {
    while let Some(entry) = entries.front() {
        if now.duration_since(entry.at) >= window {
            entries.pop_front();
        } else {
            break;
        }
    }
}

fn snapshot_of(entries: &VecDeque<WindowEntry>) -> WindowSnapshot {
    WindowSnapshot {
        requests: entries.len() as u32,
        tokens: entries.iter().map(|e| e.tokens).sum(),
    }
}

fn roll(budget: &mut BudgetState, today: NaiveDate) {
    if budget.current_day != today {
        debug!(
            previous = %budget.current_day,
            used = budget.daily_tokens_used,
            "Daily budget rolled over"
        );
        budget.daily_tokens_used = 0;
        budget.current_day = today;
    }
    let month = YearMonth::of(today);
    if budget.current_month != month {
        debug!(used = budget.monthly_tokens_used, "Monthly budget rolled over");
        budget.monthly_tokens_used = 0;
        budget.current_month = month;
    }
}

#[derive(Clone, Copy)]
enum Period {
    Day,
    Month,
}

/// A counter with the reservation's hold removed, if it still carries it.
fn held_back(budget: &BudgetState, reservation: &Reservation, period: Period) -> u64 {
    match period {
        Period::Day if budget.current_day == reservation.day => {
            budget.daily_tokens_used.saturating_sub(reservation.tokens)
        }
        Period::Day => budget.daily_tokens_used,
        Period::Month if budget.current_month == reservation.month => {
            budget.monthly_tokens_used.saturating_sub(reservation.tokens)
        }
        Period::Month => budget.monthly_tokens_used,
    }
}

impl UsageTracker {
    /// Creates a tracker for the given model profiles, anchored at today.
    pub fn new(profiles: HashMap<String, ModelProfile>) -> Self {
        Self {
            profiles,
            window: USAGE_WINDOW,
            windows: Mutex::new(HashMap::new()),
            budget: Mutex::new(BudgetState::starting(Local::now().date_naive())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Overrides the window length.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Profile for a model, if configured.
    pub fn profile(&self, model: &str) -> Option<&ModelProfile> {
        self.profiles.get(model)
    }

    /// Configured model names.
    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Records a completed call and returns its cost.
    ///
    /// Adds one window entry and charges `input + output` tokens to both
    /// calendar counters.
    #[instrument(skip(self), fields(model = %model))]
    pub fn record(&self, model: &str, input_tokens: u64, output_tokens: u64) -> UsageRecord {
        self.rollover_check();
        let total = input_tokens + output_tokens;
        let now = Instant::now();

        {
            let mut windows = lock(&self.windows);
            let entries = windows.entry(model.to_string()).or_default();
            purge(entries, self.window, now);
            entries.push_back(WindowEntry {
                at: now,
                tokens: total,
                id: self.next_id.fetch_add(1, Ordering::Relaxed),
            });
        }

        {
            let mut budget = lock(&self.budget);
            budget.daily_tokens_used += total;
            budget.monthly_tokens_used += total;
        }

        self.priced(model, input_tokens, output_tokens)
    }

    /// Holds `tokens` for `model` if `decide` accepts the current state.
    ///
    /// `decide` sees the purged window and the rolled-over budget while
    /// both locks are held, so no other admission can slip in between the
    /// check and the reservation.
    pub(crate) fn reserve_if<F>(
        &self,
        model: &str,
        tokens: u64,
        decide: F,
    ) -> Option<Reservation>
    where
        F: FnOnce(WindowSnapshot, &BudgetState) -> bool,
    {
        let now = Instant::now();
        let today = Local::now().date_naive();

        let mut windows = lock(&self.windows);
        let entries = windows.entry(model.to_string()).or_default();
        purge(entries, self.window, now);

        let mut budget = lock(&self.budget);
        roll(&mut budget, today);

        if !decide(snapshot_of(entries), &*budget) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.push_back(WindowEntry {
            at: now,
            tokens,
            id,
        });
        budget.daily_tokens_used += tokens;
        budget.monthly_tokens_used += tokens;
        debug!(model = %model, tokens, "Reserved capacity");

        Some(Reservation {
            model: model.to_string(),
            id,
            tokens,
            day: budget.current_day,
            month: budget.current_month,
        })
    }

    /// Replaces a reservation with the call's actual usage.
    ///
    /// The window slot keeps its timestamp. Calendar counters that rolled
    /// over since the reservation are charged the full actual amount.
    #[instrument(skip(self, reservation), fields(model = %reservation.model))]
    pub fn settle(
        &self,
        reservation: &Reservation,
        input_tokens: u64,
        output_tokens: u64,
    ) -> UsageRecord {
        let total = input_tokens + output_tokens;
        let today = Local::now().date_naive();

        {
            let mut windows = lock(&self.windows);
            if let Some(entry) = windows
                .get_mut(&reservation.model)
                .and_then(|entries| entries.iter_mut().find(|e| e.id == reservation.id))
            {
                entry.tokens = total;
            }
        }

        {
            let mut budget = lock(&self.budget);
            roll(&mut budget, today);
            budget.daily_tokens_used = held_back(&budget, reservation, Period::Day) + total;
            budget.monthly_tokens_used = held_back(&budget, reservation, Period::Month) + total;
        }

        self.priced(&reservation.model, input_tokens, output_tokens)
    }

    /// Returns a reservation's window slot and tokens unused.
    pub fn release(&self, reservation: &Reservation) {
        let today = Local::now().date_naive();

        {
            let mut windows = lock(&self.windows);
            if let Some(entries) = windows.get_mut(&reservation.model) {
                entries.retain(|e| e.id != reservation.id);
            }
        }

        let mut budget = lock(&self.budget);
        roll(&mut budget, today);
        budget.daily_tokens_used = held_back(&budget, reservation, Period::Day);
        budget.monthly_tokens_used = held_back(&budget, reservation, Period::Month);
        debug!(model = %reservation.model, tokens = reservation.tokens, "Released reservation");
    }

    fn priced(&self, model: &str, input_tokens: u64, output_tokens: u64) -> UsageRecord {
        let cost_usd = match self.profiles.get(model) {
            Some(p) => {
                (input_tokens as f64 * p.input_cost_per_1k
                    + output_tokens as f64 * p.output_cost_per_1k)
                    / 1000.0
            }
            None => {
                warn!("No pricing configured for model, recording zero cost");
                0.0
            }
        };

        info!(
            model = %model,
            input_tokens,
            output_tokens,
            cost_usd,
            "API usage recorded"
        );

        UsageRecord {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd,
        }
    }

    /// Current window counts for a model, after purging stale entries.
    pub fn snapshot(&self, model: &str) -> WindowSnapshot {
        let now = Instant::now();
        let mut windows = lock(&self.windows);
        match windows.get_mut(model) {
            Some(entries) => {
                purge(entries, self.window, now);
                snapshot_of(entries)
            }
            None => WindowSnapshot::default(),
        }
    }

    /// Resets calendar counters whose period has ended, using today's local date.
    pub fn rollover_check(&self) {
        self.rollover_check_at(Local::now().date_naive());
    }

    /// Resets calendar counters whose period differs from `today`.
    pub fn rollover_check_at(&self, today: NaiveDate) {
        roll(&mut lock(&self.budget), today);
    }

    /// Copy of the calendar counters, after a rollover check.
    pub fn budget_state(&self) -> BudgetState {
        self.rollover_check();
        *lock(&self.budget)
    }

    /// Copy of the calendar counters without a rollover check.
    pub fn budget_state_raw(&self) -> BudgetState {
        *lock(&self.budget)
    }

    /// Replaces the calendar counters, e.g. from persisted state.
    pub fn restore(&self, state: BudgetState) {
        *lock(&self.budget) = state;
    }
}
