//! Tests for the usage tracker.

use chrono::{Local, NaiveDate};
use civic_rate_limit::{BudgetState, ModelProfile, UsageTracker, YearMonth};
use std::collections::HashMap;
use std::time::Duration;

fn profiles() -> HashMap<String, ModelProfile> {
    HashMap::from([(
        "gpt-4o-mini".to_string(),
        ModelProfile::new(300, 180_000)
            .with_input_cost_per_1k(0.15)
            .with_output_cost_per_1k(0.60),
    )])
}

#[test]
fn test_record_then_snapshot() {
    let tracker = UsageTracker::new(profiles());
    let before = tracker.snapshot("gpt-4o-mini");
    let budget_before = tracker.budget_state();

    let record = tracker.record("gpt-4o-mini", 120, 80);

    let after = tracker.snapshot("gpt-4o-mini");
    let budget_after = tracker.budget_state();
    assert_eq!(after.requests, before.requests + 1);
    assert_eq!(after.tokens, before.tokens + 200);
    assert_eq!(budget_after.daily_tokens_used, budget_before.daily_tokens_used + 200);
    assert_eq!(budget_after.monthly_tokens_used, budget_before.monthly_tokens_used + 200);
    assert_eq!(record.total_tokens(), 200);
}

#[test]
fn test_record_computes_cost() {
    let tracker = UsageTracker::new(profiles());
    let record = tracker.record("gpt-4o-mini", 1000, 1000);
    assert!((record.cost_usd - 0.75).abs() < 1e-9);
}

#[test]
fn test_unseen_model_has_empty_window() {
    let tracker = UsageTracker::new(profiles());
    let snapshot = tracker.snapshot("gpt-4o-mini");
    assert_eq!(snapshot.requests, 0);
    assert_eq!(snapshot.tokens, 0);
}

#[test]
fn test_window_entries_expire() {
    let tracker = UsageTracker::new(profiles()).with_window(Duration::from_millis(40));
    tracker.record("gpt-4o-mini", 10, 10);
    assert_eq!(tracker.snapshot("gpt-4o-mini").requests, 1);

    std::thread::sleep(Duration::from_millis(60));

    let snapshot = tracker.snapshot("gpt-4o-mini");
    assert_eq!(snapshot.requests, 0);
    assert_eq!(snapshot.tokens, 0);
    // calendar counters are not windowed
    assert_eq!(tracker.budget_state().daily_tokens_used, 20);
}

#[test]
fn test_day_rollover_resets_daily_only() {
    let tracker = UsageTracker::new(profiles());
    let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    tracker.restore(BudgetState {
        daily_tokens_used: 5_000,
        monthly_tokens_used: 50_000,
        current_day: day,
        current_month: YearMonth::of(day),
    });

    tracker.rollover_check_at(day.succ_opt().unwrap());

    let state = tracker.budget_state_raw();
    assert_eq!(state.daily_tokens_used, 0);
    assert_eq!(state.monthly_tokens_used, 50_000);
    assert_eq!(state.current_day, NaiveDate::from_ymd_opt(2026, 3, 15).unwrap());
}

#[test]
fn test_same_day_check_keeps_counters() {
    let tracker = UsageTracker::new(profiles());
    tracker.record("gpt-4o-mini", 10, 0);
    tracker.rollover_check_at(Local::now().date_naive());
    assert_eq!(tracker.budget_state_raw().daily_tokens_used, 10);
}

#[test]
fn test_concurrent_records_are_all_counted() {
    let tracker = std::sync::Arc::new(UsageTracker::new(profiles()));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    tracker.record("gpt-4o-mini", 1, 1);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tracker.snapshot("gpt-4o-mini").requests, 200);
    assert_eq!(tracker.budget_state().daily_tokens_used, 400);
}
