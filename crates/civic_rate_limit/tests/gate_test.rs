//! Tests for budget gate capacity decisions.

use chrono::Local;
use civic_core::FallbackReason;
use civic_error::GovernanceErrorKind;
use civic_rate_limit::{
    BudgetGate, BudgetSettings, BudgetState, CapacityDecision, CapacityGrant, ModelProfile,
    UsageTracker, YearMonth,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn gate(rpm: u32, tpm: u64, daily: u64, monthly: u64) -> BudgetGate {
    let tracker = Arc::new(UsageTracker::new(HashMap::from([(
        "fast".to_string(),
        ModelProfile::new(rpm, tpm),
    )])));
    BudgetGate::new(
        tracker,
        BudgetSettings {
            daily_tokens: daily,
            monthly_tokens: monthly,
        },
        Duration::from_millis(5),
    )
}

fn spend_today(gate: &BudgetGate, daily: u64, monthly: u64) {
    let today = Local::now().date_naive();
    gate.tracker().restore(BudgetState {
        daily_tokens_used: daily,
        monthly_tokens_used: monthly,
        current_day: today,
        current_month: YearMonth::of(today),
    });
}

#[test]
fn test_allows_when_empty() {
    let gate = gate(10, 1000, 10_000, 100_000);
    assert_eq!(gate.check_capacity("fast", 100).unwrap(), CapacityDecision::Allowed);
    assert!(gate.can_proceed("fast", 100).unwrap());
}

#[test]
fn test_request_ceiling() {
    let gate = gate(2, 1000, 10_000, 100_000);
    gate.tracker().record("fast", 1, 1);
    gate.tracker().record("fast", 1, 1);
    assert_eq!(
        gate.check_capacity("fast", 1).unwrap(),
        CapacityDecision::RequestCeiling
    );
}

#[test]
fn test_token_ceiling_counts_estimate() {
    let gate = gate(10, 1000, 10_000, 100_000);
    gate.tracker().record("fast", 400, 400);
    assert!(gate.can_proceed("fast", 200).unwrap());
    assert_eq!(
        gate.check_capacity("fast", 201).unwrap(),
        CapacityDecision::TokenCeiling
    );
}

#[test]
fn test_budget_decisions() {
    let gate = gate(10, 100_000, 1_000, 5_000);
    spend_today(&gate, 900, 900);
    assert_eq!(
        gate.check_capacity("fast", 101).unwrap(),
        CapacityDecision::DailyBudgetExceeded
    );

    spend_today(&gate, 0, 4_950);
    let decision = gate.check_capacity("fast", 100).unwrap();
    assert_eq!(decision, CapacityDecision::MonthlyBudgetExceeded);
    assert_eq!(
        decision.budget_reason(),
        Some(FallbackReason::MonthlyBudgetExceeded)
    );
}

#[test]
fn test_can_proceed_is_monotonic_in_estimate() {
    let gate = gate(10, 1000, 10_000, 100_000);
    gate.tracker().record("fast", 300, 0);
    let mut seen_refusal = false;
    for estimate in (0..2000).step_by(50) {
        let allowed = gate.can_proceed("fast", estimate).unwrap();
        if seen_refusal {
            assert!(!allowed, "allowed {} after a smaller estimate was refused", estimate);
        }
        seen_refusal |= !allowed;
    }
    assert!(seen_refusal);
}

#[test]
fn test_unknown_model_is_error() {
    let gate = gate(10, 1000, 10_000, 100_000);
    let err = gate.check_capacity("mystery", 1).unwrap_err();
    assert_eq!(err.kind, GovernanceErrorKind::UnknownModel("mystery".to_string()));
}

#[test]
fn test_checks_do_not_record_usage() {
    let gate = gate(10, 1000, 10_000, 100_000);
    for _ in 0..5 {
        gate.can_proceed("fast", 100).unwrap();
    }
    assert_eq!(gate.tracker().snapshot("fast").requests, 0);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 0);
}

#[tokio::test]
async fn test_wait_returns_immediately_on_budget_exhaustion() {
    let gate = gate(10, 100_000, 1_000, 5_000);
    spend_today(&gate, 1_000, 1_000);

    let start = Instant::now();
    let grant = gate
        .wait_for_capacity("fast", 10, Duration::from_secs(5))
        .await
        .unwrap();
    assert!(matches!(
        grant,
        CapacityGrant::BudgetExhausted(FallbackReason::DailyBudgetExceeded)
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_wait_times_out_on_saturated_window() {
    let gate = gate(1, 1000, 10_000, 100_000);
    gate.tracker().record("fast", 1, 1);

    let err = gate
        .wait_for_capacity("fast", 1, Duration::from_millis(30))
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        GovernanceErrorKind::CapacityTimeout { ref model, .. } if model == "fast"
    ));
}

#[tokio::test]
async fn test_wait_succeeds_once_window_clears() {
    let tracker = Arc::new(
        UsageTracker::new(HashMap::from([(
            "fast".to_string(),
            ModelProfile::new(1, 1000),
        )]))
        .with_window(Duration::from_millis(30)),
    );
    let gate = BudgetGate::new(
        tracker.clone(),
        BudgetSettings::default(),
        Duration::from_millis(5),
    );
    tracker.record("fast", 1, 1);
    assert!(!gate.can_proceed("fast", 1).unwrap());

    let grant = gate
        .wait_for_capacity("fast", 1, Duration::from_secs(2))
        .await
        .unwrap();
    assert!(matches!(grant, CapacityGrant::Granted(_)));
}

#[tokio::test]
async fn test_granted_capacity_is_held_until_settled() {
    let gate = gate(10, 100_000, 1_000, 100_000);

    let CapacityGrant::Granted(permit) = gate
        .wait_for_capacity("fast", 600, Duration::from_secs(1))
        .await
        .unwrap()
    else {
        panic!("expected capacity to be granted");
    };
    assert_eq!(permit.reserved_tokens(), 600);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 600);

    // A second caller sees the hold before the first call finishes
    let grant = gate
        .wait_for_capacity("fast", 600, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(matches!(
        grant,
        CapacityGrant::BudgetExhausted(FallbackReason::DailyBudgetExceeded)
    ));

    let record = permit.settle(100, 50);
    assert_eq!(record.total_tokens(), 150);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 150);
    assert_eq!(gate.tracker().snapshot("fast").requests, 1);
}

#[test]
fn test_dropped_permit_releases_capacity() {
    let gate = gate(1, 1000, 10_000, 100_000);
    let permit = gate.try_reserve("fast", 300).unwrap().unwrap();
    assert_eq!(
        gate.try_reserve("fast", 1).unwrap().unwrap_err(),
        CapacityDecision::RequestCeiling
    );

    drop(permit);
    assert_eq!(gate.tracker().snapshot("fast").requests, 0);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 0);
    assert!(gate.try_reserve("fast", 1).unwrap().is_ok());
}

#[test]
fn test_concurrent_reservations_respect_daily_cap() {
    let gate = gate(100, 1_000_000, 1_000, 100_000);

    let permits: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| gate.try_reserve("fast", 400).unwrap().ok()))
            .collect();
        handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(permits.len(), 2);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 800);
    drop(permits);
    assert_eq!(gate.tracker().budget_state().daily_tokens_used, 0);
}

#[test]
fn test_stats_percentages() {
    let gate = gate(10, 1000, 10_000, 100_000);
    gate.tracker().record("fast", 150, 100);
    let stats = gate.stats();
    let fast = &stats.models["fast"];
    assert_eq!(fast.requests, 1);
    assert_eq!(fast.rpm, 10);
    assert!((fast.requests_pct - 10.0).abs() < 1e-9);
    assert!((fast.tokens_pct - 25.0).abs() < 1e-9);
    assert_eq!(stats.budget.daily_used, 250);
    assert!((stats.budget.daily_pct - 2.5).abs() < 1e-9);
}
