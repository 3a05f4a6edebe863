//! Governed chat client tests against a scripted provider.

mod test_utils;

use civic_core::{
    FallbackReason, RetrievedDocument, TokenUsage, estimate_message_tokens, estimate_tokens,
};
use civic_error::{CivicErrorKind, GovernanceErrorKind, ProviderErrorKind};
use civic_models::{Governance, GovernedLlmClient, RagRequest, build_messages};
use civic_rate_limit::{BackoffPolicy, BudgetSettings, Environment, ModelProfile};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockBehavior, MockProvider, MockResponse, TEST_TIMEOUT, governance, test_config};

fn snap_docs() -> Vec<RetrievedDocument> {
    vec![
        RetrievedDocument::new("SNAP applications are accepted online through ACCESS HRA.")
            .with_metadata("source", "snap_guide.pdf")
            .with_metadata("service", "snap"),
        RetrievedDocument::new("Bring proof of identity and income to the interview.")
            .with_metadata("source", "snap_guide.pdf")
            .with_metadata("service", "snap"),
    ]
}

#[tokio::test]
async fn test_successful_generate() -> anyhow::Result<()> {
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));

    let completion = client
        .generate("How do I apply for SNAP?", &snap_docs(), 300, None)
        .await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(completion.model, "gpt-4o-mini");
    assert_eq!(completion.tokens_used, 150);
    assert_eq!(completion.sources, vec!["snap_guide.pdf".to_string()]);
    assert!((completion.confidence - 0.8).abs() < 1e-9);
    assert!(!completion.from_cache);
    assert!(!completion.is_fallback());
    Ok(())
}

#[tokio::test]
async fn test_daily_budget_exhaustion_serves_fallback() -> anyhow::Result<()> {
    let config = test_config().with_budget(BudgetSettings {
        daily_tokens: 100,
        monthly_tokens: 1_000_000,
    });
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(config), Arc::new(provider.clone()));

    let completion = client
        .generate("How do I apply for SNAP?", &snap_docs(), 300, None)
        .await?;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(
        completion.fallback_reason,
        Some(FallbackReason::DailyBudgetExceeded)
    );
    assert_eq!(completion.model, "mock-fallback-snap");
    assert_eq!(completion.fallback_count, 1);
    assert!((completion.confidence - 0.85).abs() < 1e-9);

    let status = client.governance().status();
    assert!(status.fallback.active);
    assert_eq!(status.fallback.reason, Some(FallbackReason::DailyBudgetExceeded));
    Ok(())
}

#[tokio::test]
async fn test_identical_requests_hit_cache() -> anyhow::Result<()> {
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));
    let docs = snap_docs();

    let first = client.generate("Where do I apply?", &docs, 300, None).await?;
    let second = client.generate("Where do I apply?", &docs, 300, None).await?;

    assert_eq!(provider.call_count(), 1);
    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(first.text, second.text);
    assert_eq!(client.governance().cache().stats().hits, 1);

    // Usage is charged once
    let status = client.governance().status();
    assert_eq!(status.usage.budget.daily_used, 150);
    Ok(())
}

#[tokio::test]
async fn test_production_disables_cache() -> anyhow::Result<()> {
    let config = test_config().with_environment(Environment::Production);
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(config), Arc::new(provider.clone()));

    let first = client.generate("Where do I apply?", &[], 300, None).await?;
    let second = client.generate("Where do I apply?", &[], 300, None).await?;

    assert_eq!(provider.call_count(), 2);
    assert!(!first.from_cache);
    assert!(!second.from_cache);
    Ok(())
}

#[tokio::test]
async fn test_persistent_rate_limit_exhausts_retries() -> anyhow::Result<()> {
    let provider = MockProvider::new(MockBehavior::AlwaysRateLimited);
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));

    let completion = client
        .generate("How do I renew Medicaid?", &[], 300, None)
        .await?;

    // One attempt plus max_retries = 2
    assert_eq!(provider.call_count(), 3);
    assert_eq!(
        completion.fallback_reason,
        Some(FallbackReason::RateLimitExceeded)
    );
    assert!(completion.model.starts_with("mock-fallback-"));
    assert!(client.governance().fallback().is_active());

    // Nothing was charged to the budget
    assert_eq!(client.governance().status().usage.budget.daily_used, 0);

    // The active fallback short-circuits later calls
    let again = client
        .generate("How do I renew Medicaid?", &[], 300, None)
        .await?;
    assert_eq!(provider.call_count(), 3);
    assert_eq!(again.fallback_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_permanent_error_skips_retries() -> anyhow::Result<()> {
    let provider = MockProvider::new_error(ProviderErrorKind::Http {
        status: 401,
        message: "invalid api key".to_string(),
    });
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));

    let completion = client.generate("Child care help?", &[], 300, None).await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(completion.fallback_reason, Some(FallbackReason::ApiError));
    assert_eq!(completion.model, "mock-fallback-childcare");
    Ok(())
}

#[tokio::test]
async fn test_transient_error_recovers() -> anyhow::Result<()> {
    let provider = MockProvider::new(MockBehavior::FailThenSucceed(
        1,
        ProviderErrorKind::Http {
            status: 503,
            message: "overloaded".to_string(),
        },
    ));
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));

    let completion = client.generate("Cash assistance?", &[], 300, None).await?;

    assert_eq!(provider.call_count(), 2);
    assert!(!completion.is_fallback());
    assert!(!client.governance().fallback().is_active());
    Ok(())
}

#[tokio::test]
async fn test_retry_delays_grow_between_attempts() -> anyhow::Result<()> {
    let provider = MockProvider::new(MockBehavior::Sequence(vec![
        MockResponse::Error(ProviderErrorKind::RateLimited {
            retry_after_secs: None,
        }),
        MockResponse::Error(ProviderErrorKind::Http {
            status: 503,
            message: "overloaded".to_string(),
        }),
        MockResponse::Success,
    ]));
    let backoff =
        BackoffPolicy::new(Duration::from_millis(25), Duration::from_secs(1), 2).with_jitter(0.0);
    let governance = Governance::from_config(test_config()).with_backoff(backoff);
    let client = GovernedLlmClient::new(governance, Arc::new(provider.clone()));

    let completion = tokio::time::timeout(
        TEST_TIMEOUT,
        client.generate("Cash assistance?", &[], 300, None),
    )
    .await??;

    assert!(!completion.is_fallback());
    let times = provider.call_times();
    assert_eq!(times.len(), 3);

    // 25ms * 2^1, then 25ms * 2^2
    let first_gap = times[1] - times[0];
    let second_gap = times[2] - times[1];
    assert!(first_gap >= Duration::from_millis(50), "first gap {:?}", first_gap);
    assert!(second_gap >= Duration::from_millis(100), "second gap {:?}", second_gap);
    assert!(second_gap > first_gap);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_stay_within_daily_cap() -> anyhow::Result<()> {
    let queries: Vec<String> = (0..5).map(|i| format!("Question {} about SNAP", i)).collect();
    let estimate = estimate_message_tokens(&build_messages(&queries[0], &[])) + 300;

    // Room for one in-flight estimate, never two
    let daily_cap = estimate * 3 / 2;
    let config = test_config().with_budget(BudgetSettings {
        daily_tokens: daily_cap,
        monthly_tokens: 1_000_000,
    });
    let provider = MockProvider::new_success().with_delay(Duration::from_millis(50));
    let client = Arc::new(GovernedLlmClient::new(
        governance(config),
        Arc::new(provider.clone()),
    ));

    let handles: Vec<_> = queries
        .into_iter()
        .map(|query| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.generate(&query, &[], 300, None).await })
        })
        .collect();

    let mut answered = 0;
    let mut fallbacks = 0;
    for handle in handles {
        let completion = tokio::time::timeout(TEST_TIMEOUT, handle).await???;
        if completion.is_fallback() {
            assert_eq!(
                completion.fallback_reason,
                Some(FallbackReason::DailyBudgetExceeded)
            );
            fallbacks += 1;
        } else {
            assert_eq!(completion.model, "gpt-4o-mini");
            answered += 1;
        }
    }

    assert!(answered >= 1);
    assert!(fallbacks >= 1);
    assert_eq!(answered + fallbacks, 5);
    assert_eq!(provider.call_count(), answered);

    let budget = client.governance().status().usage.budget;
    assert_eq!(budget.daily_used, answered as u64 * 150);
    assert!(budget.daily_used <= daily_cap);
    Ok(())
}

#[tokio::test]
async fn test_usage_estimated_without_provider_counts() -> anyhow::Result<()> {
    let provider = MockProvider::new_success().with_usage(None);
    let client = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));
    let docs = snap_docs();
    let query = "What do I bring to the SNAP interview?";

    let completion = client.generate(query, &docs, 300, None).await?;

    let expected = estimate_message_tokens(&build_messages(query, &docs))
        + estimate_tokens(&completion.text);
    assert_eq!(completion.tokens_used, expected);

    let status = client.governance().status();
    assert_eq!(status.usage.budget.daily_used, expected);
    assert_eq!(status.usage.models["gpt-4o-mini"].requests, 1);
    assert_eq!(status.usage.models["gpt-4o-mini"].tokens, expected);
    Ok(())
}

#[tokio::test]
async fn test_capacity_timeout_is_an_error() -> anyhow::Result<()> {
    let mut config = test_config();
    config
        .models
        .insert("gpt-4o-mini".to_string(), ModelProfile::new(1, 180_000));
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(config), Arc::new(provider.clone()));

    client.generate("First question", &[], 300, None).await?;
    let err = client
        .generate("Second question", &[], 300, None)
        .await
        .unwrap_err();

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(
        err.kind(),
        CivicErrorKind::Governance(e) if matches!(e.kind, GovernanceErrorKind::CapacityTimeout { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_unknown_model_is_an_error() {
    let config = test_config().with_fast_model("gpt-unknown");
    let provider = MockProvider::new_success();
    let client = GovernedLlmClient::new(governance(config), Arc::new(provider.clone()));

    let err = client.generate("Hello", &[], 300, None).await.unwrap_err();

    assert_eq!(provider.call_count(), 0);
    assert!(matches!(
        err.kind(),
        CivicErrorKind::Governance(e) if matches!(e.kind, GovernanceErrorKind::UnknownModel(_))
    ));
}

#[tokio::test]
async fn test_premium_model_selection() -> anyhow::Result<()> {
    let provider = MockProvider::new_success().with_usage(Some(TokenUsage::new(10, 5)));

    let restricted = GovernedLlmClient::new(governance(test_config()), Arc::new(provider.clone()));
    assert_eq!(restricted.choose_model(Some("legal analysis"), None), "gpt-4o-mini");
    assert_eq!(restricted.choose_model(Some("Deep Dive"), Some(true)), "gpt-4");

    let permissive = GovernedLlmClient::new(
        governance(test_config().with_allow_premium(true)),
        Arc::new(provider.clone()),
    );
    assert_eq!(permissive.choose_model(None, None), "gpt-4o-mini");
    assert_eq!(permissive.choose_model(Some("simple lookup"), None), "gpt-4o-mini");
    assert_eq!(permissive.choose_model(Some("Multi-Step plan"), None), "gpt-4");
    assert_eq!(permissive.choose_model(Some("complex"), Some(false)), "gpt-4o-mini");

    let request = RagRequest::builder()
        .query("Appeal a denied benefit claim")
        .task_hint("legal strategy")
        .allow_premium(true)
        .build()?;
    let completion = restricted.generate_request(&request).await?;
    assert_eq!(completion.model, "gpt-4");
    assert_eq!(
        client_requests(&restricted, "gpt-4"),
        1,
        "premium call recorded against the premium window"
    );
    Ok(())
}

fn client_requests(client: &GovernedLlmClient, model: &str) -> u32 {
    client.governance().status().usage.models[model].requests
}
