//! Governed embedding client tests against a scripted provider.

mod test_utils;

use civic_core::FallbackReason;
use civic_models::GovernedEmbeddingClient;
use civic_rate_limit::BudgetSettings;
use std::sync::Arc;
use test_utils::{MockProvider, governance, test_config};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_embed_returns_vector_per_text() -> anyhow::Result<()> {
    let provider = MockProvider::new_success();
    let client = GovernedEmbeddingClient::new(governance(test_config()), Arc::new(provider.clone()));

    let batch = client.embed(&texts(&["snap", "medicaid", "childcare"])).await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(batch.vectors.len(), 3);
    assert!(batch.vectors.iter().all(|v| v.len() == 4));
    assert!(!batch.is_partial());
    assert_eq!(batch.model, "text-embedding-ada-002");
    assert_eq!(batch.tokens_used, 150);
    Ok(())
}

#[tokio::test]
async fn test_empty_input_skips_provider() -> anyhow::Result<()> {
    let provider = MockProvider::new_success();
    let client = GovernedEmbeddingClient::new(governance(test_config()), Arc::new(provider.clone()));

    let batch = client.embed(&[]).await?;

    assert_eq!(provider.call_count(), 0);
    assert!(batch.vectors.is_empty());
    assert!(batch.dropped.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_vectors_are_dropped() -> anyhow::Result<()> {
    let provider = MockProvider::new_success().with_vectors(vec![
        vec![0.1, 0.2, 0.3, 0.4],
        vec![0.1, 0.2],
        vec![0.4, 0.3, 0.2, 0.1],
    ]);
    let client = GovernedEmbeddingClient::new(governance(test_config()), Arc::new(provider.clone()));

    let batch = client.embed(&texts(&["a", "b", "c"])).await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(batch.dropped, vec![1]);
    assert_eq!(
        batch.vectors,
        vec![vec![0.1, 0.2, 0.3, 0.4], vec![0.4, 0.3, 0.2, 0.1]]
    );
    assert!(batch.fallback_reason.is_none());
    Ok(())
}

#[tokio::test]
async fn test_all_malformed_falls_back_after_retries() -> anyhow::Result<()> {
    let provider = MockProvider::new_success().with_vectors(vec![vec![f32::NAN; 4]]);
    let client = GovernedEmbeddingClient::new(governance(test_config()), Arc::new(provider.clone()));

    let batch = client.embed(&texts(&["apply for snap"])).await?;

    assert_eq!(provider.call_count(), 3);
    assert_eq!(batch.fallback_reason, Some(FallbackReason::UnknownError));
    assert_eq!(batch.model, "mock-fallback-embeddings");
    assert_eq!(batch.vectors.len(), 1);
    assert_eq!(batch.vectors[0].len(), 4);
    assert_eq!(client.governance().status().usage.budget.daily_used, 0);
    Ok(())
}

#[tokio::test]
async fn test_embeddings_are_cached() -> anyhow::Result<()> {
    let provider = MockProvider::new_success();
    let client = GovernedEmbeddingClient::new(governance(test_config()), Arc::new(provider.clone()));
    let input = texts(&["medicaid renewal"]);

    let first = client.embed(&input).await?;
    let second = client.embed(&input).await?;

    assert_eq!(provider.call_count(), 1);
    assert!(second.from_cache);
    assert_eq!(first.vectors, second.vectors);

    // The cache hit gives its reservation back
    let usage = client.governance().status().usage;
    assert_eq!(usage.budget.daily_used, 150);
    assert_eq!(usage.models["text-embedding-ada-002"].requests, 1);
    Ok(())
}

#[tokio::test]
async fn test_budget_exhaustion_serves_mock_vectors() -> anyhow::Result<()> {
    let config = test_config().with_budget(BudgetSettings {
        daily_tokens: 1,
        monthly_tokens: 1_000,
    });
    let provider = MockProvider::new_success();
    let client = GovernedEmbeddingClient::new(governance(config), Arc::new(provider.clone()));
    let input = texts(&["unemployment benefits", "unemployment benefits"]);

    let batch = client.embed(&input).await?;

    assert_eq!(provider.call_count(), 0);
    assert_eq!(batch.fallback_reason, Some(FallbackReason::DailyBudgetExceeded));
    assert_eq!(batch.vectors[0], batch.vectors[1]);
    assert_eq!(batch.vectors[0][0], 0.5);
    Ok(())
}
