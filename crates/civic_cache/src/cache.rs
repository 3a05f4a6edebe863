//! Response cache implementation.

use civic_core::GovernedResponse;
use civic_rate_limit::{CacheSettings, Environment, GovernanceConfig};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Cache entry with value and expiration.
#[derive(Debug, Clone, Getters)]
pub struct CacheEntry {
    value: GovernedResponse,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// Check if this entry is expired.
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    /// Get remaining time until expiration.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.created_at.elapsed())
    }
}

/// Configuration for the response cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
pub struct ResponseCacheConfig {
    /// Default TTL for cached entries (seconds)
    #[serde(default = "default_ttl")]
    default_ttl: u64,

    /// Maximum cache size (number of entries)
    #[serde(default = "default_max_size")]
    max_size: usize,

    /// Whether caching is enabled
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_ttl() -> u64 {
    600
}

fn default_max_size() -> usize {
    1000
}

fn default_enabled() -> bool {
    true
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            max_size: default_max_size(),
            enabled: default_enabled(),
        }
    }
}

impl ResponseCacheConfig {
    /// Cache settings for the given environment; disabled in production.
    pub fn from_settings(settings: &CacheSettings, environment: Environment) -> Self {
        Self {
            default_ttl: settings.ttl_secs,
            max_size: settings.max_entries,
            enabled: environment == Environment::Development,
        }
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Live entries
    pub entries: usize,
    /// Whether the cache is active
    pub enabled: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    access_order: Vec<String>,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            let key = self.access_order.remove(pos);
            self.access_order.push(key);
        }
    }

    fn forget(&mut self, key: &str) {
        self.entries.remove(key);
        if let Some(pos) = self.access_order.iter().position(|k| k == key) {
            self.access_order.remove(pos);
        }
    }

    fn evict_lru(&mut self) {
        if !self.access_order.is_empty() {
            let key = self.access_order.remove(0);
            tracing::debug!(key = %key, "Evicting LRU entry");
            self.entries.remove(&key);
        }
    }
}

/// Cache of governed responses keyed by [`crate::key_for`].
///
/// Safe to share between tasks behind an `Arc`. Expired entries are evicted
/// when looked up. Fallback responses are never stored.
///
/// # Example
///
/// ```
/// use civic_cache::{ResponseCache, ResponseCacheConfig};
/// use civic_core::{Completion, GovernedResponse};
///
/// let cache = ResponseCache::new(ResponseCacheConfig::default());
/// let response = GovernedResponse::Completion(Completion {
///     text: "Apply online.".to_string(),
///     confidence: 0.66,
///     sources: vec!["snap.pdf".to_string()],
///     tokens_used: 40,
///     model: "gpt-4o-mini".to_string(),
///     from_cache: false,
///     fallback_reason: None,
///     fallback_count: 0,
/// });
///
/// cache.put("key", response, None);
/// assert!(cache.get("key").unwrap().from_cache());
/// ```
#[derive(Debug)]
pub struct ResponseCache {
    config: ResponseCacheConfig,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    /// Create a new response cache with configuration.
    pub fn new(config: ResponseCacheConfig) -> Self {
        tracing::debug!(
            default_ttl = config.default_ttl,
            max_size = config.max_size,
            enabled = config.enabled,
            "Creating new ResponseCache"
        );
        Self {
            config,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Create a cache from governance configuration.
    pub fn from_config(config: &GovernanceConfig) -> Self {
        Self::new(ResponseCacheConfig::from_settings(
            &config.cache,
            config.environment,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether lookups and stores do anything.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Default entry lifetime.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.config.default_ttl)
    }

    /// Look up a response, marking it `from_cache`.
    ///
    /// Returns None if:
    /// - Cache is disabled
    /// - Entry doesn't exist
    /// - Entry is expired (it is removed)
    #[tracing::instrument(skip(self), fields(enabled = self.config.enabled))]
    pub fn get(&self, key: &str) -> Option<GovernedResponse> {
        if !self.config.enabled {
            return None;
        }

        let mut state = self.lock();
        let expired = match state.entries.get(key) {
            None => {
                state.misses += 1;
                tracing::debug!("Cache miss");
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            tracing::debug!("Cache entry expired, removing");
            state.forget(key);
            state.misses += 1;
            return None;
        }

        state.touch(key);
        state.hits += 1;
        let entry = state.entries.get(key)?;
        tracing::debug!(time_remaining = ?entry.time_remaining(), "Cache hit");
        Some(entry.value.clone().mark_cached())
    }

    /// Store a response for `ttl` (default TTL when `None`).
    ///
    /// No-op when the cache is disabled or the response came from the
    /// fallback engine.
    #[tracing::instrument(skip(self, response), fields(enabled = self.config.enabled))]
    pub fn put(&self, key: &str, response: GovernedResponse, ttl: Option<Duration>) {
        if !self.config.enabled {
            return;
        }
        if response.is_fallback() {
            tracing::debug!("Not caching fallback response");
            return;
        }

        let ttl = ttl.unwrap_or_else(|| self.default_ttl());
        let mut state = self.lock();

        if state.entries.len() >= self.config.max_size && !state.entries.contains_key(key) {
            state.evict_lru();
        }

        if let Some(pos) = state.access_order.iter().position(|k| k == key) {
            state.access_order.remove(pos);
        }
        state.access_order.push(key.to_string());

        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value: response,
                created_at: Instant::now(),
                ttl,
            },
        );
        tracing::debug!(ttl = ?ttl, size = state.entries.len(), "Inserted entry into cache");
    }

    /// Remove expired entries from cache.
    pub fn cleanup_expired(&self) -> usize {
        let mut state = self.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.forget(key);
        }
        if !expired.is_empty() {
            tracing::info!(
                removed = expired.len(),
                remaining = state.entries.len(),
                "Cleaned up expired cache entries"
            );
        }
        expired.len()
    }

    /// Clear all cache entries.
    pub fn clear(&self) {
        let mut state = self.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.access_order.clear();
        tracing::info!(cleared = count, "Cleared cache");
    }

    /// Get number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Hit/miss counters and size.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
            enabled: self.config.enabled,
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(ResponseCacheConfig::default())
    }
}
