//! Configuration for the governance layer.
//!
//! Sources, in order of precedence (later overrides earlier):
//! - Bundled defaults (include_str! from civic.toml)
//! - User config in the home directory (~/.config/civic/civic.toml)
//! - User config in the current directory (./civic.toml)
//! - `CIVIC_`-prefixed environment variables, `__` between sections

use civic_error::{CivicError, CivicResult, ConfigError};
use config::{Config, Environment as EnvSource, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Deployment mode.
///
/// The response cache is only consulted in development.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Local development; caching enabled
    #[default]
    Development,
    /// Production; caching disabled
    Production,
}

/// Rate ceilings and pricing for one model.
///
/// # Example
///
/// ```toml
/// [models."gpt-4o-mini"]
/// rpm = 300
/// tpm = 180_000
/// input_cost_per_1k = 0.15
/// output_cost_per_1k = 0.60
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct ModelProfile {
    /// Requests per minute
    pub rpm: u32,
    /// Tokens per minute
    pub tpm: u64,
    /// USD per 1K input tokens
    #[serde(default)]
    pub input_cost_per_1k: f64,
    /// USD per 1K output tokens
    #[serde(default)]
    pub output_cost_per_1k: f64,
}

impl ModelProfile {
    /// Creates a profile with no pricing.
    pub fn new(rpm: u32, tpm: u64) -> Self {
        Self {
            rpm,
            tpm,
            input_cost_per_1k: 0.0,
            output_cost_per_1k: 0.0,
        }
    }
}

/// Daily and monthly token caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct BudgetSettings {
    /// Tokens allowed per calendar day
    #[serde(default = "default_daily_tokens")]
    pub daily_tokens: u64,
    /// Tokens allowed per calendar month
    #[serde(default = "default_monthly_tokens")]
    pub monthly_tokens: u64,
}

fn default_daily_tokens() -> u64 {
    200_000
}

fn default_monthly_tokens() -> u64 {
    2_000_000
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            daily_tokens: default_daily_tokens(),
            monthly_tokens: default_monthly_tokens(),
        }
    }
}

/// Retry policy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct RetrySettings {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Cap on any single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    300
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetrySettings {
    /// Base delay as a duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a duration.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct CacheSettings {
    /// Entry lifetime in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum number of entries before LRU eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_secs() -> u64 {
    600
}

fn default_max_entries() -> usize {
    1000
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheSettings {
    /// Entry lifetime as a duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level governance configuration.
///
/// # Example
///
/// ```no_run
/// use civic_rate_limit::GovernanceConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GovernanceConfig::load()?;
/// let profile = config.profile(&config.fast_model).unwrap();
/// println!("{} rpm: {}", config.fast_model, profile.rpm);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct GovernanceConfig {
    /// Deployment mode
    #[serde(default)]
    pub environment: Environment,
    /// Whether complex task hints may use the premium model
    #[serde(default)]
    pub allow_premium: bool,
    /// Default chat model
    #[serde(default = "default_fast_model")]
    #[setters(into)]
    pub fast_model: String,
    /// Chat model for complex tasks
    #[serde(default = "default_premium_model")]
    #[setters(into)]
    pub premium_model: String,
    /// Embedding model
    #[serde(default = "default_embedding_model")]
    #[setters(into)]
    pub embedding_model: String,
    /// Expected embedding dimensionality
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    /// Longest wait for rate-ceiling capacity, in seconds
    #[serde(default = "default_capacity_wait_secs")]
    pub capacity_wait_secs: u64,
    /// Capacity poll interval, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Chat sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Chat nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Token caps
    #[serde(default)]
    pub budget: BudgetSettings,
    /// Retry policy
    #[serde(default)]
    pub retry: RetrySettings,
    /// Response cache
    #[serde(default)]
    pub cache: CacheSettings,
    /// Per-model ceilings and pricing
    #[serde(default = "default_models")]
    pub models: HashMap<String, ModelProfile>,
}

fn default_fast_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_premium_model() -> String {
    "gpt-4".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_capacity_wait_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

fn default_models() -> HashMap<String, ModelProfile> {
    HashMap::from([
        (
            default_fast_model(),
            ModelProfile::new(300, 180_000)
                .with_input_cost_per_1k(0.15)
                .with_output_cost_per_1k(0.60),
        ),
        (
            default_premium_model(),
            ModelProfile::new(60, 30_000)
                .with_input_cost_per_1k(5.0)
                .with_output_cost_per_1k(15.0),
        ),
        (
            default_embedding_model(),
            ModelProfile::new(3000, 1_000_000).with_input_cost_per_1k(0.10),
        ),
    ])
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            allow_premium: false,
            fast_model: default_fast_model(),
            premium_model: default_premium_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            capacity_wait_secs: default_capacity_wait_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            budget: BudgetSettings::default(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
            models: default_models(),
        }
    }
}

impl GovernanceConfig {
    /// Load configuration from a specific file path.
    ///
    /// Fields missing from the file take their built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> CivicResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                CivicError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CivicError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled.
    ///
    /// User config files are optional and silently skipped if not found.
    #[instrument]
    pub fn load() -> CivicResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        const DEFAULT_CONFIG: &str = include_str!("../../../civic.toml");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/civic/civic.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("civic").required(false))
            .add_source(
                EnvSource::with_prefix("CIVIC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                CivicError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                CivicError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` naming the first problem found.
    pub fn validate(&self) -> CivicResult<()> {
        if self.budget.daily_tokens == 0 || self.budget.monthly_tokens == 0 {
            return Err(ConfigError::new("Token budgets must be positive").into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::new(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            ))
            .into());
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::new("poll_interval_ms must be positive").into());
        }
        if self.embedding_dimensions == 0 {
            return Err(ConfigError::new("embedding_dimensions must be positive").into());
        }
        for model in [&self.fast_model, &self.premium_model, &self.embedding_model] {
            let profile = self.profile(model).ok_or_else(|| {
                ConfigError::new(format!("No [models.\"{}\"] profile configured", model))
            })?;
            if profile.rpm == 0 || profile.tpm == 0 {
                return Err(ConfigError::new(format!(
                    "Model {} must have positive rpm and tpm",
                    model
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Profile for a model, if configured.
    pub fn profile(&self, model: &str) -> Option<&ModelProfile> {
        self.models.get(model)
    }

    /// True when running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Capacity wait as a duration.
    pub fn capacity_wait(&self) -> Duration {
        Duration::from_secs(self.capacity_wait_secs)
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
