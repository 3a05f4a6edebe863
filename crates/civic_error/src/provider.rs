//! Provider error types and retry classification.

/// Failure conditions reported by an LLM or embedding provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ProviderErrorKind {
    /// The provider rejected the call because a rate limit was hit.
    #[display("Rate limited by provider (retry after {:?}s)", retry_after_secs)]
    RateLimited {
        /// Seconds suggested by the provider, if any
        retry_after_secs: Option<u64>,
    },
    /// Non-success HTTP status other than 429
    #[display("HTTP {} error: {}", status, message)]
    Http {
        /// HTTP status code
        status: u16,
        /// Error body or reason
        message: String,
    },
    /// Transport failure (connection reset, timeout, DNS)
    #[display("Request failed: {}", _0)]
    Request(String),
    /// Response could not be interpreted
    #[display("Invalid response: {}", _0)]
    InvalidResponse(String),
    /// No API key configured for the provider
    #[display("API key not configured ({} not set)", _0)]
    MissingApiKey(String),
}

impl ProviderErrorKind {
    /// Check if this error should be retried.
    ///
    /// Authentication and request-shape failures are permanent; everything
    /// else may clear up on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderErrorKind::RateLimited { .. } => true,
            ProviderErrorKind::Http { status, .. } => !matches!(*status, 400 | 401 | 403 | 404),
            ProviderErrorKind::Request(_) => true,
            ProviderErrorKind::InvalidResponse(_) => true,
            ProviderErrorKind::MissingApiKey(_) => false,
        }
    }

    /// Whether this is a provider rate-limit signal.
    pub fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited { .. } | ProviderErrorKind::Http { status: 429, .. }
        )
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use civic_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::RateLimited { retry_after_secs: Some(2) });
/// assert!(err.is_retryable());
/// assert!(err.kind.is_rate_limit());
///
/// let err = ProviderError::new(ProviderErrorKind::Http {
///     status: 401,
///     message: "bad key".to_string(),
/// });
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// The governed clients consult this to decide whether a failed provider
/// call is attempted again or escalated straight to the fallback engine.
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
