//! Top-level error wrapper types.

use crate::{ConfigError, GovernanceError, JsonError, ProviderError, RetrievalError};

/// Every error condition the Civic crates can produce.
///
/// # Examples
///
/// ```
/// use civic_error::{CivicError, ConfigError};
///
/// let err: CivicError = ConfigError::new("bad value").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CivicErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Provider error that escaped the fallback path
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Rate limit or budget governance error
    #[from(GovernanceError)]
    Governance(GovernanceError),
    /// Document retrieval error
    #[from(RetrievalError)]
    Retrieval(RetrievalError),
}

/// Civic error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Civic Error: {}", _0)]
pub struct CivicError(Box<CivicErrorKind>);

impl CivicError {
    /// Create a new error from a kind.
    pub fn new(kind: CivicErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CivicErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to CivicErrorKind
impl<T> From<T> for CivicError
where
    T: Into<CivicErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Civic operations.
pub type CivicResult<T> = std::result::Result<T, CivicError>;
