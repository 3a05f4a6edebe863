//! Governance (rate limit and budget) error types.

/// Hard failures raised by the governance layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GovernanceErrorKind {
    /// Rate ceilings did not clear within the allowed wait
    #[display("Timed out after {}ms waiting for capacity on {}", waited_ms, model)]
    CapacityTimeout {
        /// Model whose window stayed saturated
        model: String,
        /// How long the caller waited
        waited_ms: u64,
    },
    /// No profile is configured for the model
    #[display("Unknown model: {}", _0)]
    UnknownModel(String),
}

/// Governance error with source location tracking.
///
/// # Examples
///
/// ```
/// use civic_error::{GovernanceError, GovernanceErrorKind};
///
/// let err = GovernanceError::new(GovernanceErrorKind::UnknownModel("gpt-5".to_string()));
/// assert!(format!("{}", err).contains("gpt-5"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Governance Error: {} at line {} in {}", kind, line, file)]
pub struct GovernanceError {
    /// The kind of error that occurred
    pub kind: GovernanceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GovernanceError {
    /// Create a new GovernanceError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GovernanceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
