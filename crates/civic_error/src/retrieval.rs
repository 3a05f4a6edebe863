//! Retrieval collaborator error types.

/// Error raised by a document retriever.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Retrieval Error: {} at line {} in {}", message, line, file)]
pub struct RetrievalError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl RetrievalError {
    /// Create a new RetrievalError at the current location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
