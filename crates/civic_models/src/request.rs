//! Per-call bookkeeping for a governed request.

use std::sync::atomic::{AtomicU32, Ordering};

/// One governed call in flight.
///
/// Lives only for the duration of the call; it carries what the logs and
/// metrics need to describe it.
#[derive(Debug)]
pub struct GovernedRequest {
    /// Target model
    pub model: String,
    /// `"chat"` or `"embeddings"`
    pub kind: &'static str,
    /// Input plus expected output tokens
    pub estimated_tokens: u64,
    attempts: AtomicU32,
}

impl GovernedRequest {
    /// Creates a request that has not been attempted yet.
    pub fn new(model: impl Into<String>, kind: &'static str, estimated_tokens: u64) -> Self {
        Self {
            model: model.into(),
            kind,
            estimated_tokens,
            attempts: AtomicU32::new(0),
        }
    }

    /// Registers another provider attempt and returns its 1-based number.
    pub fn next_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Provider attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}
