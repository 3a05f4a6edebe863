//! Token estimation and usage accounting.

use crate::Message;
use serde::{Deserialize, Serialize};

/// Estimates the token count of a text as one token per four characters.
///
/// Characters are Unicode scalar values. The estimate rounds up, so any
/// non-empty text is at least one token.
///
/// # Examples
///
/// ```
/// use civic_core::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

/// Estimates the prompt tokens of a message list.
pub fn estimate_message_tokens(messages: &[Message]) -> u64 {
    messages.iter().map(|m| estimate_tokens(&m.content)).sum()
}

/// Token usage for a single provider call.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct TokenUsage {
    /// Tokens in the prompt/input
    input_tokens: u64,
    /// Tokens in the response/output
    output_tokens: u64,
}

impl TokenUsage {
    /// Creates a new usage record.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Input plus output tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Cost in USD given per-1K-token prices.
    pub fn cost(&self, input_cost_per_1k: f64, output_cost_per_1k: f64) -> f64 {
        (self.input_tokens as f64 * input_cost_per_1k
            + self.output_tokens as f64 * output_cost_per_1k)
            / 1000.0
    }
}
