//! Chat request type.

use crate::Message;
use serde::{Deserialize, Serialize};

/// A fully-formed chat completion request for one model.
///
/// # Examples
///
/// ```
/// use civic_core::{ChatRequest, Message};
///
/// let request = ChatRequest::builder()
///     .model("gpt-4o-mini")
///     .messages(vec![Message::user("Hello")])
///     .max_tokens(300u32)
///     .build()
///     .unwrap();
///
/// assert_eq!(request.temperature, 0.3);
/// assert_eq!(request.top_p, 0.9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,
    /// Ordered conversation messages
    pub messages: Vec<Message>,
    /// Maximum number of completion tokens
    #[builder(default = "300")]
    pub max_tokens: u32,
    /// Sampling temperature
    #[builder(default = "0.3")]
    pub temperature: f32,
    /// Nucleus sampling mass
    #[builder(default = "0.9")]
    pub top_p: f32,
}

impl ChatRequest {
    /// Creates a new request builder.
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    /// Sampling parameters as a JSON object, used for cache keying.
    pub fn params(&self) -> serde_json::Value {
        serde_json::json!({
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "top_p": self.top_p,
        })
    }
}
