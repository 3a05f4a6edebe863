//! Role types for chat participants.

use serde::{Deserialize, Serialize};

/// Speaker of a chat message.
///
/// Serializes in the lowercase form chat-completion APIs expect.
///
/// # Examples
///
/// ```
/// use civic_core::Role;
///
/// assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
/// assert_eq!(format!("{}", Role::User), "user");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions framing the conversation
    #[display("system")]
    System,
    /// The person asking
    #[display("user")]
    User,
    /// The model's reply
    #[display("assistant")]
    Assistant,
}
