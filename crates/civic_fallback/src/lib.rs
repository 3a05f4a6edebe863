//! Mock fallback engine.
//!
//! Once a budget is exhausted or the provider keeps failing, the governed
//! clients switch to this engine. It answers with service-aware canned text
//! and deterministic pseudo-embeddings so downstream code keeps working
//! without spending anything. It stays active until explicitly deactivated.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod detect;
mod engine;
mod templates;

pub use detect::{detect_category, embedding_indicator, intent_prefix};
pub use engine::{FallbackStatus, MOCK_CONFIDENCE, MockFallback};
pub use templates::templates_for;
