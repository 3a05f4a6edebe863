//! Core data types for the Civic governed RAG pipeline.
//!
//! This crate provides the request, response and document types shared by
//! the governance layer, the fallback engine and the provider clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod fallback_reason;
mod message;
mod request;
mod response;
mod role;
mod service;
mod telemetry;
mod token_counting;

pub use document::RetrievedDocument;
pub use fallback_reason::FallbackReason;
pub use message::Message;
pub use request::{ChatRequest, ChatRequestBuilder, ChatRequestBuilderError};
pub use response::{Completion, EmbeddingBatch, GovernedResponse};
pub use role::Role;
pub use service::ServiceCategory;
pub use telemetry::init_tracing;
pub use token_counting::{TokenUsage, estimate_message_tokens, estimate_tokens};
