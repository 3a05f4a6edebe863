//! Governed LLM and embedding clients.
//!
//! Every provider call made through this crate passes the same checkpoints:
//! token estimate, fallback check, budget gate, response cache, retry with
//! backoff, usage recording. When a budget is exhausted or retries run out
//! the caller still gets a well-formed response from the mock fallback
//! engine; the only errors returned are a capacity-wait timeout and an
//! unknown model.
//!
//! # Example
//!
//! ```no_run
//! use civic_models::{Governance, GovernedLlmClient, OpenAiProvider};
//! use civic_rate_limit::GovernanceConfig;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let governance = Governance::from_config(GovernanceConfig::load()?);
//! let client = GovernedLlmClient::new(governance, Arc::new(OpenAiProvider::from_env()));
//! let answer = client.generate("How do I apply for SNAP?", &[], 300, None).await?;
//! println!("{} ({})", answer.text, answer.model);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod embeddings;
mod governance;
mod llm;
mod metrics;
mod openai;
mod prompts;
mod request;
mod scoring;

pub use embeddings::GovernedEmbeddingClient;
pub use governance::{Admission, Governance, GovernanceStatus};
pub use llm::{GovernedLlmClient, PREMIUM_HINT_KEYWORDS, RagRequest, RagRequestBuilder};
pub use metrics::{GovernanceMetrics, classify_error};
pub use openai::OpenAiProvider;
pub use prompts::{SYSTEM_PROMPT, SYSTEM_PROMPT_LIMIT, build_messages, format_context, user_prompt};
pub use request::GovernedRequest;
pub use scoring::DocumentCountScorer;
