//! Error types for the Civic pipeline.
//!
//! This crate provides the foundation error types used throughout the Civic workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! Only two conditions ever reach a caller of the governed clients as an
//! error: a capacity wait that timed out and an unknown model name. Provider
//! failures are absorbed by the fallback engine and surface only as a
//! fallback reason on the response.
//!
//! # Examples
//!
//! ```
//! use civic_error::{CivicResult, ConfigError};
//!
//! fn load() -> CivicResult<String> {
//!     Err(ConfigError::new("daily budget must be positive"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod governance;
mod json;
mod provider;
mod retrieval;

pub use config::ConfigError;
pub use error::{CivicError, CivicErrorKind, CivicResult};
pub use governance::{GovernanceError, GovernanceErrorKind};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind, RetryableError};
pub use retrieval::RetrievalError;
