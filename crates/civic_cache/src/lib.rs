//! Response caching for development runs.
//!
//! Identical governed requests made while iterating locally are answered
//! from memory instead of spending provider quota. The cache is inert in
//! production.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod key;

pub use cache::{CacheEntry, CacheStats, ResponseCache, ResponseCacheConfig, ResponseCacheConfigBuilder};
pub use key::key_for;
