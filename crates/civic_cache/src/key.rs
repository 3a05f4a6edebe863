//! Deterministic cache keys.

use civic_error::JsonError;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Rebuilds a JSON value with every object's keys in sorted order.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, canonicalize(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Cache key for a request: SHA-256 (hex) of the canonical JSON of
/// `{model, messages, params}`.
///
/// Object key order inside `params` (or anywhere else) never changes the key.
///
/// # Errors
///
/// Returns a `JsonError` if `messages` cannot be represented as JSON.
///
/// # Examples
///
/// ```
/// use civic_cache::key_for;
/// use serde_json::json;
///
/// let a = key_for("gpt-4o-mini", &["hi"], &json!({"max_tokens": 10, "temperature": 0.3})).unwrap();
/// let b = key_for("gpt-4o-mini", &["hi"], &json!({"temperature": 0.3, "max_tokens": 10})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn key_for<M>(model: &str, messages: &M, params: &Value) -> Result<String, JsonError>
where
    M: Serialize + ?Sized,
{
    let messages = serde_json::to_value(messages)
        .map_err(|e| JsonError::new(format!("Failed to serialize messages for cache key: {}", e)))?;

    let mut payload = Map::new();
    payload.insert("messages".to_string(), messages);
    payload.insert("model".to_string(), Value::String(model.to_string()));
    payload.insert("params".to_string(), params.clone());

    let canonical = serde_json::to_string(&canonicalize(Value::Object(payload)))
        .map_err(|e| JsonError::new(format!("Failed to encode cache key payload: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
