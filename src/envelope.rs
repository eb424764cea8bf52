//! The string encoding used for every stored and published value.
//!
//! Strings travel as-is. Any other JSON value is written as
//! [`JSON_PREFIX_MAGIC`] followed by its JSON text, so a reader can tell a
//! plain string apart from an encoded structure.
//!
//! ```
//! use rediservice::envelope;
//! use serde_json::json;
//!
//! let wire = envelope::encode(&json!({ "words": ["hi"] })).unwrap();
//! assert_eq!(wire, r#"__json__:{"words":["hi"]}"#);
//! assert_eq!(envelope::decode(&wire).unwrap(), json!({ "words": ["hi"] }));
//! assert_eq!(envelope::decode("plain").unwrap(), json!("plain"));
//! ```
//!
//! A string that itself starts with the marker is ambiguous: it decodes as
//! whatever JSON follows the marker, not as the original string.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Marker placed in front of JSON-encoded (non-string) values.
pub const JSON_PREFIX_MAGIC: &str = "__json__:";

/// Malformed envelope payload.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The marker was present but the remainder is not valid JSON.
    #[error("malformed envelope payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a JSON value into its transport string.
pub fn encode(value: &Value) -> Result<String, EnvelopeError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => {
            let json = serde_json::to_string(other)?;
            Ok(format!("{JSON_PREFIX_MAGIC}{json}"))
        }
    }
}

/// Encode any serializable value into its transport string.
pub fn encode_serialize<T: Serialize + ?Sized>(value: &T) -> Result<String, EnvelopeError> {
    encode(&serde_json::to_value(value)?)
}

/// Decode a transport string.
///
/// JSON is only parsed when the string starts with the exact marker;
/// anything else comes back unchanged as a `Value::String`.
pub fn decode(raw: &str) -> Result<Value, EnvelopeError> {
    match raw.strip_prefix(JSON_PREFIX_MAGIC) {
        Some(json) => Ok(serde_json::from_str(json)?),
        None => Ok(Value::String(raw.to_string())),
    }
}
