//! Error type for bus operations and message handlers.

use std::error::Error;

use serde_json::Value;
use thiserror::Error;

use crate::cache::CacheError;
use crate::store::TransportError;

#[derive(Debug, Error)]
pub enum BusError {
    /// A mapping was required but something else was passed. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Message data could not be deserialized into the requested type.
    #[error("decode failed: {0}")]
    Decode(String),
    /// The store failed; propagated untouched.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A cache read or write failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// The bus was dropped while an activation or handler still referred to it.
    #[error("bus closed")]
    Closed,
    /// Error raised by user handler code.
    #[error("handler error: {0}")]
    Handler(Box<dyn Error + Send + Sync>),
}

impl BusError {
    /// `"<what>" must be an object, not <type>`.
    pub(crate) fn not_a_mapping(what: &str, value: &Value) -> Self {
        BusError::InvalidArgument(format!(
            "\"{what}\" must be an object, not {}",
            json_type(value)
        ))
    }

    /// Wrap an arbitrary error from handler code.
    pub fn handler(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        BusError::Handler(err.into())
    }
}

impl From<serde_json::Error> for BusError {
    fn from(err: serde_json::Error) -> Self {
        BusError::Decode(err.to_string())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
