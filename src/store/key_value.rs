//! Key-value half of a store connection.

use super::TransportError;

/// Get / set / expire over raw (already enveloped) string values.
pub trait KeyValue: Send + Sync {
    /// Read the raw value stored at `key`, `None` if missing or expired.
    fn get(&self, key: &str) -> Result<Option<String>, TransportError>;

    /// Write `value` at `key`. Any expiry previously set on the key is cleared.
    fn set(&self, key: &str, value: &str) -> Result<(), TransportError>;

    /// Expire `key` after `seconds`. Returns `false` when the key does not exist.
    fn expire(&self, key: &str, seconds: u64) -> Result<bool, TransportError>;
}
