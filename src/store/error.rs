//! Error type for store connections.

use thiserror::Error;

use crate::envelope::EnvelopeError;

/// Any failure talking to the backing key-value / pub-sub store.
///
/// The bus never retries these; they are handed back to the caller through
/// the returned `Result`, the cache callback, or the deferred rejection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The store URL could not be understood.
    #[error("invalid store url: {0}")]
    InvalidUrl(String),
    /// The store rejected the configured password.
    #[error("authentication failed")]
    AuthFailed,
    /// The connection was refused or has gone away.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// A per-channel connection pool is full.
    #[error("connection pool exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Maximum number of pooled connections.
        capacity: usize,
    },
    /// A value could not be encoded for the wire.
    #[error("encode failed: {0}")]
    Encode(#[from] EnvelopeError),
    /// Store configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
