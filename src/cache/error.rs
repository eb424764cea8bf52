//! Error type for cache reads and writes.

use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::store::TransportError;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The store could not be reached or rejected the command.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The stored value is not a valid envelope.
    #[error(transparent)]
    Decode(#[from] EnvelopeError),
    /// A deferred read was abandoned before it produced a value.
    #[error("cache read canceled before completion")]
    Canceled,
}
