//! Combined connection trait and the factory that opens connections.

use super::key_value::KeyValue;
use super::pub_sub::PubSub;
use super::TransportError;

/// A single store connection, usable for both key-value and pub/sub commands.
pub trait Connection: KeyValue + PubSub + 'static {}

// Blanket implementation
impl<T: KeyValue + PubSub + 'static> Connection for T {}

/// Opens new connections to a store.
///
/// The channel transport asks for one connection per channel and keeps it
/// pooled, so `connect` should be cheap but is not called per message.
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced by this connector.
    type Connection: Connection;

    /// Open a fresh connection.
    fn connect(&self) -> Result<Self::Connection, TransportError>;
}
