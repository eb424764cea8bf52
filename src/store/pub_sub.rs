//! Publish / subscribe half of a store connection.

use std::sync::mpsc::Receiver;

use super::TransportError;

/// Fan-out messaging over named channels.
///
/// Every subscriber of a channel receives every frame published after it
/// subscribed. Frames are raw (already enveloped) strings.
pub trait PubSub: Send + Sync {
    /// Publish a frame. Returns the number of subscribers that received it.
    fn publish(&self, channel: &str, payload: &str) -> Result<usize, TransportError>;

    /// Subscribe this connection to `channel`.
    ///
    /// The receiver yields frames until the connection unsubscribes or is
    /// dropped, at which point iteration ends.
    fn subscribe(&self, channel: &str) -> Result<Receiver<String>, TransportError>;

    /// Stop delivering `channel` to this connection.
    fn unsubscribe(&self, channel: &str) -> Result<(), TransportError>;
}
