//! Channel transport — publish / subscribe over named channels.
//!
//! Messages are enveloped on the way out and decoded on the way in. Each
//! channel gets one pooled outbound connection for publishing and one pooled
//! inbound connection plus a delivery thread for subscribers. Every listener
//! registered on a channel shares that thread and runs in registration order.
//!
//! ## Example
//!
//! ```
//! use std::sync::{mpsc, Arc};
//! use std::time::Duration;
//! use rediservice::channels::Channels;
//! use rediservice::store::{MemoryConnector, MemoryServer, StoreConfig};
//! use serde_json::json;
//!
//! let connector = MemoryConnector::new(MemoryServer::new(), StoreConfig::testing());
//! let channels = Channels::new(Arc::new(connector), 8);
//!
//! let (tx, rx) = mpsc::channel();
//! channels
//!     .subscribe("news", move |message, _channel| {
//!         tx.send(message)?;
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! channels.publish("news", &json!({ "headline": "hi" })).unwrap();
//! let received = rx.recv_timeout(Duration::from_secs(1)).unwrap();
//! assert_eq!(received, json!({ "headline": "hi" }));
//! ```

mod pool;

pub use pool::{ConnectionPool, Overflow};

use std::collections::HashMap;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::envelope;
use crate::store::{Connector, PubSub, TransportError};

/// Error returned by a listener; logged and counted, never propagated.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked with each decoded message and the channel it came from.
pub type Listener = Arc<dyn Fn(Value, &str) -> Result<(), ListenerError> + Send + Sync>;

/// Counters from a channel's delivery thread.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Frames received from the store.
    pub received: usize,
    /// Listener invocations that returned `Ok`.
    pub delivered: usize,
    /// Listener invocations that returned an error.
    pub failed: usize,
    /// Frames whose envelope could not be decoded.
    pub malformed: usize,
}

struct Subscription {
    listeners: Arc<RwLock<Vec<Listener>>>,
    worker: Option<JoinHandle<SubscriptionStats>>,
}

/// Publish / subscribe front end over a store [`Connector`].
pub struct Channels<C: Connector> {
    outbound: ConnectionPool<C>,
    inbound: ConnectionPool<C>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
}

impl<C: Connector> Channels<C> {
    /// Create a transport whose per-channel pools each hold at most `pool_size` connections.
    ///
    /// Publishing never runs out of connections: a full outbound pool closes
    /// its least recently used one. Subscribing to more than `pool_size`
    /// channels fails with [`TransportError::PoolExhausted`].
    pub fn new(connector: Arc<C>, pool_size: usize) -> Self {
        Self {
            outbound: ConnectionPool::with_overflow(
                Arc::clone(&connector),
                pool_size,
                Overflow::EvictLeastRecent,
            ),
            inbound: ConnectionPool::new(connector, pool_size),
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Envelope `message` and publish it on `channel`.
    ///
    /// Returns the number of store-level subscribers that received it.
    pub fn publish(&self, channel: &str, message: &Value) -> Result<usize, TransportError> {
        let payload = envelope::encode(message)?;
        let conn = self.outbound.checkout(channel)?;
        let receivers = conn.publish(channel, &payload)?;
        tracing::debug!(channel, receivers, "published");
        Ok(receivers)
    }

    /// Register `on_message` for every message published on `channel`.
    ///
    /// The first listener on a channel opens its inbound connection and
    /// delivery thread; later listeners join the existing ones. Frames that
    /// fail to decode are delivered as `{"error": "<reason>"}`.
    pub fn subscribe<F>(&self, channel: &str, on_message: F) -> Result<(), TransportError>
    where
        F: Fn(Value, &str) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(on_message);
        let mut subscriptions = self.subscriptions.lock();

        if let Some(existing) = subscriptions.get(channel) {
            existing.listeners.write().push(listener);
            tracing::debug!(channel, "added listener");
            return Ok(());
        }

        let conn = self.inbound.checkout(channel)?;
        let frames = match conn.subscribe(channel) {
            Ok(frames) => frames,
            Err(err) => {
                self.inbound.release(channel);
                return Err(err);
            }
        };

        let listeners = Arc::new(RwLock::new(vec![listener]));
        let worker = {
            let channel = channel.to_string();
            let listeners = Arc::clone(&listeners);
            thread::Builder::new()
                .name(format!("channel:{channel}"))
                .spawn(move || deliver(channel, frames, listeners))
                .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?
        };

        subscriptions.insert(
            channel.to_string(),
            Subscription {
                listeners,
                worker: Some(worker),
            },
        );
        tracing::debug!(channel, "subscribed");
        Ok(())
    }

    /// Stop delivery on `channel` and release its inbound connection.
    ///
    /// Returns the delivery thread's counters, or `None` if the channel was
    /// not subscribed. When called from the channel's own delivery thread the
    /// thread is not joined and the counters are empty.
    pub fn unsubscribe(&self, channel: &str) -> Result<Option<SubscriptionStats>, TransportError> {
        let Some(mut subscription) = self.subscriptions.lock().remove(channel) else {
            return Ok(None);
        };

        let result = match self.inbound.release(channel) {
            Some(conn) => conn.unsubscribe(channel),
            None => Ok(()),
        };

        let stats = match subscription.worker.take() {
            Some(worker) if worker.thread().id() != thread::current().id() => {
                worker.join().unwrap_or_default()
            }
            _ => SubscriptionStats::default(),
        };

        result?;
        tracing::debug!(channel, ?stats, "unsubscribed");
        Ok(Some(stats))
    }

    /// Unsubscribe from every channel.
    ///
    /// Keeps going past failures and reports the first one.
    pub fn unsubscribe_all(&self) -> Result<(), TransportError> {
        let channels: Vec<String> = self.subscriptions.lock().keys().cloned().collect();
        let mut first_error = None;
        for channel in channels {
            if let Err(err) = self.unsubscribe(&channel) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Names of the currently subscribed channels.
    pub fn subscribed(&self) -> Vec<String> {
        self.subscriptions.lock().keys().cloned().collect()
    }

    /// Number of listeners registered on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.subscriptions
            .lock()
            .get(channel)
            .map_or(0, |s| s.listeners.read().len())
    }
}

impl<C: Connector> Drop for Channels<C> {
    fn drop(&mut self) {
        if let Err(err) = self.unsubscribe_all() {
            tracing::warn!(error = %err, "failed to unsubscribe during shutdown");
        }
        self.outbound.drain();
    }
}

fn deliver(
    channel: String,
    frames: Receiver<String>,
    listeners: Arc<RwLock<Vec<Listener>>>,
) -> SubscriptionStats {
    let mut stats = SubscriptionStats::default();

    for frame in frames {
        stats.received += 1;

        let message = match envelope::decode(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(%channel, error = %err, "undecodable frame");
                stats.malformed += 1;
                json!({ "error": err.to_string() })
            }
        };

        // Snapshot so listeners may subscribe more listeners without deadlocking.
        let current: Vec<Listener> = listeners.read().clone();
        for listener in current {
            match listener(message.clone(), &channel) {
                Ok(()) => stats.delivered += 1,
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(%channel, error = %err, "listener failed");
                }
            }
        }
    }

    tracing::debug!(%channel, "delivery stopped");
    stats
}
