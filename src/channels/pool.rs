//! Bounded pool of connections keyed by channel name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::{Connector, TransportError};

/// What a full pool does when a new channel asks for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    /// Fail with [`TransportError::PoolExhausted`].
    Reject,
    /// Close the least recently used connection to make room.
    EvictLeastRecent,
}

struct Slot<T> {
    conn: Arc<T>,
    last_used: u64,
}

struct Slots<T> {
    entries: HashMap<String, Slot<T>>,
    clock: u64,
}

/// Keeps one dedicated connection per channel, up to `capacity` channels.
///
/// A connection is opened on the first checkout for a channel and handed
/// back on every later checkout until it is released or evicted.
pub struct ConnectionPool<C: Connector> {
    connector: Arc<C>,
    capacity: usize,
    overflow: Overflow,
    slots: Mutex<Slots<C::Connection>>,
}

impl<C: Connector> ConnectionPool<C> {
    /// Pool that rejects new channels once full.
    pub fn new(connector: Arc<C>, capacity: usize) -> Self {
        Self::with_overflow(connector, capacity, Overflow::Reject)
    }

    pub fn with_overflow(connector: Arc<C>, capacity: usize, overflow: Overflow) -> Self {
        Self {
            connector,
            capacity,
            overflow,
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Get the connection for `channel`, opening one if needed.
    pub fn checkout(&self, channel: &str) -> Result<Arc<C::Connection>, TransportError> {
        let mut slots = self.slots.lock();
        slots.clock += 1;
        let now = slots.clock;

        if let Some(slot) = slots.entries.get_mut(channel) {
            slot.last_used = now;
            return Ok(Arc::clone(&slot.conn));
        }

        if slots.entries.len() >= self.capacity {
            match self.overflow {
                Overflow::Reject => {
                    return Err(TransportError::PoolExhausted {
                        capacity: self.capacity,
                    })
                }
                Overflow::EvictLeastRecent => {
                    let oldest = slots
                        .entries
                        .iter()
                        .min_by_key(|(_, slot)| slot.last_used)
                        .map(|(name, _)| name.clone());
                    if let Some(oldest) = oldest {
                        slots.entries.remove(&oldest);
                        tracing::trace!(channel = %oldest, "evicted pooled connection");
                    }
                }
            }
        }

        // A zero-capacity evicting pool still hands out unpooled connections.
        let conn = Arc::new(self.connector.connect()?);
        if slots.entries.len() < self.capacity {
            slots.entries.insert(
                channel.to_string(),
                Slot {
                    conn: Arc::clone(&conn),
                    last_used: now,
                },
            );
        }
        Ok(conn)
    }

    /// Remove the connection for `channel` from the pool.
    pub fn release(&self, channel: &str) -> Option<Arc<C::Connection>> {
        self.slots.lock().entries.remove(channel).map(|slot| slot.conn)
    }

    /// Remove and return every pooled connection.
    pub fn drain(&self) -> Vec<(String, Arc<C::Connection>)> {
        self.slots
            .lock()
            .entries
            .drain()
            .map(|(name, slot)| (name, slot.conn))
            .collect()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.slots.lock().entries.contains_key(channel)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
