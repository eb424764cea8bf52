//! In-memory store for testing and single-process deployments.
//!
//! `MemoryServer` plays the role of the store process: it owns every
//! database and the channel fan-out table. `MemoryConnector` opens
//! `MemoryConnection`s against it the same way a network client would,
//! honoring the URL scheme, password, database index and key prefix from a
//! [`StoreConfig`].
//!
//! ## Example
//!
//! ```
//! use rediservice::store::{KeyValue, Connector, MemoryConnector, MemoryServer, StoreConfig};
//!
//! let server = MemoryServer::new();
//! let connector = MemoryConnector::new(server.clone(), StoreConfig::testing());
//! let conn = connector.connect().unwrap();
//!
//! conn.set("greeting", "hello").unwrap();
//! assert_eq!(conn.get("greeting").unwrap().as_deref(), Some("hello"));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::connection::Connector;
use super::key_value::KeyValue;
use super::pub_sub::PubSub;
use super::settings::StoreConfig;
use super::TransportError;

const SCHEMES: [&str; 3] = ["redis://", "rediss://", "memory://"];

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

struct Subscriber {
    connection: u64,
    frames: Sender<String>,
}

#[derive(Default)]
struct ServerState {
    databases: HashMap<u32, HashMap<String, Entry>>,
    channels: HashMap<String, Vec<Subscriber>>,
}

struct Shared {
    state: Mutex<ServerState>,
    password: Option<String>,
    next_connection: AtomicU64,
}

/// Shared in-memory store.
///
/// Cheap to clone; clones refer to the same data. Channels are global to the
/// server while keys live in the database selected by each connection.
#[derive(Clone)]
pub struct MemoryServer {
    shared: Arc<Shared>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryServer {
    /// Create an open server that accepts any password.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a server that only accepts connections presenting `password`.
    pub fn with_password(password: impl Into<String>) -> Self {
        Self::build(Some(password.into()))
    }

    fn build(password: Option<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ServerState::default()),
                password,
                next_connection: AtomicU64::new(1),
            }),
        }
    }

    /// Number of live keys in `database`.
    pub fn key_count(&self, database: u32) -> usize {
        let now = Instant::now();
        self.shared
            .state
            .lock()
            .databases
            .get(&database)
            .map_or(0, |db| db.values().filter(|e| e.is_live(now)).count())
    }

    /// Number of subscriptions currently registered on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.shared
            .state
            .lock()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }
}

/// Opens connections to a [`MemoryServer`].
#[derive(Clone)]
pub struct MemoryConnector {
    server: MemoryServer,
    config: StoreConfig,
}

impl MemoryConnector {
    pub fn new(server: MemoryServer, config: StoreConfig) -> Self {
        Self { server, config }
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<MemoryConnection, TransportError> {
        if !SCHEMES.iter().any(|scheme| self.config.url.starts_with(scheme)) {
            return Err(TransportError::InvalidUrl(self.config.url.clone()));
        }

        let shared = &self.server.shared;
        if let Some(required) = &shared.password {
            if self.config.password.as_deref() != Some(required.as_str()) {
                return Err(TransportError::AuthFailed);
            }
        }

        let id = shared.next_connection.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(connection = id, url = %self.config.url, db = self.config.database, "connected");

        Ok(MemoryConnection {
            id,
            shared: Arc::clone(shared),
            database: self.config.database,
            prefix: self.config.prefix.clone().unwrap_or_default(),
        })
    }
}

/// One client connection to a [`MemoryServer`].
///
/// Dropping the connection removes all of its subscriptions, which ends the
/// receivers it handed out.
pub struct MemoryConnection {
    id: u64,
    shared: Arc<Shared>,
    database: u32,
    prefix: String,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("id", &self.id)
            .field("database", &self.database)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl MemoryConnection {
    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn drop_subscriptions(&self, state: &mut ServerState, channel: Option<&str>) {
        state.channels.retain(|name, subscribers| {
            if channel.map_or(true, |c| c == name) {
                subscribers.retain(|s| s.connection != self.id);
            }
            !subscribers.is_empty()
        });
    }
}

impl KeyValue for MemoryConnection {
    fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let key = self.key(key);
        let now = Instant::now();
        let mut state = self.shared.state.lock();
        let Some(db) = state.databases.get_mut(&self.database) else {
            return Ok(None);
        };

        if let Some(entry) = db.get(&key) {
            if entry.is_live(now) {
                return Ok(Some(entry.value.clone()));
            }
            db.remove(&key);
        }
        Ok(None)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), TransportError> {
        let key = self.key(key);
        self.shared
            .state
            .lock()
            .databases
            .entry(self.database)
            .or_default()
            .insert(
                key,
                Entry {
                    value: value.to_string(),
                    expires_at: None,
                },
            );
        Ok(())
    }

    fn expire(&self, key: &str, seconds: u64) -> Result<bool, TransportError> {
        let key = self.key(key);
        let now = Instant::now();
        let mut state = self.shared.state.lock();
        let entry = state
            .databases
            .get_mut(&self.database)
            .and_then(|db| db.get_mut(&key))
            .filter(|entry| entry.is_live(now));

        match entry {
            Some(entry) => {
                entry.expires_at = Some(now + Duration::from_secs(seconds));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl PubSub for MemoryConnection {
    fn publish(&self, channel: &str, payload: &str) -> Result<usize, TransportError> {
        let mut state = self.shared.state.lock();
        let Some(subscribers) = state.channels.get_mut(channel) else {
            return Ok(0);
        };

        // Receivers that hung up are pruned as we go.
        subscribers.retain(|s| s.frames.send(payload.to_string()).is_ok());
        let delivered = subscribers.len();
        if delivered == 0 {
            state.channels.remove(channel);
        }
        Ok(delivered)
    }

    fn subscribe(&self, channel: &str) -> Result<Receiver<String>, TransportError> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.shared.state.lock();
        self.drop_subscriptions(&mut state, Some(channel));
        state
            .channels
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber {
                connection: self.id,
                frames: tx,
            });
        Ok(rx)
    }

    fn unsubscribe(&self, channel: &str) -> Result<(), TransportError> {
        let mut state = self.shared.state.lock();
        self.drop_subscriptions(&mut state, Some(channel));
        Ok(())
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        self.drop_subscriptions(&mut state, None);
    }
}
