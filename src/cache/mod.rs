//! Key-value cache with expiry.
//!
//! Values are enveloped before they are written, so strings stay readable
//! in the store while structures round-trip through JSON. A write without
//! an explicit TTL uses the configured default; a TTL of zero or less
//! stores the value without expiry.
//!
//! Reads come in three styles:
//!
//! - [`Cache::get`] returns the result directly.
//! - [`Cache::get_with`] hands the result to a callback on the cache's worker
//!   thread. Reads queue up and run one at a time in submission order.
//! - [`Cache::get_deferred`] returns a [`Deferred`] to await or wait on.
//!
//! ## Example
//!
//! ```
//! use rediservice::cache::Cache;
//! use rediservice::store::{MemoryConnector, MemoryServer, StoreConfig};
//! use serde_json::json;
//!
//! let connector = MemoryConnector::new(MemoryServer::new(), StoreConfig::testing());
//! let cache = Cache::new(&connector, 60).unwrap();
//!
//! cache.set("author", &json!({ "name": "Kevin", "age": 45 }), None).unwrap();
//! assert_eq!(cache.get("author").unwrap(), Some(json!({ "name": "Kevin", "age": 45 })));
//! assert_eq!(cache.get("missing").unwrap(), None);
//! ```

#[cfg(feature = "deferred")]
mod deferred;
mod error;

#[cfg(feature = "deferred")]
pub use deferred::Deferred;
pub use error::CacheError;

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::{self, EnvelopeError};
use crate::store::{Connector, KeyValue, TransportError};

type Job<C> = Box<dyn FnOnce(&<C as Connector>::Connection) + Send>;

/// Cache over a single store connection.
///
/// Callback and deferred reads are served by one long-lived worker thread
/// that shares the connection. Dropping the cache finishes the queued reads
/// and joins the worker.
pub struct Cache<C: Connector> {
    conn: Arc<C::Connection>,
    default_ttl: i64,
    jobs: Option<Sender<Job<C>>>,
    worker: Option<JoinHandle<usize>>,
}

impl<C: Connector> Cache<C> {
    /// Open a cache connection and start its worker. `default_ttl` is in seconds.
    pub fn new(connector: &C, default_ttl: i64) -> Result<Self, TransportError> {
        let conn = Arc::new(connector.connect()?);
        let (jobs, queue) = mpsc::channel::<Job<C>>();

        let worker = {
            let conn = Arc::clone(&conn);
            thread::Builder::new()
                .name("cache-reader".to_string())
                .spawn(move || {
                    let mut served = 0;
                    for job in queue {
                        job(conn.as_ref());
                        served += 1;
                    }
                    tracing::debug!(served, "cache worker stopped");
                    served
                })
                .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?
        };

        Ok(Self {
            conn,
            default_ttl,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }

    /// TTL applied when [`set`](Self::set) is called without one.
    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    /// Store `value` at `key`.
    ///
    /// `ttl` of `None` uses the default TTL. An expiry is only set when the
    /// resolved TTL is greater than zero.
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<i64>,
    ) -> Result<(), CacheError> {
        let payload = envelope::encode_serialize(value).map_err(TransportError::from)?;
        self.conn.set(key, &payload)?;

        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl > 0 {
            self.conn.expire(key, ttl.unsigned_abs())?;
        }
        tracing::debug!(key, ttl, "cached");
        Ok(())
    }

    /// Read the value at `key`; `Ok(None)` when missing or expired.
    pub fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        read(self.conn.as_ref(), key)
    }

    /// Read the value at `key` and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key)? {
            Some(value) => {
                let typed = serde_json::from_value(value).map_err(EnvelopeError::from)?;
                Ok(Some(typed))
            }
            None => Ok(None),
        }
    }

    /// Read the value at `key` on the worker thread and pass the result to `callback`.
    ///
    /// The callback always runs, including when the read or decode fails.
    /// A slow callback delays the reads queued behind it.
    pub fn get_with<F>(&self, key: &str, callback: F)
    where
        F: FnOnce(Result<Option<Value>, CacheError>) + Send + 'static,
    {
        let key = key.to_string();
        let job: Job<C> = Box::new(move |conn: &C::Connection| callback(read(conn, &key)));

        let job = match &self.jobs {
            Some(jobs) => match jobs.send(job) {
                Ok(()) => return,
                Err(mpsc::SendError(job)) => job,
            },
            None => job,
        };
        // The worker is gone (a callback panicked); serve the read here.
        tracing::warn!("cache worker unavailable, reading inline");
        job(self.conn.as_ref());
    }

    /// Start reading `key` and return a handle to the pending result.
    #[cfg(feature = "deferred")]
    pub fn get_deferred(&self, key: &str) -> Deferred<Option<Value>> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.get_with(key, move |result| {
            // The caller may have dropped the handle; nothing to do then.
            let _ = tx.send(result);
        });
        Deferred::new(rx)
    }
}

impl<C: Connector> Drop for Cache<C> {
    fn drop(&mut self) {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            // A callback that drops the last handle to its own cache must not join itself.
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::warn!("cache worker panicked");
            }
        }
    }
}

fn read<K: KeyValue + ?Sized>(conn: &K, key: &str) -> Result<Option<Value>, CacheError> {
    match conn.get(key)? {
        Some(raw) => Ok(Some(envelope::decode(&raw)?)),
        None => Ok(None),
    }
}
