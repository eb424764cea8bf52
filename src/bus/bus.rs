//! The `Bus` type: services, pattern-matched handlers, merged republish and cache.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use serde::Serialize;
use serde_json::Value;

use super::context::Context;
use super::error::BusError;
use super::pattern::Pattern;
use super::selector::Selector;
use super::service::{Activation, Registry, RunOptions, SetupFn};
use crate::cache::{Cache, CacheError};
#[cfg(feature = "deferred")]
use crate::cache::Deferred;
use crate::channels::{Channels, SubscriptionStats};
use crate::store::{Connector, MemoryConnector, MemoryServer, StoreConfig, TransportError};

pub(crate) struct Inner<C: Connector> {
    config: StoreConfig,
    channels: Channels<C>,
    cache: Cache<C>,
    registry: Registry<C>,
}

/// Service bus over a store connector.
///
/// Cheap to clone; clones share the same registry, running-set, cache
/// connection and channel subscriptions. When the last clone is dropped every
/// channel is unsubscribed.
///
/// ## Example
///
/// ```
/// use std::sync::mpsc;
/// use std::time::Duration;
/// use rediservice::bus::{Bus, Pattern, RunOptions};
/// use serde_json::json;
///
/// let bus = Bus::in_memory().unwrap();
///
/// bus.service("text.join", |bus, name, _opts| {
///     bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
///         let words: Vec<String> = ctx.field("words")?;
///         let sep = ctx.get("sep").and_then(|s| s.as_str()).unwrap_or("");
///         ctx.reply(json!({ "result": words.join(sep) }))
///     })
/// });
/// bus.run("text.join", &RunOptions::new()).unwrap();
///
/// let (tx, rx) = mpsc::channel();
/// bus.on_match("text.join", Pattern::new().present("result"), move |ctx| {
///     tx.send(ctx.get("result").cloned()).ok();
///     Ok(())
/// })
/// .unwrap();
///
/// bus.send("text.join", json!({ "words": ["hello", "world"], "sep": " " }), None).unwrap();
/// let result = rx.recv_timeout(Duration::from_secs(2)).unwrap();
/// assert_eq!(result, Some(json!("hello world")));
/// ```
pub struct Bus<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for Bus<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Bus<MemoryConnector> {
    /// Bus over a fresh private in-memory store, using the test database.
    pub fn in_memory() -> Result<Self, TransportError> {
        Self::with_memory(MemoryServer::new(), StoreConfig::testing())
    }

    /// Bus over an existing in-memory store.
    pub fn with_memory(server: MemoryServer, config: StoreConfig) -> Result<Self, TransportError> {
        Self::new(MemoryConnector::new(server, config.clone()), config)
    }
}

impl<C: Connector> Bus<C> {
    /// Create a bus. `config` supplies the default cache TTL and pool size.
    pub fn new(connector: C, config: StoreConfig) -> Result<Self, TransportError> {
        let cache = Cache::new(&connector, config.cache_ttl)?;
        let channels = Channels::new(Arc::new(connector), config.pool_size);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                channels,
                cache,
                registry: Registry::new(),
            }),
        })
    }

    pub(crate) fn from_weak(inner: &Weak<Inner<C>>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn channels(&self) -> &Channels<C> {
        &self.inner.channels
    }

    pub fn cache(&self) -> &Cache<C> {
        &self.inner.cache
    }

    // -------------------------------------------------------------------------
    // Services
    // -------------------------------------------------------------------------

    /// Register a service. Registering an existing name replaces its setup
    /// routine but leaves the running-set alone.
    pub fn service<F>(&self, name: &str, setup: F) -> Activation<C>
    where
        F: Fn(&Bus<C>, &str, &RunOptions) -> Result<(), BusError> + Send + Sync + 'static,
    {
        let setup: Arc<SetupFn<C>> = Arc::new(setup);
        self.inner.registry.register(name, Arc::clone(&setup));
        Activation::new(name.to_string(), setup, Arc::downgrade(&self.inner))
    }

    /// Registered services the selector picks, in registration order.
    pub fn services(&self, selector: impl Into<Selector>) -> Vec<(String, Activation<C>)> {
        self.inner
            .registry
            .select(&selector.into())
            .into_iter()
            .map(|(name, setup)| {
                let activation = Activation::new(name.clone(), setup, Arc::downgrade(&self.inner));
                (name, activation)
            })
            .collect()
    }

    /// Activate every selected service that is not running yet.
    ///
    /// A service joins the running-set before its setup routine is called
    /// and stays there even if setup fails.
    pub fn run(&self, selector: impl Into<Selector>, options: &RunOptions) -> Result<(), BusError> {
        for (name, setup) in self.inner.registry.select(&selector.into()) {
            if !self.inner.registry.claim(&name) {
                tracing::trace!(service = %name, "already running");
                continue;
            }
            if options.debug {
                tracing::info!(service = %name, "running service");
            }
            self.start(&name, setup.as_ref(), options)?;
        }
        Ok(())
    }

    /// Snapshot of the names activated through `run`.
    pub fn running(&self) -> BTreeSet<String> {
        self.inner.registry.running()
    }

    pub(crate) fn start(
        &self,
        name: &str,
        setup: &SetupFn<C>,
        options: &RunOptions,
    ) -> Result<(), BusError> {
        if options.debug {
            self.on(name, |ctx| {
                tracing::info!(channel = ctx.channel(), data = ?ctx.data(), "message");
                Ok(())
            })?;
        }
        setup(self, name, options)
    }

    // -------------------------------------------------------------------------
    // Messaging
    // -------------------------------------------------------------------------

    /// Call `handler` for every message on `channel`.
    pub fn on<F>(&self, channel: &str, handler: F) -> Result<(), BusError>
    where
        F: Fn(&Context<'_, C>) -> Result<(), BusError> + Send + Sync + 'static,
    {
        self.on_match(channel, Pattern::any(), handler)
    }

    /// Call `handler` for every message on `channel` that matches `pattern`.
    ///
    /// Every matching handler on a channel fires, in registration order. A
    /// message that is not a JSON object fails with `InvalidArgument` in the
    /// delivery loop, where it is logged and counted.
    pub fn on_match<F>(&self, channel: &str, pattern: Pattern, handler: F) -> Result<(), BusError>
    where
        F: Fn(&Context<'_, C>) -> Result<(), BusError> + Send + Sync + 'static,
    {
        let bus = Arc::downgrade(&self.inner);
        self.inner.channels.subscribe(channel, move |message, channel| {
            let bus = Bus::from_weak(&bus).ok_or(BusError::Closed)?;
            let data = match message {
                Value::Object(data) => data,
                other => return Err(BusError::not_a_mapping("data", &other).into()),
            };
            if pattern.matches(&data) {
                handler(&Context::new(channel, data, &bus))?;
            }
            Ok(())
        })?;
        tracing::debug!(channel, "handler registered");
        Ok(())
    }

    /// Like [`on_match`](Self::on_match) with the pattern written as a JSON
    /// object (`true` = present, `false` = absent, other = equal).
    pub fn on_value<F>(&self, channel: &str, pattern: &Value, handler: F) -> Result<(), BusError>
    where
        F: Fn(&Context<'_, C>) -> Result<(), BusError> + Send + Sync + 'static,
    {
        let pattern = Pattern::try_from(pattern)?;
        self.on_match(channel, pattern, handler)
    }

    /// Publish `data` on `channel`, with `overrides` merged over it when it
    /// is an object. `data` must be an object.
    pub fn send(&self, channel: &str, data: Value, overrides: Option<Value>) -> Result<(), BusError> {
        let mut data = match data {
            Value::Object(data) => data,
            other => return Err(BusError::not_a_mapping("data", &other)),
        };
        if let Some(Value::Object(overrides)) = overrides {
            data.extend(overrides);
        }
        self.inner.channels.publish(channel, &Value::Object(data))?;
        Ok(())
    }

    /// Stop all handlers on `channel`.
    pub fn unsubscribe(&self, channel: &str) -> Result<Option<SubscriptionStats>, BusError> {
        Ok(self.inner.channels.unsubscribe(channel)?)
    }

    // -------------------------------------------------------------------------
    // Cache
    // -------------------------------------------------------------------------

    /// Cache `value` at `key`; `ttl` of `None` uses the configured default.
    pub fn set_cache<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<i64>,
    ) -> Result<(), BusError> {
        Ok(self.inner.cache.set(key, value, ttl)?)
    }

    pub fn get_cache(&self, key: &str) -> Result<Option<Value>, BusError> {
        Ok(self.inner.cache.get(key)?)
    }

    /// Callback-style cache read.
    pub fn get_cache_with<F>(&self, key: &str, callback: F)
    where
        F: FnOnce(Result<Option<Value>, CacheError>) + Send + 'static,
    {
        self.inner.cache.get_with(key, callback)
    }

    /// Deferred-style cache read.
    #[cfg(feature = "deferred")]
    pub fn get_cache_deferred(&self, key: &str) -> Deferred<Option<Value>> {
        self.inner.cache.get_deferred(key)
    }
}
