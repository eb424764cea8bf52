//! Service registry and activation.
//!
//! A service is a name plus a setup routine. Registering it does nothing
//! else; running it calls the setup routine, which usually subscribes
//! handlers on the service's channel. `run` activates each name at most once
//! per bus.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::bus::Inner;
use super::error::BusError;
use super::selector::Selector;
use super::Bus;
use crate::store::Connector;

/// Setup routine: receives the bus, the service name and the run options.
pub type SetupFn<C> = dyn Fn(&Bus<C>, &str, &RunOptions) -> Result<(), BusError> + Send + Sync;

/// Options passed to `run` and on to each setup routine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    /// Log activations and echo every message on the service channel at `info` level.
    pub debug: bool,
    /// Free-form settings for setup routines.
    pub settings: Map<String, Value>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with `debug` turned on.
    pub fn debug() -> Self {
        Self {
            debug: true,
            ..Self::default()
        }
    }

    /// Add a setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Handle that starts one registered service.
///
/// Starting through the handle always calls the setup routine; use
/// `Bus::run` for once-only activation.
pub struct Activation<C: Connector> {
    name: String,
    setup: Arc<SetupFn<C>>,
    bus: Weak<Inner<C>>,
}

impl<C: Connector> Activation<C> {
    pub(crate) fn new(name: String, setup: Arc<SetupFn<C>>, bus: Weak<Inner<C>>) -> Self {
        Self { name, setup, bus }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the setup routine with `options`.
    pub fn start(&self, options: &RunOptions) -> Result<(), BusError> {
        let bus = Bus::from_weak(&self.bus).ok_or(BusError::Closed)?;
        bus.start(&self.name, self.setup.as_ref(), options)
    }
}

impl<C: Connector> Clone for Activation<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            setup: Arc::clone(&self.setup),
            bus: Weak::clone(&self.bus),
        }
    }
}

impl<C: Connector> fmt::Debug for Activation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activation").field("name", &self.name).finish()
    }
}

/// Registered services in registration order, plus the running-set.
pub(crate) struct Registry<C: Connector> {
    services: Mutex<Vec<(String, Arc<SetupFn<C>>)>>,
    running: Mutex<BTreeSet<String>>,
}

impl<C: Connector> Registry<C> {
    pub(crate) fn new() -> Self {
        Self {
            services: Mutex::new(Vec::new()),
            running: Mutex::new(BTreeSet::new()),
        }
    }

    /// Register or replace `name`. A replaced service keeps its position.
    pub(crate) fn register(&self, name: &str, setup: Arc<SetupFn<C>>) {
        let mut services = self.services.lock();
        match services.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = setup,
            None => services.push((name.to_string(), setup)),
        }
    }

    /// Services the selector picks, in registration order.
    pub(crate) fn select(&self, selector: &Selector) -> Vec<(String, Arc<SetupFn<C>>)> {
        self.services
            .lock()
            .iter()
            .filter(|(name, _)| selector.matches(name))
            .map(|(name, setup)| (name.clone(), Arc::clone(setup)))
            .collect()
    }

    /// Add `name` to the running-set. Returns `false` if it was already there.
    pub(crate) fn claim(&self, name: &str) -> bool {
        self.running.lock().insert(name.to_string())
    }

    pub(crate) fn running(&self) -> BTreeSet<String> {
        self.running.lock().clone()
    }
}
