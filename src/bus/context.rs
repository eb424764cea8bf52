//! Context passed to message handlers.
//!
//! Carries the message that matched, the channel it arrived on, and a
//! handle to the bus so the handler can publish results.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::error::BusError;
use super::Bus;
use crate::store::Connector;

/// The context passed to every handler registered with `on` / `on_match`.
///
/// ## Example
///
/// ```ignore
/// bus.on_match("text.join", Pattern::new().present("words").absent("result"), |ctx| {
///     let words: Vec<String> = ctx.field("words")?;
///     ctx.reply(json!({ "result": words.join(" ") }))
/// })?;
/// ```
pub struct Context<'a, C: Connector> {
    channel: &'a str,
    data: Map<String, Value>,
    bus: &'a Bus<C>,
}

impl<'a, C: Connector> Context<'a, C> {
    pub(crate) fn new(channel: &'a str, data: Map<String, Value>, bus: &'a Bus<C>) -> Self {
        Self { channel, data, bus }
    }

    /// The channel the message arrived on.
    pub fn channel(&self) -> &str {
        self.channel
    }

    /// The message fields.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The raw value of one field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Deserialize the whole message into a typed struct.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    /// Deserialize one field. A missing field is a decode error.
    pub fn field<T: DeserializeOwned>(&self, field: &str) -> Result<T, BusError> {
        let value = self
            .data
            .get(field)
            .cloned()
            .ok_or_else(|| BusError::Decode(format!("missing field `{field}`")))?;
        Ok(serde_json::from_value(value)?)
    }

    /// The bus the handler is registered on.
    pub fn bus(&self) -> &Bus<C> {
        self.bus
    }

    /// Republish this message on its own channel with `overrides` merged on top.
    pub fn reply(&self, overrides: Value) -> Result<(), BusError> {
        self.bus
            .send(self.channel, Value::Object(self.data.clone()), Some(overrides))
    }
}
