//! Test services: the text services used throughout the suite.

use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use rediservice::{Bus, BusError, MemoryConnector, Pattern, RunOptions};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub type TestBus = Bus<MemoryConnector>;

/// How long to wait for an asynchronous delivery.
pub const WAIT: Duration = Duration::from_secs(2);

/// How long to wait before concluding nothing will arrive.
pub const QUIET: Duration = Duration::from_millis(150);

/// Join a list of words with the optional `sep`.
pub fn text_join(bus: &TestBus, name: &str, _opts: &RunOptions) -> Result<(), BusError> {
    bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
        let words: Vec<String> = ctx.field("words")?;
        let sep = ctx.get("sep").and_then(Value::as_str).unwrap_or("");
        ctx.reply(json!({ "result": words.join(sep) }))
    })
}

#[derive(Deserialize)]
struct CapsRequest {
    words: Vec<String>,
}

/// Uppercase each word and report how many there were.
pub fn text_caps(bus: &TestBus, name: &str, _opts: &RunOptions) -> Result<(), BusError> {
    bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
        let request: CapsRequest = ctx.input()?;
        let result: Vec<String> = request.words.iter().map(|w| w.to_uppercase()).collect();
        ctx.reply(json!({ "result": result, "count": result.len() }))
    })
}

pub fn register_text_services(bus: &TestBus) {
    bus.service("text.join", text_join);
    bus.service("text.caps", text_caps);
}

/// Forward every message on `channel` matching `pattern` to the returned receiver.
pub fn collect(bus: &TestBus, channel: &str, pattern: Pattern) -> Receiver<Map<String, Value>> {
    let (tx, rx) = mpsc::channel();
    bus.on_match(channel, pattern, move |ctx| {
        tx.send(ctx.data().clone()).map_err(BusError::handler)
    })
    .unwrap();
    rx
}
