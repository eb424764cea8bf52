//! Service Bus — named services and pattern-matched channel handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Bus                                  │
//! │  service() / services() / run() / running()                  │
//! │  on() / on_match() / send() / set_cache() / get_cache()      │
//! └──────────────────────────────────────────────────────────────┘
//!            │                      │                    │
//!            ▼                      ▼                    ▼
//! ┌──────────────────┐   ┌────────────────────┐   ┌─────────────┐
//! │ Registry         │   │ Channels           │   │ Cache       │
//! │ services+running │   │ pub/sub + patterns │   │ get/set/ttl │
//! └──────────────────┘   └────────────────────┘   └─────────────┘
//! ```
//!
//! Message flow: `send` → channel → delivery thread → pattern check →
//! handler → (optional) `reply` / `send` → channel.
//!
//! ## Handler Convention
//!
//! ```ignore
//! // Join a list of words
//! bus.service("text.join", |bus, name, _opts| {
//!     bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
//!         let words: Vec<String> = ctx.field("words")?;
//!         let sep = ctx.get("sep").and_then(Value::as_str).unwrap_or("");
//!         ctx.reply(json!({ "result": words.join(sep) }))
//!     })
//! });
//!
//! bus.run(Selector::pattern(r"^text\.")?, &RunOptions::debug())?;
//! ```

mod bus;
mod context;
mod error;
mod pattern;
mod selector;
mod service;

pub use bus::Bus;
pub use context::Context;
pub use error::BusError;
pub use pattern::{Directive, Pattern};
pub use selector::Selector;
pub use service::{Activation, RunOptions, SetupFn};
