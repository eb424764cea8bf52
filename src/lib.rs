//! rediservice — pub/sub microservices over a key-value store.
//!
//! Register named services, subscribe handlers that fire only for messages
//! matching a declarative field pattern, republish merged results, and
//! cache values with expiry.
//!
//! ```
//! use rediservice::{Bus, Pattern, RunOptions};
//! use serde_json::json;
//!
//! let bus = Bus::in_memory().unwrap();
//!
//! // Capitalize a list of words
//! bus.service("text.caps", |bus, name, _opts| {
//!     bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
//!         let words: Vec<String> = ctx.field("words")?;
//!         let result: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();
//!         ctx.reply(json!({ "result": result, "count": result.len() }))
//!     })
//! });
//!
//! bus.run("text.caps", &RunOptions::new()).unwrap();
//! assert!(bus.running().contains("text.caps"));
//! ```

pub mod bus;
pub mod cache;
pub mod channels;
pub mod envelope;
pub mod store;

pub use bus::{Activation, Bus, BusError, Context, Directive, Pattern, RunOptions, Selector};
#[cfg(feature = "deferred")]
pub use cache::Deferred;
pub use cache::{Cache, CacheError};
pub use channels::{Channels, SubscriptionStats};
pub use envelope::EnvelopeError;
pub use store::{MemoryConnector, MemoryServer, StoreConfig, TransportError};

// Re-export so handlers can build messages without a direct dependency.
pub use serde_json::{json, Value};
