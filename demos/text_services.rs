//! Two text services on one bus, plus a client that calls them.
//!
//! ```sh
//! REDIS_CACHE_TTL=60 RUST_LOG=rediservice=debug cargo run --example text_services
//! ```

use std::sync::mpsc;
use std::time::Duration;

use rediservice::{Bus, BusError, MemoryServer, Pattern, RunOptions, Selector, StoreConfig};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // REDIS_* variables (cache TTL, prefix, database, ...) apply to the in-memory store too.
    let config = StoreConfig::from_env()?;
    tracing::info!(database = config.database, cache_ttl = config.cache_ttl, "store config");
    let bus = Bus::with_memory(MemoryServer::new(), config)?;

    bus.service("text.join", |bus, name, _opts| {
        bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
            let words: Vec<String> = ctx.field("words")?;
            let sep = ctx.get("sep").and_then(Value::as_str).unwrap_or("");
            ctx.reply(json!({ "result": words.join(sep) }))
        })
    });

    bus.service("text.caps", |bus, name, _opts| {
        bus.on_match(name, Pattern::new().present("words").absent("result"), |ctx| {
            let words: Vec<String> = ctx.field("words")?;
            let result: Vec<String> = words.iter().map(|w| w.to_uppercase()).collect();
            ctx.reply(json!({ "result": result, "count": result.len() }))
        })
    });

    for (name, _) in bus.services(Selector::All) {
        println!("registered {name}");
    }
    bus.run(Selector::pattern(r"^text\.")?, &RunOptions::debug())?;

    let (tx, rx) = mpsc::channel();
    for channel in ["text.join", "text.caps"] {
        let tx = tx.clone();
        bus.on_match(channel, Pattern::new().present("result"), move |ctx| {
            tx.send((ctx.channel().to_string(), ctx.get("result").cloned()))
                .map_err(BusError::handler)
        })?;
    }

    bus.send("text.join", json!({ "words": ["hello", "world"], "sep": " " }), None)?;
    bus.send("text.caps", json!({ "words": ["hello", "world"] }), None)?;

    for _ in 0..2 {
        let (channel, result) = rx.recv_timeout(Duration::from_secs(2))?;
        println!("{channel}: {}", result.unwrap_or(Value::Null));
    }

    bus.set_cache("last-run", &json!({ "services": bus.running() }), None)?;
    println!("cached: {}", bus.get_cache("last-run")?.unwrap_or(Value::Null));

    Ok(())
}
