//! Store abstraction: the key-value and pub-sub capabilities the bus needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ Cache                        │   │ Channels                     │
//! │  get / set / expire          │   │  publish / subscribe         │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!                 │                                 │
//!                 ▼                                 ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │ Connector → Connection (KeyValue + PubSub)                       │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                                    │
//!          ▼                                    ▼
//! ┌──────────────────┐              ┌───────────────────────────┐
//! │ MemoryConnector  │              │ network client (external) │
//! │   (included)     │              │                           │
//! └──────────────────┘              └───────────────────────────┘
//! ```

mod connection;
mod error;
mod key_value;
mod memory;
mod pub_sub;
mod settings;

pub use connection::{Connection, Connector};
pub use error::TransportError;
pub use key_value::KeyValue;
pub use memory::{MemoryConnection, MemoryConnector, MemoryServer};
pub use pub_sub::PubSub;
pub use settings::{StoreConfig, DEFAULT_POOL_SIZE, DEFAULT_TTL_SECS, DEFAULT_URL, LIVE_DB, TEST_DB};
