//! Store connection settings.
//!
//! Every knob is optional and can come from the environment:
//!
//! | variable          | field       | default                  |
//! |-------------------|-------------|--------------------------|
//! | `REDIS_URL`       | `url`       | `redis://localhost:6379` |
//! | `REDIS_DATABASE`  | `database`  | `1`                      |
//! | `REDIS_PREFIX`    | `prefix`    | none                     |
//! | `REDIS_PASSWORD`  | `password`  | none                     |
//! | `REDIS_CACHE_TTL` | `cache_ttl` | `86400`                  |
//! | `REDIS_POOL_SIZE` | `pool_size` | `64`                     |

use config::{Config, Environment};
use serde::Deserialize;

use super::TransportError;

/// Database used for development and production data.
pub const LIVE_DB: u32 = 1;
/// Database used by test runs so cached data stays apart.
pub const TEST_DB: u32 = 2;
/// Store URL used when none is configured.
pub const DEFAULT_URL: &str = "redis://localhost:6379";
/// Default cache time-to-live: one day.
pub const DEFAULT_TTL_SECS: i64 = 86_400;
/// Default bound on each per-channel connection pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

const ENV_PREFIX: &str = "REDIS";

/// Connection and cache settings for a bus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store URL (`redis://`, `rediss://` or `memory://`).
    pub url: String,
    /// Database index.
    pub database: u32,
    /// Prefix applied to every cache key.
    pub prefix: Option<String>,
    /// Password sent when connecting.
    pub password: Option<String>,
    /// Default cache TTL in seconds. Zero or negative stores without expiry.
    pub cache_ttl: i64,
    /// Maximum connections held by each per-channel pool.
    pub pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            database: LIVE_DB,
            prefix: None,
            password: None,
            cache_ttl: DEFAULT_TTL_SECS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl StoreConfig {
    /// Defaults, pointed at the test database.
    pub fn testing() -> Self {
        Self {
            database: TEST_DB,
            ..Self::default()
        }
    }

    /// Load settings from `REDIS_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::load(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings from an explicit set of `REDIS_*` variables instead of
    /// the process environment.
    pub fn from_env_source<I, K, V>(vars: I) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let source: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Environment::with_prefix(ENV_PREFIX).source(Some(source)))
    }

    fn load(env: Environment) -> Result<Self, TransportError> {
        let settings = Config::builder()
            .add_source(env.try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_cache_ttl(mut self, seconds: i64) -> Self {
        self.cache_ttl = seconds;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }
}
