//! Session management: persisted conversation state with optimistic locking.

pub mod cache;
pub mod context;
pub mod error;
pub mod in_memory;
pub mod memory_cache;
#[cfg(feature = "redis")]
pub mod redis;
pub mod traits;

pub use cache::{CacheClient, CacheSessionStore, CasOutcome, DEFAULT_SESSION_TTL, SESSION_KEY_PREFIX};
pub use context::OpContext;
pub use error::SessionError;
pub use in_memory::InMemorySessionStore;
pub use memory_cache::MemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;
pub use traits::{Message, Role, SessionData, SessionStore};

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::config::SessionStoreConfig;

/// Backend selector for [`create_session_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    Redis,
}

impl FromStr for StoreType {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" | "cache" => Ok(Self::Redis),
            _ => Err(SessionError::InvalidStoreType(s.to_string())),
        }
    }
}

/// Construction inputs for [`create_session_store`].
#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Already-connected cache client; required for [`StoreType::Redis`].
    pub cache_client: Option<Arc<dyn CacheClient>>,
    /// Session expiration; `None` or zero means [`DEFAULT_SESSION_TTL`].
    pub ttl: Option<Duration>,
}

impl StoreOptions {
    pub fn with_cache_client(mut self, client: Arc<dyn CacheClient>) -> Self {
        self.cache_client = Some(client);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Factory: create the session store backend selected by `store_type`.
pub fn create_session_store(
    store_type: StoreType,
    options: StoreOptions,
) -> Result<Box<dyn SessionStore>, SessionError> {
    let store: Box<dyn SessionStore> = match store_type {
        StoreType::Memory => Box::new(InMemorySessionStore::new()),
        StoreType::Redis => {
            let client = options.cache_client.ok_or_else(|| {
                SessionError::InvalidConfig("cache-backed session store requires a cache client".into())
            })?;
            Box::new(CacheSessionStore::new(client, options.ttl.unwrap_or(DEFAULT_SESSION_TTL)))
        }
    };
    tracing::info!(backend = store.name(), "session store initialised");
    Ok(store)
}

/// Factory: create a session store from configuration.
///
/// `cache_client` is consulted only for cache-backed configurations.
pub fn create_session_store_from_config(
    config: &SessionStoreConfig,
    cache_client: Option<Arc<dyn CacheClient>>,
) -> Result<Box<dyn SessionStore>, SessionError> {
    let store_type: StoreType = config.backend.parse()?;
    let options = StoreOptions {
        cache_client,
        ttl: Some(config.ttl()),
    };
    create_session_store(store_type, options)
}

/// Connect to Redis at `config.redis_url` and build the configured store.
#[cfg(feature = "redis")]
pub async fn connect_session_store(
    config: &SessionStoreConfig,
) -> Result<Box<dyn SessionStore>, SessionError> {
    let store_type: StoreType = config.backend.parse()?;
    let cache_client: Option<Arc<dyn CacheClient>> = match store_type {
        StoreType::Memory => None,
        StoreType::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                SessionError::InvalidConfig("redis_url is required for the redis backend".into())
            })?;
            let client: Arc<dyn CacheClient> = Arc::new(RedisCache::connect(url).await?);
            Some(client)
        }
    };
    create_session_store_from_config(config, cache_client)
}
