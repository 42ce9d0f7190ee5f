//! GET result caching.
//!
//! The request pipeline only talks to the [`CacheStore`] / [`CacheStorage`]
//! traits. A store resolves named storages; a storage holds string values
//! per namespace and enforces their TTL.
//!
//! - [`spec`]: deciding per call whether and how to cache
//! - [`key`]: deterministic cache keys
//! - [`memory`]: in-process storage backend

pub mod key;
pub mod memory;
pub mod spec;

pub use key::cache_key;
pub use memory::MemoryStorage;
pub use spec::{CacheOption, CacheOptions, CacheSpec, ResolvedCache};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Namespace GET results are stored under.
pub const REMOTE_NAMESPACE: &str = "remote";

/// Storage name used when neither the call nor the configuration picks one.
pub const DEFAULT_STORAGE: &str = "memory";

/// A key/value backend with per-entry expiry.
///
/// Implementations must be safe to share between threads; no locking is done
/// around a get followed by a set.
pub trait CacheStorage: Send + Sync {
    /// Fetch a live value. Expired entries read as absent.
    fn get_item(&self, namespace: &str, key: &str) -> Option<String>;

    /// Store a value. `ttl` of `None` uses the backend's default lifetime.
    fn set_item(&self, namespace: &str, key: &str, value: &str, ttl: Option<Duration>) -> bool;

    /// Remove a value, returning whether one was present.
    fn remove_item(&self, namespace: &str, key: &str) -> bool;
}

/// Resolves storage backends by name.
pub trait CacheStore: Send + Sync {
    fn load_storage(&self, name: &str) -> Option<Arc<dyn CacheStorage>>;
}

/// A fixed set of named storages.
#[derive(Clone)]
pub struct StorageRegistry {
    storages: HashMap<String, Arc<dyn CacheStorage>>,
}

impl Default for StorageRegistry {
    /// A registry holding one [`MemoryStorage`] under [`DEFAULT_STORAGE`].
    fn default() -> Self {
        Self::empty().with_storage(DEFAULT_STORAGE, Arc::new(MemoryStorage::new()))
    }
}

impl StorageRegistry {
    pub fn empty() -> Self {
        Self {
            storages: HashMap::new(),
        }
    }

    /// Register `storage` under `name`, replacing any previous one.
    pub fn with_storage(mut self, name: impl Into<String>, storage: Arc<dyn CacheStorage>) -> Self {
        self.storages.insert(name.into(), storage);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.storages.keys().map(String::as_str)
    }
}

impl CacheStore for StorageRegistry {
    fn load_storage(&self, name: &str) -> Option<Arc<dyn CacheStorage>> {
        self.storages.get(name).cloned()
    }
}
