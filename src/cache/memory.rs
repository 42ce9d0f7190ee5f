//! In-memory cache storage.
//!
//! Thread-safe via `DashMap`, with an entry limit and TTL expiry checked on
//! read.

use crate::cache::CacheStorage;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Cache key components: namespace plus item key.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct EntryKey {
    namespace: String,
    key: String,
}

impl EntryKey {
    fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }
}

/// Stored value.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    stored_at: Instant,
    /// `None` lives until evicted
    ttl: Option<Duration>,
}

impl Entry {
    fn is_fresh(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.stored_at.elapsed() < ttl,
            None => true,
        }
    }
}

/// In-memory string storage with per-entry TTL.
pub struct MemoryStorage {
    entries: DashMap<EntryKey, Entry>,
    max_entries: usize,
    default_ttl: Option<Duration>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    /// Create a storage with default limits and no default TTL.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: 1000,
            default_ttl: None,
        }
    }

    /// Create a storage with custom limits.
    pub fn with_limits(max_entries: usize, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            default_ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| entry.is_fresh());
    }

    fn make_room(&self) {
        if self.entries.len() < self.max_entries {
            return;
        }
        self.purge_expired();

        // Oldest entries go first
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().stored_at)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl CacheStorage for MemoryStorage {
    fn get_item(&self, namespace: &str, key: &str) -> Option<String> {
        let entry_key = EntryKey::new(namespace, key);
        let fresh = {
            let entry = self.entries.get(&entry_key)?;
            entry.is_fresh().then(|| entry.value.clone())
        };
        if fresh.is_none() {
            self.entries.remove(&entry_key);
        }
        fresh
    }

    fn set_item(&self, namespace: &str, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        let entry_key = EntryKey::new(namespace, key);
        if !self.entries.contains_key(&entry_key) {
            self.make_room();
        }
        self.entries.insert(
            entry_key,
            Entry {
                value: value.to_string(),
                stored_at: Instant::now(),
                ttl: ttl.or(self.default_ttl),
            },
        );
        true
    }

    fn remove_item(&self, namespace: &str, key: &str) -> bool {
        self.entries.remove(&EntryKey::new(namespace, key)).is_some()
    }
}
