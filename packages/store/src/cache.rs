//! Keyed caches with an optional time-to-live.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Slot<V> {
    /// Known to exist (seen in a listing) but never loaded.
    Unloaded,
    Loaded { value: V, loaded_at: Instant },
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// Present and fresh.
    Hit(V),
    /// Present but older than the TTL.
    Stale,
    /// Known to exist but not loaded yet.
    Unloaded,
    /// Never seen, or removed.
    Miss,
}

/// A path-keyed cache.
#[derive(Debug, Clone)]
pub struct Cache<V> {
    entries: HashMap<String, Slot<V>>,
    ttl: Option<Duration>,
}

impl<V: Clone> Cache<V> {
    /// Create an empty cache. Without a `ttl` entries never go stale.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Look `key` up, cloning a fresh value out.
    pub fn lookup(&self, key: &str) -> Lookup<V> {
        match self.entries.get(key) {
            None => Lookup::Miss,
            Some(Slot::Unloaded) => Lookup::Unloaded,
            Some(Slot::Loaded { value, loaded_at }) => match self.ttl {
                Some(ttl) if loaded_at.elapsed() > ttl => Lookup::Stale,
                _ => Lookup::Hit(value.clone()),
            },
        }
    }

    /// Store a loaded value, restarting its age.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(
            key.into(),
            Slot::Loaded {
                value,
                loaded_at: Instant::now(),
            },
        );
    }

    /// Record that `key` exists without loading it. Loaded entries are kept.
    pub fn mark_unloaded(&mut self, key: impl Into<String>) {
        self.entries.entry(key.into()).or_insert(Slot::Unloaded);
    }

    /// Whether `key` is known, loaded or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Forget `key` alone.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Drop `prefix` and every key beneath it.
    pub fn remove_tree(&mut self, prefix: &str) {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        self.entries
            .retain(|key, _| key != prefix && !key.starts_with(&dir));
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of known keys, loaded or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
