//! In-Memory Key-Value Store
//!
//! Generic thread-safe hashmap behind a reader-writer lock. Read-only
//! operations take the shared lock, mutations take the exclusive lock,
//! and `extract` performs read + remove in a single critical section.

use std::hash::Hash;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use rand::seq::SliceRandom;

/// Default number of keys `one()` samples before shuffling
pub const ONE_SAMPLE_CAP: usize = 30;

const INITIAL_CAPACITY: usize = 100;

/// Thread-safe in-memory key-value store
///
/// Cloning is cheap; all clones share the same backing map.
#[derive(Debug)]
pub struct Store<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for Store<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a new empty store
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create a new empty store with a capacity hint
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
        }
    }

    /// Check if key exists
    pub fn has(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Get value by key, returns None if key doesn't exist
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).cloned()
    }

    /// Set key-value pair, overwriting unconditionally
    pub fn set(&self, key: K, value: V) {
        self.inner.write().insert(key, value);
    }

    /// Get and delete in one critical section
    ///
    /// Unlike `get` followed by `del`, no other caller can observe the
    /// entry between the read and the removal.
    pub fn extract(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    /// Delete key, no-op if absent
    pub fn del(&self, key: &K) {
        self.inner.write().remove(key);
    }

    /// Replace the entire contents with the given entries
    ///
    /// Readers see either the old or the new state, never a mix. The
    /// entries are collected before the swap so the write lock is held
    /// only for the exchange itself.
    pub fn replace<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let next: HashMap<K, V> = entries.into_iter().collect();
        *self.inner.write() = next;
    }

    /// Get a snapshot of all keys, order unspecified
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries
    pub fn flush(&self) {
        self.inner.write().clear();
    }

    /// Iterate over at most `limit` entries (0 means all)
    ///
    /// Keys are snapshotted up front; each value is re-fetched from the
    /// live map at yield time, so entries deleted after the snapshot are
    /// skipped and values may reflect later writes. Dropping the
    /// iterator early touches no further keys.
    pub fn scan(&self, limit: usize) -> impl Iterator<Item = (K, V)> + '_ {
        let keys = if limit == 0 {
            self.keys()
        } else {
            self.keys_up_to(limit)
        };

        keys.into_iter()
            .filter_map(move |key| self.get(&key).map(|value| (key, value)))
    }

    /// Sample one entry pseudo-randomly
    ///
    /// Shuffles a bounded prefix of the key snapshot and returns the
    /// first key's current value. Uniform for stores with at most
    /// `ONE_SAMPLE_CAP` entries; for larger stores only membership of
    /// the sampled prefix is guaranteed.
    pub fn one(&self) -> Option<(K, V)> {
        self.one_sampled(ONE_SAMPLE_CAP)
    }

    /// Sample one entry from a prefix of at most `cap` keys (0 means all)
    pub fn one_sampled(&self, cap: usize) -> Option<(K, V)> {
        let mut keys = if cap == 0 {
            self.keys()
        } else {
            self.keys_up_to(cap)
        };
        if keys.is_empty() {
            return None;
        }

        keys.shuffle(&mut rand::thread_rng());

        let key = keys.swap_remove(0);
        let value = self.get(&key)?;

        Some((key, value))
    }

    /// Snapshot at most `limit` keys in map-iteration order
    pub(crate) fn keys_up_to(&self, limit: usize) -> Vec<K> {
        self.inner.read().keys().take(limit).cloned().collect()
    }

    /// Snapshot the keys whose entries satisfy the predicate
    ///
    /// Holds the shared lock for the scan; callers delete afterwards
    /// under the exclusive lock (two-phase sweep).
    pub(crate) fn keys_matching<F>(&self, pred: F) -> Vec<K>
    where
        F: Fn(&K, &V) -> bool,
    {
        self.inner
            .read()
            .iter()
            .filter(|(k, v)| pred(k, v))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Delete the given keys under one exclusive lock, returns count removed
    pub(crate) fn del_batch(&self, keys: &[K]) -> usize {
        let mut map = self.inner.write();
        keys.iter().filter(|key| map.remove(*key).is_some()).count()
    }
}
