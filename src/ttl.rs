//! TTL Store
//!
//! Store variant where every entry carries an absolute expiry instant.
//! A background sweep, spawned at construction with period equal to the
//! configured TTL, deletes entries whose instant has passed. Reads never
//! consult expiry, so an expired entry stays visible until the next
//! sweep.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::ticker;

const INITIAL_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct TtlEntry<V> {
    value: V,
    expires_at: i64,
}

/// Thread-safe key-value store with per-entry absolute expiry
///
/// Cloning is cheap; all clones share the same backing map.
#[derive(Debug)]
pub struct TtlStore<K, V> {
    ttl: Duration,
    inner: Arc<RwLock<HashMap<K, TtlEntry<V>>>>,
}

impl<K, V> Clone for TtlStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a TTL store and spawn its sweep task
    ///
    /// The sweep wakes every `ttl` and deletes expired entries until the
    /// token is cancelled; the returned handle is the task's completion
    /// signal. Fails on a zero `ttl`.
    pub fn new(
        ttl: Duration,
        shutdown: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), CacheError> {
        if ttl.is_zero() {
            return Err(CacheError::ZeroInterval);
        }

        let store = Self {
            ttl,
            inner: Arc::new(RwLock::new(HashMap::with_capacity(INITIAL_CAPACITY))),
        };

        info!(ttl = ?ttl, "ttl sweep started");

        let sweeper = store.clone();
        let handle = ticker::spawn_periodic(ttl, shutdown, move || {
            let now = Utc::now().timestamp();

            let mut map = sweeper.inner.write();
            let before = map.len();
            map.retain(|_, entry| entry.expires_at >= now);

            let removed = before - map.len();
            if removed > 0 {
                debug!(removed, "swept expired entries");
            }
        });

        Ok((store, handle))
    }
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Check if key exists, expired or not
    pub fn has(&self, key: &K) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Get value by key; expiry is not consulted on access
    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.read().get(key).map(|entry| entry.value.clone())
    }

    /// Set key-value pair expiring one TTL from now
    pub fn set(&self, key: K, value: V) {
        let expires_at = Utc::now().timestamp() + self.ttl.as_secs() as i64;
        self.inner.write().insert(key, TtlEntry { value, expires_at });
    }

    /// Set key-value pair with a caller-supplied absolute expiry
    pub fn set_with_expiry(&self, key: K, value: V, expires_at: DateTime<Utc>) {
        self.inner.write().insert(
            key,
            TtlEntry {
                value,
                expires_at: expires_at.timestamp(),
            },
        );
    }

    /// Delete key, no-op if absent
    pub fn del(&self, key: &K) {
        self.inner.write().remove(key);
    }

    /// Get a snapshot of all keys, order unspecified
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys().cloned().collect()
    }

    /// Get the number of entries, including expired-but-unswept ones
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
}
