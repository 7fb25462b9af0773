//! Eviction Sweepers
//!
//! Background policies attached to a `Store`: timestamp sweep deletes
//! entries whose expiry instant has passed, count-bounded sweep deletes
//! arbitrary entries once the store grows past a maximum. Each sweeper
//! runs as a periodic tokio task bound to a cancellation token and hands
//! back the join handle.

use std::hash::Hash;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::store::Store;
use crate::ticker;

/// Expiry instant accessor a value must provide for timestamp sweeping
///
/// A capability contract: any value type reporting its own expiry as
/// epoch seconds can be stored under a `TimestampSweep`.
pub trait Expiry {
    /// Unix seconds after which the value is stale
    fn expires_at(&self) -> i64;
}

/// Background sweep deleting entries whose expiry instant has passed
pub struct TimestampSweep<K, V> {
    store: Store<K, V>,
    period: Duration,
}

impl<K, V> TimestampSweep<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Expiry + Clone + Send + Sync + 'static,
{
    /// Create a sweeper for the given store
    pub fn new(store: Store<K, V>, period: Duration) -> Result<Self, CacheError> {
        if period.is_zero() {
            return Err(CacheError::ZeroInterval);
        }

        Ok(Self { store, period })
    }

    /// Spawn the sweeper as a background task
    ///
    /// Each tick collects stale keys under the shared lock, then deletes
    /// them under one exclusive lock. An entry re-inserted with a fresh
    /// expiry between the two phases may be retained for one extra cycle.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        info!(period = ?self.period, "timestamp sweep started");

        let store = self.store;
        ticker::spawn_periodic(self.period, shutdown, move || {
            let now = Utc::now().timestamp();

            let stale = store.keys_matching(|_, value| value.expires_at() < now);
            if stale.is_empty() {
                return;
            }

            let removed = store.del_batch(&stale);
            debug!(removed, "swept stale entries");
        })
    }
}

/// Background sweep holding the store at or below a maximum entry count
pub struct CountBoundedSweep<K, V> {
    store: Store<K, V>,
    max_count: usize,
    period: Duration,
}

impl<K, V> CountBoundedSweep<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a sweeper for the given store
    ///
    /// Fails fast on a zero maximum or a zero period rather than
    /// clamping either.
    pub fn new(
        store: Store<K, V>,
        max_count: usize,
        period: Duration,
    ) -> Result<Self, CacheError> {
        if max_count == 0 {
            return Err(CacheError::ZeroMaxCount);
        }
        if period.is_zero() {
            return Err(CacheError::ZeroInterval);
        }

        Ok(Self {
            store,
            max_count,
            period,
        })
    }

    /// Spawn the sweeper as a background task
    ///
    /// Each tick deletes `len - max_count` entries taken in
    /// map-iteration order; victims are arbitrary, not weighted by
    /// recency or frequency.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        info!(
            max_count = self.max_count,
            period = ?self.period,
            "count-bounded sweep started"
        );

        let store = self.store;
        let max_count = self.max_count;
        ticker::spawn_periodic(self.period, shutdown, move || {
            let size = store.len();
            if size <= max_count {
                return;
            }

            let victims = store.keys_up_to(size - max_count);
            let removed = store.del_batch(&victims);
            debug!(removed, size, max_count, "evicted excess entries");
        })
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a store with a timestamp sweep attached
    pub fn with_timestamp_sweep(
        period: Duration,
        shutdown: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), CacheError>
    where
        V: Expiry,
    {
        let store = Self::new();
        let handle = TimestampSweep::new(store.clone(), period)?.spawn(shutdown);
        Ok((store, handle))
    }

    /// Create a store with a count-bounded sweep attached
    pub fn with_count_bounded_sweep(
        max_count: usize,
        period: Duration,
        shutdown: CancellationToken,
    ) -> Result<(Self, JoinHandle<()>), CacheError> {
        let store = Self::new();
        let handle = CountBoundedSweep::new(store.clone(), max_count, period)?.spawn(shutdown);
        Ok((store, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestValue {
        val: String,
        ts: i64,
    }

    impl Expiry for TestValue {
        fn expires_at(&self) -> i64 {
            self.ts
        }
    }

    #[tokio::test]
    async fn test_timestamp_sweep_removes_stale_entries() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("kvcache=debug")
            .with_test_writer()
            .try_init();

        let token = CancellationToken::new();
        let (store, _handle) = Store::<String, TestValue>::with_timestamp_sweep(
            Duration::from_millis(100),
            token.clone(),
        )
        .unwrap();

        store.set(
            "foo".into(),
            TestValue {
                val: "bar".into(),
                ts: (Utc::now() + chrono::Duration::milliseconds(200)).timestamp(),
            },
        );
        assert!(store.has(&"foo".into()));

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!store.has(&"foo".into()));
        token.cancel();
    }

    #[tokio::test]
    async fn test_timestamp_sweep_keeps_live_entries() {
        let token = CancellationToken::new();
        let (store, _handle) = Store::<String, TestValue>::with_timestamp_sweep(
            Duration::from_millis(50),
            token.clone(),
        )
        .unwrap();

        store.set(
            "foo".into(),
            TestValue {
                val: "bar".into(),
                ts: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            },
        );

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(store.has(&"foo".into()));
        token.cancel();
    }

    #[tokio::test]
    async fn test_count_bounded_sweep_trims_to_max() {
        let token = CancellationToken::new();
        let (store, _handle) = Store::<i32, i32>::with_count_bounded_sweep(
            100,
            Duration::from_millis(200),
            token.clone(),
        )
        .unwrap();

        for i in 0..200 {
            store.set(i, i);
        }
        assert_eq!(store.len(), 200);

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(store.len(), 100);
        token.cancel();
    }

    #[tokio::test]
    async fn test_count_bounded_sweep_noop_under_max() {
        let token = CancellationToken::new();
        let (store, _handle) = Store::<i32, i32>::with_count_bounded_sweep(
            100,
            Duration::from_millis(50),
            token.clone(),
        )
        .unwrap();

        for i in 0..80 {
            store.set(i, i);
        }

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(store.len(), 80);
        token.cancel();
    }

    #[tokio::test]
    async fn test_cancellation_stops_sweeping() {
        let token = CancellationToken::new();
        let store: Store<String, TestValue> = Store::new();
        let handle = TimestampSweep::new(store.clone(), Duration::from_millis(50))
            .unwrap()
            .spawn(token.clone());

        token.cancel();
        handle.await.unwrap();

        store.set(
            "stale".into(),
            TestValue {
                val: "x".into(),
                ts: Utc::now().timestamp() - 60,
            },
        );

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Sweeper is gone; the stale entry stays.
        assert!(store.has(&"stale".into()));
    }

    #[test]
    fn test_rejects_zero_max_count() {
        let store: Store<i32, i32> = Store::new();
        let err = CountBoundedSweep::new(store, 0, Duration::from_secs(1)).err().unwrap();
        assert_eq!(err, CacheError::ZeroMaxCount);
    }

    #[test]
    fn test_rejects_zero_period() {
        let store: Store<String, TestValue> = Store::new();
        let err = TimestampSweep::new(store, Duration::ZERO).err().unwrap();
        assert_eq!(err, CacheError::ZeroInterval);

        let err = CountBoundedSweep::new(Store::<i32, i32>::new(), 10, Duration::ZERO)
            .err()
            .unwrap();
        assert_eq!(err, CacheError::ZeroInterval);
    }
}
