//! KVCACHE - Concurrency-Safe In-Process Key/Value Cache
//!
//! Generic key/value storage with three eviction disciplines:
//! unbounded storage with manual lifecycle, TTL expiry with periodic
//! background sweeping, and count-bounded eviction with arbitrary
//! victim choice. All background sweepers are tokio tasks bound to a
//! cancellation token and hand back an explicit join handle.

pub mod error;
pub mod store;
pub mod sweep;
pub mod ttl;

mod ticker;

pub use error::CacheError;
pub use store::Store;
pub use sweep::{CountBoundedSweep, Expiry, TimestampSweep};
pub use ttl::TtlStore;
