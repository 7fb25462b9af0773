//! Cache Errors
//!
//! Misconfiguration is the only failure mode; every steady-state
//! operation is total and reports absence through `Option`.

use thiserror::Error;

/// Construction-time configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    /// A sweeper cannot tick with a zero period
    #[error("sweep interval must be greater than zero")]
    ZeroInterval,

    /// A count bound of zero would drain the store on every tick
    #[error("maximum entry count must be greater than zero")]
    ZeroMaxCount,
}
