//! Freshness cache for aggregate results
//!
//! Aggregates are stored one entry per country code and judged fresh or
//! stale lazily on read; nothing is ever expired or deleted in the store.
//! Store failures never reach the caller: a failed read is a miss and a
//! failed write is logged and dropped.

mod codec;
mod freshness;
mod store;

pub use codec::{EntryCodec, JsonCodec};
pub use freshness::{CacheLookup, FreshnessCache, DEFAULT_FRESHNESS_SECS};
pub use store::{CacheStore, DiskCacheStore, MemoryCacheStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::AggregateResult;

/// One cached aggregate, keyed by the caller's country code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub payload: AggregateResult,
}

/// Errors raised by cache stores
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache entry could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
}
