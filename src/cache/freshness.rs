//! Freshness policy over a [`CacheStore`]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{CacheEntry, CacheStore};
use crate::data::AggregateResult;

/// Age below which a cached aggregate is served as-is (24 hours)
pub const DEFAULT_FRESHNESS_SECS: u64 = 86_400;

/// Result of looking a key up in the cache
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Younger than the freshness window
    Fresh(CacheEntry),
    /// Present but at least as old as the freshness window
    Stale(CacheEntry),
    /// Absent, or the store could not be read
    Missing,
}

/// Cache of aggregate results with a fixed freshness window
#[derive(Clone)]
pub struct FreshnessCache {
    store: Arc<dyn CacheStore>,
    window: Duration,
}

impl FreshnessCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_window_secs(store, DEFAULT_FRESHNESS_SECS)
    }

    pub fn with_window_secs(store: Arc<dyn CacheStore>, window_secs: u64) -> Self {
        Self {
            store,
            window: i64::try_from(window_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Reads the entry for `key`; a read failure is reported as absent
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.store.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Reads the entry for `key` and classifies it against `now`
    pub async fn lookup(&self, key: &str, now: DateTime<Utc>) -> CacheLookup {
        match self.get(key).await {
            Some(entry) if self.is_fresh(&entry, now) => {
                debug!(key, stored_at = %entry.stored_at, "Cache hit");
                CacheLookup::Fresh(entry)
            }
            Some(entry) => {
                debug!(key, stored_at = %entry.stored_at, "Cache entry is stale");
                CacheLookup::Stale(entry)
            }
            None => CacheLookup::Missing,
        }
    }

    /// An entry is fresh iff `now - stored_at` is strictly below the window
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.stored_at) < self.window
    }

    /// Replaces the entry for `key`, stamped with the current time
    ///
    /// Returns whether the entry was persisted; a failed write is logged only.
    pub async fn put(&self, key: &str, payload: &AggregateResult) -> bool {
        self.put_at(key, payload, Utc::now()).await
    }

    /// Replaces the entry for `key` with an explicit storage time
    pub async fn put_at(
        &self,
        key: &str,
        payload: &AggregateResult,
        stored_at: DateTime<Utc>,
    ) -> bool {
        let entry = CacheEntry {
            key: key.to_string(),
            stored_at,
            payload: payload.clone(),
        };
        match self.store.put(&entry).await {
            Ok(()) => {
                debug!(key, "Cached aggregate result");
                true
            }
            Err(e) => {
                warn!(key, error = %e, "Cache write failed, result not persisted");
                false
            }
        }
    }
}
