//! Byte encoding of cache entries at the store boundary

use super::{CacheEntry, CacheError};

/// Converts cache entries to and from the bytes a store persists
///
/// Stores with their own number representation rules plug in their codec here
/// instead of the pipeline reshaping its payload.
pub trait EntryCodec: Send + Sync {
    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>, CacheError>;

    fn decode(&self, bytes: &[u8]) -> Result<CacheEntry, CacheError>;

    /// File extension used by file-backed stores
    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Pretty-printed JSON, which keeps the poverty payload's numbers and key
/// order exactly as they were fetched
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl EntryCodec for JsonCodec {
    fn encode(&self, entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
        Ok(serde_json::to_vec_pretty(entry)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<CacheEntry, CacheError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
