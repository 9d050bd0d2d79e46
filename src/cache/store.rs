//! Key/value stores for cache entries
//!
//! [`DiskCacheStore`] keeps one file per key in an XDG-compliant cache
//! directory. [`MemoryCacheStore`] keeps entries in process memory.

use async_trait::async_trait;
use directories::ProjectDirs;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::codec::{EntryCodec, JsonCodec};
use super::{CacheEntry, CacheError};

/// Whole-entry get/put over cache entries keyed by country code
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Reads the entry for `key`, or `None` if there is none
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Replaces the entry stored under `entry.key`
    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;
}

/// Distinguishes temp files of concurrent writers within one process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each entry as a file in a cache directory
///
/// Writes go to a temporary file that is renamed over the target, so a reader
/// sees either the old entry or the new one, never a partial write.
#[derive(Debug, Clone)]
pub struct DiskCacheStore<C = JsonCodec> {
    cache_dir: PathBuf,
    codec: C,
}

impl DiskCacheStore<JsonCodec> {
    /// Creates a store in the XDG cache directory (`~/.cache/povertyatlas/` on Linux)
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "povertyatlas")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a store in a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            codec: JsonCodec,
        }
    }
}

impl<C: EntryCodec> DiskCacheStore<C> {
    /// Creates a store in `cache_dir` that encodes entries with `codec`
    pub fn with_codec(cache_dir: PathBuf, codec: C) -> Self {
        Self { cache_dir, codec }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", file_stem(key), self.codec.extension()))
    }
}

#[async_trait]
impl<C: EntryCodec> CacheStore for DiskCacheStore<C> {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let bytes = match tokio::fs::read(self.cache_path(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        self.codec.decode(&bytes).map(Some)
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;

        let bytes = self.codec.encode(entry)?;
        let target = self.cache_path(&entry.key);
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = target.with_extension(format!("tmp-{}-{}", std::process::id(), seq));

        tokio::fs::write(&tmp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Maps a key to a file stem; bytes outside `[A-Za-z0-9_-]` are
/// percent-escaped so distinct keys never share a file
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

/// Keeps entries in process memory
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory store poisoned".to_string()))?;
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}
