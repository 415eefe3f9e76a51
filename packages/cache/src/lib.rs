#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Persisted result cache with per-entry expiry.
//!
//! Each cache entry is stored as two keys in a [`KeyValueStore`]:
//! `<prefix>:<key>:data` holds the serialized value and
//! `<prefix>:<key>:timestamp` holds the millisecond epoch it was written
//! at. Entries are keyed by the caller (typically a canonical hash of the
//! query that produced them), so unrelated queries never overwrite each
//! other.
//!
//! Write failures never surface: a rejected write clears every entry under
//! the prefix and the caller proceeds uncached.

pub mod paths;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Default key prefix for entries written by this crate.
pub const DEFAULT_PREFIX: &str = "peace_map_acled";

/// Default time-to-live, in hours.
pub const DEFAULT_TTL_HOURS: u32 = 24;

/// Default store quota, matching typical browser local-storage limits.
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Errors raised while persisting a cache entry.
///
/// These are handled inside [`ResultCache::put`] and never returned to
/// its callers.
#[derive(Debug, thiserror::Error)]
pub enum CacheWriteError {
    /// The store has no room for the entry.
    #[error("Cache quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured quota.
        quota: usize,
    },

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failed.
    #[error("JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cache settings, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether responses are cached at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory for the file store.
    #[serde(default = "paths::default_cache_dir")]
    pub dir: PathBuf,
    /// Entry lifetime in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
    /// Store quota in bytes. `None` disables the quota.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: Option<u64>,
}

const fn default_true() -> bool {
    true
}

const fn default_ttl_hours() -> u32 {
    DEFAULT_TTL_HOURS
}

#[allow(clippy::unnecessary_wraps)]
const fn default_max_bytes() -> Option<u64> {
    Some(DEFAULT_MAX_BYTES)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: paths::default_cache_dir(),
            ttl_hours: DEFAULT_TTL_HOURS,
            max_bytes: Some(DEFAULT_MAX_BYTES),
        }
    }
}

impl CacheConfig {
    /// Opens a file-backed cache as configured, or `None` when caching is
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns [`CacheWriteError::Io`] if the cache directory cannot be
    /// created.
    pub fn open(&self) -> Result<Option<ResultCache>, CacheWriteError> {
        if !self.enabled {
            return Ok(None);
        }
        let store = FileStore::open(&self.dir, self.max_bytes)?;
        Ok(Some(
            ResultCache::new(Arc::new(store))
                .with_ttl(Duration::hours(i64::from(self.ttl_hours))),
        ))
    }
}

/// A time-to-live cache over a [`KeyValueStore`].
#[derive(Clone)]
pub struct ResultCache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    ttl: Duration,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ResultCache {
    /// A cache with the default prefix and a 24 hour TTL.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            prefix: DEFAULT_PREFIX.to_string(),
            ttl: Duration::hours(i64::from(DEFAULT_TTL_HOURS)),
        }
    }

    /// An unbounded in-memory cache.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Overrides the entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    fn data_key(&self, key: &str) -> String {
        format!("{}:{key}:data", self.prefix)
    }

    fn timestamp_key(&self, key: &str) -> String {
        format!("{}:{key}:timestamp", self.prefix)
    }

    /// Returns the cached value for `key` if it is younger than the TTL.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, Utc::now())
    }

    /// [`Self::get`] evaluated at `now`.
    ///
    /// Expired, half-written, or undecodable entries are removed and
    /// reported as absent.
    #[must_use]
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let stored_at = self
            .store
            .get(&self.timestamp_key(key))
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        let Some(stored_at) = stored_at else {
            if self.store.get(&self.data_key(key)).is_some() {
                log::debug!("Cache entry {key} has no timestamp, clearing");
                self.clear(key);
            }
            return None;
        };

        let age_ms = now.timestamp_millis().saturating_sub(stored_at);
        if age_ms >= self.ttl.num_milliseconds() {
            log::info!(
                "Cache entry {key} expired ({:.1}h old), clearing",
                age_ms as f64 / 3_600_000.0
            );
            self.clear(key);
            return None;
        }

        let Some(data) = self.store.get(&self.data_key(key)) else {
            self.clear(key);
            return None;
        };

        match serde_json::from_str(&data) {
            Ok(value) => {
                log::debug!(
                    "Cache hit for {key} ({:.1}h old)",
                    age_ms as f64 / 3_600_000.0
                );
                Some(value)
            }
            Err(e) => {
                log::warn!("Cache entry {key} is unreadable ({e}), clearing");
                self.clear(key);
                None
            }
        }
    }

    /// Stores `value` under `key`, stamped with the current time.
    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.put_at(key, value, Utc::now());
    }

    /// [`Self::put`] stamped with `now`.
    ///
    /// If the store rejects the write, every entry under the prefix is
    /// cleared and the value is not cached.
    pub fn put_at<T: Serialize + ?Sized>(&self, key: &str, value: &T, now: DateTime<Utc>) {
        self.purge_expired_at(now);
        if let Err(e) = self.try_put(key, value, now) {
            log::warn!("Failed to cache {key}, clearing cache: {e}");
            self.clear_all();
        }
    }

    fn try_put<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        now: DateTime<Utc>,
    ) -> Result<(), CacheWriteError> {
        let data = serde_json::to_string(value)?;
        self.store.set(&self.data_key(key), &data)?;
        self.store
            .set(&self.timestamp_key(key), &now.timestamp_millis().to_string())?;
        log::debug!("Cached {key} ({} bytes)", data.len());
        Ok(())
    }

    /// Removes every entry under the prefix that is older than the TTL at
    /// `now`. Returns the number of entries removed.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let prefix = format!("{}:", self.prefix);
        let mut removed = 0;

        for store_key in self.store.keys() {
            let Some(entry) = store_key
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(":timestamp"))
            else {
                continue;
            };
            let expired = self
                .store
                .get(&store_key)
                .and_then(|raw| raw.trim().parse::<i64>().ok())
                .is_none_or(|stored_at| {
                    now.timestamp_millis().saturating_sub(stored_at)
                        >= self.ttl.num_milliseconds()
                });
            if expired {
                self.clear(entry);
                removed += 1;
            }
        }

        if removed > 0 {
            log::debug!("Purged {removed} expired cache entries");
        }
        removed
    }

    /// Removes the entry for `key`.
    pub fn clear(&self, key: &str) {
        self.store.remove(&self.data_key(key));
        self.store.remove(&self.timestamp_key(key));
    }

    /// Removes every entry under this cache's prefix.
    pub fn clear_all(&self) {
        let prefix = format!("{}:", self.prefix);
        for key in self.store.keys() {
            if key.starts_with(&prefix) {
                self.store.remove(&key);
            }
        }
    }
}
