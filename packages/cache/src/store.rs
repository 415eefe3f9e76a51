//! Key/value storage backends for the result cache.
//!
//! [`KeyValueStore`] models a small string store with a byte quota, the
//! way browser local storage behaves: writes that would exceed the quota
//! are rejected rather than evicting anything.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::CacheWriteError;
use crate::paths;

/// A string key/value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheWriteError`] if the write is rejected.
    fn set(&self, key: &str, value: &str) -> Result<(), CacheWriteError>;

    /// Removes `key`. Missing keys are ignored.
    fn remove(&self, key: &str);

    /// Returns every key currently stored.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store, optionally bounded by a byte quota.
///
/// The quota counts key and value bytes of every entry.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    max_bytes: Option<usize>,
}

impl MemoryStore {
    /// An unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes once `max_bytes` would be exceeded.
    #[must_use]
    pub fn with_quota(max_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            max_bytes: Some(max_bytes),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheWriteError> {
        let mut entries = self.lock();

        if let Some(quota) = self.max_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > quota {
                return Err(CacheWriteError::QuotaExceeded { needed, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// File-backed store: one file per key inside a directory.
///
/// The quota counts the bytes of every entry file in the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    max_bytes: Option<u64>,
}

impl FileStore {
    /// Opens (or creates) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheWriteError::Io`] if the directory cannot be created.
    pub fn open(dir: &Path, max_bytes: Option<u64>) -> Result<Self, CacheWriteError> {
        paths::ensure_dir(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            max_bytes,
        })
    }

    fn entry_files(&self) -> Vec<(String, PathBuf, u64)> {
        let Ok(read_dir) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let key = paths::key_from_file_name(name.to_str()?)?;
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                Some((key, entry.path(), size))
            })
            .collect()
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = paths::entry_path(&self.dir, key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Failed to read cache file {}: {e}", path.display());
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheWriteError> {
        if let Some(quota) = self.max_bytes {
            let used: u64 = self
                .entry_files()
                .iter()
                .filter(|(k, _, _)| k != key)
                .map(|(_, _, size)| size)
                .sum();
            let needed = used + value.len() as u64;
            if needed > quota {
                return Err(CacheWriteError::QuotaExceeded {
                    needed: usize::try_from(needed).unwrap_or(usize::MAX),
                    quota: usize::try_from(quota).unwrap_or(usize::MAX),
                });
            }
        }

        paths::ensure_dir(&self.dir)?;
        std::fs::write(paths::entry_path(&self.dir, key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) {
        let path = paths::entry_path(&self.dir, key);
        if let Err(e) = std::fs::remove_file(&path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            log::warn!("Failed to remove cache file {}: {e}", path.display());
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entry_files().into_iter().map(|(key, _, _)| key).collect()
    }
}
