#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the persisted cache.
//!
//! Paths are relative to the working directory unless overridden in the
//! cache configuration.

use std::path::{Path, PathBuf};

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the default `data/cache/` directory for the file store.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    data_dir().join("cache")
}

/// Returns the file path backing a single store key.
///
/// Keys are hex-encoded so that any key is a valid file name on every
/// platform.
#[must_use]
pub fn entry_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", hex::encode(key.as_bytes())))
}

/// Recovers the store key from a file name produced by [`entry_path`].
#[must_use]
pub fn key_from_file_name(file_name: &str) -> Option<String> {
    let encoded = file_name.strip_suffix(".json")?;
    let bytes = hex::decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
