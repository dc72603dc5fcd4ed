//! Durable key/value storage for snapshots and history.
//!
//! This module provides:
//! - `SnapshotStorage`: the persist/load capability
//! - `JsonFileStorage`: one pretty-printed JSON file per key, written atomically
//! - `MemoryStorage`: in-memory storage with failure injection for tests
//!
//! A successful `persist` is durable before it returns. A failed `persist`
//! leaves the caller's in-memory state authoritative; nothing retries.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;

// ============================================================================
// StorageError
// ============================================================================

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("ストレージの入出力に失敗しました ({key}): {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Stored bytes are not valid JSON for the expected shape.
    #[error("保存データが破損しています ({key}): {detail}")]
    Malformed { key: String, detail: String },

    /// Injected failure (tests only).
    #[error("ストレージが利用できません: {0}")]
    Unavailable(String),
}

// ============================================================================
// SnapshotStorage
// ============================================================================

/// Durable key/value storage capability.
pub trait SnapshotStorage: Send + Sync {
    /// Stores `value` under `key`; durable once this returns `Ok`.
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Loads the value under `key`, or `None` when nothing is stored.
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

/// Serializes and persists a typed value.
pub fn persist_typed<T: Serialize>(
    storage: &dyn SnapshotStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let value = serde_json::to_value(value).map_err(|e| StorageError::Malformed {
        key: key.to_string(),
        detail: e.to_string(),
    })?;
    storage.persist(key, &value)
}

/// Loads and decodes a typed value, treating every failure as "absent".
///
/// Load failures and malformed data are logged and swallowed so that callers
/// fall back to their defaults instead of failing startup.
pub fn load_typed<T: DeserializeOwned>(storage: &dyn SnapshotStorage, key: &str) -> Option<T> {
    let value = match storage.load(key) {
        Ok(Some(value)) => value,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "保存データの読み込みに失敗しました");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!(key, error = %e, "保存データの形式が不正なため無視します");
            None
        }
    }
}

// ============================================================================
// JsonFileStorage
// ============================================================================

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Creates storage rooted at `dir` (created lazily on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn io_error(key: &str, source: io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl SnapshotStorage for JsonFileStorage {
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| Self::io_error(key, e))?;
        let json = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Malformed {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
        tmp.write_all(&json).map_err(|e| Self::io_error(key, e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Self::io_error(key, e))?;
        tmp.persist(self.path_for(key))
            .map_err(|e| Self::io_error(key, e.error))?;

        tracing::trace!(key, "保存しました");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let content = match fs::read_to_string(self.path_for(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(key, e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StorageError::Malformed {
                key: key.to_string(),
                detail: e.to_string(),
            })
    }
}

// ============================================================================
// MemoryStorage
// ============================================================================

/// In-memory storage with injectable failures.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Value>>,
    persist_count: Mutex<usize>,
    fail_persist: AtomicBool,
    fail_load: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a key, bypassing failure injection.
    pub fn insert(&self, key: &str, value: Value) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    /// Returns the stored value, bypassing failure injection.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of successful `persist` calls.
    #[must_use]
    pub fn persist_count(&self) -> usize {
        *self
            .persist_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }
}

impl SnapshotStorage for MemoryStorage {
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("persist {}", key)));
        }
        self.insert(key, value.clone());
        *self
            .persist_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("load {}", key)));
        }
        Ok(self.get(key))
    }
}

// ============================================================================
// Tests
// ============================================================================
