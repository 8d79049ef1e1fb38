//! Persisted string values by key
//!
//! [`FileKeyValueStore`] keeps a single JSON object on disk and rewrites it
//! on every `set`; [`MemoryKeyValueStore`] is its in-process counterpart.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Errors from a key/value store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error: {0}")]
    Io(String),

    /// The stored document or value is not valid JSON
    #[error("Stored data is not valid JSON: {0}")]
    Json(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

/// Boxed future returned by [`KeyValueStore`] methods
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// String values addressed by key
pub trait KeyValueStore: Send + Sync {
    /// Value under `key`, if any
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>>;

    /// Replace the value under `key`
    fn set<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()>;
}

/// Key/value store backed by a JSON object in one file
///
/// A missing file reads as empty. Writes replace the whole file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileKeyValueStore {
    /// Store backed by `path`; the file is created on first `set`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        Box::pin(async move {
            let values = self.read_all().await?;
            Ok(values.get(key).cloned())
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut values = self.read_all().await?;
            values.insert(key.to_string(), value);
            let document = serde_json::to_string_pretty(&values)?;
            tokio::fs::write(&self.path, document).await?;
            tracing::debug!(path = %self.path.display(), key, "Persisted value");
            Ok(())
        })
    }
}

/// In-memory key/value store
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get<'a>(&'a self, key: &'a str) -> StorageFuture<'a, Option<String>> {
        let value = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();
        Box::pin(async move { Ok(value) })
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> StorageFuture<'a, ()> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Box::pin(async { Ok(()) })
    }
}
