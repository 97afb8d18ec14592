//! Persistent key-value store shared by every surface (popup, coordinator, CLI).
//!
//! Values are JSON. A file-backed store keeps the whole map in one JSON object and
//! replaces the file atomically on every mutation, so a reader in another process
//! never observes a partial write. Before each operation the file's modification
//! time is compared with the last one seen and the map is reloaded if another
//! process wrote in between.

pub mod defaults;
pub mod keys;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tokio::sync::{RwLock, watch};

/// Errors raised by the store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A value could not be converted to JSON
    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

struct Contents {
    map: Map<String, Value>,
    seen_modified: Option<SystemTime>,
}

struct StoreInner {
    path: Option<PathBuf>,
    contents: RwLock<Contents>,
    revision: watch::Sender<u64>,
}

/// Asynchronous JSON key-value store
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.inner.path).finish()
    }
}

impl Store {
    /// Create a store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::with_contents(None, Map::new(), None)
    }

    /// Open (or lazily create) a file-backed store.
    ///
    /// A malformed file is logged and treated as empty; it is replaced on the next write.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let (map, modified) = read_file(&path).await?;
        tracing::debug!("Opened store at {:?} ({} keys)", path, map.len());
        Ok(Self::with_contents(Some(path), map, modified))
    }

    fn with_contents(
        path: Option<PathBuf>,
        map: Map<String, Value>,
        seen_modified: Option<SystemTime>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(StoreInner {
                path,
                contents: RwLock::new(Contents { map, seen_modified }),
                revision,
            }),
        }
    }

    /// Path of the backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Subscribe to change notifications. The value is a revision counter
    /// bumped once per mutation (including reloads caused by other processes).
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Get a raw JSON value
    pub async fn get_raw(&self, key: &str) -> Option<Value> {
        self.sync_from_disk().await;
        let contents = self.inner.contents.read().await;
        contents.map.get(key).cloned()
    }

    /// Get a typed value. A value of the wrong shape is logged and reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key).await?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Store value for '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Get a string value, accepting numbers and booleans by their display form
    pub async fn get_string(&self, key: &str) -> Option<String> {
        match self.get_raw(key).await? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Get a flag, accepting `true`, `"true"`, `"1"` and `1` as set
    pub async fn get_flag(&self, key: &str) -> bool {
        self.get_raw(key).await.as_ref().is_some_and(is_truthy)
    }

    /// Whether a key is present
    pub async fn contains(&self, key: &str) -> bool {
        self.get_raw(key).await.is_some()
    }

    /// All keys currently stored
    pub async fn keys(&self) -> Vec<String> {
        self.sync_from_disk().await;
        let contents = self.inner.contents.read().await;
        contents.map.keys().cloned().collect()
    }

    /// Set one value
    pub async fn set<V: Serialize>(&self, key: &str, value: V) -> StoreResult<()> {
        let value = to_value(key, value)?;
        self.set_many([(key.to_string(), value)]).await
    }

    /// Set several values with a single write
    pub async fn set_many<I, K>(&self, entries: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.mutate(|map| {
            for (key, value) in entries {
                map.insert(key.into(), value);
            }
        })
        .await
    }

    /// Remove one key
    pub async fn remove(&self, key: &str) -> StoreResult<()> {
        self.remove_many([key]).await
    }

    /// Remove several keys with a single write
    pub async fn remove_many<'a, I>(&self, keys: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.mutate(|map| {
            for key in keys {
                map.remove(key);
            }
        })
        .await
    }

    /// Remove every key
    pub async fn clear(&self) -> StoreResult<()> {
        self.mutate(|map| map.clear()).await
    }

    async fn mutate<F>(&self, apply: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut contents = self.inner.contents.write().await;

        // Merge onto whatever another process wrote since we last looked
        if let Some(path) = &self.inner.path {
            let on_disk = modified_time(path).await;
            if on_disk.is_some() && on_disk != contents.seen_modified {
                let (map, modified) = read_file(path).await?;
                contents.map = map;
                contents.seen_modified = modified;
            }
        }

        apply(&mut contents.map);

        if let Some(path) = &self.inner.path {
            write_atomic(path, &contents.map).await?;
            contents.seen_modified = modified_time(path).await;
        }
        drop(contents);

        self.inner.revision.send_modify(|rev| *rev += 1);
        Ok(())
    }

    async fn sync_from_disk(&self) {
        let Some(path) = &self.inner.path else {
            return;
        };
        let on_disk = modified_time(path).await;
        {
            let contents = self.inner.contents.read().await;
            if on_disk.is_none() || on_disk == contents.seen_modified {
                return;
            }
        }

        match read_file(path).await {
            Ok((map, modified)) => {
                let mut contents = self.inner.contents.write().await;
                contents.map = map;
                contents.seen_modified = modified;
                drop(contents);
                tracing::trace!("Store reloaded after external write");
                self.inner.revision.send_modify(|rev| *rev += 1);
            }
            Err(e) => tracing::warn!("Failed to reload store: {}", e),
        }
    }
}

/// Loose truthiness used for flags written by older clients
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => s == "true" || s == "1",
        _ => false,
    }
}

fn to_value<V: Serialize>(key: &str, value: V) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

async fn read_file(path: &Path) -> StoreResult<(Map<String, Value>, Option<SystemTime>)> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok((Map::new(), None)),
        Err(e) => return Err(StoreError::io(path, e)),
    };
    let modified = modified_time(path).await;

    let map = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::error!("Store file {:?} is not a JSON object, starting empty", path);
            Map::new()
        }
        Err(e) => {
            tracing::error!("Store file {:?} is malformed ({}), starting empty", path, e);
            Map::new()
        }
    };
    Ok((map, modified))
}

async fn write_atomic(path: &Path, map: &Map<String, Value>) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let json = serde_json::to_string_pretty(map).map_err(|source| StoreError::Serialize {
        key: "*".to_string(),
        source,
    })?;

    // Per-process temp name so concurrent writers never share a temp file
    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    tokio::fs::write(&temp_path, json)
        .await
        .map_err(|e| StoreError::io(&temp_path, e))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(())
}
