//! Snapshot persistence collaborator

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use crate::{
    error::{Error, Result},
    state::Snapshot,
};

/// Loads and saves the overlay snapshot.
///
/// `load` hands back raw JSON so a partially valid snapshot can still be
/// restored field by field.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<Value>>;
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Snapshot kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/chronoghost/state.json`, or the working directory when the
    /// platform has no data dir
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chronoghost")
            .join("state.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self) -> Result<Option<Value>> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        // Write then rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Store(format!("{}: {}", self.path.display(), e)))?;
        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}

/// Snapshot kept in memory; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<Value>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing (possibly corrupt) snapshot
    pub fn with_value(value: Value) -> Self {
        Self {
            value: Mutex::new(Some(value)),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn value(&self) -> Option<Value> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<Value>> {
        Ok(self.value())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let value = serde_json::to_value(snapshot)?;
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::OverlayState;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("chronoghost-test-{}-{}", std::process::id(), name))
            .join("nested")
            .join("state.json")
    }

    #[tokio::test]
    async fn file_store_round_trip_creates_dirs() {
        let path = temp_path("round-trip");
        let store = JsonFileStore::new(&path);
        assert_eq!(store.load().await.unwrap(), None);

        let snapshot = Snapshot::capture(&OverlayState::new());
        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded["timers"][0]["name"], "Timer 1");
        assert_eq!(loaded["opacity"], 0.85);

        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[tokio::test]
    async fn unparseable_file_is_an_error() {
        let path = temp_path("garbage");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load().await, Err(Error::Json(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[tokio::test]
    async fn memory_store_counts_saves() {
        let store = MemoryStore::new();
        store.save(&Snapshot::capture(&OverlayState::new())).await.unwrap();
        store.save(&Snapshot::capture(&OverlayState::new())).await.unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(store.load().await.unwrap().is_some());
    }
}
