//! Persistence adapters for store snapshots
//!
//! The store only needs two operations from its backing storage: load the
//! snapshot once at startup and persist the full snapshot after a mutation.
//! `JsonFileSnapshot` keeps the snapshot in a single pretty-printed JSON file;
//! `MemorySnapshot` keeps it in memory for ephemeral servers and tests.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{Result, StoreError};

/// Load/persist contract for store snapshots
///
/// Send + Sync required so the adapter can live inside the shared router.
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot
    fn load(&self) -> Result<Value>;

    /// Overwrite the snapshot with `snapshot`
    fn persist(&self, snapshot: &Value) -> Result<()>;

    /// Human readable location (for logs)
    fn describe(&self) -> String;
}

// ============================================================================
// JSON file
// ============================================================================

/// Snapshot stored as a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileSnapshot {
    path: PathBuf,
}

impl JsonFileSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty `{}` snapshot if the file does not exist yet.
    ///
    /// Returns true when a file was created.
    pub fn init_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.persist(&Value::Object(serde_json::Map::new()))?;
        Ok(true)
    }

    /// Sibling temp file used for atomic replacement
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileSnapshot {
    fn load(&self) -> Result<Value> {
        let text = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::SnapshotNotFound(self.path.clone()),
            _ => StoreError::Io(e),
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    fn persist(&self, snapshot: &Value) -> Result<()> {
        let text = serde_json::to_string_pretty(snapshot)?;

        // Atomic write: temp + fsync + rename
        let tmp_path = self.tmp_path();
        let written = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.sync_all()?;
            drop(file);
            fs::rename(&tmp_path, &self.path)
        });

        if let Err(e) = written {
            // Never leave a partial temp file behind
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp_path.display(),
                        error = %cleanup,
                        "failed to remove temp snapshot"
                    );
                }
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Snapshot held in memory; nothing touches the filesystem
#[derive(Debug)]
pub struct MemorySnapshot {
    data: Mutex<Value>,
    persist_count: AtomicUsize,
}

impl MemorySnapshot {
    pub fn new(initial: Value) -> Self {
        Self {
            data: Mutex::new(initial),
            persist_count: AtomicUsize::new(0),
        }
    }

    /// Empty `{}` snapshot
    pub fn empty() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }

    /// Number of successful `persist` calls
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }

    /// Copy of the last persisted (or initial) snapshot
    pub fn current(&self) -> Result<Value> {
        self.data
            .lock()
            .map(|data| data.clone())
            .map_err(|_| StoreError::LockPoisoned("snapshot read"))
    }
}

impl SnapshotStore for MemorySnapshot {
    fn load(&self) -> Result<Value> {
        self.current()
    }

    fn persist(&self, snapshot: &Value) -> Result<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| StoreError::LockPoisoned("snapshot write"))?;
        *data = snapshot.clone();
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}


#[cfg(test)]
mod memory_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_snapshot_roundtrip() {
        let snapshot = MemorySnapshot::empty();
        assert_eq!(snapshot.load().unwrap(), json!({}));
        assert_eq!(snapshot.persist_count(), 0);

        snapshot.persist(&json!({"todos": []})).unwrap();

        assert_eq!(snapshot.load().unwrap(), json!({"todos": []}));
        assert_eq!(snapshot.persist_count(), 1);
        assert_eq!(snapshot.describe(), "<memory>");
    }
}
