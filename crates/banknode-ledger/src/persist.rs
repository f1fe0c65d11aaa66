use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use banknode_types::{BankError, Result};

use crate::snapshot::LedgerSnapshot;

/// Durable backing for a ledger snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<LedgerSnapshot>>;

    /// Replace the stored snapshot. Must not return before the write is durable.
    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()>;
}

/// JSON file store with atomic writes (.tmp → fsync → rename).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> BankError {
    BankError::Storage(format!("Failed to {action} {}: {err}", path.display()))
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage_error("read ledger file", &self.path, err)),
        };
        let snapshot: LedgerSnapshot = serde_json::from_str(&content)
            .map_err(|err| storage_error("parse ledger file", &self.path, err))?;
        snapshot
            .validate()
            .map_err(|err| storage_error("validate ledger file", &self.path, err))?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        let parent = self.parent_dir();
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| storage_error("create ledger directory", parent, err))?;
        let tmp_path = self.tmp_path();
        let content = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| storage_error("serialize ledger for", &self.path, err))?;

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|err| storage_error("create", &tmp_path, err))?;
        file.write_all(&content)
            .await
            .map_err(|err| storage_error("write", &tmp_path, err))?;
        file.sync_all()
            .await
            .map_err(|err| storage_error("sync", &tmp_path, err))?;
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| storage_error("rename temp file onto", &self.path, err))?;
        sync_dir(parent).await
    }
}

/// Persist the directory entry created by a rename.
#[cfg(unix)]
async fn sync_dir(dir: &Path) -> Result<()> {
    let handle = tokio::fs::File::open(dir)
        .await
        .map_err(|err| storage_error("open ledger directory", dir, err))?;
    handle
        .sync_all()
        .await
        .map_err(|err| storage_error("sync ledger directory", dir, err))
}

// Directories cannot be opened as files here; the rename is durable once it returns.
#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Snapshot store that keeps the last saved snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<LedgerSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            saved: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self) -> Result<Option<LedgerSnapshot>> {
        Ok(self.saved.lock().await.clone())
    }

    async fn save(&self, snapshot: &LedgerSnapshot) -> Result<()> {
        *self.saved.lock().await = Some(snapshot.clone());
        Ok(())
    }
}
