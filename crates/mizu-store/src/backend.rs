//! Snapshot backends: where a store's document lives between runs.
//!
//! The store hands over the whole document on every flush. Backends replace the
//! previous snapshot in one step and never patch it.

use async_trait::async_trait;
use mizu_core::{Error, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Pluggable snapshot storage.
#[async_trait]
pub trait SnapshotBackend: Send + Sync {
    /// Last saved document, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<Value>>;

    /// Replace the saved document.
    async fn save(&self, document: &Value) -> Result<()>;

    /// Physical path/URI (for human inspection).
    fn location(&self) -> String;
}

/// JSON file on local disk, e.g. `deployed_objects.json`.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl SnapshotBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let document = serde_json::from_str(&content)
            .map_err(|e| Error::snapshot(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(document))
    }

    async fn save(&self, document: &Value) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut json = serde_json::to_string_pretty(document)?;
        json.push('\n');
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!("wrote {} ({} bytes)", self.path.display(), json.len());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process backend. Clones share the same document, so a test can drop a
/// store and reopen it to simulate a restart.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    document: Arc<Mutex<Option<Value>>>,
    fail_saves: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Value) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(document))),
            ..Self::default()
        }
    }

    /// Make every following save fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn document(&self) -> Option<Value> {
        self.document.lock().await.clone()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<Value>> {
        Ok(self.document.lock().await.clone())
    }

    async fn save(&self, document: &Value) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "snapshot save disabled").into());
        }
        *self.document.lock().await = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_file_missing_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(tmp.path().join("nope.json"));
        assert!(backend.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_file_save_replaces_and_leaves_no_tmp() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state").join("user_objects.json");
        let backend = JsonFileBackend::new(&path);

        backend.save(&json!({"a": "1"})).await.unwrap();
        backend.save(&json!({"b": "2"})).await.unwrap();

        let loaded = backend.load().await.unwrap().unwrap();
        assert_eq!(loaded, json!({"b": "2"}));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn json_file_corrupt_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonFileBackend::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[tokio::test]
    async fn memory_backend_shared_between_clones() {
        let a = MemoryBackend::new();
        let b = a.clone();
        a.save(&json!({"k": "v"})).await.unwrap();
        assert_eq!(b.load().await.unwrap(), Some(json!({"k": "v"})));
        assert_eq!(b.save_count(), 1);
    }

    #[tokio::test]
    async fn memory_backend_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_saves(true);
        assert!(backend.save(&json!({})).await.is_err());
        assert!(backend.document().await.is_none());
    }
}
