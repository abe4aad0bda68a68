//! Write-back of store state to the backing file.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::persistence::baseline::Baseline;
use crate::store::{Database, DatabaseStore};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to serialize database: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Replaces the backing file with serialized state.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// readers never see a partial document. Writes are serialized: each one
/// snapshots the store while holding the lock, so a newer state is never
/// overwritten by an older one.
#[derive(Debug)]
pub struct DatabaseWriter {
    path: PathBuf,
    baseline: Baseline,
    lock: Mutex<()>,
}

impl DatabaseWriter {
    pub fn new(path: impl Into<PathBuf>, baseline: Baseline) -> Self {
        Self {
            path: path.into(),
            baseline,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the store's current state.
    pub async fn persist(&self, store: &DatabaseStore) -> Result<(), WriteError> {
        let _serial = self.lock.lock().await;
        let snapshot = store.get_state();
        self.write_locked(&snapshot).await
    }

    /// Persist a specific database value.
    pub async fn write(&self, database: &Database) -> Result<(), WriteError> {
        let _serial = self.lock.lock().await;
        self.write_locked(database).await
    }

    async fn write_locked(&self, database: &Database) -> Result<(), WriteError> {
        let content = database.to_pretty_string()?;

        // Must precede the write, or the watcher reads our own file as external.
        self.baseline.set(content.clone());

        let tmp_path = temp_path(&self.path);
        let io_err = |source| WriteError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = tokio::fs::File::create(&tmp_path).await.map_err(io_err)?;
        file.write_all(content.as_bytes()).await.map_err(io_err)?;
        file.sync_all().await.map_err(io_err)?;
        drop(file);
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(io_err)?;

        tracing::debug!(
            path = %self.path.display(),
            bytes = content.len(),
            "Database written"
        );
        Ok(())
    }
}

/// `db.json` → `.db.json.tmp` in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{database_store, Action};
    use serde_json::json;

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(temp_path(Path::new("/data/db.json")), PathBuf::from("/data/.db.json.tmp"));
    }

    #[tokio::test]
    async fn test_write_sets_baseline_before_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let baseline = Baseline::default();
        let writer = DatabaseWriter::new(&path, baseline.clone());

        let store = database_store(Database::default());
        let mut body = serde_json::Map::new();
        body.insert("text".into(), json!("A"));
        store.dispatch(Action::Insert { key: "posts".into(), id: "a".into(), body });

        writer.persist(&store).await.unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(baseline.get().as_deref(), Some(on_disk.as_str()));
        assert!(!baseline.replace_if_changed(&on_disk));
        assert_eq!(Database::parse(&on_disk).unwrap(), *store.get_state());
        assert!(!temp_path(&path).exists());
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DatabaseWriter::new(dir.path().join("missing/db.json"), Baseline::default());
        let err = writer.write(&Database::default()).await.unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
