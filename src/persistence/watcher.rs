//! Backing file watcher for live reload.

use std::path::{Path, PathBuf};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::persistence::baseline::Baseline;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// New file content that did not originate from this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub content: String,
}

/// Watches one file by watching its parent directory.
///
/// Single-file watches break when editors replace the file, so events for the
/// whole directory are filtered down to the target path.
pub struct FileWatcher {
    path: PathBuf,
    dir: PathBuf,
    baseline: Baseline,
    change_tx: mpsc::UnboundedSender<FileChange>,
}

impl FileWatcher {
    /// Create a watcher for `path`.
    ///
    /// Returns the watcher and a receiver for external changes.
    pub fn new(
        path: &Path,
        baseline: Baseline,
    ) -> Result<(Self, mpsc::UnboundedReceiver<FileChange>), WatchError> {
        let (path, dir) = resolve(path)?;
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        Ok((Self {
            path,
            dir,
            baseline,
            change_tx,
        }, change_rx))
    }

    /// The resolved file path events are filtered against.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start watching in the notify background thread.
    ///
    /// Watching stops when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, WatchError> {
        let dir = self.dir.clone();
        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => self.handle_event(&event),
                Err(e) => tracing::warn!(error = %e, "Watch error"),
            }
        }, Config::default())?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %dir.display(), "Database watcher started");
        Ok(watcher)
    }

    fn handle_event(&self, event: &Event) {
        if !(event.kind.is_modify() || event.kind.is_create()) {
            return;
        }
        if !event.paths.iter().any(|p| p == &self.path) {
            return;
        }
        self.check();
    }

    /// Re-read the file and emit a change if it differs from the baseline.
    pub fn check(&self) {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read watched file");
                return;
            }
        };

        if !self.baseline.replace_if_changed(&content) {
            tracing::trace!(path = %self.path.display(), "Watched file unchanged");
            return;
        }

        tracing::info!(path = %self.path.display(), "Database file changed externally");
        let _ = self.change_tx.send(FileChange { content });
    }
}

/// Absolute file path plus its (canonical) parent directory.
fn resolve(path: &Path) -> Result<(PathBuf, PathBuf), WatchError> {
    let resolve_err = |source| WatchError::Resolve {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path.file_name().ok_or_else(|| {
        resolve_err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let dir = parent.canonicalize().map_err(resolve_err)?;

    Ok((dir.join(file_name), dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::writer::DatabaseWriter;
    use crate::store::Database;
    use std::time::Duration;

    #[test]
    fn test_resolve_relative_path() {
        let (path, dir) = resolve(Path::new("Cargo.toml")).unwrap();
        assert!(path.is_absolute());
        assert_eq!(path.parent(), Some(dir.as_path()));
    }

    #[test]
    fn test_check_suppresses_known_content() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("db.json");
        std::fs::write(&file, "{}").unwrap();

        let (watcher, mut rx) = FileWatcher::new(&file, Baseline::new(Some("{}".into()))).unwrap();
        watcher.check();
        assert!(rx.try_recv().is_err());

        std::fs::write(&file, "{\"posts\":[]}").unwrap();
        watcher.check();
        assert_eq!(rx.try_recv().unwrap().content, "{\"posts\":[]}");

        // Duplicate OS events for the same content.
        watcher.check();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_read_failure_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, mut rx) = FileWatcher::new(&dir.path().join("gone.json"), Baseline::default()).unwrap();
        watcher.check();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_self_write_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("db.json");
        std::fs::write(&file, "{}").unwrap();

        let baseline = Baseline::new(Some("{}".into()));
        let (watcher, mut rx) = FileWatcher::new(&file, baseline.clone()).unwrap();
        let _handle = watcher.run().unwrap();

        let writer = DatabaseWriter::new(&file, baseline);
        let db = Database::parse(r#"{"posts":[{"id":"a"}]}"#).unwrap();
        writer.write(&db).await.unwrap();

        let got = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(got.is_err(), "self write should not be reported: {:?}", got);
    }

    #[tokio::test]
    async fn test_external_write_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("db.json");
        std::fs::write(&file, "{}").unwrap();

        let (watcher, mut rx) = FileWatcher::new(&file, Baseline::new(Some("{}".into()))).unwrap();
        let _handle = watcher.run().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        std::fs::write(&file, r#"{"users":[]}"#).unwrap();

        // A truncate-then-write can surface an empty intermediate read first.
        let expected = r#"{"users":[]}"#;
        let found = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(change) = rx.recv().await {
                if change.content == expected {
                    return true;
                }
            }
            false
        })
        .await;
        assert_eq!(found.ok(), Some(true));
    }
}
