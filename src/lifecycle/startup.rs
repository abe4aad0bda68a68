//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the database file, creating `{}` when it does not exist
//! - Seed the watcher baseline with what was loaded
//! - Build the first serving generation and the HTTP server
//! - Start the file watcher and the reload loop
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: a missing directory or an invalid database file at startup
//!   is fatal; the same problems after startup are only logged
//! - A reload builds a fresh store and dispatcher and swaps them in; the old
//!   generation is detached, and in-flight requests finish on it

use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::api::build_app_state;
use crate::config::ServerConfig;
use crate::http::{shared_state, HttpServer, SharedState};
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::persistence::{Baseline, DatabaseWriter, FileChange, FileWatcher, WatchError};
use crate::store::{database_store, Database, DatabaseError};

const EMPTY_DATABASE: &str = "{}\n";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read database {path}: {source}")]
    ReadDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create database {path}: {source}")]
    CreateDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid database {path}: {source}")]
    InvalidDatabase {
        path: PathBuf,
        #[source]
        source: DatabaseError,
    },

    #[error("database watcher failed: {0}")]
    Watch(#[from] WatchError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Read and validate the database file, writing an empty one if missing.
///
/// Returns the raw content alongside the parsed database.
pub async fn load_or_create(path: &Path) -> Result<(String, Database), StartupError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "Database file not found; creating an empty one");
            tokio::fs::write(path, EMPTY_DATABASE)
                .await
                .map_err(|source| StartupError::CreateDatabase {
                    path: path.to_path_buf(),
                    source,
                })?;
            EMPTY_DATABASE.to_string()
        }
        Err(source) => {
            return Err(StartupError::ReadDatabase {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let database = Database::parse(&content).map_err(|source| StartupError::InvalidDatabase {
        path: path.to_path_buf(),
        source,
    })?;
    Ok((content, database))
}

/// A started server that has not bound a socket yet.
pub struct Running {
    pub server: HttpServer,
    pub shared: SharedState,
    pub writer: Arc<DatabaseWriter>,
    pub baseline: Baseline,
    watcher: Option<RecommendedWatcher>,
    reload: Option<JoinHandle<()>>,
}

impl Running {
    /// Serve on `listener` until `shutdown` fires, then stop watching.
    pub async fn serve(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        let Running {
            server,
            watcher,
            reload,
            ..
        } = self;

        let result = server.run(listener, shutdown.subscribe()).await;

        drop(watcher);
        if let Some(reload) = reload {
            shutdown.trigger();
            if let Err(e) = reload.await {
                tracing::warn!(error = %e, "Reload task ended abnormally");
            }
        }
        result.map_err(StartupError::Serve)
    }

    /// Whether external edits are being watched.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }
}

/// Everything up to, but not including, binding the listener.
pub async fn start(config: ServerConfig, shutdown: &Shutdown) -> Result<Running, StartupError> {
    let db_path = config.storage.database.clone();
    let storage_dir = config.storage.storage_dir.clone();

    let (content, database) = load_or_create(&db_path).await?;
    tracing::info!(
        path = %db_path.display(),
        collections = database.collections().count(),
        entries = database.entry_count(),
        "Database loaded"
    );

    let baseline = Baseline::new(Some(content));
    let writer = Arc::new(DatabaseWriter::new(db_path.clone(), baseline.clone()));
    let store = Arc::new(database_store(database));
    let shared = shared_state(build_app_state(store, Arc::clone(&writer), storage_dir.clone()));

    let (watcher, reload) = if config.storage.watch {
        let (file_watcher, changes) = FileWatcher::new(&db_path, baseline.clone())?;
        let watcher = file_watcher.run()?;
        let reload = spawn_reload_loop(
            changes,
            Arc::clone(&shared),
            Arc::clone(&writer),
            storage_dir,
            shutdown.subscribe(),
        );
        (Some(watcher), Some(reload))
    } else {
        tracing::info!("Database watching disabled");
        (None, None)
    };

    let server = HttpServer::new(config, Arc::clone(&shared));
    Ok(Running {
        server,
        shared,
        writer,
        baseline,
        watcher,
        reload,
    })
}

/// Start, bind and serve until shutdown.
pub async fn run(config: ServerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let address = config.bind_address();
    let running = start(config, &shutdown).await?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => tracing::info!(address = %local, "Server is listening at http://{}", address),
        Err(_) => tracing::info!("Server is listening at http://{}", address),
    }

    running.serve(listener, &shutdown).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Apply external edits until the channel closes or shutdown fires.
pub fn spawn_reload_loop(
    mut changes: mpsc::UnboundedReceiver<FileChange>,
    shared: SharedState,
    writer: Arc<DatabaseWriter>,
    storage_dir: PathBuf,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                change = changes.recv() => {
                    let Some(change) = change else { break };
                    apply_change(&shared, &writer, &storage_dir, change);
                }
            }
        }
        tracing::debug!("Reload loop stopped");
    })
}

fn apply_change(shared: &SharedState, writer: &Arc<DatabaseWriter>, storage_dir: &Path, change: FileChange) {
    let database = match Database::parse(&change.content) {
        Ok(database) => database,
        Err(e) => {
            tracing::warn!(error = %e, "External edit is not a valid database; keeping current state");
            metrics::record_reload("rejected");
            return;
        }
    };

    let entries = database.entry_count();
    let store = Arc::new(database_store(database));
    let state = build_app_state(store, Arc::clone(writer), storage_dir.to_path_buf());
    let previous = shared.swap(Arc::new(state));
    previous.detach();
    metrics::record_reload("applied");
    tracing::info!(entries, "Database reloaded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_or_create_writes_empty_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");

        let (content, database) = load_or_create(&path).await.unwrap();
        assert_eq!(content, EMPTY_DATABASE);
        assert_eq!(database, Database::default());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), EMPTY_DATABASE);
    }

    #[tokio::test]
    async fn test_load_or_create_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{"posts": {"id": "a"}}"#).unwrap();

        assert!(matches!(
            load_or_create(&path).await,
            Err(StartupError::InvalidDatabase { .. })
        ));
    }

    fn fixture(dir: &Path) -> (SharedState, Arc<DatabaseWriter>) {
        let writer = Arc::new(DatabaseWriter::new(dir.join("db.json"), Baseline::default()));
        let store = Arc::new(database_store(Database::default()));
        let state = build_app_state(store, Arc::clone(&writer), dir.to_path_buf());
        (shared_state(state), writer)
    }

    #[test]
    fn test_apply_change_swaps_store() {
        let dir = tempfile::tempdir().unwrap();
        let (shared, writer) = fixture(dir.path());
        let old_store = Arc::clone(&shared.load().store);

        let change = FileChange {
            content: r#"{"posts": [{"id": "a"}]}"#.to_string(),
        };
        apply_change(&shared, &writer, dir.path(), change);

        let current = shared.load_full();
        assert!(current.store.get_state().entry("posts", "a").is_some());
        assert_eq!(old_store.listener_count(), 0);
    }

    #[test]
    fn test_apply_change_keeps_state_on_bad_content() {
        let dir = tempfile::tempdir().unwrap();
        let (shared, writer) = fixture(dir.path());
        let before = shared.load_full();

        apply_change(&shared, &writer, dir.path(), FileChange { content: "{not json".into() });

        assert!(Arc::ptr_eq(&before, &shared.load_full()));
        assert_eq!(before.store.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_reload_loop_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let (shared, writer) = fixture(dir.path());
        let (_tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();

        let handle = spawn_reload_loop(rx, shared, writer, dir.path().to_path_buf(), shutdown.subscribe());
        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
