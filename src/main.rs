//! json-devserver
//!
//! Serves a JSON file as a REST API, with static assets and live reload.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────▶ http::server (axum fallback, timeout, request ID, trace)
//!                 │
//!                 ▼
//!             http::dispatcher ──▶ routing (ordered regex routes)
//!                 │
//!                 ▼
//!             api handlers ──▶ store (reducer) ──▶ persistence::writer
//!                                                        │
//!                                                        ▼
//!                                                    db.json
//!                                                        │
//!     external edit ──▶ persistence::watcher ──▶ lifecycle reload loop
//!                                                 (new store, ArcSwap)
//! ```

use clap::Parser;

use json_devserver::config::{resolve_config, CliArgs};
use json_devserver::lifecycle::{self, spawn_signal_listener, Shutdown};
use json_devserver::observability::{init_logging, init_metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = resolve_config(&args)?;

    init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "json-devserver starting");
    tracing::info!(
        bind_address = %config.bind_address(),
        database = %config.storage.database.display(),
        storage = %config.storage.storage_dir.display(),
        watch = config.storage.watch,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    lifecycle::run(config, shutdown).await?;
    Ok(())
}
