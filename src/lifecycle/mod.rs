//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → load or create database file → seed baseline
//!     → Store + routes → watcher + reload loop → bind listener → serve
//!
//! Reload (startup.rs):
//!     FileChange → parse → new Store + Dispatcher → swap → detach old
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → broadcast → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)
//! - A bad external edit never takes the server down

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_listener};
pub use startup::{load_or_create, run, spawn_reload_loop, start, Running, StartupError};
