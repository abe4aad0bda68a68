//! Backing file synchronization.
//!
//! # Data Flow
//! ```text
//! write request:
//!     Store::dispatch → writer.rs
//!         → baseline.set(new content)      (before touching the file)
//!         → temp file + rename
//!
//! external edit:
//!     notify event on parent directory
//!     → watcher.rs filters to the database path
//!     → re-read; equal to baseline? drop : baseline.replace + FileChange
//!     → lifecycle reload loop builds a fresh Store
//! ```
//!
//! # Design Decisions
//! - Watch the directory, not the file: editors replace files on save
//! - One baseline shared by both sides suppresses self-triggered reloads
//! - Read failures are warnings; the watcher keeps running

pub mod baseline;
pub mod watcher;
pub mod writer;

pub use baseline::Baseline;
pub use watcher::{FileChange, FileWatcher, WatchError};
pub use writer::{DatabaseWriter, WriteError};
