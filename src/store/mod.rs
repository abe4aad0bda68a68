//! In-memory collection store.
//!
//! # Data Flow
//! ```text
//! write handler builds Action
//!     → Store::dispatch
//!         → reducer.rs (pure: &Database + Action → Database)
//!         → ArcSwap publishes the new Database
//!         → listeners notified (subscription order)
//!     → persistence writer snapshots get_state() to disk
//! ```
//!
//! # Design Decisions
//! - The reducer never mutates its input; readers hold cheap `Arc` snapshots
//! - Dispatch is serialized with a mutex so transitions are atomic under tokio's
//!   multi-threaded scheduler
//! - Listener identity is a numeric id, never closure equality

pub mod database;
pub mod reducer;
pub mod store;

pub use database::{entry_id, Collection, Database, DatabaseError, Entry};
pub use reducer::{reduce, Action};
pub use store::{Store, Transition};

/// The store that backs the HTTP API.
pub type DatabaseStore = Store<Database, Action>;

/// Build a store around an initial database, using [`reduce`].
pub fn database_store(initial: Database) -> DatabaseStore {
    Store::new(reduce, initial)
}
