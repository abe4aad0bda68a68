//! Pure state transitions over collections.
//!
//! | Action        | Effect                                                        |
//! |---------------|---------------------------------------------------------------|
//! | `Insert`      | `{...body, id}` appended; an existing id is replaced in place  |
//! | `Upsert`      | `{...body, id}` replaces in place, else appended               |
//! | `PatchUpdate` | `{...existing, ...body, id}`; absent collection/id is a no-op  |
//! | `Remove`      | entry dropped, order kept; absent collection/id is a no-op     |
//!
//! The given `id` always wins over an `id` field inside the body.

use serde_json::Value;

use super::database::{Database, Entry};

/// A write request, consumed once by [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Insert { key: String, id: String, body: Entry },
    Upsert { key: String, id: String, body: Entry },
    PatchUpdate { key: String, id: String, body: Entry },
    Remove { key: String, id: String },
}

impl Action {
    /// Collection the action targets.
    pub fn key(&self) -> &str {
        match self {
            Action::Insert { key, .. }
            | Action::Upsert { key, .. }
            | Action::PatchUpdate { key, .. }
            | Action::Remove { key, .. } => key,
        }
    }

    /// Entry id the action targets.
    pub fn id(&self) -> &str {
        match self {
            Action::Insert { id, .. }
            | Action::Upsert { id, .. }
            | Action::PatchUpdate { id, .. }
            | Action::Remove { id, .. } => id,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Insert { .. } => "insert",
            Action::Upsert { .. } => "upsert",
            Action::PatchUpdate { .. } => "patch",
            Action::Remove { .. } => "remove",
        }
    }
}

/// Body fields with `id` forced to the given value.
fn with_id(mut body: Entry, id: String) -> Entry {
    // Keeps the key position when the body already had one.
    body.insert("id".to_string(), Value::String(id));
    body
}

/// Compute the next database for an action.
pub fn reduce(state: &Database, action: Action) -> Database {
    match action {
        Action::Insert { key, id, body } | Action::Upsert { key, id, body } => {
            let mut next = state.clone();
            let collection = next.collection_or_insert(&key);
            let index = collection.position(&id);
            let entry = with_id(body, id);

            match index {
                Some(index) => collection.entries_mut()[index] = entry,
                None => collection.entries_mut().push(entry),
            }
            next
        }

        Action::PatchUpdate { key, id, body } => {
            let Some(index) = state.collection(&key).and_then(|c| c.position(&id)) else {
                return state.clone();
            };

            let mut next = state.clone();
            if let Some(collection) = next.collection_mut(&key) {
                let existing = &mut collection.entries_mut()[index];
                for (field, value) in body {
                    if field != "id" {
                        existing.insert(field, value);
                    }
                }
            }
            next
        }

        Action::Remove { key, id } => {
            let Some(index) = state.collection(&key).and_then(|c| c.position(&id)) else {
                return state.clone();
            };

            let mut next = state.clone();
            if let Some(collection) = next.collection_mut(&key) {
                collection.entries_mut().remove(index);
            }
            next
        }
    }
}
