//! Typed view of the backing JSON document.
//!
//! The file is a single object mapping collection names to arrays of
//! entries. Every entry is an object carrying a string `id` that is unique
//! within its collection. Collection order and field order survive a
//! load/save cycle.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// A single record. Always holds a string `id`.
pub type Entry = Map<String, Value>;

/// Errors raised when a document does not have the database shape.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("collection `{0}` must be an array")]
    CollectionNotArray(String),

    #[error("collection `{collection}` entry #{index} must be an object")]
    EntryNotObject { collection: String, index: usize },

    #[error("collection `{collection}` entry #{index} has no string `id`")]
    MissingId { collection: String, index: usize },

    #[error("collection `{collection}` has duplicate id `{id}`")]
    DuplicateId { collection: String, id: String },
}

/// Name of the JSON type, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Read the `id` of an entry.
pub fn entry_id(entry: &Entry) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

/// A named, ordered sequence of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    entries: Vec<Entry>,
}

impl Collection {
    fn new(name: String) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| entry_id(e) == Some(id))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| entry_id(e) == Some(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }
}

/// Mapping from collection name to collection. The store's whole state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    collections: Vec<Collection>,
}

impl Database {
    /// Parse and validate a document.
    pub fn parse(text: &str) -> Result<Self, DatabaseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Validate an already-parsed document.
    pub fn from_value(value: Value) -> Result<Self, DatabaseError> {
        let Value::Object(map) = value else {
            return Err(DatabaseError::NotAnObject(json_kind(&value)));
        };

        let mut collections = Vec::with_capacity(map.len());
        for (name, items) in map {
            let Value::Array(items) = items else {
                return Err(DatabaseError::CollectionNotArray(name));
            };

            let mut seen = HashSet::with_capacity(items.len());
            let mut entries = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let Value::Object(entry) = item else {
                    return Err(DatabaseError::EntryNotObject { collection: name, index });
                };
                let Some(id) = entry_id(&entry) else {
                    return Err(DatabaseError::MissingId { collection: name, index });
                };
                if !seen.insert(id.to_string()) {
                    let id = id.to_string();
                    return Err(DatabaseError::DuplicateId { collection: name, id });
                }
                entries.push(entry);
            }

            collections.push(Collection { name, entries });
        }

        Ok(Self { collections })
    }

    /// Pretty-printed document with a trailing newline, as written to disk.
    pub fn to_pretty_string(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn entry(&self, name: &str, id: &str) -> Option<&Entry> {
        self.collection(name).and_then(|c| c.get(id))
    }

    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.iter()
    }

    /// Total number of entries across collections.
    pub fn entry_count(&self) -> usize {
        self.collections.iter().map(Collection::len).sum()
    }

    pub(crate) fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.name == name)
    }

    /// Existing collection, or a new empty one appended after the others.
    pub(crate) fn collection_or_insert(&mut self, name: &str) -> &mut Collection {
        let index = match self.collections.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.collections.push(Collection::new(name.to_string()));
                self.collections.len() - 1
            }
        };
        &mut self.collections[index]
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl Serialize for Database {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.collections.len()))?;
        for collection in &self.collections {
            map.serialize_entry(&collection.name, &collection.entries)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Database {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Database::from_value(value).map_err(D::Error::custom)
    }
}

impl std::str::FromStr for Database {
    type Err = DatabaseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Database::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_preserves_order() {
        let db = Database::parse(
            r#"{"posts":[{"id":"b","text":"B"},{"id":"a","text":"A"}],"comments":[]}"#,
        )
        .unwrap();

        let names: Vec<_> = db.collections().map(Collection::name).collect();
        assert_eq!(names, vec!["posts", "comments"]);
        assert_eq!(db.collection("posts").unwrap().position("a"), Some(1));
        assert_eq!(db.entry_count(), 2);

        let round = serde_json::to_string(&db).unwrap();
        assert_eq!(
            round,
            r#"{"posts":[{"id":"b","text":"B"},{"id":"a","text":"A"}],"comments":[]}"#
        );
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = Database::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, DatabaseError::NotAnObject("array")));
    }

    #[test]
    fn test_rejects_bad_entries() {
        let err = Database::from_value(json!({"posts": {"id": "a"}})).unwrap_err();
        assert!(matches!(err, DatabaseError::CollectionNotArray(name) if name == "posts"));

        let err = Database::from_value(json!({"posts": [1]})).unwrap_err();
        assert!(matches!(err, DatabaseError::EntryNotObject { index: 0, .. }));

        let err = Database::from_value(json!({"posts": [{"id": 1}]})).unwrap_err();
        assert!(matches!(err, DatabaseError::MissingId { index: 0, .. }));

        let err = Database::from_value(json!({"posts": [{"id": "a"}, {"id": "a"}]})).unwrap_err();
        assert!(matches!(err, DatabaseError::DuplicateId { id, .. } if id == "a"));
    }

    #[test]
    fn test_pretty_output_ends_with_newline() {
        let db = Database::parse(r#"{"posts":[{"id":"a"}]}"#).unwrap();
        let text = db.to_pretty_string().unwrap();
        assert!(text.ends_with("]\n}\n"));
        assert_eq!(Database::parse(&text).unwrap(), db);
    }
}
