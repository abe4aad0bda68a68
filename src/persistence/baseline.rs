//! Last known content of the backing file.

use std::sync::{Arc, Mutex, PoisonError};

/// Shared between the watcher and the writer.
///
/// The writer records what it is about to write before touching the file, so
/// the watcher recognises that content when its own event arrives.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    content: Arc<Mutex<Option<String>>>,
}

impl Baseline {
    pub fn new(initial: Option<String>) -> Self {
        Self {
            content: Arc::new(Mutex::new(initial)),
        }
    }

    /// Record content as known.
    pub fn set(&self, content: String) {
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = Some(content);
    }

    pub fn get(&self) -> Option<String> {
        self.content.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Store `content` if it differs from the baseline. Returns whether it did.
    pub fn replace_if_changed(&self, content: &str) -> bool {
        let mut current = self.content.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() == Some(content) {
            return false;
        }
        *current = Some(content.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_if_changed() {
        let baseline = Baseline::new(None);
        assert!(baseline.replace_if_changed("{}"));
        assert!(!baseline.replace_if_changed("{}"));
        assert!(baseline.replace_if_changed("{\"a\":[]}"));
        assert_eq!(baseline.get().as_deref(), Some("{\"a\":[]}"));
    }

    #[test]
    fn test_clones_share_content() {
        let baseline = Baseline::new(Some("x".into()));
        let writer_side = baseline.clone();
        writer_side.set("y".into());
        assert!(!baseline.replace_if_changed("y"));
    }
}
