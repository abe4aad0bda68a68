//! Path template compilation.
//!
//! A template is a regular expression fragment with named captures, e.g.
//! `/posts/(?<id>[^/]+)`. It is anchored at both ends and matched
//! case-insensitively against the normalized request path.

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid path template `{template}`: {source}")]
pub struct PatternError {
    pub template: String,
    #[source]
    pub source: regex::Error,
}

/// A compiled, anchored, case-insensitive path template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
}

impl PathPattern {
    /// Compile `template` into `^template$`.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(&format!("^(?:{template})$"))
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError {
                template: template.to_string(),
                source,
            })?;

        Ok(Self {
            source: template.to_string(),
            regex,
        })
    }

    /// The template as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Named captures of a match, or `None` if `path` does not match.
    /// Groups that did not participate are left out.
    pub fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let params = self
            .regex
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
            .collect();
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_both_ends() {
        let pattern = PathPattern::compile("/posts").unwrap();
        assert!(pattern.is_match("/posts"));
        assert!(!pattern.is_match("/posts/a"));
        assert!(!pattern.is_match("/api/posts"));
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = PathPattern::compile("/posts/(?<id>[^/]+)").unwrap();
        let params = pattern.captures("/POSTS/AbC").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("AbC"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let pattern = PathPattern::compile("/a|/b").unwrap();
        assert!(pattern.is_match("/a"));
        assert!(pattern.is_match("/b"));
        assert!(!pattern.is_match("/a/extra"));
        assert!(!pattern.is_match("/x/b"));
    }

    #[test]
    fn test_no_groups_gives_empty_params() {
        let pattern = PathPattern::compile(".*").unwrap();
        assert_eq!(pattern.captures("/anything"), Some(HashMap::new()));
    }

    #[test]
    fn test_optional_group_left_out() {
        let pattern = PathPattern::compile("/files(?:/(?<name>.+))?").unwrap();
        assert!(pattern.captures("/files").unwrap().is_empty());
        assert_eq!(pattern.captures("/files/a.png").unwrap()["name"], "a.png");
    }

    #[test]
    fn test_invalid_template() {
        let err = PathPattern::compile("/posts/(?<id>[").unwrap_err();
        assert_eq!(err.template, "/posts/(?<id>[");
    }
}
