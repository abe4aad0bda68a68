//! Query-string filtering for collection listings.
//!
//! `?tag=a&tag=b&author=x` keeps entries whose `author` renders as `x` and
//! whose `tag` renders as `a` or `b`. Fields are compared as text: a missing
//! field renders as `undefined`, `null` as `null`, arrays as their elements
//! joined by `,`.

use serde_json::{Number, Value};
use url::Url;

use crate::store::Entry;

/// Accepted values per field, in first-seen field order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    terms: Vec<(String, Vec<String>)>,
}

impl QueryFilter {
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut terms: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in pairs {
            match terms.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value),
                None => terms.push((key, vec![value])),
            }
        }
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, entry: &Entry) -> bool {
        self.terms.iter().all(|(field, accepted)| {
            let rendered = render(entry.get(field));
            accepted.iter().any(|v| *v == rendered)
        })
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(value) => render_value(value),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(n),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => render_value(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Integral floats print without a fraction (`10.0` is `"10"`), as
/// JavaScript's number-to-string does below 1e21.
fn render_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> Entry {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn filter(query: &str) -> QueryFilter {
        QueryFilter::from_url(&Url::parse(&format!("http://localhost/posts?{query}")).unwrap())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let f = QueryFilter::from_url(&Url::parse("http://localhost/posts").unwrap());
        assert!(f.is_empty());
        assert!(f.matches(&entry(json!({"id": "a"}))));
    }

    #[test]
    fn test_and_across_keys_or_within_key() {
        let f = filter("tag=a&tag=b&author=x");
        assert!(f.matches(&entry(json!({"id": "1", "tag": "a", "author": "x"}))));
        assert!(f.matches(&entry(json!({"id": "2", "tag": "b", "author": "x"}))));
        assert!(!f.matches(&entry(json!({"id": "3", "tag": "c", "author": "x"}))));
        assert!(!f.matches(&entry(json!({"id": "4", "tag": "a", "author": "y"}))));
    }

    #[test]
    fn test_values_compared_as_text() {
        assert!(filter("views=10").matches(&entry(json!({"views": 10}))));
        assert!(filter("done=true").matches(&entry(json!({"done": true}))));
        assert!(filter("owner=null").matches(&entry(json!({"owner": null}))));
        assert!(filter("owner=undefined").matches(&entry(json!({"id": "a"}))));
        assert!(filter("tags=a,b").matches(&entry(json!({"tags": ["a", "b"]}))));
    }

    #[test]
    fn test_integral_floats_render_without_fraction() {
        assert!(filter("price=10").matches(&entry(json!({"price": 10.0}))));
        assert!(filter("price=0").matches(&entry(json!({"price": -0.0}))));
        assert!(filter("price=2.5").matches(&entry(json!({"price": 2.5}))));
        assert!(!filter("price=10.0").matches(&entry(json!({"price": 10.0}))));
        assert_eq!(render_value(&json!(1e20)), "100000000000000000000");
    }

    #[test]
    fn test_query_values_are_decoded() {
        assert!(filter("title=hello%20world").matches(&entry(json!({"title": "hello world"}))));
    }
}
