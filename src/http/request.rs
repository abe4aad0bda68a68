//! Request wrapper.
//!
//! # Responsibilities
//! - Split `Content-Type` into MIME type and parameters
//! - Normalize the path and resolve it against the `Host` header
//! - Carry the matched route once the dispatcher found one
//! - Accumulate and parse a JSON object body
//!
//! # Design Decisions
//! - `Content-Type` is split on `;` without honouring quoted strings, so
//!   `text/plain; p="a;b"` yields parameters `p="a` and `b"`
//! - The body can be read once; it is moved out on first parse
//! - A failed chunk ends accumulation with a warning; what arrived is still
//!   parsed and a broken document surfaces as a JSON error

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, Uri};
use futures_util::StreamExt;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::http::request_id::X_REQUEST_ID;
use crate::routing::MatchedRoute;
use crate::store::database::json_kind;
use crate::store::Entry;

/// Why a request URL could not be resolved. Maps to 400.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid Host header `{host}`: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid request path `{path}`: {source}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },
}

/// Why a body is not a usable JSON object.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body already consumed")]
    AlreadyConsumed,

    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON body must be an object, found {0}")]
    NotAnObject(&'static str),
}

/// Inbound request plus the metadata handlers need.
pub struct JsonRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Body>,
    mime_type: Option<String>,
    parameters: Vec<String>,
    url: Option<Url>,
    route: Option<MatchedRoute>,
    max_body_bytes: usize,
}

impl JsonRequest {
    pub fn new(request: Request<Body>, max_body_bytes: usize) -> Self {
        let (parts, body) = request.into_parts();
        let (mime_type, parameters) = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(split_content_type)
            .unwrap_or_default();

        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body: Some(body),
            mime_type,
            parameters,
            url: None,
            route: None,
            max_body_bytes,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// e.g. `application/json`
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// e.g. `["charset=utf-8"]`
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn is_json(&self) -> bool {
        self.mime_type()
            .is_some_and(|m| m.eq_ignore_ascii_case("application/json"))
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    /// Resolve and cache the normalized URL.
    ///
    /// The base is `http://<Host>`; without a `Host` header the URI authority
    /// is used, then `localhost`.
    pub fn resolve_url(&mut self) -> Result<&Url, RequestError> {
        let url = match self.url.take() {
            Some(url) => url,
            None => self.build_url()?,
        };
        Ok(self.url.insert(url))
    }

    fn build_url(&self) -> Result<Url, RequestError> {
        let host = match self.headers.get(header::HOST) {
            Some(value) => match value.to_str() {
                Ok(host) => host.to_string(),
                Err(_) => {
                    return Err(RequestError::InvalidHost {
                        host: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        source: url::ParseError::InvalidDomainCharacter,
                    });
                }
            },
            None => self
                .uri
                .authority()
                .map(|a| a.as_str().to_string())
                .unwrap_or_else(|| "localhost".to_string()),
        };

        let base = Url::parse(&format!("http://{host}/"))
            .map_err(|source| RequestError::InvalidHost { host: host.clone(), source })?;

        let mut target = normalize_path(self.uri.path());
        if let Some(query) = self.uri.query() {
            target.push('?');
            target.push_str(query);
        }

        base.join(&target)
            .map_err(|source| RequestError::InvalidPath { path: target, source })
    }

    /// Normalized URL, once [`resolve_url`](Self::resolve_url) succeeded.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn set_route(&mut self, route: MatchedRoute) {
        self.route = Some(route);
    }

    pub fn route(&self) -> Option<&MatchedRoute> {
        self.route.as_ref()
    }

    /// Read the whole body and parse it as a JSON object.
    pub async fn parse_body_as_json_object(&mut self) -> Result<Entry, BodyError> {
        let body = self.body.take().ok_or(BodyError::AlreadyConsumed)?;
        let limit = self.max_body_bytes;

        let mut stream = body.into_data_stream();
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    if buf.len() + bytes.len() > limit {
                        return Err(BodyError::TooLarge { limit });
                    }
                    buf.extend_from_slice(&bytes);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        received_bytes = buf.len(),
                        "Request body chunk unreadable; parsing what arrived"
                    );
                    break;
                }
            }
        }

        let text = String::from_utf8_lossy(&buf);
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            other => Err(BodyError::NotAnObject(json_kind(&other))),
        }
    }
}

/// Split a `Content-Type` value into MIME type and trimmed parameters.
pub fn split_content_type(value: &str) -> (Option<String>, Vec<String>) {
    let mut parts = value.split(';').map(str::trim);
    let mime_type = parts.next().map(str::to_string);
    let parameters = parts.map(str::to_string).collect();
    (mime_type, parameters)
}

/// POSIX path normalization: collapse `//`, drop `.`, resolve `..`.
///
/// A trailing separator is kept; an absolute path never climbs above `/`.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut normalized = segments.join("/");
    if normalized.is_empty() && !absolute {
        normalized.push('.');
    }
    if trailing && !normalized.is_empty() {
        normalized.push('/');
    }
    if absolute {
        normalized.insert(0, '/');
    }
    normalized
}
