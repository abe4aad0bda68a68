//! Response wrapper.
//!
//! # Responsibilities
//! - Parse `"<code> <reason>"` status lines
//! - Buffer headers and body until the dispatcher converts the response
//! - Make header writes after the response is finalized a silent no-op
//!
//! # Design Decisions
//! - The handle is cheap to clone and shared with the dispatcher's safety
//!   net, so the dispatcher can still answer 500 after a handler failed
//! - A leading token that is not an integer is a server bug, not a client
//!   error: `write_status` fails and the safety net turns it into a 500
//! - `Content-Type: application/json` is preset

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Status lines used by the API handlers.
pub mod status_line {
    pub const OK: &str = "200 OK";
    pub const CREATED: &str = "201 Created";
    pub const NO_CONTENT: &str = "204 No Content";
    pub const BAD_REQUEST: &str = "400 Bad Request";
    pub const NOT_FOUND: &str = "404 Not Found";
    pub const METHOD_NOT_ALLOWED: &str = "405 Method Not Allowed";
    pub const PAYLOAD_TOO_LARGE: &str = "413 Payload Too Large";
    pub const UNSUPPORTED_MEDIA_TYPE: &str = "415 Unsupported Media Type";
    pub const INTERNAL_SERVER_ERROR: &str = "500 Internal Server Error";
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("invalid status line `{0}`")]
    InvalidStatusLine(String),

    #[error("headers already sent")]
    HeadersSent,

    #[error("response already finished")]
    Finished,

    #[error("response body serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Parse `"404 Not Found"` into a status code and, when it differs from the
/// canonical one, a custom reason phrase.
pub fn parse_status_line(line: &str) -> Result<(StatusCode, Option<String>), ResponseError> {
    let line = line.trim();
    let (code, reason) = match line.split_once(' ') {
        Some((code, reason)) => (code, reason.trim()),
        None => (line, ""),
    };

    let status = code
        .parse::<u16>()
        .ok()
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or_else(|| ResponseError::InvalidStatusLine(line.to_string()))?;

    let custom = (!reason.is_empty() && Some(reason) != status.canonical_reason())
        .then(|| reason.to_string());
    Ok((status, custom))
}

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    headers_sent: bool,
    finished: bool,
}

/// Outbound response shared between a handler and the dispatcher.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    state: Arc<Mutex<ResponseState>>,
}

impl Default for JsonResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonResponse {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            state: Arc::new(Mutex::new(ResponseState {
                status: StatusCode::OK,
                reason: None,
                headers,
                body: Bytes::new(),
                headers_sent: false,
                finished: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn headers_sent(&self) -> bool {
        self.lock().headers_sent
    }

    pub fn finished(&self) -> bool {
        self.lock().finished
    }

    /// Headers sent or body ended; nothing more may be written.
    pub fn is_finalized(&self) -> bool {
        let state = self.lock();
        state.headers_sent || state.finished
    }

    pub fn status(&self) -> StatusCode {
        self.lock().status
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.lock()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Write the status line and extra headers. Sends the headers.
    pub fn write_status(&self, status_line: &str, headers: &[(&str, &str)]) -> Result<(), ResponseError> {
        let (status, reason) = parse_status_line(status_line)?;

        let mut state = self.lock();
        if state.finished {
            return Err(ResponseError::Finished);
        }
        if state.headers_sent {
            return Err(ResponseError::HeadersSent);
        }

        for (name, value) in headers {
            insert_header(&mut state.headers, name, value);
        }
        state.status = status;
        state.reason = reason;
        state.headers_sent = true;
        Ok(())
    }

    /// Set a header; ignored once headers were sent or the response finished.
    pub fn set_header(&self, name: &str, value: &str) {
        let mut state = self.lock();
        if state.headers_sent || state.finished {
            tracing::trace!(header = %name, "Ignoring header on finalized response");
            return;
        }
        insert_header(&mut state.headers, name, value);
    }

    /// Finish with a body. Sends default headers if none were sent.
    pub fn end(&self, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        let mut state = self.lock();
        if state.finished {
            return Err(ResponseError::Finished);
        }
        state.body = body.into();
        state.headers_sent = true;
        state.finished = true;
        Ok(())
    }

    /// Finish with whatever has been written so far. No-op if already finished.
    pub fn finish(&self) {
        let mut state = self.lock();
        state.headers_sent = true;
        state.finished = true;
    }

    /// Status line plus a JSON body.
    pub fn json<T: Serialize + ?Sized>(&self, status_line: &str, value: &T) -> Result<(), ResponseError> {
        let body = serde_json::to_vec(value)?;
        self.write_status(status_line, &[])?;
        self.end(body)
    }

    /// Status line with the JSON literal `null` as body.
    pub fn end_as(&self, status_line: &str) -> Result<(), ResponseError> {
        self.write_status(status_line, &[("content-type", "application/json")])?;
        self.end("null")
    }

    /// Convert to an HTTP response, finishing it if the handler did not.
    pub fn into_http(self) -> Response<Body> {
        let mut state = self.lock();
        state.finished = true;

        let mut response = Response::new(Body::from(std::mem::take(&mut state.body)));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        if let Some(reason) = state.reason.take() {
            match hyper::ext::ReasonPhrase::try_from(reason) {
                Ok(phrase) => {
                    response.extensions_mut().insert(phrase);
                }
                Err(_) => tracing::debug!("Dropping reason phrase with invalid bytes"),
            }
        }
        response
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
        (Ok(name), Ok(value)) => {
            headers.insert(name, value);
        }
        _ => tracing::warn!(header = %name, "Ignoring invalid header"),
    }
}
