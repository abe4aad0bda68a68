//! Response header policy.
//!
//! # Responsibilities
//! - Add permissive CORS headers to every response
//!
//! # Design Decisions
//! - Local development only: every origin, method and header is allowed
//! - Applied before dispatch, so handlers may still override a header and
//!   error responses written by the dispatcher carry the same policy

use crate::http::JsonResponse;

/// CORS headers set on every response.
pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "*"),
    ("access-control-allow-headers", "*"),
    ("access-control-expose-headers", "*"),
];

/// Add [`CORS_HEADERS`] to `response`.
pub fn apply_cors(response: &JsonResponse) {
    for (name, value) in CORS_HEADERS {
        response.set_header(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::status_line;

    #[test]
    fn test_cors_survives_error_response() {
        let resp = JsonResponse::new();
        apply_cors(&resp);
        resp.end_as(status_line::NOT_FOUND).unwrap();

        let http = resp.into_http();
        for (name, value) in CORS_HEADERS {
            assert_eq!(http.headers()[name], value);
        }
    }
}
