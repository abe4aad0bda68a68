//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, timeout, request ID, trace layers)
//!     → request.rs (MIME split, URL normalization, body parsing)
//!     → dispatcher.rs (405 / 400 / 404, route match, safety net)
//!     → route handler writes through response.rs
//!     → response.rs converted back into an HTTP response
//! ```

pub mod dispatcher;
pub mod request;
pub mod request_id;
pub mod response;
pub mod server;

pub use dispatcher::Dispatcher;
pub use request::{normalize_path, split_content_type, BodyError, JsonRequest, RequestError};
pub use request_id::X_REQUEST_ID;
pub use response::{parse_status_line, status_line, JsonResponse, ResponseError};
pub use server::{shared_state, AppState, HttpServer, SharedState};
