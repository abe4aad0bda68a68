//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (CORS headers preset on the response)
//!     → Pass to dispatcher
//! ```
//!
//! # Design Decisions
//! - Request body size is bounded by `limits.max_body_bytes` in the request
//!   wrapper; storage paths are confined to the storage directory by the
//!   static file handler

pub mod headers;

pub use headers::{apply_cors, CORS_HEADERS};
