//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! register(METHOD, template, handler)
//!     → pattern.rs (template → ^(?:template)$, case-insensitive)
//!     → router.rs (append to ordered table)
//!
//! Incoming request (method, normalized URL)
//!     → router.rs (scan routes with equal method, in order)
//!     → pattern.rs (match path, collect named captures)
//!     → Return: (Route, MatchedRoute) or NoMatch
//! ```
//!
//! # Design Decisions
//! - Explicit registration calls, no naming conventions
//! - Deterministic: first registered match wins
//! - Compile errors skip one route, never abort the process

pub mod handler;
pub mod pattern;
pub mod router;

pub use handler::{BoxError, Handler, HandlerResult};
pub use pattern::{PathPattern, PatternError};
pub use router::{MatchedRoute, Route, Router, SUPPORTED_METHODS};
