//! Route registration and lookup.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route matching a method and normalized path
//! - Return matched route metadata or explicit no-match
//!
//! # Design Decisions
//! - Duplicates are allowed; the first registered match wins
//! - Registration may happen while serving; readers take a short read lock
//!   and clone the matched `Arc<Route>` out
//! - A template that fails to compile is logged and skipped

use axum::http::Method;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

use crate::routing::handler::Handler;
use crate::routing::pattern::{PathPattern, PatternError};

/// Methods the dispatcher will route. Anything else is 405.
pub const SUPPORTED_METHODS: [Method; 6] = [
    Method::DELETE,
    Method::GET,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
];

/// An immutable registered route.
pub struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn template(&self) -> &str {
        self.pattern.source()
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.pattern.source())
            .finish()
    }
}

/// Metadata for the route a request matched.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    /// e.g. `GET`
    pub method: Method,

    /// e.g. `/(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)`
    pub template: String,

    /// Normalized request URL the pattern was matched against.
    pub url: Url,

    /// Named captures; empty when the template has none.
    pub path_params: HashMap<String, String>,
}

impl MatchedRoute {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

/// Ordered route table.
#[derive(Default)]
pub struct Router {
    routes: RwLock<Vec<Arc<Route>>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `template` and append a route.
    ///
    /// On a bad template the route is skipped with a warning and the error is
    /// returned; the table is left unchanged.
    pub fn register<H: Handler>(
        &self,
        method: Method,
        template: &str,
        handler: H,
    ) -> Result<(), PatternError> {
        let pattern = match PathPattern::compile(template) {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!(method = %method, template = %template, error = %e, "Skipping route with invalid pattern");
                return Err(e);
            }
        };

        tracing::debug!(method = %method, template = %template, "Route registered");
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(Route {
                method,
                pattern,
                handler: Arc::new(handler),
            }));
        Ok(())
    }

    /// First route, in registration order, whose method equals `method` and
    /// whose pattern matches `url`'s path.
    pub fn find(&self, method: &Method, url: &Url) -> Option<(Arc<Route>, MatchedRoute)> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        let path = url.path();

        routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                let path_params = route.pattern.captures(path)?;
                let matched = MatchedRoute {
                    method: route.method.clone(),
                    template: route.template().to_string(),
                    url: url.clone(),
                    path_params,
                };
                Some((Arc::clone(route), matched))
            })
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `METHOD template` for each route, in order.
    pub fn summary(&self) -> Vec<String> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|route| format!("{} {}", route.method, route.template()))
            .collect()
    }
}
