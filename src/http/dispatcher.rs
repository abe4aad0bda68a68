//! Request dispatch with a per-request safety net.
//!
//! # Responsibilities
//! - Reject unsupported methods (405) and unresolvable URLs (400)
//! - Find the first matching route (404 if none) and run its handler once
//! - Turn handler errors, panics and dropped handler futures into a 500
//!
//! # Design Decisions
//! - The safety net is a guard owned by one dispatch call, armed before the
//!   handler runs and dropped when it completes; it can only ever touch its
//!   own response
//! - Nothing is written to a response that already sent headers or finished

use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::http::request::JsonRequest;
use crate::http::response::{status_line, JsonResponse};
use crate::routing::{HandlerResult, Router, SUPPORTED_METHODS};

/// Routes requests to handlers registered on a [`Router`].
pub struct Dispatcher {
    router: Arc<Router>,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Answer `request` through `response`.
    pub async fn dispatch(&self, mut request: JsonRequest, response: JsonResponse) {
        if response.is_finalized() {
            tracing::debug!("Response already finalized; skipping dispatch");
            return;
        }

        let method = request.method().clone();
        if !SUPPORTED_METHODS.contains(&method) {
            tracing::debug!(method = %method, "Method not allowed");
            reject(&response, status_line::METHOD_NOT_ALLOWED);
            return;
        }

        let url = match request.resolve_url() {
            Ok(url) => url.clone(),
            Err(e) => {
                tracing::warn!(method = %method, error = %e, "Cannot resolve request URL");
                reject(&response, status_line::BAD_REQUEST);
                return;
            }
        };

        let Some((route, matched)) = self.router.find(&method, &url) else {
            tracing::debug!(method = %method, path = %url.path(), "No route matched");
            reject(&response, status_line::NOT_FOUND);
            return;
        };

        tracing::debug!(
            method = %method,
            path = %url.path(),
            route = %route.template(),
            path_params = ?matched.path_params,
            "Route matched"
        );

        let mut guard = SafetyNet::arm(response.clone(), request.request_id().map(str::to_string));
        request.set_route(matched.clone());

        let outcome = AssertUnwindSafe(route.handler().call(request, response, matched))
            .catch_unwind()
            .await;
        guard.settle(outcome);
    }
}

fn reject(response: &JsonResponse, line: &str) {
    if let Err(e) = response.end_as(line) {
        tracing::error!(status = %line, error = %e, "Failed to write rejection");
    }
}

/// Answers 500 for a request whose handler did not complete normally.
struct SafetyNet {
    response: JsonResponse,
    request_id: Option<String>,
    settled: bool,
}

impl SafetyNet {
    fn arm(response: JsonResponse, request_id: Option<String>) -> Self {
        Self {
            response,
            request_id,
            settled: false,
        }
    }

    fn settle(&mut self, outcome: Result<HandlerResult, Box<dyn Any + Send>>) {
        self.settled = true;
        match outcome {
            Ok(Ok(())) => self.response.finish(),
            Ok(Err(e)) => {
                tracing::error!(request_id = ?self.request_id, error = %e, "Handler failed");
                self.fail();
            }
            Err(panic) => {
                tracing::error!(
                    request_id = ?self.request_id,
                    panic = %panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                self.fail();
            }
        }
    }

    fn fail(&self) {
        if self.response.finished() {
            return;
        }
        if self.response.headers_sent() {
            // Status already committed; close what is there.
            self.response.finish();
            return;
        }
        reject(&self.response, status_line::INTERNAL_SERVER_ERROR);
    }
}

impl Drop for SafetyNet {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(request_id = ?self.request_id, "Handler dropped before completion");
            self.fail();
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
