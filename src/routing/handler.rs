//! Route handler abstraction.

use futures_util::future::BoxFuture;
use std::future::Future;

use crate::http::{JsonRequest, JsonResponse};
use crate::routing::router::MatchedRoute;

/// Error type handlers may return. Anything here becomes a 500.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), BoxError>;

/// Something that can answer a matched request.
///
/// Implemented for any `Fn(JsonRequest, JsonResponse, MatchedRoute) -> impl Future`.
pub trait Handler: Send + Sync + 'static {
    fn call(
        &self,
        request: JsonRequest,
        response: JsonResponse,
        route: MatchedRoute,
    ) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(JsonRequest, JsonResponse, MatchedRoute) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(
        &self,
        request: JsonRequest,
        response: JsonResponse,
        route: MatchedRoute,
    ) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request, response, route))
    }
}
