//! REST handlers over the collection store.
//!
//! # Data Flow
//! ```text
//! Dispatcher (matched route + path params)
//!     → collections.rs (CRUD on /<key> and /<key>/<id>)
//!         → Store::dispatch(Action)
//!         → DatabaseWriter::persist (500 on failure)
//!     → storage.rs (static files under /storage/)
//! ```
//!
//! # Routes, in registration order
//! ```text
//! OPTIONS .*
//! GET     /storage/(?<file>.+)
//! GET     /(?<key>[A-Za-z0-9_-]+)
//! POST    /(?<key>[A-Za-z0-9_-]+)
//! GET     /(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)
//! PUT     /(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)
//! PATCH   /(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)
//! DELETE  /(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)
//! ```

pub mod collections;
pub mod id;
pub mod query;
pub mod storage;

use axum::http::Method;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::http::{status_line, AppState, Dispatcher, JsonRequest, JsonResponse};
use crate::observability::metrics;
use crate::persistence::DatabaseWriter;
use crate::routing::{Handler, HandlerResult, MatchedRoute, PatternError, Router};
use crate::store::DatabaseStore;

pub use id::random_id;
pub use query::QueryFilter;

const COLLECTION: &str = "/(?<key>[A-Za-z0-9_-]+)";
const ENTRY: &str = "/(?<key>[A-Za-z0-9_-]+)/(?<id>[^/]+)";
const STORAGE: &str = "/storage/(?<file>.+)";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("route `{template}` did not capture `{name}`")]
    MissingParam { template: String, name: &'static str },
}

/// Everything a handler needs besides the request itself.
#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<DatabaseStore>,
    pub writer: Arc<DatabaseWriter>,
    pub storage_dir: PathBuf,
}

/// Required path parameter.
pub(crate) fn param<'a>(route: &'a MatchedRoute, name: &'static str) -> Result<&'a str, ApiError> {
    route.param(name).ok_or_else(|| ApiError::MissingParam {
        template: route.template.clone(),
        name,
    })
}

fn bind<F, Fut>(context: &ApiContext, f: F) -> impl Handler
where
    F: Fn(ApiContext, JsonRequest, JsonResponse, MatchedRoute) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let context = context.clone();
    move |request: JsonRequest, response: JsonResponse, route: MatchedRoute| {
        f(context.clone(), request, response, route)
    }
}

async fn preflight(_: JsonRequest, response: JsonResponse, _: MatchedRoute) -> HandlerResult {
    response.write_status(status_line::OK, &[])?;
    response.end(axum::body::Bytes::new())?;
    Ok(())
}

/// Path templates the API is registered under.
#[derive(Debug, Clone, Copy)]
pub struct RouteTemplates {
    pub storage: &'static str,
    pub collection: &'static str,
    pub entry: &'static str,
}

impl Default for RouteTemplates {
    fn default() -> Self {
        Self {
            storage: STORAGE,
            collection: COLLECTION,
            entry: ENTRY,
        }
    }
}

/// Register the API on `router`. Returns how many routes were skipped.
pub fn register_routes(router: &Router, context: &ApiContext) -> usize {
    register_routes_with(router, context, &RouteTemplates::default())
}

/// Register the API under `templates`.
///
/// A template that does not compile skips only its own route; the rest are
/// still registered, in order.
pub fn register_routes_with(router: &Router, context: &ApiContext, templates: &RouteTemplates) -> usize {
    let results: [Result<(), PatternError>; 8] = [
        router.register(Method::OPTIONS, ".*", preflight),
        router.register(Method::GET, templates.storage, bind(context, storage::serve_file)),
        router.register(Method::GET, templates.collection, bind(context, collections::list)),
        router.register(Method::POST, templates.collection, bind(context, collections::create)),
        router.register(Method::GET, templates.entry, bind(context, collections::get)),
        router.register(Method::PUT, templates.entry, bind(context, collections::upsert)),
        router.register(Method::PATCH, templates.entry, bind(context, collections::patch)),
        router.register(Method::DELETE, templates.entry, bind(context, collections::delete)),
    ];

    let skipped = results.iter().filter(|r| r.is_err()).count();
    if skipped > 0 {
        tracing::error!(skipped, "Some API routes were not registered");
    }
    tracing::debug!(routes = ?router.summary(), "API routes registered");
    skipped
}

/// Build a serving generation around `store`.
///
/// The returned state keeps the entry gauge current through a store
/// subscription, released when the state is detached.
pub fn build_app_state(store: Arc<DatabaseStore>, writer: Arc<DatabaseWriter>, storage_dir: PathBuf) -> AppState {
    let router = Arc::new(Router::new());
    let context = ApiContext {
        store: Arc::clone(&store),
        writer,
        storage_dir,
    };
    register_routes(&router, &context);

    metrics::record_entries(store.get_state().entry_count());
    let watched = Arc::downgrade(&store);
    let unsubscribe = store.subscribe(move || {
        if let Some(store) = watched.upgrade() {
            metrics::record_entries(store.get_state().entry_count());
        }
    });

    AppState::new(Arc::new(Dispatcher::new(router)), store).on_detach(unsubscribe)
}
