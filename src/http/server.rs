//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single fallback that feeds the dispatcher
//! - Wire up middleware (timeout, request ID, tracing)
//! - Preset CORS headers and record request metrics
//! - Bind to a listener and stop on the shutdown signal
//!
//! # Design Decisions
//! - Axum does no routing of its own; every request reaches [`Dispatcher`]
//! - The serving [`AppState`] lives behind `ArcSwap` so a reload replaces the
//!   store and dispatcher without restarting the listener; in-flight requests
//!   finish on the state they loaded
//! - Dispatch runs in its own task: the timeout layer answers the client, but
//!   the handler still runs to completion

use arc_swap::ArcSwap;
use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServerConfig;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::JsonRequest;
use crate::http::request_id::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::JsonResponse;
use crate::observability::metrics;
use crate::security::apply_cors;
use crate::store::DatabaseStore;

type Detach = Box<dyn FnOnce() + Send + Sync>;

/// One generation of serving state: a store and the dispatcher bound to it.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<DatabaseStore>,
    detach: Mutex<Option<Detach>>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, store: Arc<DatabaseStore>) -> Self {
        Self {
            dispatcher,
            store,
            detach: Mutex::new(None),
        }
    }

    /// Register cleanup to run when this generation is replaced.
    pub fn on_detach<F>(self, f: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        *self.detach.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(f));
        self
    }

    /// Run the cleanup registered with [`on_detach`](Self::on_detach). Idempotent.
    pub fn detach(&self) {
        let f = self.detach.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(f) = f {
            f();
        }
    }
}

/// Serving state shared with the reload loop.
pub type SharedState = Arc<ArcSwap<AppState>>;

pub fn shared_state(state: AppState) -> SharedState {
    Arc::new(ArcSwap::from_pointee(state))
}

#[derive(Clone)]
struct ServeContext {
    shared: SharedState,
    max_body_bytes: usize,
}

/// HTTP server for the JSON API.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    pub fn new(config: ServerConfig, shared: SharedState) -> Self {
        let context = ServeContext {
            shared,
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(&config, context);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, context: ServeContext) -> Router {
        Router::new()
            .fallback(serve_request)
            .with_state(context)
            .layer(TimeoutLayer::new(Duration::from_secs(config.limits.request_timeout_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Every request lands here.
async fn serve_request(State(context): State<ServeContext>, request: Request<Body>) -> Response<Body> {
    let start_time = Instant::now();
    let method = request.method().clone();
    let state = context.shared.load_full();

    let response = JsonResponse::new();
    apply_cors(&response);

    // Detached so a request timeout cannot cut a handler off between updating
    // the store and writing the file.
    let request = JsonRequest::new(request, context.max_body_bytes);
    let handled = response.clone();
    let task = tokio::spawn(async move { state.dispatcher.dispatch(request, handled).await });
    if let Err(e) = task.await {
        tracing::error!(error = %e, "Dispatch task failed");
    }

    metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
    response.into_http()
}
