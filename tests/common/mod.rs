//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use json_devserver::config::ServerConfig;
use json_devserver::lifecycle::{self, Running, Shutdown};
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

/// A server started on a temp directory, not bound to a socket.
pub struct TestApp {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub router: axum::Router,
    pub running: Running,
    pub shutdown: Shutdown,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn test_config(dir: &TempDir, watch: bool) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.hostname = "127.0.0.1".to_string();
    config.listener.port = 0;
    config.storage.database = dir.path().join("db.json");
    config.storage.storage_dir = dir.path().join("storage");
    config.storage.watch = watch;
    config.limits.max_body_bytes = 4096;
    config
}

/// Write `initial` as the database and start the app.
pub async fn spawn_app(initial: Value, watch: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir, watch);
    let db_path = config.storage.database.clone();
    let storage_dir = config.storage.storage_dir.clone();

    std::fs::create_dir_all(&storage_dir).unwrap();
    std::fs::write(&db_path, serde_json::to_string_pretty(&initial).unwrap()).unwrap();

    let shutdown = Shutdown::new();
    let running = lifecycle::start(config, &shutdown).await.unwrap();
    let router = running.server.router();

    TestApp {
        dir,
        db_path,
        storage_dir,
        router,
        running,
        shutdown,
    }
}

/// Drive one request through `router` and collect the whole response.
pub async fn send_to(router: axum::Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse { status, headers, body }
}

pub fn json_request(method: Method, uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        send_to(self.router.clone(), request).await
    }

    /// Send `request` from its own task, so it can run in parallel with others.
    pub fn spawn_request(&self, request: Request<Body>) -> tokio::task::JoinHandle<TestResponse> {
        tokio::spawn(send_to(self.router.clone(), request))
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(&self, method: Method, uri: &str, payload: &Value) -> TestResponse {
        self.send(json_request(method, uri, payload)).await
    }

    pub async fn send_raw(&self, method: Method, uri: &str, content_type: Option<&str>, body: &str) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    /// The database file as currently on disk.
    pub fn on_disk(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(&self.db_path).unwrap()).unwrap()
    }
}
