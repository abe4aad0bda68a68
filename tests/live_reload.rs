//! End-to-end tests over a real socket with the database watcher running.

use serde_json::{json, Value};
use std::time::Duration;
use tokio::net::TcpListener;

mod common;

struct LiveServer {
    base: String,
    client: reqwest::Client,
    app_dir: tempfile::TempDir,
    db_path: std::path::PathBuf,
    shutdown: json_devserver::Shutdown,
    task: tokio::task::JoinHandle<()>,
}

async fn start(initial: Value) -> LiveServer {
    let app = common::spawn_app(initial, true).await;
    assert!(app.running.is_watching());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let common::TestApp {
        dir,
        db_path,
        running,
        shutdown,
        ..
    } = app;

    let server_shutdown = shutdown.clone();
    let task = tokio::spawn(async move {
        running.serve(listener, &server_shutdown).await.unwrap();
    });

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    LiveServer {
        base: format!("http://{addr}"),
        client,
        app_dir: dir,
        db_path,
        shutdown,
        task,
    }
}

impl LiveServer {
    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(format!("{}{}", self.base, path)).send().await.unwrap();
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Poll `path` until `predicate` holds or five seconds pass.
    async fn wait_for(&self, path: &str, predicate: impl Fn(&Value) -> bool) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let (_, body) = self.get_json(path).await;
            if predicate(&body) {
                return body;
            }
            assert!(tokio::time::Instant::now() < deadline, "timed out waiting on {path}: {body}");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(10), self.task)
            .await
            .unwrap()
            .unwrap();
        drop(self.app_dir);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_edit_reloads_store() {
    let server = start(json!({"posts": [{"id": "a", "text": "A"}]})).await;

    let (status, body) = server.get_json("/posts").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([{"id": "a", "text": "A"}]));

    std::fs::write(
        &server.db_path,
        r#"{"posts": [{"id": "a", "text": "edited"}], "users": [{"id": "u"}]}"#,
    )
    .unwrap();

    server
        .wait_for("/posts/a", |body| body["text"] == "edited")
        .await;
    let (status, _) = server.get_json("/users/u").await;
    assert_eq!(status, 200);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_own_writes_do_not_reload() {
    let server = start(json!({"posts": []})).await;

    let resp = server
        .client
        .post(format!("{}/posts", server.base))
        .json(&json!({"text": "mine"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let created: Value = resp.json().await.unwrap();

    // Give the watcher time to see our write.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (_, body) = server.get_json("/posts").await;
    assert_eq!(body, json!([created]));

    let on_disk: Value = serde_json::from_str(&std::fs::read_to_string(&server.db_path).unwrap()).unwrap();
    assert_eq!(on_disk, json!({"posts": [created]}));

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_invalid_external_edit_keeps_state() {
    let server = start(json!({"posts": [{"id": "a"}]})).await;

    std::fs::write(&server.db_path, "{ not json").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (status, body) = server.get_json("/posts").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([{"id": "a"}]));

    // A valid edit afterwards still applies.
    std::fs::write(&server.db_path, r#"{"posts": [{"id": "b"}]}"#).unwrap();
    server
        .wait_for("/posts", |body| *body == json!([{"id": "b"}]))
        .await;

    server.stop().await;
}
