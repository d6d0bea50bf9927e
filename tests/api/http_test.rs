/*!
 * HTTP API Tests
 * Requests dispatched straight into the router, no socket involved
 */

use crate::support::{sh_registry, wait_for, LONG_RUNNING};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use unit_supervisor::api::router;
use unit_supervisor::Registry;

struct TestApi {
    _dir: TempDir,
    registry: Arc<Registry>,
    app: Router,
}

impl TestApi {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(sh_registry(dir.path()));
        let app = router(Arc::clone(&registry), 1024 * 1024);
        Self {
            _dir: dir,
            registry,
            app,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn host(&self, name: &str) -> String {
        let (status, body) = self
            .post("/api/host-bot", json!({ "name": name, "code": LONG_RUNNING }))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["botId"].as_str().unwrap().to_string()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_host_bot_returns_id() {
    let api = TestApi::new();
    let (status, body) = api
        .post("/api/host-bot", json!({ "name": "greeter", "code": LONG_RUNNING }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    let id = body["botId"].as_str().unwrap();
    assert!(api.registry.contains(id));

    api.registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_list_shape() {
    let api = TestApi::new();
    let id = api.host("lister").await;

    let (status, body) = api.get("/api/bots").await;
    assert_eq!(status, StatusCode::OK);

    let units = body.as_array().unwrap();
    assert_eq!(units.len(), 1);
    let unit = &units[0];
    assert_eq!(unit["id"], json!(id));
    assert_eq!(unit["name"], json!("lister"));
    assert_eq!(unit["status"], json!("starting"));
    assert!(unit["createdAt"].is_string());
    assert!(unit["logs"].is_array());

    api.registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_and_restart_flow() {
    let api = TestApi::new();
    let id = api.host("flow").await;

    let (status, body) = api.post("/api/stop-bot", json!({ "botId": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("unit stopped"));

    let (status, body) = api.post("/api/stop-bot", json!({ "botId": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("unit was not running"));

    let (status, body) = api.post("/api/restart-bot", json!({ "botId": id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let registry = Arc::clone(&api.registry);
    let online = wait_for(Duration::from_secs(3), || {
        registry
            .get(&id)
            .map(|d| d.summary.status == unit_supervisor::UnitState::Online)
            .unwrap_or(false)
    })
    .await;
    assert!(online);

    let (status, detail) = api.get(&format!("/api/bot/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["status"], json!("online"));
    assert!(detail["pid"].is_number());
    assert_eq!(detail["restartPending"], json!(false));

    api.registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_logs_endpoint() {
    let api = TestApi::new();
    let id = api.host("talker").await;

    let registry = Arc::clone(&api.registry);
    assert!(wait_for(Duration::from_secs(3), || {
        registry.logs(&id).contains(&"[INFO] started".to_string())
    })
    .await);

    let (status, body) = api.get(&format!("/api/bot-logs/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    let lines: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(lines.iter().any(|l| l.starts_with("[SYSTEM] process started")));
    assert!(lines.contains(&"[INFO] started"));

    let (status, body) = api.get("/api/bot-logs/unknown").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    api.registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_id_is_not_found() {
    let api = TestApi::new();

    let (status, body) = api.post("/api/stop-bot", json!({ "botId": "ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("ghost"));

    let (status, _) = api.post("/api/restart-bot", json!({ "botId": "ghost" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api.delete("/api/bot/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = api.get("/api/bot/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_removes_unit() {
    let api = TestApi::new();
    let id = api.host("doomed").await;

    let (status, body) = api.delete(&format!("/api/bot/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (_, list) = api.get("/api/bots").await;
    assert_eq!(list, json!([]));

    let (status, _) = api.delete(&format!("/api/bot/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_and_delete_on_current_thread_runtime() {
    let api = TestApi::new();
    let id = api.host("single-threaded").await;

    let (status, list) = api.get("/api/bots").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["id"], json!(id));

    let (status, body) = api.delete(&format!("/api/bot/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("unit deleted"));
    assert!(api.registry.is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_server_error() {
    let api = TestApi::new();

    let request = Request::post("/api/host-bot")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = api.send(request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());

    let (status, _) = api.post("/api/host-bot", json!({ "name": "no code" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(api.registry.is_empty());
}

#[tokio::test]
async fn test_health() {
    let api = TestApi::new();
    let (status, body) = api.get("/api/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["units"], json!(0));
    assert!(body["version"].is_string());
}
