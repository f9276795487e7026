//! In-process stand-in for the RedBot gateway.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use redbot_core::auth::MemorySessionStore;
use redbot_core::{Config, SessionSecurityClient};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct Backend {
    seen: Arc<Mutex<Vec<HeaderMap>>>,
    logins: Arc<AtomicUsize>,
}

impl Backend {
    pub fn last_headers(&self) -> HeaderMap {
        self.seen
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn login_attempts(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    fn record(&self, headers: HeaderMap) {
        self.seen.lock().unwrap().push(headers);
    }
}

pub fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    backend.logins.fetch_add(1, Ordering::SeqCst);
    if body["username"] == "admin" && body["password"] == "pw" {
        (
            StatusCode::OK,
            Json(json!({"access_token": "jwt-1", "token_type": "bearer"})),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Incorrect username or password"})),
        )
    }
}

async fn register(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "taken" {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Username already registered"})),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({"id": 2, "username": body["username"], "role": "user"})),
        )
    }
}

async fn accounts(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    backend.record(headers);
    Json(json!([
        {"id": 1, "user_id": 1, "platform": "reddit", "handle": "u/one", "token": "a", "created_at": "2025-01-01T00:00:00"},
        {"id": 2, "user_id": 1, "platform": "reddit", "handle": "u/two", "token": "b", "created_at": "2025-01-01T00:00:00"},
        {"id": 3, "user_id": 1, "platform": "", "handle": "anon", "token": "c", "created_at": "2025-01-01T00:00:00"}
    ]))
}

async fn delete_account(
    State(backend): State<Backend>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    backend.record(headers);
    if id == 99 {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": "Cuenta no encontrada"})),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({"id": id, "user_id": 1, "platform": "reddit", "handle": "gone", "token": "x"})),
        )
    }
}

async fn tasks(State(backend): State<Backend>, headers: HeaderMap) -> Json<Value> {
    backend.record(headers);
    Json(json!([
        {"id": 1, "account_id": 1, "type": "publicar", "config_json": {}, "status": "completed"},
        {"id": 2, "account_id": 1, "type": "moderar", "config_json": {}, "status": "failed"},
        {"id": 3, "account_id": 2, "type": "publicar", "config_json": {}, "status": "completed"},
        {"id": 4, "account_id": 2, "type": "responder", "config_json": {}, "status": "pending"}
    ]))
}

async fn create_task(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    backend.record(headers);
    Json(json!({
        "id": 10,
        "account_id": body["account_id"],
        "type": body["type"],
        "config_json": body["config_json"],
        "status": "pending",
        "created_at": "2025-01-01T00:00:00"
    }))
}

async fn logs(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let account = params.get("account_id").cloned().unwrap_or_else(|| "all".to_string());
    Json(json!([
        {"id": 1, "user_id": 1, "account_id": account, "task_id": 1, "task_type": "publicar",
         "status": "success", "detail": {"action": "publicar"}, "created_at": "2025-01-01T00:00:00"}
    ]))
}

async fn execute(Path(id): Path<i64>) -> Json<Value> {
    Json(json!({"count": 1, "results": [{"action": "publicar", "account": id}]}))
}

async fn expired() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token expired"})))
}

async fn locked() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "detail": "bad sig",
            "auth_type": "asymmetric",
            "hint": "Send X-Access-Token and X-Access-Signature"
        })),
    )
}

async fn forbidden_garbage() -> (StatusCode, &'static str) {
    (StatusCode::FORBIDDEN, "<html>forbidden</html>")
}

async fn forbidden_owner() -> (StatusCode, Json<Value>) {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"detail": "Not the owner of this account"})),
    )
}

async fn echo_headers(State(backend): State<Backend>, headers: HeaderMap) -> StatusCode {
    backend.record(headers);
    StatusCode::NO_CONTENT
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

pub fn gateway(backend: Backend) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/accounts", get(accounts))
        .route("/api/accounts/:id", delete(delete_account))
        .route("/api/tasks/", get(tasks).post(create_task))
        .route("/api/logs", get(logs))
        .route("/api/executor/execute/:id", post(execute))
        .route("/api/expired", get(expired))
        .route("/api/locked", get(locked))
        .route("/api/forbidden-garbage", get(forbidden_garbage))
        .route("/api/forbidden-owner", get(forbidden_owner))
        .route("/api/echo", get(echo_headers))
        .route("/api/slow", get(slow))
        .with_state(backend)
}

/// Gateway whose task service has dropped the session.
pub fn gateway_with_expired_tasks(backend: Backend) -> Router {
    Router::new()
        .route("/api/accounts", get(accounts))
        .route("/api/tasks/", get(expired))
        .with_state(backend)
}

pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", address)
}

pub fn client(base_url: &str) -> (SessionSecurityClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new());
    let config = Config {
        api_base_url: base_url.to_string(),
        ..Config::default()
    };
    let client = SessionSecurityClient::new(&config, store.clone()).unwrap();
    (client, store)
}

pub async fn start() -> (SessionSecurityClient, Arc<MemorySessionStore>, Backend) {
    let backend = Backend::default();
    let base_url = spawn(gateway(backend.clone())).await;
    let (client, store) = client(&base_url);
    (client, store, backend)
}
