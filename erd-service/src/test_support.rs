//! In-process mock of the Baserow REST API used by the tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Json, Router,
};
use common::config::BaserowSettings;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Default)]
struct Inner {
    responses: Mutex<HashMap<String, (u16, Value)>>,
    auth_status: AtomicU16,
    token_calls: AtomicUsize,
    get_calls: AtomicUsize,
    unauthorized_gets: AtomicUsize,
    seen_tokens: Mutex<Vec<String>>,
    auth_delay_ms: AtomicU64,
    get_delay_ms: AtomicU64,
}

/// Handle on a running mock server.
#[derive(Clone)]
pub struct MockBaserow {
    pub api_url: String,
    inner: Arc<Inner>,
}

impl MockBaserow {
    /// Starts a mock server on an ephemeral local port.
    pub async fn start() -> Self {
        let inner = Arc::new(Inner {
            auth_status: AtomicU16::new(200),
            ..Default::default()
        });

        let app = Router::new().fallback(handle).with_state(inner.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api_url: format!("http://{}/api", addr),
            inner,
        }
    }

    /// Registers a GET response for `path` (relative to the API root).
    pub fn on_get(&self, path: &str, status: u16, body: Value) -> &Self {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body));
        self
    }

    /// Makes the token endpoint answer with `status`.
    pub fn set_auth_status(&self, status: u16) {
        self.inner.auth_status.store(status, Ordering::SeqCst);
    }

    /// Answers the next `count` authorized GETs with 401.
    pub fn reject_next_gets(&self, count: usize) {
        self.inner.unauthorized_gets.store(count, Ordering::SeqCst);
    }

    /// Holds every token-auth answer back by `delay`.
    pub fn delay_auth(&self, delay: Duration) {
        self.inner
            .auth_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Holds every GET answer back by `delay`.
    pub fn delay_gets(&self, delay: Duration) {
        self.inner
            .get_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn token_calls(&self) -> usize {
        self.inner.token_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.inner.get_calls.load(Ordering::SeqCst)
    }

    /// Authorization headers of every GET received, in order.
    pub fn seen_tokens(&self) -> Vec<String> {
        self.inner.seen_tokens.lock().unwrap().clone()
    }

    pub fn settings(&self) -> BaserowSettings {
        BaserowSettings::new(
            Some(self.api_url.clone()),
            Some("ada@example.com".into()),
            Some("secret".into()),
        )
        .with_timeout(Duration::from_secs(5))
    }
}

async fn handle(
    State(inner): State<Arc<Inner>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().trim_start_matches("/api/").to_string();

    if method == Method::POST && path == "user/token-auth/" {
        let n = inner.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        pause(&inner.auth_delay_ms).await;
        let status = inner.auth_status.load(Ordering::SeqCst);
        let payload: Value = serde_json::from_str(&body).unwrap_or_default();
        if status != 200 || payload.get("email").is_none() || payload.get("password").is_none() {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
            return (status, Json(json!({ "error": "ERROR_INVALID_CREDENTIALS" })));
        }
        return (
            StatusCode::OK,
            Json(json!({
                "access_token": format!("token-{}", n),
                "refresh_token": format!("refresh-{}", n),
            })),
        );
    }

    inner.get_calls.fetch_add(1, Ordering::SeqCst);
    pause(&inner.get_delay_ms).await;
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    inner.seen_tokens.lock().unwrap().push(authorization.clone());

    let expired = inner
        .unauthorized_gets
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if !authorization.starts_with("JWT ") || expired {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "ERROR_SIGNATURE_HAS_EXPIRED" })),
        );
    }

    let found = inner.responses.lock().unwrap().get(&path).cloned();
    match found {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::OK),
            Json(body),
        ),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))),
    }
}

async fn pause(delay_ms: &AtomicU64) {
    let ms = delay_ms.load(Ordering::SeqCst);
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}
