//! In-process auth backend for manager tests
//!
//! Serves the three auth endpoints on an ephemeral port. Refresh tokens
//! are single-use, so a duplicate concurrent refresh would be rejected
//! exactly like a rotating production backend would.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use storefront_auth::{
    AuthClient, CURRENT_USER_PATH, CredentialStore, LOGOUT_PATH, MemoryCookieJar, MemoryStore,
    REFRESH_TOKEN_PATH,
};
use tokio::net::TcpListener;

use crate::manager::{SessionManager, SessionSettings};
use crate::navigator::RecordingNavigator;

pub const USER_JSON: &str = r#"{"_id":"u1","name":"ann","email":"ann@example.com"}"#;

#[derive(Default)]
pub struct Backend {
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    pub me_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    refresh_delay_ms: AtomicU64,
    logout_status: AtomicU16,
    minted: AtomicUsize,
}

impl Backend {
    pub fn accept_access(&self, token: &str) {
        self.valid_access.lock().unwrap().insert(token.to_owned());
    }

    pub fn accept_refresh(&self, token: &str) {
        self.valid_refresh.lock().unwrap().insert(token.to_owned());
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_logout_status(&self, status: u16) {
        self.logout_status.store(status, Ordering::SeqCst);
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

async fn me(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> impl IntoResponse {
    backend.me_calls.fetch_add(1, Ordering::SeqCst);
    let token = bearer(&headers).unwrap_or_default();
    if token == "at_down" {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance".to_owned());
    }
    if backend.valid_access.lock().unwrap().contains(&token) {
        (StatusCode::OK, format!(r#"{{"user":{USER_JSON}}}"#))
    } else {
        (StatusCode::UNAUTHORIZED, r#"{"message":"jwt expired"}"#.to_owned())
    }
}

async fn refresh(
    State(backend): State<Arc<Backend>>,
    axum::Json(body): axum::Json<serde_json::Value>,
) -> impl IntoResponse {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = backend.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let presented = body["refreshToken"].as_str().unwrap_or_default().to_owned();
    if presented == "rt_down" {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable".to_owned());
    }
    // Single use: a second exchange of the same token is rejected.
    if !backend.valid_refresh.lock().unwrap().remove(&presented) {
        return (StatusCode::UNAUTHORIZED, "invalid refresh token".to_owned());
    }

    let n = backend.minted.fetch_add(1, Ordering::SeqCst) + 1;
    let minted = format!("at_refreshed_{n}");
    backend.accept_access(&minted);
    (StatusCode::OK, format!(r#"{{"token":"{minted}"}}"#))
}

async fn logout(State(backend): State<Arc<Backend>>) -> impl IntoResponse {
    backend.logout_calls.fetch_add(1, Ordering::SeqCst);
    let status = match backend.logout_status.load(Ordering::SeqCst) {
        0 => 204,
        s => s,
    };
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Start the backend and return it with its base URL.
pub async fn spawn_backend() -> (Arc<Backend>, String) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route(CURRENT_USER_PATH, get(me))
        .route(REFRESH_TOKEN_PATH, post(refresh))
        .route(LOGOUT_PATH, post(logout))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, format!("http://{addr}"))
}

/// A manager wired to in-memory substrates, with handles to inspect them.
pub struct Harness {
    pub manager: Arc<SessionManager>,
    pub jar: Arc<MemoryCookieJar>,
    pub cache: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness(base_url: &str) -> Harness {
    let jar = Arc::new(MemoryCookieJar::new());
    let cache = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let credentials = CredentialStore::new(cache.clone(), jar.clone());
    let client = AuthClient::new(reqwest::Client::new(), base_url);
    let manager = Arc::new(SessionManager::new(
        credentials,
        client,
        navigator.clone(),
        SessionSettings::default(),
    ));
    Harness {
        manager,
        jar,
        cache,
        navigator,
    }
}
