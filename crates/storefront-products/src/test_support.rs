//! In-process storefront backend for product tests
//!
//! Auth endpoints behave like the real ones (single-use refresh tokens).
//! Product endpoints keep an in-memory table seeded with two products for
//! seller `u1` and one for `u9`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Json;
use serde_json::{Value, json};
use storefront_auth::{
    AuthClient, CURRENT_USER_PATH, CookieJar, CredentialStore, MemoryCookieJar, MemoryStore,
    REFRESH_TOKEN_PATH,
};
use storefront_session::{RecordingNavigator, SessionManager, SessionSettings};
use tokio::net::TcpListener;

use crate::service::ProductService;

pub struct Backend {
    valid_access: Mutex<HashSet<String>>,
    valid_refresh: Mutex<HashSet<String>>,
    products: Mutex<Vec<Value>>,
    refresh_calls: AtomicUsize,
    me_calls: AtomicUsize,
    product_calls: AtomicUsize,
    reject_products: AtomicBool,
    bare_public: AtomicBool,
    public_down: AtomicBool,
    minted: AtomicUsize,
}

impl Backend {
    fn new() -> Self {
        Self {
            valid_access: Mutex::default(),
            valid_refresh: Mutex::default(),
            products: Mutex::new(vec![
                json!({"_id":"p1","name":"Lamp","price":20.0,"thumbnail":"lamp.jpg","seller":"u1"}),
                json!({"_id":"p2","name":"Desk","price":150.0,"thumbnail":"","seller":"u1"}),
                json!({"_id":"p3","name":"Rug","price":80.0,"seller":"u9"}),
            ]),
            refresh_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            product_calls: AtomicUsize::new(0),
            reject_products: AtomicBool::new(false),
            bare_public: AtomicBool::new(false),
            public_down: AtomicBool::new(false),
            minted: AtomicUsize::new(0),
        }
    }

    pub fn accept_access(&self, token: &str) {
        self.valid_access.lock().unwrap().insert(token.to_owned());
    }

    pub fn accept_refresh(&self, token: &str) {
        self.valid_refresh.lock().unwrap().insert(token.to_owned());
    }

    /// Answer 401 on every authorized product route, whatever the token.
    pub fn reject_products(&self) {
        self.reject_products.store(true, Ordering::SeqCst);
    }

    pub fn serve_bare_public_list(&self) {
        self.bare_public.store(true, Ordering::SeqCst);
    }

    pub fn fail_public_list(&self) {
        self.public_down.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub fn product_ids(&self) -> Vec<String> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .filter_map(|p| p["_id"].as_str().map(str::to_owned))
            .collect()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let token = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .unwrap_or_default();
        if self.reject_products.load(Ordering::SeqCst)
            || !self.valid_access.lock().unwrap().contains(token)
        {
            return Err(message(StatusCode::UNAUTHORIZED, "Not authorized, token failed"));
        }
        Ok(())
    }
}

fn message(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "message": msg }))).into_response()
}

async fn me(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.me_calls.fetch_add(1, Ordering::SeqCst);
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    if b.valid_access.lock().unwrap().contains(token) {
        Json(json!({"user": {"_id": "u1", "name": "ann"}})).into_response()
    } else {
        message(StatusCode::UNAUTHORIZED, "jwt expired")
    }
}

async fn refresh(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refreshToken"].as_str().unwrap_or_default();
    if !b.valid_refresh.lock().unwrap().remove(presented) {
        return message(StatusCode::UNAUTHORIZED, "invalid refresh token");
    }
    let n = b.minted.fetch_add(1, Ordering::SeqCst) + 1;
    let minted = format!("at_refreshed_{n}");
    b.accept_access(&minted);
    Json(json!({ "token": minted })).into_response()
}

async fn seller_products(
    State(b): State<Arc<Backend>>,
    Path(seller): Path<String>,
    headers: HeaderMap,
) -> Response {
    b.product_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = b.authorize(&headers) {
        return rejection;
    }
    let products: Vec<Value> = b
        .products
        .lock()
        .unwrap()
        .iter()
        .filter(|p| p["seller"] == seller.as_str())
        .cloned()
        .collect();
    Json(json!({ "products": products })).into_response()
}

async fn public_products(State(b): State<Arc<Backend>>) -> Response {
    b.product_calls.fetch_add(1, Ordering::SeqCst);
    if b.public_down.load(Ordering::SeqCst) {
        return message(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }
    let products = b.products.lock().unwrap().clone();
    if b.bare_public.load(Ordering::SeqCst) {
        Json(Value::Array(products)).into_response()
    } else {
        Json(json!({ "products": products })).into_response()
    }
}

async fn create_product(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(mut body): Json<Value>,
) -> Response {
    b.product_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = b.authorize(&headers) {
        return rejection;
    }
    if body["price"].as_f64().unwrap_or(0.0) <= 0.0 {
        return message(StatusCode::BAD_REQUEST, "Price must be positive");
    }
    let mut products = b.products.lock().unwrap();
    body["_id"] = json!(format!("p{}", products.len() + 1));
    body["seller"] = json!("u1");
    products.push(body.clone());
    (StatusCode::CREATED, Json(json!({ "product": body }))).into_response()
}

async fn update_product(
    State(b): State<Arc<Backend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    b.product_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = b.authorize(&headers) {
        return rejection;
    }
    let mut products = b.products.lock().unwrap();
    let Some(existing) = products.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return message(StatusCode::NOT_FOUND, "Product not found");
    };
    if let (Some(target), Some(fields)) = (existing.as_object_mut(), body.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    // Updates answer with the bare product.
    Json(existing.clone()).into_response()
}

async fn delete_product(
    State(b): State<Arc<Backend>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    b.product_calls.fetch_add(1, Ordering::SeqCst);
    if let Err(rejection) = b.authorize(&headers) {
        return rejection;
    }
    let mut products = b.products.lock().unwrap();
    let before = products.len();
    products.retain(|p| p["_id"] != id.as_str());
    if products.len() == before {
        return message(StatusCode::NOT_FOUND, "Product not found");
    }
    Json(json!({ "message": "Product removed" })).into_response()
}

pub async fn spawn_backend() -> (Arc<Backend>, String) {
    let backend = Arc::new(Backend::new());
    let app = Router::new()
        .route(CURRENT_USER_PATH, get(me))
        .route(REFRESH_TOKEN_PATH, post(refresh))
        .route("/api/products", get(public_products).post(create_product))
        .route("/api/products/seller/{seller}", get(seller_products))
        .route("/api/products/{id}", put(update_product).delete(delete_product))
        .with_state(backend.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, format!("http://{addr}"))
}

/// Base URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub struct Harness {
    pub session: Arc<SessionManager>,
    pub service: ProductService,
    pub jar: Arc<MemoryCookieJar>,
    pub cache: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn seed_cookies(&self, access: Option<&str>, refresh: Option<&str>) {
        if let Some(t) = access {
            self.jar.set_cookie(&format!("token={t}; path=/"));
        }
        if let Some(t) = refresh {
            self.jar.set_cookie(&format!("refreshToken={t}; path=/"));
        }
    }
}

pub fn harness(base_url: &str) -> Harness {
    let jar = Arc::new(MemoryCookieJar::new());
    let cache = Arc::new(MemoryStore::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let http = reqwest::Client::new();
    let session = Arc::new(SessionManager::new(
        CredentialStore::new(cache.clone(), jar.clone()),
        AuthClient::new(http.clone(), base_url),
        navigator.clone(),
        SessionSettings::default(),
    ));
    let service = ProductService::new(http, base_url, session.clone());
    Harness {
        session,
        service,
        jar,
        cache,
        navigator,
    }
}
