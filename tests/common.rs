#![allow(dead_code)]

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::routing::{get, post};
use axum::{Json, Router};
use clinic_agenda::api::{ApiClient, LoginRedirect};
use clinic_agenda::config::{ApiConfig, MailConfig};
use clinic_agenda::domain::session::Session;
use clinic_agenda::storage::{MemorySessionStore, SessionStore};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

pub const API_KEY: &str = "test-key";
pub const PASSWORD: &str = "secret";
pub const MAIL_TOKEN: &str = "mail-token";

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("clinic_agenda=debug".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).with_test_writer().init();
    });
}

type Rejection = (StatusCode, Json<Value>);

/// What the mock backend has seen, plus knobs to make it misbehave.
#[derive(Debug)]
pub struct MockState {
    pub valid_token: Mutex<String>,
    pub refresh_calls: AtomicUsize,
    pub patient_calls: AtomicUsize,
    pub requests: AtomicUsize,
    pub refresh_delay_ms: AtomicU64,
    pub patient_delay_ms: AtomicU64,
    pub refresh_expiry: Mutex<Value>,
    pub refresh_fails: AtomicBool,
    pub always_unauthorized: AtomicBool,
    pub seen_auth: Mutex<Vec<String>>,
    pub seen_request_ids: Mutex<Vec<String>>,
    pub last_body: Mutex<Option<Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            valid_token: Mutex::new("abc".to_string()),
            refresh_calls: AtomicUsize::new(0),
            patient_calls: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            refresh_delay_ms: AtomicU64::new(0),
            patient_delay_ms: AtomicU64::new(0),
            refresh_expiry: Mutex::new(json!(200)),
            refresh_fails: AtomicBool::new(false),
            always_unauthorized: AtomicBool::new(false),
            seen_auth: Mutex::new(Vec::new()),
            seen_request_ids: Mutex::new(Vec::new()),
            last_body: Mutex::new(None),
        }
    }
}

impl MockState {
    /// Invalidates every token handed out so far.
    pub fn revoke_tokens(&self) {
        *self.valid_token.lock().unwrap() = "revoked".to_string();
    }

    pub fn last_body(&self) -> Option<Value> {
        self.last_body.lock().unwrap().clone()
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let auth = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
        let request_id = headers.get("x-request-id").and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
        self.seen_auth.lock().unwrap().push(auth.clone());
        self.seen_request_ids.lock().unwrap().push(request_id);

        let expected = format!("Bearer {}", self.valid_token.lock().unwrap());
        if self.always_unauthorized.load(Ordering::SeqCst) || auth != expected {
            return Err((StatusCode::UNAUTHORIZED, Json(json!({ "statusCode": 401, "message": "Unauthorized" }))));
        }
        Ok(())
    }
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("api_key").and_then(|v| v.to_str().ok()) == Some(API_KEY)
}

async fn login(headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, Rejection> {
    if !has_api_key(&headers) {
        return Err((StatusCode::FORBIDDEN, Json(json!({ "message": "Missing api key" }))));
    }
    if body["username"] == "broken" {
        return Ok(Json(json!({ "status": "valid", "data": {} })));
    }
    if body["password"] != PASSWORD {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "message": ["Invalid credentials", "Try again"] }))));
    }
    Ok(Json(json!({
        "status": "valid",
        "data": {
            "token": "abc",
            "token_exp": 100,
            "user_id": 7,
            "user_fname": "Ana",
            "user_lname": "Soto",
            "rol": "admin"
        }
    })))
}

async fn refresh_token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    let n = state.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.refresh_fails.load(Ordering::SeqCst) || !has_api_key(&headers) || body["token"].as_str().is_none() {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "message": "Refresh token expired" }))));
    }

    let token = format!("fresh-{n}");
    *state.valid_token.lock().unwrap() = token.clone();
    let expiry = state.refresh_expiry.lock().unwrap().clone();
    Ok(Json(json!({ "token": token, "token_exp": expiry })))
}

async fn get_patient(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(rut): Path<String>,
) -> Result<Json<Value>, Rejection> {
    state.patient_calls.fetch_add(1, Ordering::SeqCst);
    let delay = state.patient_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    state.authorize(&headers)?;
    if rut == "1-9" {
        return Err((StatusCode::NOT_FOUND, Json(json!({ "message": "Paciente no encontrado" }))));
    }
    Ok(Json(json!({ "rut": rut, "nombre": "Ana" })))
}

async fn put_patient(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(rut): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    *state.last_body.lock().unwrap() = Some(body);
    Ok(Json(json!({ "status": "success", "rut": rut })))
}

async fn communes(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(region): Path<i64>,
) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    Ok(Json(json!({ "status": "success", "data": [{ "id": 101, "region": region, "nombre": "Santiago" }] })))
}

async fn book(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    let taken = body["hour"] == "08:00";
    *state.last_body.lock().unwrap() = Some(body);
    if taken {
        return Ok(Json(json!({ "status": "error", "message": "Hora ya reservada" })));
    }
    Ok(Json(json!({ "status": "success", "message": "Cita agendada", "data": { "event_id": 991 } })))
}

async fn capacity(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    *state.last_body.lock().unwrap() = Some(body);
    Ok(Json(json!({ "aperturaEventId": 55, "events": 4 })))
}

async fn verification_status(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    *state.last_body.lock().unwrap() = Some(body);
    Ok(Json(json!({ "status": "success" })))
}

/// E-mail verifier; receives the address as a multipart form field.
async fn verify_email(headers: HeaderMap, body: String) -> Result<Json<Value>, Rejection> {
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(MAIL_TOKEN) {
        return Err((StatusCode::UNAUTHORIZED, Json(json!({ "message": "Bad mail token" }))));
    }
    let classification = if body.contains("name=\"email\"") && body.contains("ana@example.com") {
        "Deliverable"
    } else {
        "Undeliverable"
    };
    Ok(Json(json!({ "status": "Success", "classification": classification, "email": "ana@example.com" })))
}

async fn profile(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Result<Json<Value>, Rejection> {
    state.authorize(&headers)?;
    Ok(Json(json!({ "user_id": 7 })))
}

async fn no_content(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Result<StatusCode, Rejection> {
    state.authorize(&headers)?;
    Ok(StatusCode::NO_CONTENT)
}

/// In-process stand-in for the clinic backend.
pub struct MockBackend {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        setup_tracing();
        let state = Arc::new(MockState::default());

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh-token", post(refresh_token))
            .route("/auth/profile", get(profile))
            .route("/patients/{rut}", get(get_patient).put(put_patient))
            .route("/communes/{region}", get(communes))
            .route("/appointments", post(book))
            .route("/capacity", post(capacity))
            .route("/statusVerifalia", post(verification_status))
            .route("/empty", get(no_content))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api_nestjs", api).route("/verify", post(verify_email));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url: format!("http://{addr}"), state }
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            api_key: API_KEY.to_string(),
            api_prefix: "/api_nestjs".to_string(),
            platform_id: 6,
            request_timeout_secs: 5,
        }
    }

    pub fn mail_config(&self) -> MailConfig {
        MailConfig { mail_url: Some(format!("{}/verify", self.base_url)), mail_token: Some(MAIL_TOKEN.to_string()) }
    }

    /// A client whose store starts with `session`, if given.
    pub fn client(&self, session: Option<Session>) -> TestClient {
        let store: Arc<dyn SessionStore> = match session {
            Some(session) => Arc::new(MemorySessionStore::with_session(session)),
            None => Arc::new(MemorySessionStore::new()),
        };
        let redirect = Arc::new(CountingRedirect::default());
        let client = ApiClient::builder(self.config())
            .session_store(Arc::clone(&store))
            .login_redirect(Arc::clone(&redirect) as Arc<dyn LoginRedirect>)
            .build()
            .unwrap();
        TestClient { client, store, redirect }
    }
}

pub struct TestClient {
    pub client: ApiClient,
    pub store: Arc<dyn SessionStore>,
    pub redirect: Arc<CountingRedirect>,
}

impl TestClient {
    pub fn redirects(&self) -> usize {
        self.redirect.count.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct CountingRedirect {
    pub count: AtomicUsize,
}

impl LoginRedirect for CountingRedirect {
    fn redirect_to_login(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session as returned by a successful login with token `abc`.
pub fn session() -> Session {
    serde_json::from_value(json!({
        "status": "valid",
        "data": {
            "token": "abc",
            "token_exp": 100,
            "user_id": 7,
            "user_fname": "Ana",
            "user_lname": "Soto",
            "rol": "admin"
        }
    }))
    .unwrap()
}
