use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use bankflow_auth::{
    AuthSession, AuthStatus, ExchangeRequest, ExternalUserInfo, GuardDecision, LoginRequest,
    MemorySessionStore, RouteGuard, RouteHistory, SessionParts, SessionStore,
};
use bankflow_core::{AuthConfig, AuthError, keys};
use bankflow_events::{AuthBroadcaster, AuthTokenEvent, InMemoryEventBus, Subscription};
use bankflow_http::{ApiRequest, AuthInterceptor, HttpAuthBackend, HttpError, ReqwestTransport};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Value, json};

const SECRET: &str = "test-secret";

#[derive(Default)]
struct Backend {
    current: Mutex<String>,
    issued: AtomicUsize,
    refresh_calls: AtomicUsize,
    reject_refresh: AtomicBool,
}

impl Backend {
    fn issue(&self, username: &str) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let token = mint_jwt(username, n);
        *self.current.lock().unwrap() = token.clone();
        token
    }

    // The next protected call with the previously issued token gets a 401.
    fn revoke(&self) {
        *self.current.lock().unwrap() = "revoked".to_string();
    }
}

struct TestServer {
    base_url: String,
    backend: Arc<Backend>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = Arc::new(Backend::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/refresh", post(refresh))
            .route("/api/auth/azure-exchange", post(exchange))
            .route("/api/cuentas", get(cuentas))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(username: &str, jti: usize) -> String {
    let claims = json!({
        "sub": username,
        "email": format!("{username}@bank.example"),
        "roles": ["CLIENTE"],
        "jti": jti,
        "exp": (Utc::now() + ChronoDuration::minutes(10)).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn login(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if !headers.contains_key("x-guid") || !headers.contains_key("x-app") {
        return Err(StatusCode::BAD_REQUEST);
    }
    if headers.contains_key("authorization") {
        return Err(StatusCode::BAD_REQUEST);
    }
    if body["password"] != "secret" {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let username = body["username"].as_str().unwrap_or_default();
    Ok(Json(json!({
        "token": backend.issue(username),
        "refreshToken": "refresh-1",
        "expiresIn": 600,
        "user": {"id": "7", "username": username},
    })))
}

async fn refresh(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    backend.refresh_calls.fetch_add(1, Ordering::SeqCst);
    // Slow enough that concurrent 401s all land while this is in flight.
    tokio::time::sleep(Duration::from_millis(300)).await;

    if backend.reject_refresh.load(Ordering::SeqCst) || body["refreshToken"] != "refresh-1" {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({ "token": backend.issue("jdoe") })))
}

async fn exchange(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if body["azureToken"] != "provider-token" {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let username = body["userInfo"]["username"].as_str().unwrap_or_default();
    Ok(Json(json!({
        "jwtToken": backend.issue(username),
        "refreshToken": "refresh-1",
        "expiresIn": 600,
        "permissions": ["cliente.read", "cuenta.read"],
    })))
}

async fn cuentas(State(backend): State<Arc<Backend>>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let expected = format!("Bearer {}", backend.current.lock().unwrap());
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(got) if got == expected => Ok(Json(json!([{"id": "ES00-1", "saldo": 120.5}]))),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

struct Client {
    session: Arc<AuthSession>,
    interceptor: AuthInterceptor,
    store: Arc<MemorySessionStore>,
    history: Arc<RouteHistory>,
    events: Subscription<AuthTokenEvent>,
    config: AuthConfig,
}

fn client(srv: &TestServer) -> Client {
    let config = AuthConfig {
        api_url: format!("{}/api", srv.base_url),
        ..AuthConfig::default()
    };

    let transport = Arc::new(ReqwestTransport::new(Duration::from_secs(5)).unwrap());
    let store = Arc::new(MemorySessionStore::new());
    let history = Arc::new(RouteHistory::new());
    let broadcaster = AuthBroadcaster::new(Arc::new(InMemoryEventBus::<AuthTokenEvent>::new()), "shell");
    let events = broadcaster.subscribe();

    let parts = SessionParts::new(
        store.clone(),
        Arc::new(HttpAuthBackend::new(transport.clone(), config.clone())),
        history.clone(),
        broadcaster,
    );
    let session = Arc::new(AuthSession::new(config.clone(), parts));
    let interceptor = AuthInterceptor::new(session.clone(), transport);

    Client {
        session,
        interceptor,
        store,
        history,
        events,
        config,
    }
}

#[tokio::test]
async fn login_then_protected_call_carries_bearer() {
    let srv = TestServer::spawn().await;
    let c = client(&srv);

    c.session.login(&LoginRequest::new("jdoe", "secret")).await.unwrap();

    assert_eq!(c.session.status(), AuthStatus::Authenticated);
    assert_eq!(c.session.username().as_deref(), Some("jdoe"));
    assert_eq!(c.events.drain()[0].payload, c.session.token().unwrap());

    let res = c
        .interceptor
        .execute(ApiRequest::get(c.config.endpoint("/cuentas")))
        .await
        .unwrap();
    let body: Value = res.json().unwrap();
    assert_eq!(body[0]["id"], "ES00-1");
    assert_eq!(srv.backend.refresh_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_password_is_a_login_failure() {
    let srv = TestServer::spawn().await;
    let c = client(&srv);

    let err = c.session.login(&LoginRequest::new("jdoe", "nope")).await.unwrap_err();

    assert!(matches!(err, AuthError::LoginFailure(_)));
    assert!(!c.session.is_authenticated());
    assert!(c.events.drain().is_empty());
}

#[tokio::test]
async fn revoked_token_is_refreshed_once_for_concurrent_calls() {
    let srv = TestServer::spawn().await;
    let c = client(&srv);
    c.session.login(&LoginRequest::new("jdoe", "secret")).await.unwrap();
    let first = c.session.token().unwrap();

    srv.backend.revoke();

    let url = c.config.endpoint("/cuentas");
    let (a, b, d) = tokio::join!(
        c.interceptor.execute(ApiRequest::get(url.clone())),
        c.interceptor.execute(ApiRequest::get(url.clone())),
        c.interceptor.execute(ApiRequest::get(url.clone())),
    );

    assert!(a.is_ok() && b.is_ok() && d.is_ok());
    assert_eq!(srv.backend.refresh_calls.load(Ordering::SeqCst), 1);
    assert_ne!(c.session.token().unwrap(), first);
    assert_eq!(c.session.status(), AuthStatus::Authenticated);
    assert!(!c.interceptor.is_refreshing());
}

#[tokio::test]
async fn rejected_refresh_logs_out_and_guard_remembers_target() {
    let srv = TestServer::spawn().await;
    let c = client(&srv);
    c.session.login(&LoginRequest::new("jdoe", "secret")).await.unwrap();
    c.events.drain();

    srv.backend.revoke();
    srv.backend.reject_refresh.store(true, Ordering::SeqCst);

    let err = c
        .interceptor
        .execute(ApiRequest::get(c.config.endpoint("/cuentas")))
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Auth(AuthError::RefreshFailure(_))));
    assert_eq!(c.session.status(), AuthStatus::Unauthenticated);
    assert_eq!(c.store.get(keys::JWT_TOKEN), None);
    assert_eq!(c.store.get(keys::REFRESH_TOKEN), None);
    assert_eq!(c.history.last().as_deref(), Some("/auth/login"));
    assert!(c.events.drain()[0].is_logout());

    let guard = RouteGuard::new(c.session.clone(), c.store.clone(), c.config.login_route.clone());
    assert_eq!(
        guard.check("/cliente/edit/7?x=1"),
        GuardDecision::Redirect("/auth/login".to_string())
    );

    srv.backend.reject_refresh.store(false, Ordering::SeqCst);
    c.session.login(&LoginRequest::new("jdoe", "secret")).await.unwrap();

    assert_eq!(guard.check("/cliente/edit/7?x=1"), GuardDecision::Allow);
    assert_eq!(c.session.take_redirect_url().as_deref(), Some("/cliente/edit/7?x=1"));
}

#[tokio::test]
async fn identity_exchange_signs_in_with_permissions() {
    let srv = TestServer::spawn().await;
    let c = client(&srv);

    let request = ExchangeRequest {
        azure_token: "provider-token".into(),
        user_info: ExternalUserInfo {
            username: "jdoe".into(),
            name: Some("J. Doe".into()),
            email: Some("jdoe@bank.example".into()),
            object_id: Some("oid-1".into()),
        },
    };
    c.session.exchange_identity(&request).await.unwrap();

    assert!(c.session.is_authenticated());
    assert!(c.session.has_all_permissions(&["cliente.read", "cuenta.read"]));
    assert_eq!(c.history.last().as_deref(), Some("/cliente"));

    let res = c
        .interceptor
        .execute(ApiRequest::get(c.config.endpoint("/cuentas")))
        .await;
    assert!(res.is_ok());
}
