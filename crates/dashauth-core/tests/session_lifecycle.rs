//! End-to-end session lifecycle against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use dashauth_core::notify::{
    LOGIN_FAILED, LOGIN_SUCCEEDED, LOGOUT_FAILED, LOGOUT_SUCCEEDED,
};
use dashauth_core::{
    ApiClient, ApiError, AuthService, Credentials, GuardDecision, LogoutPolicy, MemoryTokenStore,
    Navigation, NavigationKind, Navigator, NotificationLog, Route, RouteGuard, Router, SessionError,
    SessionManager, SessionState, TokenKind, TokenRecord, TokenStore, UserProfile,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    session: SessionManager,
    tokens: Arc<MemoryTokenStore>,
    router: Arc<Router>,
    notes: Arc<NotificationLog>,
}

fn harness(origin: &str, start: Route, record: TokenRecord) -> Harness {
    let tokens = Arc::new(MemoryTokenStore::with_record(record));
    let router = Arc::new(Router::new(start));
    let notes = Arc::new(NotificationLog::new());
    let api = ApiClient::new(
        origin,
        Duration::from_secs(5),
        tokens.clone(),
        router.clone(),
        notes.clone(),
    )
    .unwrap();
    Harness {
        session: SessionManager::new(AuthService::new(api)),
        tokens,
        router,
        notes,
    }
}

fn record(access: Option<&str>, refresh: Option<&str>) -> TokenRecord {
    TokenRecord {
        access_token: access.map(str::to_string),
        refresh_token: refresh.map(str::to_string),
        expires_at: None,
    }
}

fn admin() -> UserProfile {
    UserProfile {
        id: 1,
        username: "admin".to_string(),
        email: "admin@example.com".to_string(),
        is_active: true,
        is_superuser: true,
    }
}

fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "access_token": access,
        "token_type": "bearer",
        "expires_in": 1800
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = json!(refresh);
    }
    body
}

async fn mount_me(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(&admin()))
        .mount(server)
        .await;
}

fn stored(h: &Harness, kind: TokenKind) -> Option<String> {
    h.tokens.get(kind).unwrap()
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_init_without_refresh_token_goes_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Route::Dashboard, record(Some("A0"), None));
    let state = h.session.init().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert!(!h.session.state().is_loading());
    assert!(h.tokens.load().unwrap().is_empty());
    assert_eq!(
        h.router.history(),
        vec![Navigation { route: Route::Login, kind: NavigationKind::Push }]
    );
}

#[tokio::test]
async fn test_init_without_refresh_token_on_login_page_stays() {
    let server = MockServer::start().await;
    let h = harness(&server.uri(), Route::Login, TokenRecord::default());

    assert_eq!(h.session.init().await, SessionState::Unauthenticated);
    assert!(h.router.history().is_empty());
}

#[tokio::test]
async fn test_init_restores_rotated_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refresh_token": "R1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", Some("R2"))))
        .expect(1)
        .mount(&server)
        .await;
    mount_me(&server, "A2").await;

    let h = harness(&server.uri(), Route::Login, record(None, Some("R1")));
    let state = h.session.init().await;

    assert_eq!(state, SessionState::Authenticated(admin()));
    assert_eq!(stored(&h, TokenKind::Access).as_deref(), Some("A2"));
    assert_eq!(stored(&h, TokenKind::Refresh).as_deref(), Some("R2"));
    // Sitting on the login page, so move on to the dashboard
    assert_eq!(h.router.current(), Route::Dashboard);
}

#[tokio::test]
async fn test_init_restore_stays_on_current_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", Some("R2"))))
        .mount(&server)
        .await;
    mount_me(&server, "A2").await;

    let h = harness(&server.uri(), Route::Dashboard, record(Some("A1"), Some("R1")));
    assert!(h.session.init().await.is_authenticated());
    assert!(h.router.history().is_empty());
}

#[tokio::test]
async fn test_init_unrotated_refresh_token_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", Some("R1"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&admin()))
        .expect(0)
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Route::Dashboard, record(Some("A1"), Some("R1")));
    let state = h.session.init().await;

    assert_eq!(state, SessionState::Unauthenticated);
    assert!(h.tokens.load().unwrap().is_empty());
    assert_eq!(h.router.current(), Route::Login);
    assert_eq!(h.router.last().unwrap().kind, NavigationKind::Push);
}

#[tokio::test]
async fn test_init_missing_refresh_token_in_response_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A2", None)))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Route::Dashboard, record(None, Some("R1")));
    assert_eq!(h.session.init().await, SessionState::Unauthenticated);
    assert!(h.tokens.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_init_rejected_refresh_clears_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .mount(&server)
        .await;

    let h = harness(&server.uri(), Route::Dashboard, record(Some("A1"), Some("R1")));
    assert_eq!(h.session.init().await, SessionState::Unauthenticated);
    assert!(h.tokens.load().unwrap().is_empty());
    assert_eq!(h.router.current(), Route::Login);
    // Startup failures are handled silently
    assert!(h.notes.entries().is_empty());
}

#[tokio::test]
async fn test_subscribers_observe_init() {
    let server = MockServer::start().await;
    let h = harness(&server.uri(), Route::Login, TokenRecord::default());
    let mut rx = h.session.subscribe();
    assert!(rx.borrow().is_loading());

    h.session.init().await;

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_login_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A1", Some("R1"))))
        .expect(1)
        .mount(&server)
        .await;
    mount_me(&server, "A1").await;

    let h = harness(&server.uri(), Route::Login, TokenRecord::default());
    h.session.init().await;
    let user = h.session.login(&Credentials::new("admin", "s3cret")).await.unwrap();

    assert_eq!(user, admin());
    assert_eq!(h.session.state(), SessionState::Authenticated(admin()));
    assert_eq!(stored(&h, TokenKind::Access).as_deref(), Some("A1"));
    assert_eq!(stored(&h, TokenKind::Refresh).as_deref(), Some("R1"));
    assert_eq!(h.notes.messages(), vec![LOGIN_SUCCEEDED]);
    assert_eq!(h.router.current(), Route::Dashboard);
}

#[tokio::test]
async fn test_login_without_refresh_token_keeps_existing_one() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A1", None)))
        .mount(&server)
        .await;
    mount_me(&server, "A1").await;

    let h = harness(&server.uri(), Route::Login, record(None, Some("R0")));
    h.session.login(&Credentials::new("admin", "s3cret")).await.unwrap();

    assert_eq!(stored(&h, TokenKind::Access).as_deref(), Some("A1"));
    assert_eq!(stored(&h, TokenKind::Refresh).as_deref(), Some("R0"));
}

#[tokio::test]
async fn test_login_rejected_leaves_store_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Incorrect username or password"
        })))
        .mount(&server)
        .await;

    let before = record(Some("A0"), Some("R0"));
    let h = harness(&server.uri(), Route::Login, before.clone());
    let result = h.session.login(&Credentials::new("admin", "wrong")).await;

    assert!(matches!(
        result,
        Err(SessionError::Api(ApiError::AuthenticationRejected))
    ));
    assert_eq!(h.tokens.load().unwrap(), before);
    assert!(h.session.state().is_loading());
    assert_eq!(h.notes.messages(), vec![LOGIN_FAILED]);
    assert!(h.router.history().is_empty());
}

// ---------------------------------------------------------------------------
// Logout
// ---------------------------------------------------------------------------

async fn signed_in(server: &MockServer, policy: LogoutPolicy) -> Harness {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("A1", Some("R1"))))
        .mount(server)
        .await;
    mount_me(server, "A1").await;

    let mut h = harness(&server.uri(), Route::Login, TokenRecord::default());
    h.session = h.session.with_logout_policy(policy);
    h.session.login(&Credentials::new("admin", "s3cret")).await.unwrap();
    h
}

#[tokio::test]
async fn test_logout_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })))
        .expect(1)
        .mount(&server)
        .await;
    let h = signed_in(&server, LogoutPolicy::KeepTokens).await;

    h.session.logout().await.unwrap();

    assert_eq!(h.session.state(), SessionState::Unauthenticated);
    assert!(h.tokens.load().unwrap().is_empty());
    assert_eq!(h.notes.messages(), vec![LOGIN_SUCCEEDED, LOGOUT_SUCCEEDED]);
    assert_eq!(h.router.current(), Route::Login);
}

#[tokio::test]
async fn test_logout_network_failure_keeps_tokens() {
    // Sign in against a live server, then log out against a dead origin
    // sharing the same token store.
    let server = MockServer::start().await;
    let h = signed_in(&server, LogoutPolicy::KeepTokens).await;

    let api = ApiClient::new(
        "http://127.0.0.1:1",
        Duration::from_secs(5),
        h.tokens.clone(),
        h.router.clone(),
        h.notes.clone(),
    )
    .unwrap();
    let offline = SessionManager::new(AuthService::new(api));

    let result = offline.logout().await;

    assert!(matches!(
        result,
        Err(SessionError::Api(ApiError::NetworkError(_)))
    ));
    assert!(h.notes.messages().contains(&LOGOUT_FAILED.to_string()));
    assert_eq!(stored(&h, TokenKind::Access).as_deref(), Some("A1"));
    assert_eq!(stored(&h, TokenKind::Refresh).as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_logout_failure_with_clear_policy() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let h = signed_in(&server, LogoutPolicy::ClearTokens).await;

    let result = h.session.logout().await;

    assert!(matches!(
        result,
        Err(SessionError::Api(ApiError::ServerError(_)))
    ));
    assert!(h.tokens.load().unwrap().is_empty());
    assert_eq!(h.session.state(), SessionState::Unauthenticated);
    assert_eq!(h.router.current(), Route::Login);
    assert!(h.notes.messages().ends_with(&[LOGOUT_FAILED.to_string()]));
}

// ---------------------------------------------------------------------------
// Guarding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_guard_follows_session() {
    let server = MockServer::start().await;
    let h = harness(&server.uri(), Route::Dashboard, TokenRecord::default());

    assert_eq!(
        RouteGuard::check(&h.session.state(), Route::Dashboard),
        GuardDecision::Pending
    );
    h.session.init().await;
    assert_eq!(
        RouteGuard::check(&h.session.state(), Route::Dashboard),
        GuardDecision::Redirect(Route::Login)
    );

    let server = MockServer::start().await;
    let h = signed_in(&server, LogoutPolicy::KeepTokens).await;
    assert_eq!(
        RouteGuard::check(&h.session.state(), Route::Dashboard),
        GuardDecision::Render
    );
    let greeting = RouteGuard::protect(&h.session.state(), h.router.as_ref(), |user| {
        format!("Hello, {}", user.username)
    });
    assert_eq!(greeting.as_deref(), Some("Hello, admin"));
}

#[tokio::test]
async fn test_teardown_keeps_stored_tokens() {
    let server = MockServer::start().await;
    let h = signed_in(&server, LogoutPolicy::KeepTokens).await;
    let tokens = h.tokens.clone();

    h.session.teardown();

    assert_eq!(tokens.get(TokenKind::Access).unwrap().as_deref(), Some("A1"));
}
