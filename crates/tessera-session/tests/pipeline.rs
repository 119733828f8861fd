//! End-to-end tests of the session middleware, guards and RBAC behind an
//! axum router.

use axum::{
    body::Body,
    extract::{Path, Request},
    http::{header, StatusCode},
    response::{Redirect, Response},
    routing::get,
    Router,
};
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use tessera_session::{
    middleware::SESSION_CACHE_CONTROL,
    session::{ClientInfo, ManualClock, SessionHandle, SessionId, SessionRecord},
    AuthContext, AuthSession, GuardLayer, Login, MemoryStore, ParamsSource, SessionAuthConfig,
    SessionAuthLayer, SessionError, StoreError,
};
use tessera_test_utils::{
    assert_err, reference_rbac, request_from, session_of, with_session, with_sessions,
    FailingStore,
};
use test_case::test_case;
use tower::ServiceExt;

const IP: &str = "10.1.2.3";
const UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
}

impl TestApp {
    fn new(config: SessionAuthConfig) -> Self {
        let clock = Arc::new(ManualClock::at_epoch());
        let context = AuthContext::new(config)
            .unwrap()
            .with_rbac(reference_rbac())
            .with_clock(clock.clone());

        let routes = Router::new()
            .route("/", get(current_role))
            .route("/login/:role", get(login))
            .route("/logout", get(logout))
            .route("/account", get(ok).route_layer(GuardLayer::require_fresh()))
            .route("/members", get(ok).route_layer(GuardLayer::require_login()))
            .route(
                "/staff",
                get(ok).route_layer(GuardLayer::require_role(["manager", "admin"], false)),
            )
            .route(
                "/middleware/post",
                get(ok).route_layer(GuardLayer::require_permission("post:add", ParamsSource::None)),
            )
            .route(
                "/middleware/post/delete",
                get(ok).route_layer(GuardLayer::require_permission("post:delete", ParamsSource::None)),
            )
            .route(
                "/middleware/post/save/:id",
                get(ok).route_layer(GuardLayer::require_permission(
                    "post:save",
                    ParamsSource::resolver(|req: &Request| {
                        let owner = req.uri().path().rsplit('/').next().and_then(|id| id.parse::<u64>().ok());
                        async move {
                            let owner = owner.ok_or_else(|| anyhow::anyhow!("invalid post id"))?;
                            Ok(json!({"userId": 1, "ownerId": owner}))
                        }
                    }),
                )),
            );

        Self {
            router: with_sessions(routes, Arc::new(MemoryStore::new()), context),
            clock,
        }
    }

    async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Request `uri` from the default client, continuing `session` if given.
    async fn get(&self, uri: &str, session: Option<&SessionId>) -> Response {
        self.get_from(uri, IP, UA, session).await
    }

    async fn get_from(&self, uri: &str, ip: &str, ua: &str, session: Option<&SessionId>) -> Response {
        let req = request_from(uri, ip, ua);
        let req = match session {
            Some(id) => with_session(req, id),
            None => req,
        };
        self.send(req).await
    }

    async fn login(&self, role: &str) -> SessionId {
        let response = self.get(&format!("/login/{}", role), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_of(&response).unwrap()
    }
}

async fn ok() -> &'static str {
    "ok"
}

async fn current_role(session: AuthSession) -> String {
    session.role()
}

async fn login(session: AuthSession, Path(role): Path<String>) -> Result<Redirect, SessionError> {
    session.login(Login::as_role(role)).await?;
    Ok(Redirect::to("/"))
}

async fn logout(session: AuthSession) -> Result<Redirect, SessionError> {
    session.logout().await?;
    Ok(Redirect::to("/"))
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_guest_session() {
    let app = TestApp::new(SessionAuthConfig::default());

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], SESSION_CACHE_CONTROL);
    assert!(session_of(&response).is_some());
    assert_eq!(body_text(response).await, "guest");
}

#[tokio::test]
async fn test_login_regenerates_and_sets_role() {
    let app = TestApp::new(SessionAuthConfig::default());

    let guest = session_of(&app.get("/", None).await).unwrap();
    let response = app.get("/login/admin", Some(&guest)).await;
    let session = session_of(&response).unwrap();
    assert_ne!(session, guest);

    let response = app.get("/", Some(&session)).await;
    assert_eq!(session_of(&response), Some(session));
    assert_eq!(body_text(response).await, "admin");
}

#[tokio::test]
async fn test_logout_returns_to_guest() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    let response = app.get("/logout", Some(&session)).await;
    let after = session_of(&response).unwrap();
    assert_ne!(after, session);

    assert_eq!(body_text(app.get("/", Some(&after)).await).await, "guest");
}

#[tokio::test]
async fn test_ip_change_forces_logout() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    let response = app.get_from("/", "10.9.9.9", UA, Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_ne!(session_of(&response), Some(session));
    assert_eq!(body_text(response).await, "guest");
}

#[tokio::test]
async fn test_user_agent_change_forces_logout() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    let response = app.get_from("/", IP, "curl/8.0", Some(&session)).await;
    assert_eq!(body_text(response).await, "guest");
}

#[tokio::test]
async fn test_disabled_checks_keep_session() {
    let app = TestApp::new(
        SessionAuthConfig::default()
            .with_ip_check(false)
            .with_ua_check(false),
    );
    let session = app.login("manager").await;

    let response = app.get_from("/", "10.9.9.9", "curl/8.0", Some(&session)).await;
    assert_eq!(session_of(&response), Some(session));
    assert_eq!(body_text(response).await, "manager");
}

#[tokio::test]
async fn test_continuity_violation_still_reaches_guard() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    let response = app
        .get_from("/middleware/post", "10.9.9.9", UA, Some(&session))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_activity_keeps_session_fresh_until_ceiling() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    app.clock.advance(Duration::minutes(4));
    assert_eq!(app.get("/account", Some(&session)).await.status(), StatusCode::OK);

    app.clock.advance(Duration::minutes(4));
    assert_eq!(app.get("/account", Some(&session)).await.status(), StatusCode::OK);

    app.clock.advance(Duration::minutes(3));
    let response = app.get("/account", Some(&session)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Stale is not logged out.
    assert_eq!(app.get("/members", Some(&session)).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_idle_session_goes_stale() {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = app.login("user").await;

    app.clock.advance(Duration::minutes(6));
    assert_eq!(
        app.get("/account", Some(&session)).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[test_case(None, "/members", StatusCode::UNAUTHORIZED ; "guest needs login")]
#[test_case(Some("user"), "/members", StatusCode::OK ; "user is logged in")]
#[test_case(Some("user"), "/staff", StatusCode::UNAUTHORIZED ; "user is not staff")]
#[test_case(Some("manager"), "/staff", StatusCode::OK ; "manager is staff")]
#[test_case(None, "/middleware/post", StatusCode::FORBIDDEN ; "guest cannot add")]
#[test_case(Some("user"), "/middleware/post", StatusCode::OK ; "user can add")]
#[test_case(Some("user"), "/middleware/post/delete", StatusCode::FORBIDDEN ; "user cannot delete")]
#[test_case(Some("manager"), "/middleware/post/delete", StatusCode::OK ; "manager can delete")]
#[test_case(Some("admin"), "/middleware/post/delete", StatusCode::OK ; "admin inherits delete")]
#[test_case(Some("user"), "/middleware/post/save/1", StatusCode::OK ; "user saves own post")]
#[test_case(Some("user"), "/middleware/post/save/2", StatusCode::FORBIDDEN ; "user cannot save others post")]
#[test_case(Some("admin"), "/middleware/post/save/1", StatusCode::OK ; "admin inherits conditional save")]
#[test_case(Some("user"), "/middleware/post/save/abc", StatusCode::FORBIDDEN ; "unresolvable params are forbidden")]
#[tokio::test]
async fn test_guard_status(role: Option<&str>, uri: &str, expected: StatusCode) {
    let app = TestApp::new(SessionAuthConfig::default());
    let session = match role {
        Some(role) => Some(app.login(role).await),
        None => None,
    };

    let response = app.get(uri, session.as_ref()).await;
    assert_eq!(response.status(), expected);
    assert_eq!(response.headers()[header::CACHE_CONTROL], SESSION_CACHE_CONTROL);
}

#[tokio::test]
async fn test_trusted_proxy_address_binds_session() {
    let app = TestApp::new(SessionAuthConfig::default().with_trust_proxy(true));

    let mut req = request_from("/login/user", IP, UA);
    req.headers_mut()
        .insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
    let session = session_of(&app.send(req).await).unwrap();

    // Same proxy hop, different origin.
    let mut req = with_session(request_from("/", IP, UA), &session);
    req.headers_mut()
        .insert("x-forwarded-for", "198.51.100.4".parse().unwrap());
    assert_eq!(body_text(app.send(req).await).await, "guest");
}

fn failing_handle() -> SessionHandle {
    let mut record = SessionRecord::new(SessionId::new());
    record.logged_in_at = Some(chrono::Utc::now());
    record.last_request_at = record.logged_in_at;
    record.role = Some("user".into());
    record.ip = Some(IP.into());
    record.user_agent = Some(UA.into());
    SessionHandle::new(record, Arc::new(FailingStore::new()))
}

#[tokio::test]
async fn test_failed_forced_logout_is_server_error() {
    let app = Router::new()
        .route("/", get(ok))
        .layer(SessionAuthLayer::new(SessionAuthConfig::default()).unwrap());

    let mut req = request_from("/", "10.9.9.9", UA);
    req.extensions_mut().insert(failing_handle());

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[header::CACHE_CONTROL], SESSION_CACHE_CONTROL);
}

#[tokio::test]
async fn test_login_propagates_store_failure() {
    let context = Arc::new(AuthContext::new(SessionAuthConfig::default()).unwrap());
    let session = AuthSession::new(
        failing_handle(),
        context,
        ClientInfo::new(Some(IP), Some(UA)),
    );

    let err = assert_err!(session.login(Login::as_role("admin")).await);
    assert_eq!(SessionError::from(err).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(session.role(), "user");
}

#[tokio::test]
async fn test_rejected_login_save_leaves_guest() {
    let context = Arc::new(AuthContext::new(SessionAuthConfig::default()).unwrap());
    let handle = SessionHandle::new(
        SessionRecord::new(SessionId::new()),
        Arc::new(FailingStore::rejecting_saves()),
    );
    let session = AuthSession::new(handle, context, ClientInfo::new(Some(IP), Some(UA)));

    let err = assert_err!(session.login(Login::as_role("admin")).await);
    assert!(matches!(err, StoreError::SaveFailed(_)));
    assert!(session.is_guest());
    assert_eq!(session.role(), "guest");

    // Whatever an outer store layer persists afterwards is still a guest.
    let record = session.handle().snapshot();
    assert!(record.role.is_none() && record.ip.is_none());
}
