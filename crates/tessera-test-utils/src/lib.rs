//! Test utilities for tessera crates.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tessera_session::{
    error::StoreError,
    rbac::condition,
    session::{SessionId, SessionRecord},
    AuthContext, MemoryStore, Rbac, RoleDefinition, SessionAuthLayer, SessionStore,
};
use tracing::warn;

/// Header the fixture store layer reads and writes the session id through.
pub const SESSION_HEADER: &str = "x-session-id";

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err and return the error.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}

/// Roles used across the test suites:
///
/// - `user`: `account`, `post:add`, and `post:save` on their own posts
/// - `manager`: `post:delete`, inherits `user`
/// - `admin`: `user:delete`, inherits `manager`
pub fn reference_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new("user")
            .grant("account")
            .grant("post:add")
            .grant_when(
                "post:save",
                condition(|p| async move { Ok(p["ownerId"] == p["userId"]) }),
            ),
        RoleDefinition::new("manager")
            .grant("post:delete")
            .inherit("user"),
        RoleDefinition::new("admin")
            .grant("user:delete")
            .inherit("manager"),
    ]
}

pub fn reference_rbac() -> Rbac {
    Rbac::new(reference_roles()).expect("reference roles are valid")
}

/// Store that rejects writes.
///
/// By default both operations fail; [`FailingStore::rejecting_saves`] lets
/// regeneration succeed so only the save fails.
#[derive(Debug, Default)]
pub struct FailingStore {
    regenerates: bool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_saves() -> Self {
        Self { regenerates: true }
    }
}

#[async_trait]
impl SessionStore for FailingStore {
    async fn regenerate(&self, _previous: &SessionId) -> Result<SessionId, StoreError> {
        if self.regenerates {
            return Ok(SessionId::new());
        }
        Err(StoreError::RegenerateFailed("store offline".into()))
    }

    async fn save(&self, _record: &SessionRecord) -> Result<(), StoreError> {
        Err(StoreError::SaveFailed("store offline".into()))
    }
}

/// Build a request as if sent from `ip` with the given user-agent.
pub fn request_from(uri: &str, ip: &str, user_agent: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{}:4000", ip).parse().expect("valid test address");
    let mut req = Request::builder()
        .uri(uri)
        .header(header::USER_AGENT, user_agent)
        .body(Body::empty())
        .expect("valid test request");
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

/// Attach a session id to a request built by [`request_from`].
pub fn with_session(mut req: Request<Body>, id: &SessionId) -> Request<Body> {
    let value = HeaderValue::from_str(&id.to_string()).expect("session ids are valid headers");
    req.headers_mut().insert(SESSION_HEADER, value);
    req
}

/// Session id the fixture store layer returned, if any.
pub fn session_of(response: &Response) -> Option<SessionId> {
    response
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| SessionId::parse(v).ok())
}

async fn attach_session(State(store): State<Arc<MemoryStore>>, mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| SessionId::parse(v).ok());

    let handle = store.open(id.as_ref());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;
    // Persist what the request left behind, as a cookie-backed store would.
    if let Err(err) = handle.save().await {
        warn!(session_id = %handle.id(), error = %err, "Failed to persist session");
    }
    if let Ok(value) = HeaderValue::from_str(&handle.id().to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Wrap `router` in the session authentication layer over `store`, with a
/// store layer that carries the session id in [`SESSION_HEADER`].
pub fn with_sessions(router: Router, store: Arc<MemoryStore>, context: AuthContext) -> Router {
    router
        .layer(SessionAuthLayer::from_context(context))
        .layer(middleware::from_fn_with_state(store, attach_session))
}
