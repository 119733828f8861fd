//! Demo server exercising the session middleware over an in-memory store.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tessera_session::{
    config::load_config,
    middleware::ParamsSource,
    rbac::{condition, Params},
    session::SessionId,
    AuthContext, AuthSession, GuardLayer, Login, MemoryStore, Rbac, RoleDefinition,
    SessionAuthLayer,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[cfg(feature = "tracing")]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SESSION_HEADER: &str = "x-session-id";

#[tokio::main]
async fn main() -> Result<()> {
    #[cfg(feature = "tracing")]
    {
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    dotenvy::dotenv().ok();
    let config = load_config()?;

    let rbac = Rbac::builder()
        .role(
            RoleDefinition::new("user")
                .grant("account")
                .grant("post:add")
                .grant_when(
                    "post:save",
                    condition(|p| async move { Ok(p["ownerId"] == p["userId"]) }),
                ),
        )
        .role(RoleDefinition::new("manager").grant("post:delete").inherit("user"))
        .role(RoleDefinition::new("admin").grant("user:delete").inherit("manager"));
    let rbac = match &config.rbac {
        Some(extra) => rbac.config(extra),
        None => rbac,
    }
    .build()?;

    let context = AuthContext::new(config)?.with_rbac(rbac);
    let store = Arc::new(MemoryStore::new());

    let app = Router::new()
        .route(
            "/middleware/post",
            get(allowed).route_layer(GuardLayer::require_permission("post:add", ParamsSource::None)),
        )
        .route(
            "/middleware/post/delete",
            get(allowed).route_layer(GuardLayer::require_permission("post:delete", ParamsSource::None)),
        )
        .route(
            "/middleware/post/save/:id",
            get(allowed).route_layer(GuardLayer::require_permission(
                "post:save",
                ParamsSource::resolver(|req: &Request| {
                    let owner = req
                        .uri()
                        .path()
                        .rsplit('/')
                        .next()
                        .and_then(|id| id.parse::<u64>().ok());
                    async move {
                        let owner = owner.ok_or_else(|| anyhow::anyhow!("invalid post id"))?;
                        Ok(json!({"userId": 1, "ownerId": owner}))
                    }
                }),
            )),
        )
        .route(
            "/account",
            get(allowed).route_layer(GuardLayer::require_fresh()),
        )
        .route("/", get(current_role))
        .route("/login/:role", get(login))
        .route("/logout", get(logout))
        .route("/post/save", get(save_post))
        .route("/post/:operation", get(post_operation))
        .layer(SessionAuthLayer::from_context(context))
        .layer(middleware::from_fn_with_state(store, attach_session))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await?;
    info!("Demo listening on {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

/// Stand-in for a real session store layer: sessions travel in a header.
async fn attach_session(State(store): State<Arc<MemoryStore>>, mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| SessionId::parse(v).ok());

    let handle = store.open(id.as_ref());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;
    if let Err(err) = handle.save().await {
        warn!(session_id = %handle.id(), error = %err, "Failed to persist session");
    }
    if let Ok(value) = HeaderValue::from_str(&handle.id().to_string()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

async fn current_role(session: AuthSession) -> String {
    session.role()
}

async fn login(session: AuthSession, Path(role): Path<String>) -> Result<Redirect, tessera_session::SessionError> {
    session.login(Login::as_role(role)).await?;
    Ok(Redirect::to("/"))
}

async fn logout(session: AuthSession) -> Result<Redirect, tessera_session::SessionError> {
    session.logout().await?;
    Ok(Redirect::to("/"))
}

async fn save_post(session: AuthSession) -> Response {
    permitted(&session, "post:save", &json!({"userId": 1, "ownerId": 1})).await
}

async fn post_operation(session: AuthSession, Path(operation): Path<String>) -> Response {
    permitted(&session, &format!("post:{}", operation), &Params::Null).await
}

async fn permitted(session: &AuthSession, operation: &str, params: &Params) -> Response {
    match session.can(operation, params).await {
        Ok(true) => "yes".into_response(),
        _ => StatusCode::FORBIDDEN.into_response(),
    }
}

async fn allowed() -> Body {
    Body::from("yes")
}
