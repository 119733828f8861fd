//! Composable request gates: login, freshness, role and permission.

use crate::{
    error::SessionError,
    rbac::Params,
    session::{AuthSession, RoleMatch},
};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    convert::Infallible,
    fmt,
    future::Future,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{util::BoxCloneService, Layer, Service, ServiceExt};
use tracing::{debug, warn};

type Resolver = dyn Fn(&Request<Body>) -> BoxFuture<'static, anyhow::Result<Params>> + Send + Sync;

/// Where a permission guard gets the parameters for its conditions.
#[derive(Clone, Default)]
pub enum ParamsSource {
    /// No parameters (`null`).
    #[default]
    None,
    /// Fixed parameters.
    Static(Params),
    /// Computed from the request, possibly asynchronously.
    Resolver(Arc<Resolver>),
}

impl ParamsSource {
    /// Compute parameters from the request.
    ///
    /// The closure reads what it needs from the request synchronously and
    /// returns a future producing the parameters.
    pub fn resolver<F, Fut>(f: F) -> Self
    where
        F: Fn(&Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Params>> + Send + 'static,
    {
        Self::Resolver(Arc::new(move |req: &Request<Body>| -> BoxFuture<'static, anyhow::Result<Params>> {
            Box::pin(f(req))
        }))
    }

    fn begin(&self, req: &Request<Body>) -> BoxFuture<'static, anyhow::Result<Params>> {
        match self {
            Self::None => Box::pin(futures::future::ready(Ok(Params::Null))),
            Self::Static(params) => Box::pin(futures::future::ready(Ok(params.clone()))),
            Self::Resolver(resolve) => resolve(req),
        }
    }
}

impl fmt::Debug for ParamsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Static(params) => f.debug_tuple("Static").field(params).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Condition a guard requires before passing the request on.
#[derive(Debug, Clone)]
pub enum Gate {
    /// Session is logged in. Fails with 401.
    Login,
    /// Session is logged in and fresh. Fails with 401.
    Fresh,
    /// Session role matches (or, negated, does not match). Fails with 401.
    Role { roles: RoleMatch, negate: bool },
    /// Session role may perform the operation. Fails with 403.
    Permission {
        operation: String,
        params: ParamsSource,
    },
}

impl Gate {
    /// Check the gate. Only the synchronous part touches the request, so the
    /// returned future does not borrow it.
    fn check(&self, session: AuthSession, req: &Request<Body>) -> BoxFuture<'static, Result<(), SessionError>> {
        let verdict = match self {
            Self::Login => session.is_logged_in().then_some(()).ok_or(SessionError::Unauthorized),
            Self::Fresh => session.is_fresh().then_some(()).ok_or(SessionError::StaleSession),
            Self::Role { roles, negate } => session
                .has_role(roles.clone(), *negate)
                .then_some(())
                .ok_or(SessionError::RoleMismatch),
            Self::Permission { operation, params } => {
                let operation = operation.clone();
                let pending = params.begin(req);
                return Box::pin(async move { check_permission(&session, &operation, pending).await });
            }
        };

        Box::pin(futures::future::ready(verdict))
    }
}

async fn check_permission(
    session: &AuthSession,
    operation: &str,
    params: BoxFuture<'static, anyhow::Result<Params>>,
) -> Result<(), SessionError> {
    let params = params.await.map_err(|err| {
        warn!(operation, error = %err, "Failed to resolve permission parameters");
        SessionError::PermissionDenied
    })?;

    match session.can(operation, &params).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(SessionError::PermissionDenied),
        Err(err) => {
            warn!(operation, error = %err, "Permission check failed");
            Err(SessionError::PermissionDenied)
        }
    }
}

/// Remainder of the pipeline, handed to a custom denial handler.
pub struct Continuation {
    inner: BoxCloneService<Request<Body>, Response, Infallible>,
}

impl Continuation {
    /// Run the rest of the pipeline as if the guard had passed.
    pub async fn run(self, req: Request<Body>) -> Response {
        match self.inner.oneshot(req).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }
}

/// Replaces the default status response when a guard denies a request.
pub type DenialHandler =
    Arc<dyn Fn(Request<Body>, Continuation) -> BoxFuture<'static, Response> + Send + Sync>;

/// Build a [`DenialHandler`] from an async closure.
pub fn denial_handler<F, Fut>(f: F) -> DenialHandler
where
    F: Fn(Request<Body>, Continuation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: Request<Body>, next: Continuation| -> BoxFuture<'static, Response> {
        Box::pin(f(req, next))
    })
}

/// Guard layer configuration.
#[derive(Clone)]
pub struct GuardLayer {
    gate: Arc<Gate>,
    on_denied: Option<DenialHandler>,
}

impl GuardLayer {
    pub fn new(gate: Gate) -> Self {
        Self {
            gate: Arc::new(gate),
            on_denied: None,
        }
    }

    /// Require a logged-in session.
    pub fn require_login() -> Self {
        Self::new(Gate::Login)
    }

    /// Require a fresh login.
    pub fn require_fresh() -> Self {
        Self::new(Gate::Fresh)
    }

    /// Require the session role to match `roles`, or not to when `negate`.
    pub fn require_role(roles: impl Into<RoleMatch>, negate: bool) -> Self {
        Self::new(Gate::Role {
            roles: roles.into(),
            negate,
        })
    }

    /// Require permission for `operation`.
    pub fn require_permission(operation: impl Into<String>, params: ParamsSource) -> Self {
        Self::new(Gate::Permission {
            operation: operation.into(),
            params,
        })
    }

    /// Handle denials with `handler` instead of a status response.
    pub fn on_denied(mut self, handler: DenialHandler) -> Self {
        self.on_denied = Some(handler);
        self
    }

    pub fn gate(&self) -> &Gate {
        &self.gate
    }
}

impl<S> Layer<S> for GuardLayer {
    type Service = GuardMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardMiddleware {
            inner,
            gate: self.gate.clone(),
            on_denied: self.on_denied.clone(),
        }
    }
}

/// Guard middleware service.
#[derive(Clone)]
pub struct GuardMiddleware<S> {
    inner: S,
    gate: Arc<Gate>,
    on_denied: Option<DenialHandler>,
}

impl<S> Service<Request<Body>> for GuardMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let gate = self.gate.clone();
        let on_denied = self.on_denied.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let Some(session) = req.extensions().get::<AuthSession>().cloned() else {
            return Box::pin(async { Ok(SessionError::MissingSession.into_response()) });
        };
        let verdict = gate.check(session, &req);

        Box::pin(async move {
            let denial = match verdict.await {
                Ok(()) => return inner.call(req).await,
                Err(denial) => denial,
            };

            debug!(gate = ?gate, code = denial.error_code(), "Guard denied request");

            match on_denied {
                Some(handler) => {
                    let next = Continuation {
                        inner: BoxCloneService::new(inner),
                    };
                    Ok(handler(req, next).await)
                }
                None => Ok(denial.into_response()),
            }
        })
    }
}
