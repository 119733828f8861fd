//! Session middleware layer.

use super::completion::CompletionHook;
use crate::{
    config::SessionAuthConfig,
    error::{ConfigError, SessionError},
    session::{AuthContext, AuthSession, ClientInfo, SessionHandle},
};
use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::error;

/// Keeps intermediaries from caching session-identifying headers.
pub const SESSION_CACHE_CONTROL: &str = "no-cache=\"Set-Cookie, Set-Cookie2\"";

/// Set the session cache-control header unless a handler chose its own.
pub fn harden(response: &mut Response) {
    response
        .headers_mut()
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static(SESSION_CACHE_CONTROL));
}

/// Layer attaching an [`AuthSession`] to every request.
///
/// Expects the session store layer to have put a [`SessionHandle`] in the
/// request extensions. Authenticated sessions whose client IP or user-agent
/// changed are logged out before the inner service runs.
#[derive(Clone)]
pub struct SessionAuthLayer {
    context: Arc<AuthContext>,
}

impl SessionAuthLayer {
    pub fn new(config: SessionAuthConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_context(AuthContext::new(config)?))
    }

    pub fn from_context(context: AuthContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    pub fn context(&self) -> &AuthContext {
        &self.context
    }
}

impl<S> Layer<S> for SessionAuthLayer {
    type Service = SessionAuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionAuthMiddleware {
            inner,
            context: self.context.clone(),
        }
    }
}

/// Session middleware service.
#[derive(Clone)]
pub struct SessionAuthMiddleware<S> {
    inner: S,
    context: Arc<AuthContext>,
}

impl<S> Service<Request<Body>> for SessionAuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let context = self.context.clone();
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let Some(handle) = req.extensions().get::<SessionHandle>().cloned() else {
                error!(uri = %req.uri(), "No session handle on request; is the session store layer installed?");
                let mut response = SessionError::MissingSession.into_response();
                harden(&mut response);
                return Ok(response);
            };

            let client = ClientInfo::from_request(&req, context.config().trust_proxy);
            let session = AuthSession::new(handle, context, client);
            let hook = CompletionHook::new(session.clone());

            if let Err(err) = session.enforce_continuity().await {
                let mut response = SessionError::from(err).into_response();
                harden(&mut response);
                return Ok(response);
            }

            req.extensions_mut().insert(session);

            let mut response = inner.call(req).await?;
            hook.fire();

            harden(&mut response);
            Ok(response)
        })
    }
}
