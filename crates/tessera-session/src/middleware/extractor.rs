//! Session extractor for handlers.

use crate::{error::SessionError, session::AuthSession};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

#[async_trait]
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or(SessionError::MissingSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SessionAuthConfig,
        session::{AuthContext, ClientInfo, MemoryStore},
    };
    use axum::http::Request;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_extracts_session() {
        let context = Arc::new(AuthContext::new(SessionAuthConfig::default()).unwrap());
        let store = Arc::new(MemoryStore::new());
        let session = AuthSession::new(store.open(None), context, ClientInfo::default());

        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(session.clone());

        let extracted = AuthSession::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(extracted.id(), session.id());
    }

    #[tokio::test]
    async fn test_missing_session() {
        let (mut parts, _) = Request::new(()).into_parts();
        let result = AuthSession::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(SessionError::MissingSession)));
    }
}
