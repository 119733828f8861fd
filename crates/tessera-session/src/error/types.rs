//! Session error types.

use axum::http::StatusCode;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures reported by the external session store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("session regeneration failed: {0}")]
    RegenerateFailed(String),

    #[error("session save failed: {0}")]
    SaveFailed(String),

    #[error("session store unavailable")]
    Unavailable,
}

/// Malformed options or role configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("fresh timeout must be greater than zero")]
    ZeroFreshTimeout,

    #[error("max fresh timeout ({max} ms) is shorter than fresh timeout ({fresh} ms)")]
    MaxFreshBelowFresh { fresh: u64, max: u64 },

    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("role '{role}' inherits undefined role '{parent}'")]
    UndefinedParent { role: String, parent: String },

    #[error("role inheritance cycle through '{0}'")]
    InheritanceCycle(String),

    #[error("invalid operation pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures inside the permission evaluator.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("condition for '{operation}' on role '{role}' failed")]
    Condition {
        role: String,
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("role-based access control is not configured")]
    NotConfigured,
}

/// Error enum covering session middleware and guard outcomes.
#[derive(Debug, Error)]
pub enum SessionError {
    // 401 Unauthorized
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session is not fresh")]
    StaleSession,

    #[error("Role not permitted")]
    RoleMismatch,

    // 403 Forbidden
    #[error("Permission denied")]
    PermissionDenied,

    // 500 Internal Server Error
    #[error("Session object missing")]
    MissingSession,

    #[error("Session store error")]
    Store(#[from] StoreError),

    #[error("Invalid configuration")]
    Config(#[from] ConfigError),

    #[error("Access control error")]
    Rbac(#[from] RbacError),
}

impl SessionError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::StaleSession | Self::RoleMismatch => {
                StatusCode::UNAUTHORIZED
            }

            Self::PermissionDenied => StatusCode::FORBIDDEN,

            Self::MissingSession | Self::Store(_) | Self::Config(_) | Self::Rbac(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::StaleSession => "stale_session",
            Self::RoleMismatch => "role_mismatch",
            Self::PermissionDenied => "permission_denied",
            Self::MissingSession => "session_missing",
            Self::Store(_) => "session_store_error",
            Self::Config(_) => "configuration_error",
            Self::Rbac(_) => "access_control_error",
        }
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}
