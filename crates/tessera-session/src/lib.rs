//! Tessera session authentication
//!
//! This crate augments an externally managed HTTP session with login state,
//! freshness tracking, hijack detection and role-based access control.
//!
//! # Architecture
//!
//! - **Session**: the record, its store interface and the [`AuthSession`]
//!   view exposing login, logout, freshness and role operations
//! - **RBAC**: roles with inherited and conditional grants
//! - **Middleware**: the per-request session chain and composable guards
//! - **Config**: options, loading and validation
//!
//! A session store layer is expected to place a [`SessionHandle`] in the
//! request extensions before [`SessionAuthLayer`] runs. Guards installed
//! after it read the [`AuthSession`] the chain leaves behind.
//!
//! # Features
//!
//! - `tracing` - log subscriber setup for the demo binary

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod middleware;
pub mod rbac;
pub mod session;

pub use config::SessionAuthConfig;
pub use error::{SessionError, SessionResult, StoreError};
pub use middleware::{GuardLayer, ParamsSource, SessionAuthLayer};
pub use rbac::{Rbac, RoleDefinition};
pub use session::{AuthContext, AuthSession, Login, MemoryStore, SessionHandle, SessionStore};
