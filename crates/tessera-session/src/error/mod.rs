//! Error handling for session authentication.

pub mod response;
pub mod types;

pub use types::{ConfigError, RbacError, SessionError, SessionResult, StoreError};
