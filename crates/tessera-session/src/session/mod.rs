//! Session records and the authentication state layered on top of them.

pub mod auth;
pub mod client;
pub mod clock;
pub mod continuity;
pub mod freshness;
pub mod handle;
pub mod id;
pub mod record;
pub mod role;
pub mod store;

pub use auth::{AuthContext, AuthSession, Login};
pub use client::ClientInfo;
pub use clock::{Clock, ManualClock, SystemClock};
pub use continuity::{check_continuity, Binding, Continuity};
pub use freshness::FreshnessPolicy;
pub use handle::SessionHandle;
pub use id::{IdParseError, SessionId};
pub use record::{Attributes, SessionRecord};
pub use role::{RoleMatch, AUTHENTICATED_ROLE, GUEST_ROLE};
pub use store::{MemoryStore, SessionStore};
