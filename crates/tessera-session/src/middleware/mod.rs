//! Request pipeline: the session middleware chain and composable guards.

pub mod completion;
pub mod extractor;
pub mod guard;
pub mod session;

pub use completion::CompletionHook;
pub use guard::{denial_handler, Continuation, DenialHandler, Gate, GuardLayer, GuardMiddleware, ParamsSource};
pub use session::{harden, SessionAuthLayer, SessionAuthMiddleware, SESSION_CACHE_CONTROL};
