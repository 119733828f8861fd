//! Binding an authenticated session to the client that logged in.

use super::{client::ClientInfo, record::SessionRecord};
use std::fmt;

/// Which binding a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Ip,
    UserAgent,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip => f.write_str("ip"),
            Self::UserAgent => f.write_str("user_agent"),
        }
    }
}

/// Outcome of the per-request continuity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    /// Nothing to check.
    Guest,
    /// Authenticated and bound to this client.
    Intact,
    /// Authenticated but the client changed; the session must be logged out.
    Violated(Binding),
}

/// Compare the stored bindings with the current client.
///
/// The IP is checked before the user-agent and the first mismatch wins.
pub fn check_continuity(
    record: &SessionRecord,
    client: &ClientInfo,
    ip_check: bool,
    ua_check: bool,
) -> Continuity {
    if record.is_guest() {
        return Continuity::Guest;
    }

    if ip_check && record.ip != client.ip {
        return Continuity::Violated(Binding::Ip);
    }

    if ua_check && record.user_agent != client.user_agent {
        return Continuity::Violated(Binding::UserAgent);
    }

    Continuity::Intact
}
