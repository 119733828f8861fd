//! Configuration types.

use crate::rbac::RbacConfig;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Options recognised by the session middleware factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAuthConfig {
    /// Bind authenticated sessions to the client IP.
    #[serde(default = "default_true")]
    pub ip_check: bool,
    /// Bind authenticated sessions to the client user-agent.
    #[serde(default = "default_true")]
    pub ua_check: bool,
    /// Window after login or last activity during which the session is fresh.
    #[serde(default = "default_fresh_timeout")]
    pub fresh_timeout_ms: u64,
    /// Absolute ceiling on freshness measured from login.
    #[serde(default = "default_max_fresh_timeout")]
    pub max_fresh_timeout_ms: u64,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`.
    #[serde(default)]
    pub trust_proxy: bool,
    /// Role configuration.
    #[serde(default)]
    pub rbac: Option<RbacConfig>,
}

fn default_true() -> bool {
    true
}

fn default_fresh_timeout() -> u64 {
    300_000 // 5 minutes
}

fn default_max_fresh_timeout() -> u64 {
    600_000 // 10 minutes
}

impl Default for SessionAuthConfig {
    fn default() -> Self {
        Self {
            ip_check: default_true(),
            ua_check: default_true(),
            fresh_timeout_ms: default_fresh_timeout(),
            max_fresh_timeout_ms: default_max_fresh_timeout(),
            trust_proxy: false,
            rbac: None,
        }
    }
}

impl SessionAuthConfig {
    /// Enable or disable the IP continuity check.
    pub fn with_ip_check(mut self, enabled: bool) -> Self {
        self.ip_check = enabled;
        self
    }

    /// Enable or disable the user-agent continuity check.
    pub fn with_ua_check(mut self, enabled: bool) -> Self {
        self.ua_check = enabled;
        self
    }

    /// Set both freshness windows, in milliseconds.
    pub fn with_freshness(mut self, fresh_timeout_ms: u64, max_fresh_timeout_ms: u64) -> Self {
        self.fresh_timeout_ms = fresh_timeout_ms;
        self.max_fresh_timeout_ms = max_fresh_timeout_ms;
        self
    }

    /// Trust proxy headers for the client IP.
    pub fn with_trust_proxy(mut self, enabled: bool) -> Self {
        self.trust_proxy = enabled;
        self
    }

    /// Attach a role configuration.
    pub fn with_rbac(mut self, rbac: RbacConfig) -> Self {
        self.rbac = Some(rbac);
        self
    }

    pub fn fresh_timeout(&self) -> Duration {
        Duration::milliseconds(clamp_ms(self.fresh_timeout_ms))
    }

    pub fn max_fresh_timeout(&self) -> Duration {
        Duration::milliseconds(clamp_ms(self.max_fresh_timeout_ms))
    }
}

fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX / 1_000)
}
