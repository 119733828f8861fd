//! Dual-timeout freshness policy.

use super::record::SessionRecord;
use crate::config::SessionAuthConfig;
use chrono::{DateTime, Duration, Utc};

/// Decides whether a login is recent enough for sensitive operations.
///
/// A session is fresh while it is younger than `fresh_timeout`, or while its
/// last request is within `fresh_timeout`, but never once it is older than
/// `max_fresh_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    fresh_timeout: Duration,
    max_fresh_timeout: Duration,
}

impl FreshnessPolicy {
    pub fn new(fresh_timeout: Duration, max_fresh_timeout: Duration) -> Self {
        Self {
            fresh_timeout,
            max_fresh_timeout,
        }
    }

    pub fn from_config(config: &SessionAuthConfig) -> Self {
        Self::new(config.fresh_timeout(), config.max_fresh_timeout())
    }

    pub fn fresh_timeout(&self) -> Duration {
        self.fresh_timeout
    }

    pub fn max_fresh_timeout(&self) -> Duration {
        self.max_fresh_timeout
    }

    pub fn is_fresh(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        let Some(logged_in_at) = record.logged_in_at else {
            return false;
        };

        let age = now - logged_in_at;
        if age > self.max_fresh_timeout {
            return false;
        }

        if age < self.fresh_timeout {
            return true;
        }

        record
            .last_request_at
            .is_some_and(|last| now - last < self.fresh_timeout)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_config(&SessionAuthConfig::default())
    }
}
