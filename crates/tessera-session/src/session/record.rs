//! The session record this crate augments.

use super::{id::SessionId, role::GUEST_ROLE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied attributes merged in at login.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Authentication state stored on a session.
///
/// `logged_in_at` being `None` means guest; a guest never carries `ip`,
/// `user_agent` or a role. Login attributes live in their own map so they
/// cannot shadow the reserved fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logged_in_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_request_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub attributes: Attributes,
}

impl SessionRecord {
    /// A fresh guest record.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            logged_in_at: None,
            last_request_at: None,
            role: None,
            ip: None,
            user_agent: None,
            attributes: Attributes::new(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.logged_in_at.is_none()
    }

    /// The stored role, or `"guest"` when unset or not logged in.
    pub fn effective_role(&self) -> &str {
        match (&self.logged_in_at, &self.role) {
            (Some(_), Some(role)) => role.as_str(),
            _ => GUEST_ROLE,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_guest() {
        let record = SessionRecord::new(SessionId::new());
        assert!(record.is_guest());
        assert_eq!(record.effective_role(), "guest");
        assert!(record.ip.is_none());
        assert!(record.user_agent.is_none());
    }

    #[test]
    fn test_role_ignored_without_login() {
        let mut record = SessionRecord::new(SessionId::new());
        record.role = Some("admin".into());
        assert_eq!(record.effective_role(), "guest");

        record.logged_in_at = Some(Utc::now());
        assert_eq!(record.effective_role(), "admin");
    }

    #[test]
    fn test_guest_serializes_compactly() {
        let record = SessionRecord::new(SessionId::new());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json.as_object().unwrap().len(), 1);
        let back: SessionRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
