//! Role names and role matching.

/// Role reported for sessions that are not logged in.
pub const GUEST_ROLE: &str = "guest";

/// Role assigned by a login that does not name one.
pub const AUTHENTICATED_ROLE: &str = "authenticated";

/// A single role or a set of acceptable roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleMatch {
    One(String),
    Any(Vec<String>),
}

impl RoleMatch {
    /// Whether `role` is the role, or a member of the set.
    pub fn matches(&self, role: &str) -> bool {
        match self {
            Self::One(expected) => expected == role,
            Self::Any(set) => set.iter().any(|r| r == role),
        }
    }
}

impl From<&str> for RoleMatch {
    fn from(role: &str) -> Self {
        Self::One(role.to_string())
    }
}

impl From<String> for RoleMatch {
    fn from(role: String) -> Self {
        Self::One(role)
    }
}

impl From<Vec<String>> for RoleMatch {
    fn from(roles: Vec<String>) -> Self {
        Self::Any(roles)
    }
}

impl From<Vec<&str>> for RoleMatch {
    fn from(roles: Vec<&str>) -> Self {
        Self::Any(roles.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for RoleMatch {
    fn from(roles: &[&str]) -> Self {
        Self::Any(roles.iter().map(|r| r.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RoleMatch {
    fn from(roles: [&str; N]) -> Self {
        Self::Any(roles.iter().map(|r| r.to_string()).collect())
    }
}
