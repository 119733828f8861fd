//! Authentication lifecycle, roles and freshness for one request's session.

use super::{
    client::ClientInfo,
    clock::{Clock, SystemClock},
    continuity::{check_continuity, Continuity},
    freshness::FreshnessPolicy,
    handle::SessionHandle,
    id::SessionId,
    record::{Attributes, SessionRecord},
    role::{RoleMatch, AUTHENTICATED_ROLE},
};
use crate::{
    config::{validate_config, SessionAuthConfig},
    error::{ConfigError, RbacError, StoreError},
    rbac::{Params, Rbac},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Settings shared by every request passing through the session middleware.
#[derive(Debug)]
pub struct AuthContext {
    config: SessionAuthConfig,
    freshness: FreshnessPolicy,
    rbac: Option<Arc<Rbac>>,
    clock: Arc<dyn Clock>,
}

impl AuthContext {
    /// Validate options and build the role evaluator from `config.rbac`.
    pub fn new(config: SessionAuthConfig) -> Result<Self, ConfigError> {
        if let Err(errors) = validate_config(&config) {
            if let Some(error) = errors.into_iter().next() {
                return Err(error);
            }
        }

        let rbac = match &config.rbac {
            Some(rbac) => Some(Arc::new(Rbac::from_config(rbac)?)),
            None => None,
        };

        Ok(Self {
            freshness: FreshnessPolicy::from_config(&config),
            config,
            rbac,
            clock: Arc::new(SystemClock),
        })
    }

    /// Use a prepared evaluator, e.g. one carrying conditional grants.
    pub fn with_rbac(mut self, rbac: Rbac) -> Self {
        self.rbac = Some(Arc::new(rbac));
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SessionAuthConfig {
        &self.config
    }

    pub fn freshness(&self) -> &FreshnessPolicy {
        &self.freshness
    }

    pub fn rbac(&self) -> Option<&Rbac> {
        self.rbac.as_deref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

/// Arguments to [`AuthSession::login`].
#[derive(Debug, Clone, PartialEq)]
pub struct Login {
    role: String,
    attributes: Attributes,
}

impl Login {
    /// Log in with a specific role.
    pub fn as_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

impl Default for Login {
    fn default() -> Self {
        Self::as_role(AUTHENTICATED_ROLE)
    }
}

/// Authentication view of the session attached to a request.
///
/// Created by the session middleware and stored in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthSession {
    handle: SessionHandle,
    context: Arc<AuthContext>,
    client: ClientInfo,
}

impl AuthSession {
    pub fn new(handle: SessionHandle, context: Arc<AuthContext>, client: ClientInfo) -> Self {
        Self {
            handle,
            context,
            client,
        }
    }

    pub fn id(&self) -> SessionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn client(&self) -> &ClientInfo {
        &self.client
    }

    /// Log the session in.
    ///
    /// Regenerates the identity, stamps login and last-request times, stores
    /// the role and (when enabled) the client bindings, merges attributes and
    /// persists the record. The session only becomes authenticated once the
    /// store accepted the record; on failure it stays a guest.
    pub async fn login(&self, login: Login) -> Result<(), StoreError> {
        let previous = self.handle.id();
        let id = self.handle.regenerate().await?;

        let now = self.context.clock.now();
        let config = &self.context.config;
        let Login { role, attributes } = login;

        let mut record = SessionRecord::new(id);
        record.logged_in_at = Some(now);
        record.last_request_at = Some(now);
        record.role = Some(role.clone());
        if config.ip_check {
            record.ip = self.client.ip.clone();
        }
        if config.ua_check {
            record.user_agent = self.client.user_agent.clone();
        }
        record.attributes.extend(attributes);

        self.handle.commit(record).await?;

        info!(previous = %previous, session_id = %id, role = %role, "Session logged in");
        Ok(())
    }

    /// Log the session out, leaving a fresh guest record under a new identity.
    pub async fn logout(&self) -> Result<(), StoreError> {
        let previous = self.handle.id();
        let id = self.handle.regenerate().await?;
        self.handle.save().await?;

        info!(previous = %previous, session_id = %id, "Session logged out");
        Ok(())
    }

    /// Stamp the last request time. Never moves it backwards.
    pub fn set_last_request(&self) {
        let now = self.context.clock.now();
        self.handle.update(|record| {
            record.last_request_at = Some(match record.last_request_at {
                Some(last) if last > now => last,
                _ => now,
            });
        });
    }

    /// Stamp the last request time and persist.
    pub async fn touch(&self) -> Result<(), StoreError> {
        self.set_last_request();
        self.handle.save().await
    }

    pub fn is_guest(&self) -> bool {
        self.handle.read(|record| record.is_guest())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.is_guest()
    }

    /// Logged in and holding one of `roles`.
    pub fn is_logged_in_as(&self, roles: impl Into<RoleMatch>) -> bool {
        self.is_logged_in() && self.has_role(roles, false)
    }

    pub fn is_fresh(&self) -> bool {
        let now = self.context.clock.now();
        self.handle
            .read(|record| self.context.freshness.is_fresh(record, now))
    }

    /// Set the role stored on the session.
    ///
    /// The role only takes effect while the session is logged in.
    pub fn set_role(&self, role: impl Into<String>) -> &Self {
        let role = role.into();
        self.handle.update(|record| record.role = Some(role));
        self
    }

    /// Current role, `"guest"` when not logged in.
    pub fn role(&self) -> String {
        self.handle
            .read(|record| record.effective_role().to_string())
    }

    /// Whether the current role matches; `negate` inverts the answer.
    pub fn has_role(&self, roles: impl Into<RoleMatch>, negate: bool) -> bool {
        let matched = roles.into().matches(&self.role());
        matched != negate
    }

    pub fn has_not_role(&self, roles: impl Into<RoleMatch>) -> bool {
        self.has_role(roles, true)
    }

    /// Whether the current role may perform `operation`.
    pub async fn can(&self, operation: &str, params: &Params) -> Result<bool, RbacError> {
        let rbac = self.context.rbac.as_ref().ok_or(RbacError::NotConfigured)?;
        let role = self.role();
        let allowed = rbac.can(&role, operation, params).await?;
        debug!(session_id = %self.id(), role = %role, operation, allowed, "Permission check");
        Ok(allowed)
    }

    /// Run the continuity check, logging out on a violation.
    ///
    /// The forced logout completes before this returns.
    pub async fn enforce_continuity(&self) -> Result<Continuity, StoreError> {
        let config = &self.context.config;
        let verdict = self.handle.read(|record| {
            check_continuity(record, &self.client, config.ip_check, config.ua_check)
        });

        if let Continuity::Violated(binding) = verdict {
            warn!(
                session_id = %self.id(),
                binding = %binding,
                "The request {} did not match the session; logging out",
                binding
            );
            self.logout().await?;
        }

        Ok(verdict)
    }
}
