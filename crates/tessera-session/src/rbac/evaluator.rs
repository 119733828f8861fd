//! Permission evaluation over flattened role definitions.

use super::{
    condition::{Condition, Params},
    types::{validate_definitions, RbacConfig, RoleDefinition},
};
use crate::error::{ConfigError, RbacError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Immutable role evaluator. Inheritance is resolved once at construction.
#[derive(Debug)]
pub struct Rbac {
    roles: HashMap<String, ResolvedRole>,
}

#[derive(Debug, Default)]
struct ResolvedRole {
    exact: HashMap<String, Vec<ResolvedGrant>>,
    patterns: Vec<(glob::Pattern, ResolvedGrant)>,
}

#[derive(Clone)]
struct ResolvedGrant {
    /// Role that declared the grant.
    origin: String,
    condition: Option<Arc<dyn Condition>>,
}

impl std::fmt::Debug for ResolvedGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedGrant")
            .field("origin", &self.origin)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}

impl ResolvedRole {
    /// Grants for `operation`: literal grants, then pattern grants, each in
    /// resolution order (own before inherited).
    fn matching<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a ResolvedGrant> + 'a {
        self.exact
            .get(operation)
            .into_iter()
            .flatten()
            .chain(
                self.patterns
                    .iter()
                    .filter(move |(pattern, _)| pattern.matches(operation))
                    .map(|(_, grant)| grant),
            )
    }
}

impl Rbac {
    /// Build an evaluator from role definitions.
    pub fn new(definitions: Vec<RoleDefinition>) -> Result<Self, ConfigError> {
        if let Some(error) = validate_definitions(&definitions).into_iter().next() {
            return Err(error);
        }

        let by_name: HashMap<&str, &RoleDefinition> =
            definitions.iter().map(|d| (d.name.as_str(), d)).collect();

        let mut roles = HashMap::with_capacity(definitions.len());
        for definition in &definitions {
            let mut resolved = ResolvedRole::default();
            let mut seen = HashSet::new();
            flatten(definition, &by_name, &mut seen, &mut resolved)?;
            debug!(
                role = %definition.name,
                operations = resolved.exact.len(),
                patterns = resolved.patterns.len(),
                "Resolved role permissions"
            );
            roles.insert(definition.name.clone(), resolved);
        }

        Ok(Self { roles })
    }

    /// Build an evaluator from serializable configuration.
    pub fn from_config(config: &RbacConfig) -> Result<Self, ConfigError> {
        Self::new(config.definitions())
    }

    pub fn builder() -> RbacBuilder {
        RbacBuilder::default()
    }

    /// Whether a role with this name is defined.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    /// Decide whether `role` may perform `operation` given `params`.
    ///
    /// Unknown roles and operations resolve to `false`. An unconditional grant
    /// wins outright; otherwise conditions are evaluated in order until one
    /// holds. A failing condition aborts the check with an error.
    pub async fn can(&self, role: &str, operation: &str, params: &Params) -> Result<bool, RbacError> {
        let Some(resolved) = self.roles.get(role) else {
            debug!(role, operation, "Unknown role, denying");
            return Ok(false);
        };

        let grants: Vec<&ResolvedGrant> = resolved.matching(operation).collect();
        if grants.is_empty() {
            trace!(role, operation, "No grant for operation");
            return Ok(false);
        }

        if grants.iter().any(|g| g.condition.is_none()) {
            return Ok(true);
        }

        for grant in grants {
            let Some(condition) = &grant.condition else {
                continue;
            };
            let allowed = condition
                .evaluate(params)
                .await
                .map_err(|source| RbacError::Condition {
                    role: grant.origin.clone(),
                    operation: operation.to_string(),
                    source,
                })?;
            if allowed {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn flatten<'a>(
    definition: &'a RoleDefinition,
    by_name: &HashMap<&str, &'a RoleDefinition>,
    seen: &mut HashSet<&'a str>,
    resolved: &mut ResolvedRole,
) -> Result<(), ConfigError> {
    if !seen.insert(definition.name.as_str()) {
        return Ok(());
    }

    for grant in &definition.grants {
        let entry = ResolvedGrant {
            origin: definition.name.clone(),
            condition: grant.condition.clone(),
        };
        if grant.is_pattern() {
            let pattern = glob::Pattern::new(&grant.operation).map_err(|err| {
                ConfigError::InvalidPattern {
                    pattern: grant.operation.clone(),
                    reason: err.msg.to_string(),
                }
            })?;
            resolved.patterns.push((pattern, entry));
        } else {
            resolved
                .exact
                .entry(grant.operation.clone())
                .or_default()
                .push(entry);
        }
    }

    for parent in &definition.inherits {
        let parent = by_name
            .get(parent.as_str())
            .copied()
            .ok_or_else(|| ConfigError::UndefinedParent {
                role: definition.name.clone(),
                parent: parent.clone(),
            })?;
        flatten(parent, by_name, seen, resolved)?;
    }

    Ok(())
}

/// Collects role definitions, merging repeated roles.
#[derive(Default)]
pub struct RbacBuilder {
    definitions: Vec<RoleDefinition>,
}

impl RbacBuilder {
    /// Add every role from serializable configuration.
    pub fn config(mut self, config: &RbacConfig) -> Self {
        for definition in config.definitions() {
            self = self.role(definition);
        }
        self
    }

    /// Add a role, or extend it if already present.
    pub fn role(mut self, definition: RoleDefinition) -> Self {
        match self.definitions.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => {
                existing.grants.extend(definition.grants);
                for parent in definition.inherits {
                    if !existing.inherits.contains(&parent) {
                        existing.inherits.push(parent);
                    }
                }
            }
            None => self.definitions.push(definition),
        }
        self
    }

    pub fn build(self) -> Result<Rbac, ConfigError> {
        Rbac::new(self.definitions)
    }
}
