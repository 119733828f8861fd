//! Role configuration types.

use super::condition::Condition;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Serializable role configuration: role name to operations and parents.
///
/// Conditional grants cannot be expressed here; attach them in code with
/// [`RoleDefinition::grant_when`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RbacConfig {
    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,
}

/// Operations and inherited roles for one role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Granted operations; glob patterns such as `post:*` are allowed.
    #[serde(default)]
    pub can: Vec<String>,
    /// Roles whose grants are inherited.
    #[serde(default)]
    pub inherits: Vec<String>,
}

impl RoleConfig {
    pub fn can(mut self, operation: impl Into<String>) -> Self {
        self.can.push(operation.into());
        self
    }

    pub fn inherits(mut self, role: impl Into<String>) -> Self {
        self.inherits.push(role.into());
        self
    }
}

impl RbacConfig {
    pub fn with_role(mut self, name: impl Into<String>, role: RoleConfig) -> Self {
        self.roles.insert(name.into(), role);
        self
    }

    /// Convert into role definitions without conditions.
    pub fn definitions(&self) -> Vec<RoleDefinition> {
        self.roles
            .iter()
            .map(|(name, role)| RoleDefinition {
                name: name.clone(),
                grants: role.can.iter().map(Grant::new).collect(),
                inherits: role.inherits.clone(),
            })
            .collect()
    }

    /// Structural problems: empty names, unknown parents, cycles, bad patterns.
    pub fn validate(&self) -> Vec<ConfigError> {
        validate_definitions(&self.definitions())
    }
}

/// A role with its grants and inherited roles.
#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub name: String,
    pub grants: Vec<Grant>,
    pub inherits: Vec<String>,
}

impl RoleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grants: Vec::new(),
            inherits: Vec::new(),
        }
    }

    /// Grant an operation unconditionally.
    pub fn grant(mut self, operation: impl Into<String>) -> Self {
        self.grants.push(Grant::new(operation));
        self
    }

    /// Grant an operation when the condition holds.
    pub fn grant_when(mut self, operation: impl Into<String>, condition: Arc<dyn Condition>) -> Self {
        self.grants.push(Grant::when(operation, condition));
        self
    }

    pub fn inherit(mut self, role: impl Into<String>) -> Self {
        self.inherits.push(role.into());
        self
    }
}

/// Permission to perform an operation, optionally guarded by a condition.
#[derive(Clone)]
pub struct Grant {
    pub operation: String,
    pub condition: Option<Arc<dyn Condition>>,
}

impl Grant {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            condition: None,
        }
    }

    pub fn when(operation: impl Into<String>, condition: Arc<dyn Condition>) -> Self {
        Self {
            operation: operation.into(),
            condition: Some(condition),
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }

    /// Whether the operation is a glob pattern rather than a literal name.
    pub fn is_pattern(&self) -> bool {
        self.operation.contains(['*', '?', '['])
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("operation", &self.operation)
            .field("conditional", &self.is_conditional())
            .finish()
    }
}

pub(crate) fn validate_definitions(definitions: &[RoleDefinition]) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    let names: HashSet<&str> = definitions.iter().map(|d| d.name.as_str()).collect();

    for definition in definitions {
        if definition.name.is_empty() {
            errors.push(ConfigError::EmptyRoleName);
        }

        for parent in &definition.inherits {
            if !names.contains(parent.as_str()) {
                errors.push(ConfigError::UndefinedParent {
                    role: definition.name.clone(),
                    parent: parent.clone(),
                });
            }
        }

        for grant in definition.grants.iter().filter(|g| g.is_pattern()) {
            if let Err(err) = glob::Pattern::new(&grant.operation) {
                errors.push(ConfigError::InvalidPattern {
                    pattern: grant.operation.clone(),
                    reason: err.msg.to_string(),
                });
            }
        }
    }

    if let Some(role) = find_cycle(definitions) {
        errors.push(ConfigError::InheritanceCycle(role));
    }

    errors
}

fn find_cycle(definitions: &[RoleDefinition]) -> Option<String> {
    fn visit<'a>(
        name: &'a str,
        definitions: &'a [RoleDefinition],
        on_stack: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<String> {
        if on_stack.contains(&name) {
            return Some(name.to_string());
        }
        if !done.insert(name) {
            return None;
        }

        on_stack.push(name);
        let parents = definitions
            .iter()
            .filter(|d| d.name == name)
            .flat_map(|d| d.inherits.iter());
        for parent in parents {
            if let Some(role) = visit(parent, definitions, on_stack, done) {
                return Some(role);
            }
        }
        on_stack.pop();

        None
    }

    let mut done = HashSet::new();
    definitions
        .iter()
        .find_map(|d| visit(&d.name, definitions, &mut Vec::new(), &mut done))
}
