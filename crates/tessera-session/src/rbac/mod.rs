//! Role-based access control with inherited roles and conditional grants.

pub mod condition;
pub mod evaluator;
pub mod types;

pub use condition::{condition, Condition, FnCondition, Params};
pub use evaluator::{Rbac, RbacBuilder};
pub use types::{Grant, RbacConfig, RoleConfig, RoleDefinition};
