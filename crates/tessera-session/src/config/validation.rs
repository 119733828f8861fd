//! Configuration validation.

use super::types::SessionAuthConfig;
use crate::error::ConfigError;

/// Validate session authentication options.
pub fn validate_config(config: &SessionAuthConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.fresh_timeout_ms == 0 {
        errors.push(ConfigError::ZeroFreshTimeout);
    }

    if config.max_fresh_timeout_ms < config.fresh_timeout_ms {
        errors.push(ConfigError::MaxFreshBelowFresh {
            fresh: config.fresh_timeout_ms,
            max: config.max_fresh_timeout_ms,
        });
    }

    if let Some(rbac) = &config.rbac {
        errors.extend(rbac.validate());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
