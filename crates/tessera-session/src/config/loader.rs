//! Layered loading of [`SessionAuthConfig`].
//!
//! Sources, later ones overriding earlier ones:
//!
//! 1. the embedded `defaults.toml`
//! 2. a TOML/YAML/JSON file, when one is configured
//! 3. `TESSERA_*` environment variables, `__` separating nested keys
//!    (`TESSERA_RBAC__ROLES__USER__CAN=account`)
//!
//! The merged result is validated before it is handed out.

use super::{types::SessionAuthConfig, validation::validate_config};
use anyhow::{bail, Context, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment variable naming the optional config file for [`load_config`].
pub const CONFIG_FILE_VAR: &str = "TESSERA_CONFIG";

const DEFAULT_ENV_PREFIX: &str = "TESSERA";

/// Builder for the session auth configuration sources.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    file_required: bool,
    env_prefix: String,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            file_required: false,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Layer a config file over the defaults. A missing file is skipped
    /// unless [`require_file`](Self::require_file) is set.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Fail instead of skipping when the config file does not exist.
    pub fn require_file(mut self, required: bool) -> Self {
        self.file_required = required;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    fn sources(&self) -> Result<ConfigBuilder<config::builder::DefaultState>> {
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("defaults.toml"),
            FileFormat::Toml,
        ));

        if let Some(path) = &self.file {
            match (path.exists(), self.file_required) {
                (true, _) => {
                    info!(path = %path.display(), "Loading session auth config file");
                    builder = builder.add_source(File::from(path.as_path()));
                }
                (false, true) => bail!("Config file {} does not exist", path.display()),
                (false, false) => {
                    debug!(path = %path.display(), "Config file not found; using defaults")
                }
            }
        }

        Ok(builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ))
    }

    /// Merge every source and validate the result.
    pub fn load(&self) -> Result<SessionAuthConfig> {
        let config: SessionAuthConfig = self
            .sources()?
            .build()
            .context("Failed to merge session auth config sources")?
            .try_deserialize()
            .context("Malformed session auth config")?;

        if let Err(errors) = validate_config(&config) {
            let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid session auth config: {}", reasons.join("; "));
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Load with the default prefix, layering the file named by
/// [`CONFIG_FILE_VAR`] when it is set.
pub fn load_config() -> Result<SessionAuthConfig> {
    let loader = match std::env::var_os(CONFIG_FILE_VAR) {
        Some(path) => ConfigLoader::new().with_config_path(path),
        None => ConfigLoader::new(),
    };
    loader.load()
}
