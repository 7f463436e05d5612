//! Configuration for the query layer
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on the loaded struct)
//! 2. **Environment variables** (`BOUTIQUE_*`)
//! 3. **Config file** (`boutique.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use boutique_core::config::BoutiqueConfig;
//!
//! let config = BoutiqueConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! A complete file:
//!
//! ```toml
//! [query]
//! validation = "strict"
//! max_search_length = 80
//!
//! [query.entities.product]
//! default_limit = 24
//! max_limit = 48
//!
//! [admin]
//! path_prefixes = ["/admin"]
//! roles = ["admin", "staff"]
//!
//! [logging]
//! level = "debug"
//! format = "logfmt"
//! ```

pub mod admin;
pub mod query;

pub use crate::logging::LoggingConfig;
pub use admin::AdminConfig;
pub use query::{EntityLimits, QuerySettings, ValidationMode};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "boutique.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoutiqueConfig {
    pub query: QuerySettings,
    pub admin: AdminConfig,
    pub logging: LoggingConfig,
}

impl BoutiqueConfig {
    /// Load `boutique.toml` from the working directory, then the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file; a missing file means defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    /// Load configuration from a TOML file only
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.query.merge(other.query);
        self.admin.merge(other.admin);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_env(&|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) {
        self.query.apply_env(var);
        self.admin.apply_env(var);
        self.logging.apply_env(var);
    }

    pub fn validate(&self) -> Result<()> {
        self.query.validate()?;
        self.admin.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
