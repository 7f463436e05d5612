//! Admin listing configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Requests under these paths are administrative
    pub path_prefixes: Vec<String>,
    /// Callers holding any of these roles are administrative
    pub roles: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            path_prefixes: vec!["/admin".to_string(), "/api/admin".to_string()],
            roles: vec!["admin".to_string()],
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

impl AdminConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(paths) = var("BOUTIQUE_ADMIN_PATHS") {
            self.path_prefixes = split_list(&paths);
        }
        if let Some(roles) = var("BOUTIQUE_ADMIN_ROLES") {
            self.roles = split_list(&roles);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for prefix in &self.path_prefixes {
            if !prefix.starts_with('/') {
                bail!("admin.path_prefixes: {:?} must start with '/'", prefix);
            }
        }
        Ok(())
    }
}
