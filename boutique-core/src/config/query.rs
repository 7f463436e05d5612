//! Query layer settings

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::entity::Entity;

/// What happens to filter values that cannot be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Drop them, log, and keep going
    #[default]
    Lenient,
    /// Fail the request with the first offending value
    Strict,
}

impl FromStr for ValidationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(ValidationMode::Lenient),
            "strict" => Ok(ValidationMode::Strict),
            other => bail!("unknown validation mode {:?} (expected lenient or strict)", other),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationMode::Lenient => f.write_str("lenient"),
            ValidationMode::Strict => f.write_str("strict"),
        }
    }
}

/// Page-size override for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLimits {
    pub default_limit: Option<u32>,
    pub max_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub validation: ValidationMode,
    /// Longest search or text-filter term used; longer input is cut
    pub max_search_length: usize,
    /// Keyed by entity name, e.g. `[query.entities.product]`
    pub entities: BTreeMap<String, EntityLimits>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { validation: ValidationMode::Lenient, max_search_length: 100, entities: BTreeMap::new() }
    }
}

impl QuerySettings {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(mode) = var("BOUTIQUE_VALIDATION") {
            match mode.parse() {
                Ok(mode) => self.validation = mode,
                Err(e) => log::warn!("Ignoring BOUTIQUE_VALIDATION: {}", e),
            }
        }
        if let Some(len) = var("BOUTIQUE_MAX_SEARCH_LENGTH") {
            match len.trim().parse() {
                Ok(len) => self.max_search_length = len,
                Err(_) => log::warn!("Ignoring BOUTIQUE_MAX_SEARCH_LENGTH={:?}", len),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_search_length == 0 {
            bail!("query.max_search_length must be greater than 0");
        }
        for (name, limits) in &self.entities {
            if name.parse::<Entity>().is_err() {
                bail!("query.entities.{}: unknown entity", name);
            }
            if limits.default_limit == Some(0) || limits.max_limit == Some(0) {
                bail!("query.entities.{}: limits must be greater than 0", name);
            }
            if let (Some(default), Some(max)) = (limits.default_limit, limits.max_limit) {
                if default > max {
                    bail!("query.entities.{}: default_limit {} exceeds max_limit {}", name, default, max);
                }
            }
        }
        Ok(())
    }
}
