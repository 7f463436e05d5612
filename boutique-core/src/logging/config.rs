//! Logger settings

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::logging::{LogFormat, LogOutput};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level written
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Added to every entry, e.g. `service = "storefront-api"`
    pub context_fields: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Human,
            output: LogOutput::Stderr,
            context_fields: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        log::Level::from(self).to_level_filter()
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => anyhow::bail!("unknown log level {:?}", other),
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

impl LoggingConfig {
    /// JSON lines on stdout at info
    pub fn production() -> Self {
        Self { format: LogFormat::Json, output: LogOutput::Stdout, ..Self::default() }
    }

    /// Human-readable stderr at debug
    pub fn development() -> Self {
        Self { level: LogLevel::Debug, ..Self::default() }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_context_field(mut self, key: &str, value: &str) -> Self {
        self.context_fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, var: &impl Fn(&str) -> Option<String>) {
        if let Some(level) = var("BOUTIQUE_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.level = level,
                Err(e) => log::warn!("Ignoring BOUTIQUE_LOG_LEVEL: {}", e),
            }
        }
        if let Some(format) = var("BOUTIQUE_LOG_FORMAT") {
            match format.parse() {
                Ok(format) => self.format = format,
                Err(e) => log::warn!("Ignoring BOUTIQUE_LOG_FORMAT: {}", e),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = LoggingConfig::production();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Stdout);

        let config = LoggingConfig::development();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Human);
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoggingConfig::production()
            .with_level(LogLevel::Warn)
            .with_format(LogFormat::Logfmt)
            .with_context_field("service", "storefront");
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Logfmt);
        assert_eq!(config.context_fields.get("service"), Some(&"storefront".to_string()));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_apply_env_keeps_current_values_on_bad_input() {
        let mut config = LoggingConfig::production();
        config.apply_env(&|key: &str| match key {
            "BOUTIQUE_LOG_LEVEL" => Some("loud".to_string()),
            "BOUTIQUE_LOG_FORMAT" => Some("logfmt".to_string()),
            _ => None,
        });
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Logfmt);
    }

    #[test]
    fn test_toml_section() {
        let config: LoggingConfig = toml::from_str(
            r#"
level = "trace"
format = "json"
output = "stdout"

[context_fields]
service = "admin-api"
"#,
        )
        .unwrap();
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.output, LogOutput::Stdout);
        assert_eq!(config.context_fields["service"], "admin-api");
    }
}
