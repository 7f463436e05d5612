//! Log output destinations and the entry written to them

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logging::{LogLevel, LoggingConfig};

/// Where log lines go
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    Stderr,
}

/// A structured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Usually the module path
    pub target: String,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

#[derive(Debug, Clone)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
            target: target.into(),
            fields: BTreeMap::new(),
            location: None,
        }
    }

    pub fn from_log_record(record: &log::Record, config: &LoggingConfig) -> Self {
        let mut entry = Self::new(record.level().into(), record.args().to_string(), record.target());

        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry.location = Some(LogLocation { file: file.to_string(), line });
        }
        for (key, value) in &config.context_fields {
            entry.fields.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
        entry
    }

    pub fn with_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_log_record() {
        let config = LoggingConfig::default().with_context_field("service", "storefront");
        let entry = LogEntry::from_log_record(
            &log::Record::builder()
                .args(format_args!("dropped minPrice"))
                .level(log::Level::Warn)
                .target("boutique_core::builder")
                .file(Some("src/builder.rs"))
                .line(Some(42))
                .build(),
            &config,
        );
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "dropped minPrice");
        assert_eq!(entry.target, "boutique_core::builder");
        assert_eq!(entry.location.as_ref().map(|l| l.line), Some(42));
        assert_eq!(entry.fields["service"], "storefront");
    }
}
