//! Log line formatting

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::logging::destinations::LogEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `{"timestamp":"2024-01-15T10:30:00Z","level":"WARN","message":"...","target":"..."}`
    Json,
    /// `2024-01-15 10:30:00.000 WARN  [boutique_core::builder] ...`
    Human,
    /// `timestamp=2024-01-15T10:30:00Z level=WARN target=... message="..."`
    Logfmt,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" | "text" => Ok(LogFormat::Human),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => anyhow::bail!("unknown log format {:?}", other),
        }
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

fn level_name(entry: &LogEntry) -> String {
    format!("{:?}", entry.level).to_uppercase()
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_json(entry: &LogEntry) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".to_string(), Value::String(entry.timestamp.to_rfc3339()));
    json.insert("level".to_string(), Value::String(level_name(entry)));
    json.insert("message".to_string(), Value::String(entry.message.clone()));
    json.insert("target".to_string(), Value::String(entry.target.clone()));

    if let Some(location) = &entry.location {
        json.insert("file".to_string(), Value::String(location.file.clone()));
        json.insert("line".to_string(), Value::from(location.line));
    }
    for (key, value) in &entry.fields {
        json.insert(key.clone(), value.clone());
    }

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

fn format_human(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:5} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level_name(entry),
        entry.target,
        entry.message
    );
    for (key, value) in &entry.fields {
        line.push_str(&format!(" {}={}", key, plain(value)));
    }
    line
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn format_logfmt(entry: &LogEntry) -> String {
    let mut parts = vec![
        format!("timestamp={}", entry.timestamp.to_rfc3339()),
        format!("level={}", level_name(entry)),
        format!("target={}", entry.target),
        format!("message={}", quote(&entry.message)),
    ];
    if let Some(location) = &entry.location {
        parts.push(format!("file={}", quote(&location.file)));
        parts.push(format!("line={}", location.line));
    }
    for (key, value) in &entry.fields {
        let rendered = match value {
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            other => quote(&plain(other)),
        };
        parts.push(format!("{}={}", key, rendered));
    }
    parts.join(" ")
}
