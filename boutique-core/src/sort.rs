//! Sort specifications and query-string sort parsing
//!
//! Three spellings are accepted on the wire:
//!
//! - `sort=-createdAt,price` (prefix `-` for descending, optional `+` for ascending)
//! - `sort=price:asc,name:desc`
//! - `sortBy=price&sortOrder=asc` (order defaults to descending)
//!
//! `sort` wins when both forms are present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::params::RawParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Ok(SortDirection::Asc),
            "desc" | "descending" | "-1" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.field),
            SortDirection::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// Ordered list of sort keys; earlier keys take precedence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec(Vec<SortKey>);

impl SortSpec {
    pub fn new(keys: Vec<SortKey>) -> Self {
        let mut spec = Self::default();
        for key in keys {
            spec.push(key);
        }
        spec
    }

    /// Parse the compact `-createdAt,price` form without any whitelist.
    /// Used for configuration defaults.
    pub fn parse(s: &str) -> Self {
        Self::new(s.split(',').filter_map(|token| parse_token(token)?.ok()).collect())
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|k| k.field == field)
    }

    /// Append a key unless the field is already present
    pub fn push(&mut self, key: SortKey) {
        if !self.contains(&key.field) {
            self.0.push(key);
        }
    }

    pub fn then(mut self, key: SortKey) -> Self {
        self.push(key);
        self
    }

    /// `{"createdAt": -1, "price": 1}` with key order preserved
    pub fn to_mongo(&self) -> Value {
        let mut map = Map::new();
        for key in &self.0 {
            map.insert(key.field.clone(), Value::from(key.direction.as_i32()));
        }
        Value::Object(map)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl Serialize for SortSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_mongo().serialize(serializer)
    }
}

/// Field names that may reach the store: letters, digits, `_` and `.` separators,
/// never an operator (`$`) or an empty segment
pub fn is_safe_field_name(field: &str) -> bool {
    !field.is_empty()
        && field.len() <= 64
        && field.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// `None` for an empty token, `Err` with the raw token when its direction is unreadable
fn parse_token(token: &str) -> Option<Result<SortKey, String>> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }

    if let Some((field, direction)) = token.split_once(':') {
        return Some(match direction.parse() {
            Ok(direction) => Ok(SortKey { field: field.trim().to_string(), direction }),
            Err(_) => Err(token.to_string()),
        });
    }

    if let Some(field) = token.strip_prefix('-') {
        return Some(Ok(SortKey::desc(field.trim())));
    }
    // `+` arrives as a space when the query string was form-decoded
    let field = token.strip_prefix('+').unwrap_or(token);
    Some(Ok(SortKey::asc(field.trim())))
}

/// Malformed tokens keep their raw text as the field name, which no whitelist
/// accepts, so they surface as rejections
fn requested_key(token: &str) -> Option<SortKey> {
    parse_token(token).map(|parsed| parsed.unwrap_or_else(SortKey::asc))
}

/// Caller-requested sort keys in request order, before any whitelist check
pub fn requested_sort(params: &RawParams) -> Vec<SortKey> {
    if let Some(sort) = params.get_trimmed("sort") {
        return sort.split(',').filter_map(requested_key).collect();
    }

    let Some(sort_by) = params.get_trimmed("sortBy") else {
        return Vec::new();
    };

    let direction = match params.get_trimmed("sortOrder") {
        Some(order) => order.parse().unwrap_or_else(|_| {
            log::debug!("Ignoring sortOrder={:?}, using descending", order);
            SortDirection::Desc
        }),
        None => SortDirection::Desc,
    };

    sort_by
        .split(',')
        .filter_map(|token| {
            // An explicit sign or suffix inside sortBy wins over sortOrder
            let t = token.trim();
            let explicit = t.starts_with('-') || t.starts_with('+') || t.contains(':');
            match parse_token(token)? {
                Ok(key) if explicit => Some(key),
                Ok(key) => Some(SortKey { field: key.field, direction }),
                Err(raw) => Some(SortKey::asc(raw)),
            }
        })
        .collect()
}

/// Outcome of checking requested keys against a whitelist
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSort {
    pub spec: SortSpec,
    pub rejected: Vec<String>,
}

/// Keep only whitelisted, safe, first-occurrence fields in request order
pub fn resolve_sort(requested: Vec<SortKey>, sortable: &[String]) -> ResolvedSort {
    let mut resolved = ResolvedSort::default();
    for key in requested {
        if is_safe_field_name(&key.field) && sortable.iter().any(|s| *s == key.field) {
            resolved.spec.push(key);
        } else {
            resolved.rejected.push(key.field);
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sortable() -> Vec<String> {
        ["name", "price", "createdAt", "updatedAt"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_compact_form() {
        let spec = SortSpec::parse("-createdAt, price,+name");
        assert_eq!(
            spec.keys(),
            &[SortKey::desc("createdAt"), SortKey::asc("price"), SortKey::asc("name")]
        );
        assert_eq!(spec.to_string(), "-createdAt,price,name");
    }

    #[test]
    fn test_parse_colon_form() {
        let params = RawParams::parse("sort=price:asc,name:DESC");
        assert_eq!(requested_sort(&params), vec![SortKey::asc("price"), SortKey::desc("name")]);
    }

    #[test]
    fn test_sort_wins_over_sort_by() {
        let params = RawParams::parse("sort=-price&sortBy=name&sortOrder=asc");
        assert_eq!(requested_sort(&params), vec![SortKey::desc("price")]);
    }

    #[test]
    fn test_sort_by_with_order() {
        let params = RawParams::parse("sortBy=price&sortOrder=asc");
        assert_eq!(requested_sort(&params), vec![SortKey::asc("price")]);

        let params = RawParams::parse("sortBy=price");
        assert_eq!(requested_sort(&params), vec![SortKey::desc("price")]);

        let params = RawParams::parse("sortBy=price&sortOrder=sideways");
        assert_eq!(requested_sort(&params), vec![SortKey::desc("price")]);
    }

    #[test]
    fn test_resolve_drops_unknown_and_duplicates() {
        let requested = vec![
            SortKey::desc("password"),
            SortKey::asc("price"),
            SortKey::desc("price"),
            SortKey::asc("$where"),
        ];
        let resolved = resolve_sort(requested, &sortable());
        assert_eq!(resolved.spec.keys(), &[SortKey::asc("price")]);
        assert_eq!(resolved.rejected, vec!["password".to_string(), "$where".to_string()]);
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let params = RawParams::parse("sort=price:,name,created:sideways");
        let resolved = resolve_sort(requested_sort(&params), &sortable());
        assert_eq!(resolved.spec.keys(), &[SortKey::asc("name")]);
        assert_eq!(resolved.rejected, vec!["price:".to_string(), "created:sideways".to_string()]);

        let params = RawParams::parse("sortBy=price:up&sortOrder=asc");
        let resolved = resolve_sort(requested_sort(&params), &sortable());
        assert!(resolved.spec.is_empty());
        assert_eq!(resolved.rejected, vec!["price:up".to_string()]);

        assert_eq!(SortSpec::parse("price:,-name"), SortSpec::parse("-name"));
    }

    #[test]
    fn test_safe_field_names() {
        assert!(is_safe_field_name("shippingAddress.fullName"));
        assert!(is_safe_field_name("_id"));
        assert!(!is_safe_field_name("$where"));
        assert!(!is_safe_field_name("a..b"));
        assert!(!is_safe_field_name(""));
        assert!(!is_safe_field_name("name;drop"));
    }

    #[test]
    fn test_to_mongo_keeps_order() {
        let spec = SortSpec::new(vec![SortKey::desc("createdAt"), SortKey::desc("updatedAt")]);
        assert_eq!(spec.to_mongo().to_string(), r#"{"createdAt":-1,"updatedAt":-1}"#);
    }
}
