//! Raw query-string parameters

use serde::{Deserialize, Serialize};

/// Decoded query parameters in request order; repeated keys are kept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawParams {
    pairs: Vec<(String, String)>,
}

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    /// A leading `?` is ignored and `colors[]=red` is read as `colors=red`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(key);
            if key.is_empty() {
                continue;
            }
            params.insert(key, decode(value));
        }
        params
    }

    /// Split `/admin/products?page=2` into its path and parameters
    pub fn split_path_and_query(full_path: &str) -> (String, Self) {
        match full_path.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse(query)),
            None => (full_path.to_string(), Self::new()),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = Self::new();
        for (k, v) in pairs {
            params.insert(k, v);
        }
        params
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut key = key.into();
        if let Some(stripped) = key.strip_suffix("[]") {
            key = stripped.to_string();
        }
        self.pairs.push((key, value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// First value for `key`, trimmed, treating blank as absent
    pub fn get_trimmed(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

fn decode(s: &str) -> String {
    let spaced = s.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let params = RawParams::parse("?page=2&limit=12&search=linen+shirt&brand=H%26M");
        assert_eq!(params.get("page"), Some("2"));
        assert_eq!(params.get("limit"), Some("12"));
        assert_eq!(params.get("search"), Some("linen shirt"));
        assert_eq!(params.get("brand"), Some("H&M"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_repeated_and_bracket_keys() {
        let params = RawParams::parse("colors[]=red&colors[]=blue&colors=green");
        assert_eq!(params.get_all("colors"), vec!["red", "blue", "green"]);
        assert_eq!(params.get("colors"), Some("red"));
    }

    #[test]
    fn test_flag_without_value() {
        let params = RawParams::parse("isActive&&=orphan");
        assert!(params.contains("isActive"));
        assert_eq!(params.get("isActive"), Some(""));
        assert_eq!(params.get_trimmed("isActive"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_split_path_and_query() {
        let (path, params) = RawParams::split_path_and_query("/api/admin/users?sort=-name");
        assert_eq!(path, "/api/admin/users");
        assert_eq!(params.get("sort"), Some("-name"));

        let (path, params) = RawParams::split_path_and_query("/products");
        assert_eq!(path, "/products");
        assert!(params.is_empty());
    }

    #[test]
    fn test_invalid_percent_encoding_is_kept() {
        let params = RawParams::parse("search=%E0%A4%A");
        assert_eq!(params.get("search"), Some("%E0%A4%A"));
    }
}
