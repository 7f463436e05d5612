//! Field projection

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::document::{pick_paths, remove_path};
use crate::sort::is_safe_field_name;

/// Which attributes of each document are returned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Whole document
    #[default]
    All,
    /// Only these paths, plus `_id` when `with_id` is set
    Include { fields: Vec<String>, with_id: bool },
    /// Everything except these paths
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse `name,price` or `-description,-content`.
    /// Unsafe names and hidden fields are dropped. When includes and excludes
    /// are mixed the includes win, though `-_id` still drops the id.
    pub fn parse(raw: &str, hidden: &[String]) -> Option<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let (negated, field) = match token.strip_prefix('-') {
                Some(field) => (true, field.trim()),
                None => (false, token.strip_prefix('+').unwrap_or(token).trim()),
            };
            if !is_safe_field_name(field) {
                log::warn!("Dropping projection field {:?}", field);
                continue;
            }
            if negated {
                if !exclude.iter().any(|f| f == field) {
                    exclude.push(field.to_string());
                }
            } else if is_hidden(field, hidden) {
                log::warn!("Dropping hidden projection field {:?}", field);
            } else if !include.iter().any(|f| f == field) {
                include.push(field.to_string());
            }
        }

        if !include.is_empty() {
            let with_id = !exclude.iter().any(|f| f == "_id");
            include.retain(|f| f != "_id");
            return Some(Projection::Include { fields: include, with_id });
        }
        if !exclude.is_empty() {
            return Some(Projection::Exclude(exclude));
        }
        None
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Projection::All)
    }

    /// Apply to a single document; hidden fields are always removed
    pub fn apply(&self, doc: &Value, hidden: &[String]) -> Value {
        let mut out = match self {
            Projection::All => doc.clone(),
            Projection::Include { fields, with_id } => {
                let mut paths = fields.clone();
                if *with_id {
                    paths.insert(0, "_id".to_string());
                }
                pick_paths(doc, &paths)
            }
            Projection::Exclude(fields) => {
                let mut out = doc.clone();
                for field in fields {
                    remove_path(&mut out, field);
                }
                out
            }
        };
        for field in hidden {
            remove_path(&mut out, field);
        }
        out
    }

    /// `{"name": 1, "price": 1}` / `{"password": 0}`
    pub fn to_mongo(&self) -> Value {
        let mut map = Map::new();
        match self {
            Projection::All => {}
            Projection::Include { fields, with_id } => {
                if !with_id {
                    map.insert("_id".to_string(), Value::from(0));
                }
                for field in fields {
                    map.insert(field.clone(), Value::from(1));
                }
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    map.insert(field.clone(), Value::from(0));
                }
            }
        }
        Value::Object(map)
    }
}

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_mongo().serialize(serializer)
    }
}

fn is_hidden(field: &str, hidden: &[String]) -> bool {
    hidden.iter().any(|h| field == h || field.starts_with(&format!("{}.", h)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hidden() -> Vec<String> {
        vec!["password".to_string()]
    }

    #[test]
    fn test_parse_include() {
        let p = Projection::parse("name, price ,name", &hidden()).unwrap();
        assert_eq!(
            p,
            Projection::Include { fields: vec!["name".into(), "price".into()], with_id: true }
        );
    }

    #[test]
    fn test_parse_exclude() {
        let p = Projection::parse("-description,-content", &hidden()).unwrap();
        assert_eq!(p, Projection::Exclude(vec!["description".into(), "content".into()]));
    }

    #[test]
    fn test_mixed_prefers_include() {
        let p = Projection::parse("name,-description,-_id", &hidden()).unwrap();
        assert_eq!(p, Projection::Include { fields: vec!["name".into()], with_id: false });
        assert_eq!(p.to_mongo(), json!({"_id": 0, "name": 1}));
    }

    #[test]
    fn test_hidden_and_unsafe_dropped() {
        assert_eq!(Projection::parse("password,$where", &hidden()), None);
        assert_eq!(Projection::parse(" , ", &hidden()), None);
    }

    #[test]
    fn test_apply_include_keeps_id() {
        let doc = json!({"_id": "a", "name": "Shirt", "price": 1, "password": "x"});
        let p = Projection::Include { fields: vec!["name".into()], with_id: true };
        assert_eq!(p.apply(&doc, &hidden()), json!({"_id": "a", "name": "Shirt"}));

        let p = Projection::Include { fields: vec!["name".into()], with_id: false };
        assert_eq!(p.apply(&doc, &hidden()), json!({"name": "Shirt"}));
    }

    #[test]
    fn test_apply_strips_hidden_fields() {
        let doc = json!({"_id": "a", "email": "a@b.c", "password": "x"});
        assert_eq!(Projection::All.apply(&doc, &hidden()), json!({"_id": "a", "email": "a@b.c"}));
        let p = Projection::Exclude(vec!["email".into()]);
        assert_eq!(p.apply(&doc, &hidden()), json!({"_id": "a"}));
    }
}
