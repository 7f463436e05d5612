//! Declarative filter rules
//!
//! A [`FilterRule`] maps one or more query-string keys onto a stored field. The
//! rule's [`FilterKind`] decides how raw text is validated and which condition it
//! becomes; see [`compile`].

mod compile;

pub use compile::{compile, compile_all, CompiledFilter, Rejection};
pub(crate) use compile::truncate_chars;

use serde::Serialize;

/// How a stored array is matched against the requested values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayMatch {
    /// Stored array intersects the requested values
    Any,
    /// Stored array contains every requested value
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterKind {
    /// `true` / `false`, case-insensitive
    Boolean,
    /// 24-character hex document reference
    ObjectId,
    /// Case-insensitive partial match, or exact match against `allowed`
    Text,
    /// Inclusive numeric bounds read from two keys, plus an optional exact key
    #[serde(rename_all = "camelCase")]
    NumericRange { min_param: String, max_param: String, exact_param: Option<String> },
    /// Inclusive timestamp bounds read from two keys
    #[serde(rename_all = "camelCase")]
    DateRange { from_param: String, to_param: String },
    /// Single value, comma list or repeated key
    #[serde(rename_all = "camelCase")]
    ArrayMembership { mode: ArrayMatch, max_items: Option<usize> },
}

/// One queryable field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterRule {
    /// Query-string key (range kinds read their own keys instead)
    pub param: String,
    /// Stored field the condition applies to
    pub field: String,
    #[serde(flatten)]
    pub kind: FilterKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FilterRule {
    fn new(param: &str, field: &str, kind: FilterKind) -> Self {
        Self {
            param: param.to_string(),
            field: field.to_string(),
            kind,
            required: false,
            allowed: None,
            min: None,
            max: None,
        }
    }

    pub fn boolean(param: &str) -> Self {
        Self::new(param, param, FilterKind::Boolean)
    }

    pub fn object_id(param: &str) -> Self {
        Self::new(param, param, FilterKind::ObjectId)
    }

    pub fn text(param: &str) -> Self {
        Self::new(param, param, FilterKind::Text)
    }

    /// `minPrice`/`maxPrice` onto `price`
    pub fn numeric_range(field: &str, min_param: &str, max_param: &str) -> Self {
        Self::new(
            field,
            field,
            FilterKind::NumericRange {
                min_param: min_param.to_string(),
                max_param: max_param.to_string(),
                exact_param: None,
            },
        )
    }

    pub fn date_range(field: &str, from_param: &str, to_param: &str) -> Self {
        Self::new(
            field,
            field,
            FilterKind::DateRange { from_param: from_param.to_string(), to_param: to_param.to_string() },
        )
    }

    pub fn array(param: &str, mode: ArrayMatch) -> Self {
        Self::new(param, param, FilterKind::ArrayMembership { mode, max_items: None })
    }

    /// Store under a different field name than the query key
    pub fn on_field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Also accept an exact value under `param` for numeric ranges
    pub fn with_exact(mut self, param: &str) -> Self {
        if let FilterKind::NumericRange { exact_param, .. } = &mut self.kind {
            *exact_param = Some(param.to_string());
        }
        self
    }

    pub fn max_items(mut self, cap: usize) -> Self {
        if let FilterKind::ArrayMembership { max_items, .. } = &mut self.kind {
            *max_items = Some(cap);
        }
        self
    }

    /// Every query-string key this rule reads
    pub fn params(&self) -> Vec<&str> {
        match &self.kind {
            FilterKind::NumericRange { min_param, max_param, exact_param } => {
                let mut keys = vec![min_param.as_str(), max_param.as_str()];
                if let Some(exact) = exact_param {
                    keys.push(exact.as_str());
                }
                keys
            }
            FilterKind::DateRange { from_param, to_param } => vec![from_param.as_str(), to_param.as_str()],
            _ => vec![self.param.as_str()],
        }
    }
}
