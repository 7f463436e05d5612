//! Filter condition tree
//!
//! Filter rules, search terms and server-side constraints all compile down to a
//! [`Condition`]. The tree renders to a MongoDB filter document with
//! [`Condition::to_mongo`] and evaluates against in-memory JSON documents through
//! a compiled [`Matcher`], so both the count and the page fetch of a listing share
//! one definition of "matching".

use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;

use crate::document::{as_date, candidates};

/// Upper bound on compiled pattern size for user-supplied text
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Typed literal a condition compares against
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
    ObjectId(ObjectId),
    Date(DateTime<Utc>),
}

impl Scalar {
    pub fn to_bson(&self) -> Bson {
        match self {
            Scalar::Bool(b) => Bson::Boolean(*b),
            Scalar::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Bson::Int64(*n as i64),
            Scalar::Number(n) => Bson::Double(*n),
            Scalar::Text(s) => Bson::String(s.clone()),
            Scalar::ObjectId(id) => Bson::ObjectId(*id),
            Scalar::Date(d) => Bson::DateTime(bson::DateTime::from_chrono(*d)),
        }
    }

    /// Relaxed Extended JSON form
    pub fn to_mongo(&self) -> Value {
        self.to_bson().into_relaxed_extjson()
    }

    /// Does a stored value equal this literal?
    fn matches(&self, stored: &Value) -> bool {
        self.compare(stored) == Some(Ordering::Equal)
    }

    /// Order of `stored` relative to this literal, when the two are comparable
    fn compare(&self, stored: &Value) -> Option<Ordering> {
        match self {
            Scalar::Bool(b) => stored.as_bool().map(|v| v.cmp(b)),
            Scalar::Number(n) => stored.as_f64().and_then(|v| v.partial_cmp(n)),
            Scalar::Text(s) => stored.as_str().map(|v| v.cmp(s.as_str())),
            Scalar::ObjectId(id) => stored_object_id(stored).map(|v| v.cmp(id)),
            Scalar::Date(d) => as_date(stored).map(|v| v.cmp(d)),
        }
    }
}

fn stored_object_id(value: &Value) -> Option<ObjectId> {
    match value {
        Value::String(s) => ObjectId::parse_str(s).ok(),
        Value::Object(map) => map.get("$oid").and_then(stored_object_id),
        _ => None,
    }
}

fn field_doc(field: &str, value: impl Into<Bson>) -> Document {
    let mut document = Document::new();
    document.insert(field, value);
    document
}

fn scalars(values: &[Scalar]) -> Vec<Bson> {
    values.iter().map(Scalar::to_bson).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Every child holds; the empty conjunction matches everything
    And(Vec<Condition>),
    /// At least one child holds; the empty disjunction matches nothing
    Or(Vec<Condition>),
    /// Field equals the value, or a stored array contains it
    Eq { field: String, value: Scalar },
    /// Field (or any stored array element) equals one of the values
    In { field: String, values: Vec<Scalar> },
    /// Stored array contains every value
    ContainsAll { field: String, values: Vec<Scalar> },
    /// Inclusive bounds; an absent bound is open
    Range { field: String, min: Option<Scalar>, max: Option<Scalar> },
    /// Pattern match against string fields
    Regex { field: String, pattern: String, case_insensitive: bool },
}

impl Default for Condition {
    fn default() -> Self {
        Condition::match_all()
    }
}

impl Condition {
    pub fn match_all() -> Self {
        Condition::And(Vec::new())
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, Condition::And(children) if children.iter().all(Condition::is_match_all))
    }

    pub fn eq(field: impl Into<String>, value: Scalar) -> Self {
        Condition::Eq { field: field.into(), value }
    }

    /// Case-insensitive partial match of `text`; metacharacters are escaped
    pub fn contains_text(field: impl Into<String>, text: &str) -> Self {
        Condition::Regex { field: field.into(), pattern: regex::escape(text), case_insensitive: true }
    }

    /// Conjunction that flattens nested conjunctions and drops match-all children
    pub fn all(conditions: impl IntoIterator<Item = Condition>) -> Self {
        let mut flat = Vec::new();
        for condition in conditions {
            match condition {
                Condition::And(children) => {
                    flat.extend(children.into_iter().filter(|c| !c.is_match_all()))
                }
                other => flat.push(other),
            }
        }
        Condition::And(flat)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::all([self, other])
    }

    /// Render as a MongoDB filter document
    pub fn to_bson(&self) -> Document {
        match self {
            Condition::And(children) => match children.as_slice() {
                [] => Document::new(),
                [only] => only.to_bson(),
                _ => {
                    let clauses: Vec<Document> = children.iter().map(Condition::to_bson).collect();
                    doc! { "$and": clauses }
                }
            },
            Condition::Or(children) => {
                let clauses: Vec<Document> = children.iter().map(Condition::to_bson).collect();
                doc! { "$or": clauses }
            }
            Condition::Eq { field, value } => field_doc(field, value.to_bson()),
            Condition::In { field, values } => field_doc(field, doc! { "$in": scalars(values) }),
            Condition::ContainsAll { field, values } => field_doc(field, doc! { "$all": scalars(values) }),
            Condition::Range { field, min, max } => {
                let mut bounds = Document::new();
                if let Some(min) = min {
                    bounds.insert("$gte", min.to_bson());
                }
                if let Some(max) = max {
                    bounds.insert("$lte", max.to_bson());
                }
                field_doc(field, bounds)
            }
            Condition::Regex { field, pattern, case_insensitive } => {
                let mut spec = doc! { "$regex": pattern.as_str() };
                if *case_insensitive {
                    spec.insert("$options", "i");
                }
                field_doc(field, spec)
            }
        }
    }

    /// The filter document as relaxed Extended JSON
    pub fn to_mongo(&self) -> Value {
        Bson::Document(self.to_bson()).into_relaxed_extjson()
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_mongo().serialize(serializer)
    }
}

/// A condition with its patterns compiled, ready to test documents
#[derive(Debug, Clone)]
pub struct Matcher {
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    And(Vec<Node>),
    Or(Vec<Node>),
    Eq(String, Scalar),
    In(String, Vec<Scalar>),
    All(String, Vec<Scalar>),
    Range(String, Option<Scalar>, Option<Scalar>),
    Regex(String, Regex),
}

impl Matcher {
    pub fn compile(condition: &Condition) -> Result<Self, regex::Error> {
        Ok(Self { root: compile_node(condition)? })
    }

    pub fn matches(&self, doc: &Value) -> bool {
        eval(&self.root, doc)
    }
}

fn compile_node(condition: &Condition) -> Result<Node, regex::Error> {
    Ok(match condition {
        Condition::And(children) => {
            Node::And(children.iter().map(compile_node).collect::<Result<_, _>>()?)
        }
        Condition::Or(children) => {
            Node::Or(children.iter().map(compile_node).collect::<Result<_, _>>()?)
        }
        Condition::Eq { field, value } => Node::Eq(field.clone(), value.clone()),
        Condition::In { field, values } => Node::In(field.clone(), values.clone()),
        Condition::ContainsAll { field, values } => Node::All(field.clone(), values.clone()),
        Condition::Range { field, min, max } => Node::Range(field.clone(), min.clone(), max.clone()),
        Condition::Regex { field, pattern, case_insensitive } => {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .size_limit(REGEX_SIZE_LIMIT)
                .build()?;
            Node::Regex(field.clone(), re)
        }
    })
}

fn eval(node: &Node, doc: &Value) -> bool {
    match node {
        Node::And(children) => children.iter().all(|c| eval(c, doc)),
        Node::Or(children) => children.iter().any(|c| eval(c, doc)),
        Node::Eq(field, value) => candidates(doc, field).into_iter().any(|v| value.matches(v)),
        Node::In(field, values) => candidates(doc, field)
            .into_iter()
            .any(|v| values.iter().any(|s| s.matches(v))),
        Node::All(field, values) => {
            let stored = candidates(doc, field);
            !values.is_empty() && values.iter().all(|s| stored.iter().any(|v| s.matches(v)))
        }
        Node::Range(field, min, max) => candidates(doc, field).into_iter().any(|v| {
            let above = match min {
                Some(min) => matches!(min.compare(v), Some(Ordering::Greater | Ordering::Equal)),
                None => true,
            };
            let below = match max {
                Some(max) => matches!(max.compare(v), Some(Ordering::Less | Ordering::Equal)),
                None => true,
            };
            above && below
        }),
        Node::Regex(field, re) => candidates(doc, field)
            .into_iter()
            .any(|v| v.as_str().is_some_and(|s| re.is_match(s))),
    }
}
