//! In-memory document store

use async_trait::async_trait;
use bson::oid::ObjectId;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{self, AtomicI64};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{FindSpec, Model, ModelRegistry, PopulateSpec, StoreError, StoreResult};
use crate::condition::{Condition, Matcher};
use crate::document::{compare_values, get_path, get_path_mut};
use crate::entity::Entity;
use crate::sort::SortDirection;

type Collections = HashMap<Entity, Vec<Value>>;

/// Collections of JSON documents, shared between models
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    collections: Arc<RwLock<Collections>>,
    /// Last `createdAt` handed out, in epoch milliseconds
    clock: Arc<AtomicI64>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time, moved forward when needed so every stamp is strictly
    /// later than the previous one
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .clock
            .fetch_update(atomic::Ordering::SeqCst, atomic::Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        Utc.timestamp_millis_opt(now.max(previous + 1)).single().unwrap_or_else(Utc::now)
    }

    /// Insert a document, assigning `_id`, `createdAt` and `updatedAt` when absent.
    /// Store-assigned `createdAt` values increase strictly in insertion order.
    /// Returns the stored document.
    pub async fn insert(&self, entity: Entity, mut doc: Value) -> StoreResult<Value> {
        let Value::Object(map) = &mut doc else {
            return Err(StoreError::InvalidQuery(format!(
                "{} documents must be JSON objects",
                entity
            )));
        };

        let now = self.next_stamp();
        if !map.contains_key("_id") {
            map.insert("_id".to_string(), Value::String(ObjectId::new().to_hex()));
        }
        let stamp = Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true));
        if !map.contains_key("createdAt") {
            map.insert("createdAt".to_string(), stamp.clone());
        }
        if !map.contains_key("updatedAt") {
            let created = map.get("createdAt").cloned().unwrap_or(stamp);
            map.insert("updatedAt".to_string(), created);
        }

        self.collections.write().await.entry(entity).or_default().push(doc.clone());
        Ok(doc)
    }

    pub async fn insert_many(
        &self,
        entity: Entity,
        docs: impl IntoIterator<Item = Value>,
    ) -> StoreResult<Vec<Value>> {
        let mut stored = Vec::new();
        for doc in docs {
            stored.push(self.insert(entity, doc).await?);
        }
        Ok(stored)
    }

    pub async fn len(&self, entity: Entity) -> usize {
        self.collections.read().await.get(&entity).map_or(0, Vec::len)
    }

    pub async fn clear(&self, entity: Entity) {
        self.collections.write().await.remove(&entity);
    }

    pub fn model(&self, entity: Entity) -> Arc<MemoryModel> {
        Arc::new(MemoryModel { db: self.clone(), entity })
    }

    /// A registry with a model for every entity
    pub fn models(&self) -> ModelRegistry {
        Entity::ALL
            .iter()
            .fold(ModelRegistry::new(), |registry, entity| registry.with(self.model(*entity)))
    }
}

/// [`Model`] over one collection of a [`MemoryDatabase`]
#[derive(Debug, Clone)]
pub struct MemoryModel {
    db: MemoryDatabase,
    entity: Entity,
}

fn compile(filter: &Condition) -> StoreResult<Matcher> {
    Matcher::compile(filter).map_err(|e| StoreError::InvalidQuery(e.to_string()))
}

#[async_trait]
impl Model for MemoryModel {
    fn entity(&self) -> Entity {
        self.entity
    }

    async fn count_documents(&self, filter: &Condition) -> StoreResult<u64> {
        let matcher = compile(filter)?;
        let collections = self.db.collections.read().await;
        let count = collections
            .get(&self.entity)
            .map_or(0, |docs| docs.iter().filter(|d| matcher.matches(d)).count());
        Ok(count as u64)
    }

    async fn find(&self, spec: &FindSpec) -> StoreResult<Vec<Value>> {
        let matcher = compile(&spec.filter)?;
        let collections = self.db.collections.read().await;
        let Some(docs) = collections.get(&self.entity) else {
            return Ok(Vec::new());
        };

        // Ties on every requested key fall back to `_id` in the last key's direction
        let tiebreak = match spec.sort.keys().last() {
            Some(last) if !spec.sort.contains("_id") => Some(last.direction),
            _ => None,
        };

        let mut matched: Vec<&Value> = docs.iter().filter(|d| matcher.matches(d)).collect();
        matched.sort_by(|a, b| {
            for key in spec.sort.keys() {
                let ord = compare_values(get_path(a, &key.field), get_path(b, &key.field));
                let ord = directed(ord, key.direction);
                if ord.is_ne() {
                    return ord;
                }
            }
            match tiebreak {
                Some(direction) => {
                    let (x, y) = (a.get("_id").and_then(id_key), b.get("_id").and_then(id_key));
                    directed(x.cmp(&y), direction)
                }
                None => Ordering::Equal,
            }
        });

        let skip = usize::try_from(spec.skip).unwrap_or(usize::MAX);
        let mut page: Vec<Value> = matched
            .into_iter()
            .skip(skip)
            .take(spec.limit as usize)
            .cloned()
            .collect();

        for populate in &spec.populate {
            populate_path(&mut page, populate, &collections);
        }

        Ok(page.iter().map(|doc| spec.projection.apply(doc, &spec.hidden_fields)).collect())
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn id_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_ascii_lowercase()),
        Value::Object(map) => map.get("$oid").and_then(id_key),
        _ => None,
    }
}

/// Replace ids at `spec.path` with the referenced documents. A dangling single
/// reference becomes `null`; dangling entries of an id array are dropped.
fn populate_path(page: &mut [Value], spec: &PopulateSpec, collections: &Collections) {
    let Some(targets) = collections.get(&spec.target) else {
        log::debug!("Nothing to populate {} from, {} is empty", spec.path, spec.target);
        return;
    };
    let by_id: HashMap<String, &Value> = targets
        .iter()
        .filter_map(|doc| doc.get("_id").and_then(id_key).map(|id| (id, doc)))
        .collect();
    let resolve = |id: &Value| -> Option<Value> {
        let doc = id_key(id).and_then(|key| by_id.get(&key).copied())?;
        Some(spec.projection.apply(doc, &[]))
    };

    for doc in page.iter_mut() {
        let Some(slot) = get_path_mut(doc, &spec.path) else {
            continue;
        };
        match slot {
            Value::Array(ids) => {
                let expanded: Vec<Value> = ids.iter().filter_map(|id| resolve(id)).collect();
                *ids = expanded;
            }
            Value::Null => {}
            other => *other = resolve(other).unwrap_or(Value::Null),
        }
    }
}
