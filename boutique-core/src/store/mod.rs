//! Document store seam
//!
//! The query builder talks to persistence only through [`Model`]: one count and
//! one fetch per listing. A MongoDB-backed implementation renders the
//! [`FindSpec`] with the `to_mongo` helpers; [`MemoryDatabase`] evaluates it
//! directly against JSON documents.

pub mod memory;

pub use memory::{MemoryDatabase, MemoryModel};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::condition::Condition;
use crate::entity::Entity;
use crate::projection::Projection;
use crate::sort::SortSpec;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store operation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Expand the id (or ids) at `path` into documents of `target`
#[derive(Debug, Clone, PartialEq)]
pub struct PopulateSpec {
    pub path: String,
    pub target: Entity,
    pub projection: Projection,
}

/// Everything one page fetch needs
#[derive(Debug, Clone, Default)]
pub struct FindSpec {
    pub filter: Condition,
    pub sort: SortSpec,
    pub skip: u64,
    pub limit: u32,
    pub projection: Projection,
    /// Removed from every returned document regardless of projection
    pub hidden_fields: Vec<String>,
    pub populate: Vec<PopulateSpec>,
}

/// Handle on one collection
#[async_trait]
pub trait Model: Send + Sync {
    fn entity(&self) -> Entity;

    /// Number of documents matching `filter`
    async fn count_documents(&self, filter: &Condition) -> StoreResult<u64>;

    /// One page of documents, already sorted, populated and projected
    async fn find(&self, spec: &FindSpec) -> StoreResult<Vec<Value>>;
}

/// Models available to the query layer, by entity
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<Entity, Arc<dyn Model>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: Arc<dyn Model>) {
        self.models.insert(model.entity(), model);
    }

    pub fn with(mut self, model: Arc<dyn Model>) -> Self {
        self.register(model);
        self
    }

    pub fn get(&self, entity: Entity) -> Option<Arc<dyn Model>> {
        self.models.get(&entity).cloned()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entities: Vec<&Entity> = self.models.keys().collect();
        entities.sort();
        f.debug_struct("ModelRegistry").field("entities", &entities).finish()
    }
}
