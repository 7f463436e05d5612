//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use boutique_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::{BoutiqueConfig, QuerySettings, ValidationMode};
pub use crate::logging::{init_logging, LoggingConfig};

// === Entities and their listing configuration ===
pub use crate::entity::Entity;
pub use crate::filter::{ArrayMatch, FilterRule};
pub use crate::registry::{EntityQueryConfig, QueryConfigRegistry, Relation};

// === Building and running queries ===
pub use crate::admin::{AdminSortPolicy, AuthContext, RequestContext};
pub use crate::builder::{ParsedQuery, QueryBuilder};
pub use crate::condition::{Condition, Scalar};
pub use crate::pagination::{Paginated, PaginationMeta};
pub use crate::params::RawParams;
pub use crate::sort::{SortKey, SortSpec};

// === Storage ===
pub use crate::store::{MemoryDatabase, Model, ModelRegistry};

// === Errors ===
pub use crate::error::{QueryError, QueryResult};
