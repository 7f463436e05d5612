//! Boutique - Listing Query Core
//!
//! Declarative filtering, sorting, search, projection, relation expansion and
//! pagination for storefront and admin listing endpoints.
//!
//! # Overview
//!
//! Each entity (products, users, orders, ...) declares what its listing
//! accepts in an [`EntityQueryConfig`]. A [`QueryBuilder`] reads untrusted
//! query-string parameters against that config, drops anything it cannot use
//! and runs one count plus one page fetch through a [`store::Model`].
//!
//! ```rust,ignore
//! use boutique_core::prelude::*;
//!
//! let configs = QueryConfigRegistry::storefront();
//! let db = MemoryDatabase::new();
//! let ctx = RequestContext::from_url("/admin/users?search=ann&page=2", AuthContext::anonymous());
//!
//! let builder = QueryBuilder::for_entity(&db.models(), &configs, Entity::User, ctx.params.clone())?
//!     .with_defaults();
//! let page = AdminSortPolicy::default().apply(&ctx, builder).execute().await?;
//! ```
//!
//! # Modules
//!
//! - [`registry`] - Per-entity configuration and the built-in storefront table
//! - [`builder`] - The fluent [`QueryBuilder`]
//! - [`admin`] - Deterministic sort policy for admin listings
//! - [`filter`] - Declarative filter rules compiled from raw parameters
//! - [`condition`] - Filter AST, MongoDB rendering and in-memory matching
//! - [`store`] - Persistence seam and the in-memory store
//! - [`config`] / [`logging`] - TOML + environment configuration, log output

pub mod admin;
pub mod builder;
pub mod condition;
pub mod config; // TOML + env configuration
pub mod document; // Dotted-path access into JSON documents
pub mod entity;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pagination;
pub mod params;
pub mod projection;
pub mod registry;
pub mod sort;
pub mod store;

pub mod prelude;

pub use admin::{ensure_admin_sort, AdminSortPolicy, AuthContext, RequestContext};
pub use builder::{ParsedQuery, QueryBuilder};
pub use condition::{Condition, Matcher, Scalar};
pub use entity::Entity;
pub use error::{QueryError, QueryResult};
pub use bson::oid::ObjectId;
pub use pagination::{Paginated, PaginationMeta};
pub use params::RawParams;
pub use projection::Projection;
pub use registry::{EntityQueryConfig, QueryConfigRegistry, Relation};
pub use sort::{SortDirection, SortKey, SortSpec};
pub use store::{MemoryDatabase, Model, ModelRegistry, StoreError};
