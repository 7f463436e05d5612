//! Per-entity query configuration
//!
//! One [`EntityQueryConfig`] describes everything a listing endpoint accepts for
//! an entity: filter rules, search fields, sortable fields, page sizes,
//! projection and relation expansion. Configurations are collected in a
//! [`QueryConfigRegistry`] that callers build once and pass where needed; there
//! is no global instance.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::QuerySettings;
use crate::entity::Entity;
use crate::filter::{ArrayMatch, FilterRule};
use crate::projection::Projection;
use crate::sort::{SortKey, SortSpec};

/// A populatable reference from one entity to another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    /// Field holding the id (or ids) of the referenced documents
    pub path: String,
    pub target: Entity,
    /// Applied to each referenced document
    #[serde(skip)]
    pub projection: Projection,
}

impl Relation {
    pub fn new(path: &str, target: Entity) -> Self {
        Self { path: path.to_string(), target, projection: Projection::All }
    }

    pub fn excluding(mut self, fields: &[&str]) -> Self {
        self.projection = Projection::Exclude(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityQueryConfig {
    pub name: String,
    pub filters: Vec<FilterRule>,
    pub search_fields: Vec<String>,
    pub sortable_fields: Vec<String>,
    pub default_sort: SortSpec,
    pub default_limit: u32,
    pub max_limit: u32,
    pub default_projection: Projection,
    /// Never returned, whatever the caller asks for
    pub hidden_fields: Vec<String>,
    pub relations: Vec<Relation>,
    pub default_populate: Vec<String>,
}

pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_MAX_LIMIT: u32 = 100;

impl EntityQueryConfig {
    /// No filters, no search, no sortable fields, newest first
    pub fn unconfigured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            filters: Vec::new(),
            search_fields: Vec::new(),
            sortable_fields: Vec::new(),
            default_sort: SortSpec::new(vec![SortKey::desc("createdAt")]),
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            default_projection: Projection::All,
            hidden_fields: Vec::new(),
            relations: Vec::new(),
            default_populate: Vec::new(),
        }
    }

    pub fn with_filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }

    pub fn with_search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_sortable_fields(mut self, fields: &[&str]) -> Self {
        self.sortable_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Compact form, e.g. `"displayOrder,-createdAt"`
    pub fn with_default_sort(mut self, sort: &str) -> Self {
        self.default_sort = SortSpec::parse(sort);
        self
    }

    pub fn with_limits(mut self, default_limit: u32, max_limit: u32) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub fn with_default_projection(mut self, projection: Projection) -> Self {
        self.default_projection = projection;
        self
    }

    pub fn with_hidden_fields(mut self, fields: &[&str]) -> Self {
        self.hidden_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_default_populate(mut self, paths: &[&str]) -> Self {
        self.default_populate = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        self.sortable_fields.iter().any(|f| f == field)
    }

    pub fn relation(&self, path: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.path == path)
    }
}

/// Lookup from entity to its configuration
#[derive(Debug, Clone, Default)]
pub struct QueryConfigRegistry {
    configs: HashMap<Entity, Arc<EntityQueryConfig>>,
}

impl QueryConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: Entity, config: EntityQueryConfig) {
        self.configs.insert(entity, Arc::new(config));
    }

    pub fn with(mut self, entity: Entity, config: EntityQueryConfig) -> Self {
        self.register(entity, config);
        self
    }

    /// Configuration for `entity`, or an unconfigured one
    pub fn get(&self, entity: Entity) -> Arc<EntityQueryConfig> {
        self.configs
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| Arc::new(EntityQueryConfig::unconfigured(entity.as_str())))
    }

    /// Lookup by name. Unknown names degrade to an unconfigured config.
    pub fn get_by_name(&self, name: &str) -> Arc<EntityQueryConfig> {
        match name.parse::<Entity>() {
            Ok(entity) => self.get(entity),
            Err(_) => {
                log::warn!("No query config for entity {:?}, using defaults", name);
                Arc::new(EntityQueryConfig::unconfigured(name))
            }
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.configs.contains_key(&entity)
    }

    pub fn entities(&self) -> Vec<Entity> {
        let mut entities: Vec<Entity> = self.configs.keys().copied().collect();
        entities.sort();
        entities
    }

    /// Apply page-size overrides from settings
    pub fn with_overrides(mut self, settings: &QuerySettings) -> Self {
        for (name, limits) in &settings.entities {
            let Ok(entity) = name.parse::<Entity>() else {
                log::warn!("Ignoring limits for unknown entity {:?}", name);
                continue;
            };
            let mut config = (*self.get(entity)).clone();
            if let Some(max_limit) = limits.max_limit {
                config.max_limit = max_limit;
            }
            if let Some(default_limit) = limits.default_limit {
                config.default_limit = default_limit;
            }
            config.default_limit = config.default_limit.min(config.max_limit);
            log::debug!(
                "Limits for {}: default={} max={}",
                entity,
                config.default_limit,
                config.max_limit
            );
            self.register(entity, config);
        }
        self
    }

    /// Built-in storefront configuration for every entity
    pub fn storefront() -> Self {
        let product = EntityQueryConfig::unconfigured("product")
            .with_filter(FilterRule::object_id("category"))
            .with_filter(FilterRule::text("brand"))
            .with_filter(FilterRule::numeric_range("price", "minPrice", "maxPrice").bounds(Some(0.0), None))
            .with_filter(FilterRule::array("colors", ArrayMatch::Any).max_items(10))
            .with_filter(FilterRule::array("sizes", ArrayMatch::Any).max_items(10))
            .with_filter(FilterRule::array("tags", ArrayMatch::Any).max_items(10))
            .with_filter(FilterRule::boolean("isActive"))
            .with_filter(FilterRule::boolean("isFeatured"))
            .with_filter(FilterRule::boolean("isOnSale"))
            .with_filter(FilterRule::date_range("createdAt", "createdFrom", "createdTo"))
            .with_search_fields(&["name", "description", "brand"])
            .with_sortable_fields(&with_timestamps(&["name", "price", "sold", "averageRating"]))
            .with_default_sort("-createdAt")
            .with_limits(12, 50)
            .with_relation(Relation::new("category", Entity::Category))
            .with_relation(Relation::new("variants", Entity::Variant))
            .with_default_populate(&["category"]);

        let user = EntityQueryConfig::unconfigured("user")
            .with_filter(FilterRule::text("role").allowed(&["user", "admin"]))
            .with_filter(FilterRule::boolean("isActive"))
            .with_filter(FilterRule::date_range("createdAt", "createdFrom", "createdTo"))
            .with_search_fields(&["name", "email", "phone"])
            .with_sortable_fields(&with_timestamps(&["name", "email", "role"]))
            .with_default_sort("-createdAt")
            .with_limits(10, 100)
            .with_hidden_fields(USER_SECRETS);

        let order = EntityQueryConfig::unconfigured("order")
            .with_filter(
                FilterRule::text("status").allowed(&["pending", "confirmed", "shipping", "delivered", "cancelled"]),
            )
            .with_filter(FilterRule::text("paymentStatus").allowed(&["pending", "paid", "failed", "refunded"]))
            .with_filter(FilterRule::object_id("user"))
            .with_filter(
                FilterRule::numeric_range("totalAmount", "minTotal", "maxTotal").bounds(Some(0.0), None),
            )
            .with_filter(FilterRule::date_range("createdAt", "createdFrom", "createdTo"))
            .with_search_fields(&["orderCode", "shippingAddress.fullName", "shippingAddress.phone"])
            .with_sortable_fields(&with_timestamps(&["totalAmount", "status"]))
            .with_default_sort("-createdAt")
            .with_limits(10, 100)
            .with_relation(Relation::new("user", Entity::User).excluding(USER_SECRETS))
            .with_default_populate(&["user"]);

        let category = EntityQueryConfig::unconfigured("category")
            .with_filter(FilterRule::object_id("parent"))
            .with_filter(FilterRule::boolean("isActive"))
            .with_search_fields(&["name", "description"])
            .with_sortable_fields(&with_timestamps(&["name", "displayOrder"]))
            .with_default_sort("displayOrder,-createdAt")
            .with_limits(20, 100)
            .with_relation(Relation::new("parent", Entity::Category));

        let review = EntityQueryConfig::unconfigured("review")
            .with_filter(FilterRule::object_id("product"))
            .with_filter(FilterRule::object_id("user"))
            .with_filter(
                FilterRule::numeric_range("rating", "minRating", "maxRating")
                    .with_exact("rating")
                    .bounds(Some(1.0), Some(5.0)),
            )
            .with_filter(FilterRule::boolean("isApproved"))
            .with_search_fields(&["comment"])
            .with_sortable_fields(&with_timestamps(&["rating"]))
            .with_default_sort("-createdAt")
            .with_limits(10, 50)
            .with_relation(Relation::new("user", Entity::User).excluding(USER_SECRETS))
            .with_relation(Relation::new("product", Entity::Product))
            .with_default_populate(&["user"]);

        let post = EntityQueryConfig::unconfigured("post")
            .with_filter(FilterRule::boolean("isPublished"))
            .with_filter(FilterRule::array("tags", ArrayMatch::Any).max_items(10))
            .with_filter(FilterRule::object_id("author"))
            .with_filter(FilterRule::date_range("publishedAt", "publishedFrom", "publishedTo"))
            .with_search_fields(&["title", "summary", "content"])
            .with_sortable_fields(&with_timestamps(&["title", "publishedAt", "views"]))
            .with_default_sort("-publishedAt")
            .with_limits(9, 50)
            .with_relation(Relation::new("author", Entity::User).excluding(USER_SECRETS))
            .with_default_populate(&["author"]);

        let banner = EntityQueryConfig::unconfigured("banner")
            .with_filter(FilterRule::boolean("isActive"))
            .with_filter(FilterRule::text("position").allowed(&["home", "category", "promotion"]))
            .with_search_fields(&["title"])
            .with_sortable_fields(&with_timestamps(&["displayOrder"]))
            .with_default_sort("displayOrder,-createdAt")
            .with_limits(10, 50);

        let variant = EntityQueryConfig::unconfigured("variant")
            .with_filter(FilterRule::object_id("product"))
            .with_filter(FilterRule::text("color"))
            .with_filter(FilterRule::text("size"))
            .with_filter(FilterRule::numeric_range("price", "minPrice", "maxPrice").bounds(Some(0.0), None))
            .with_filter(FilterRule::boolean("inStock"))
            .with_search_fields(&["sku"])
            .with_sortable_fields(&with_timestamps(&["price", "stock"]))
            .with_default_sort("-createdAt")
            .with_limits(20, 100)
            .with_relation(Relation::new("product", Entity::Product))
            .with_default_populate(&["product"]);

        Self::new()
            .with(Entity::Product, product)
            .with(Entity::User, user)
            .with(Entity::Order, order)
            .with(Entity::Category, category)
            .with(Entity::Review, review)
            .with(Entity::Post, post)
            .with(Entity::Banner, banner)
            .with(Entity::Variant, variant)
    }
}

const USER_SECRETS: &[&str] = &["password", "resetPasswordToken", "resetPasswordExpires"];

fn with_timestamps(fields: &[&'static str]) -> Vec<&'static str> {
    fields.iter().chain(["createdAt", "updatedAt"].iter()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityLimits;
    use crate::filter::FilterKind;

    #[test]
    fn test_storefront_covers_every_entity() {
        let registry = QueryConfigRegistry::storefront();
        let mut expected = Entity::ALL.to_vec();
        expected.sort();
        assert_eq!(registry.entities(), expected);
        for entity in Entity::ALL {
            let config = registry.get(entity);
            assert_eq!(config.name, entity.as_str());
            assert!(config.default_limit <= config.max_limit);
            assert!(config.is_sortable("createdAt"));
            for path in &config.default_populate {
                assert!(config.relation(path).is_some(), "{} populates unknown {}", entity, path);
            }
        }
    }

    #[test]
    fn test_product_config() {
        let config = QueryConfigRegistry::storefront().get(Entity::Product);
        assert_eq!((config.default_limit, config.max_limit), (12, 50));
        assert_eq!(config.default_sort, SortSpec::parse("-createdAt"));
        let colors = config.filters.iter().find(|r| r.param == "colors").unwrap();
        assert_eq!(colors.kind, FilterKind::ArrayMembership { mode: ArrayMatch::Any, max_items: Some(10) });
        let price = config.filters.iter().find(|r| r.field == "price").unwrap();
        assert_eq!(price.params(), vec!["minPrice", "maxPrice"]);
    }

    #[test]
    fn test_user_secrets_hidden() {
        let config = QueryConfigRegistry::storefront().get(Entity::User);
        assert!(config.hidden_fields.contains(&"password".to_string()));
        assert!(!config.is_sortable("password"));
    }

    #[test]
    fn test_missing_config_degrades() {
        let registry = QueryConfigRegistry::new();
        let config = registry.get(Entity::Banner);
        assert!(config.filters.is_empty());
        assert_eq!(config.default_sort, SortSpec::parse("-createdAt"));

        let config = registry.get_by_name("coupon");
        assert_eq!(config.name, "coupon");
        assert!(config.sortable_fields.is_empty());
    }

    #[test]
    fn test_overrides() {
        let mut settings = QuerySettings::default();
        settings
            .entities
            .insert("products".into(), EntityLimits { default_limit: Some(24), max_limit: Some(20) });
        settings.entities.insert("coupon".into(), EntityLimits::default());

        let registry = QueryConfigRegistry::storefront().with_overrides(&settings);
        let config = registry.get(Entity::Product);
        assert_eq!((config.default_limit, config.max_limit), (20, 20));
        assert_eq!(config.search_fields, vec!["name", "description", "brand"]);
    }
}
