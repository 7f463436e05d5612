//! Fluent listing query builder
//!
//! A [`QueryBuilder`] turns raw query-string parameters into one filtered,
//! sorted, projected and paginated fetch against a [`Model`]:
//!
//! ```rust,no_run
//! use boutique_core::{Entity, MemoryDatabase, QueryBuilder, QueryConfigRegistry, RawParams};
//!
//! # async fn run() -> Result<(), boutique_core::QueryError> {
//! let db = MemoryDatabase::new();
//! let configs = QueryConfigRegistry::storefront();
//! let params = RawParams::parse("minPrice=100000&colors=red,blue&page=2&search=linen");
//!
//! let result = QueryBuilder::for_entity(&db.models(), &configs, Entity::Product, params)?
//!     .paginate()
//!     .sort_by()
//!     .select_fields()
//!     .populate_fields()
//!     .search(&["name", "description"])
//!     .apply_config_filters()
//!     .execute()
//!     .await?;
//! println!("{} of {}", result.documents.len(), result.pagination.total_items);
//! # Ok(())
//! # }
//! ```
//!
//! Each step reads its own parameters; steps that are never called leave the
//! config defaults in place. Unusable values are dropped and recorded as
//! warnings unless the builder runs in [`ValidationMode::Strict`].

use serde::Serialize;
use std::sync::Arc;

use crate::condition::Condition;
use crate::config::{QuerySettings, ValidationMode};
use crate::entity::Entity;
use crate::error::{QueryError, QueryResult};
use crate::filter::{compile_all, truncate_chars, FilterRule, Rejection};
use crate::pagination::{Paginated, PaginationMeta};
use crate::params::RawParams;
use crate::projection::Projection;
use crate::registry::{EntityQueryConfig, QueryConfigRegistry};
use crate::sort::{requested_sort, resolve_sort, SortSpec};
use crate::store::{FindSpec, Model, ModelRegistry, PopulateSpec};

/// The normalized request, ready to run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub entity: String,
    pub filter: Condition,
    pub sort: SortSpec,
    pub page: u32,
    pub limit: u32,
    pub skip: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub projection: Projection,
    pub populate: Vec<String>,
    /// Everything dropped or adjusted while reading the parameters
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ParsedQuery {
    pub fn to_find_spec(&self, config: &EntityQueryConfig) -> FindSpec {
        let populate = self
            .populate
            .iter()
            .filter_map(|path| config.relation(path))
            .map(|relation| PopulateSpec {
                path: relation.path.clone(),
                target: relation.target,
                projection: relation.projection.clone(),
            })
            .collect();

        FindSpec {
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
            projection: self.projection.clone(),
            hidden_fields: config.hidden_fields.clone(),
            populate,
        }
    }
}

/// Strict-mode failure held until `build`
#[derive(Debug, Clone)]
enum Deferred {
    Invalid(Rejection),
    Missing(String),
}

impl From<&Deferred> for QueryError {
    fn from(deferred: &Deferred) -> Self {
        match deferred {
            Deferred::Invalid(r) => QueryError::InvalidFilterValue {
                param: r.param.clone(),
                value: r.value.clone(),
                reason: r.reason.clone(),
            },
            Deferred::Missing(param) => QueryError::MissingRequiredFilter(param.clone()),
        }
    }
}

pub struct QueryBuilder {
    model: Arc<dyn Model>,
    config: Arc<EntityQueryConfig>,
    params: RawParams,
    validation: ValidationMode,
    max_search_length: usize,

    page: u32,
    limit: u32,
    sort: Option<SortSpec>,
    sort_override: Option<SortSpec>,
    projection: Option<Projection>,
    populate: Option<Vec<String>>,
    search: Option<String>,
    conditions: Vec<Condition>,
    warnings: Vec<String>,
    deferred: Option<Deferred>,
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &self.model.entity())
            .field("config", &self.config.name)
            .field("params", &self.params)
            .field("page", &self.page)
            .field("limit", &self.limit)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}

impl QueryBuilder {
    pub fn new(model: Arc<dyn Model>, config: Arc<EntityQueryConfig>, params: RawParams) -> Self {
        let settings = QuerySettings::default();
        let limit = config.default_limit.clamp(1, config.max_limit.max(1));
        Self {
            model,
            config,
            params,
            validation: settings.validation,
            max_search_length: settings.max_search_length,
            page: 1,
            limit,
            sort: None,
            sort_override: None,
            projection: None,
            populate: None,
            search: None,
            conditions: Vec::new(),
            warnings: Vec::new(),
            deferred: None,
        }
    }

    /// Resolve the model and config for `entity`. A missing model is a wiring
    /// error and fails here rather than at execution.
    pub fn for_entity(
        models: &ModelRegistry,
        configs: &QueryConfigRegistry,
        entity: Entity,
        params: RawParams,
    ) -> QueryResult<Self> {
        let model = models.get(entity).ok_or(QueryError::ModelNotRegistered(entity))?;
        Ok(Self::new(model, configs.get(entity), params))
    }

    /// Validation mode and search length; call before the reading steps
    pub fn with_settings(mut self, settings: &QuerySettings) -> Self {
        self.validation = settings.validation;
        self.max_search_length = settings.max_search_length;
        self
    }

    pub fn config(&self) -> &EntityQueryConfig {
        &self.config
    }

    pub fn params(&self) -> &RawParams {
        &self.params
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn warn(&mut self, message: String) {
        log::warn!("[{}] {}", self.config.name, message);
        self.warnings.push(message);
    }

    fn note(&mut self, message: String) {
        log::debug!("[{}] {}", self.config.name, message);
        self.warnings.push(message);
    }

    fn reject(&mut self, rejection: Rejection) {
        if self.validation == ValidationMode::Strict && self.deferred.is_none() {
            self.deferred = Some(Deferred::Invalid(rejection.clone()));
        }
        self.note(rejection.to_string());
    }

    /// `page` (default 1, at least 1) and `limit` (default from config, capped at its maximum)
    pub fn paginate(mut self) -> Self {
        let max_limit = self.config.max_limit.max(1);
        let default_limit = self.config.default_limit.clamp(1, max_limit);

        self.page = match self.params.get_trimmed("page").map(|raw| (raw.to_string(), parse_integer(raw))) {
            None => 1,
            Some((_, Some(n))) if n >= 1 => n.min(u32::MAX as i64) as u32,
            Some((raw, _)) => {
                self.note(format!("ignored page={:?}", raw));
                1
            }
        };

        self.limit = match self.params.get_trimmed("limit").map(|raw| (raw.to_string(), parse_integer(raw))) {
            None => default_limit,
            Some((_, Some(n))) if n > max_limit as i64 => {
                self.note(format!("limit {} capped at {}", n, max_limit));
                max_limit
            }
            Some((_, Some(n))) if n >= 1 => n as u32,
            Some((raw, _)) => {
                self.note(format!("ignored limit={:?}", raw));
                default_limit
            }
        };
        self
    }

    /// `sort`, or `sortBy` with `sortOrder`, restricted to sortable fields
    pub fn sort_by(mut self) -> Self {
        let resolved = resolve_sort(requested_sort(&self.params), &self.config.sortable_fields);
        for field in resolved.rejected {
            self.warn(format!("dropped sort field {:?}", field));
        }
        self.sort = Some(if resolved.spec.is_empty() {
            self.config.default_sort.clone()
        } else {
            resolved.spec
        });
        self
    }

    /// Explicit sort that takes precedence over `sort_by`
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort_override = Some(sort);
        self
    }

    /// `fields`, falling back to the default projection
    pub fn select_fields(mut self) -> Self {
        let requested = self.params.get_trimmed("fields").map(str::to_string);
        self.projection = match requested {
            None => None,
            Some(raw) => match Projection::parse(&raw, &self.config.hidden_fields) {
                Some(projection) => Some(projection),
                None => {
                    self.warn(format!("no usable fields in {:?}", raw));
                    None
                }
            },
        };
        self
    }

    /// `populate`; absent means the default expansion, blank means none
    pub fn populate_fields(mut self) -> Self {
        let Some(raw) = self.params.get("populate").map(str::to_string) else {
            self.populate = None;
            return self;
        };

        let mut paths = Vec::new();
        for path in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if self.config.relation(path).is_none() {
                self.warn(format!("dropped populate path {:?}", path));
            } else if !paths.iter().any(|p| p == path) {
                paths.push(path.to_string());
            }
        }
        self.populate = Some(paths);
        self
    }

    /// `search` as an OR of partial matches across `fields`, ANDed with every
    /// other condition. Only configured search fields are used; an empty slice
    /// means all of them.
    pub fn search(mut self, fields: &[&str]) -> Self {
        let Some(term) = self.params.get_trimmed("search").map(str::to_string) else {
            return self;
        };

        let fields: Vec<String> = if fields.is_empty() {
            self.config.search_fields.clone()
        } else {
            let mut allowed = Vec::new();
            for field in fields {
                if self.config.search_fields.iter().any(|f| f == field) {
                    allowed.push(field.to_string());
                } else {
                    self.warn(format!("dropped search field {:?}", field));
                }
            }
            allowed
        };
        if fields.is_empty() {
            self.warn(format!("search {:?} ignored, no searchable fields", term));
            return self;
        }

        let text = truncate_chars(&term, self.max_search_length).to_string();
        if text.len() < term.len() {
            self.note(format!("search truncated to {} characters", self.max_search_length));
        }

        self.conditions.push(Condition::Or(
            fields.iter().map(|field| Condition::contains_text(field.as_str(), &text)).collect(),
        ));
        self.search = Some(text);
        self
    }

    /// Read every rule's parameters and AND the usable ones in
    pub fn apply_filters(mut self, rules: &[FilterRule]) -> Self {
        let compiled = compile_all(rules, &self.params, self.max_search_length);

        if let Some(condition) = compiled.condition {
            self.conditions.push(condition);
        }
        for adjustment in compiled.adjustments {
            self.note(adjustment);
        }
        for rejection in compiled.rejections {
            self.reject(rejection);
        }
        for param in compiled.missing {
            if self.validation == ValidationMode::Strict && self.deferred.is_none() {
                self.deferred = Some(Deferred::Missing(param.clone()));
            }
            self.warn(format!("required filter {} missing", param));
        }
        self
    }

    /// Apply the entity's own filter rules
    pub fn apply_config_filters(self) -> Self {
        let config = Arc::clone(&self.config);
        self.apply_filters(&config.filters)
    }

    /// Server-side constraint, e.g. only active products on the storefront
    pub fn and_where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Every reading step with the config's own filters and search fields
    pub fn with_defaults(self) -> Self {
        self.paginate()
            .sort_by()
            .select_fields()
            .populate_fields()
            .search(&[])
            .apply_config_filters()
    }

    pub fn build(&self) -> QueryResult<ParsedQuery> {
        if let Some(deferred) = &self.deferred {
            return Err(deferred.into());
        }

        let sort = self
            .sort_override
            .clone()
            .or_else(|| self.sort.clone())
            .unwrap_or_else(|| self.config.default_sort.clone());

        Ok(ParsedQuery {
            entity: self.config.name.clone(),
            filter: Condition::all(self.conditions.iter().cloned()),
            sort,
            page: self.page,
            limit: self.limit,
            skip: PaginationMeta::skip(self.page, self.limit),
            search: self.search.clone(),
            projection: self.projection.clone().unwrap_or_else(|| self.config.default_projection.clone()),
            populate: self.populate.clone().unwrap_or_else(|| self.config.default_populate.clone()),
            warnings: self.warnings.clone(),
        })
    }

    /// Count and fetch with the same filter, then assemble the page
    pub async fn execute(&self) -> QueryResult<Paginated> {
        let query = self.build()?;
        let spec = query.to_find_spec(&self.config);

        let (total_items, documents) =
            futures::try_join!(self.model.count_documents(&spec.filter), self.model.find(&spec))?;

        log::debug!(
            "[{}] page {} ({} per page): {} of {} documents",
            query.entity,
            query.page,
            query.limit,
            documents.len(),
            total_items
        );

        Ok(Paginated { documents, pagination: PaginationMeta::new(query.page, query.limit, total_items) })
    }
}

/// Integer, or a finite decimal truncated toward zero
fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && n.abs() < i64::MAX as f64)
            .map(|n| n.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Scalar;
    use crate::filter::ArrayMatch;
    use crate::sort::SortKey;
    use crate::store::MemoryDatabase;
    use serde_json::json;

    fn builder(entity: Entity, query: &str) -> QueryBuilder {
        let db = MemoryDatabase::new();
        QueryBuilder::for_entity(&db.models(), &QueryConfigRegistry::storefront(), entity, RawParams::parse(query))
            .unwrap()
    }

    #[test]
    fn test_missing_model_fails_at_construction() {
        let err = QueryBuilder::for_entity(
            &ModelRegistry::new(),
            &QueryConfigRegistry::storefront(),
            Entity::Order,
            RawParams::new(),
        )
        .unwrap_err();
        assert!(matches!(err, QueryError::ModelNotRegistered(Entity::Order)));
    }

    #[test]
    fn test_paginate_defaults() {
        let query = builder(Entity::Product, "").paginate().build().unwrap();
        assert_eq!((query.page, query.limit, query.skip), (1, 12, 0));
    }

    #[test]
    fn test_paginate_caps_limit() {
        let query = builder(Entity::Product, "page=3&limit=1000").paginate().build().unwrap();
        assert_eq!((query.page, query.limit, query.skip), (3, 50, 100));
        assert_eq!(query.warnings, vec!["limit 1000 capped at 50".to_string()]);
    }

    #[test]
    fn test_paginate_ignores_garbage() {
        let query = builder(Entity::User, "page=-4&limit=abc").paginate().build().unwrap();
        assert_eq!((query.page, query.limit), (1, 10));

        let query = builder(Entity::User, "page=0&limit=0").paginate().build().unwrap();
        assert_eq!((query.page, query.limit), (1, 10));

        let query = builder(Entity::User, "page=2.7&limit=5").paginate().build().unwrap();
        assert_eq!((query.page, query.limit), (2, 5));
    }

    #[test]
    fn test_sort_by_whitelist_and_fallback() {
        let query = builder(Entity::Product, "sort=-price,password").sort_by().build().unwrap();
        assert_eq!(query.sort, SortSpec::new(vec![SortKey::desc("price")]));
        assert_eq!(query.warnings, vec!["dropped sort field \"password\"".to_string()]);

        let query = builder(Entity::Product, "sortBy=secret&sortOrder=asc").sort_by().build().unwrap();
        assert_eq!(query.sort, SortSpec::parse("-createdAt"));
    }

    #[test]
    fn test_sort_by_reports_malformed_tokens() {
        let query = builder(Entity::Product, "sort=price:,name").sort_by().build().unwrap();
        assert_eq!(query.sort, SortSpec::parse("name"));
        assert_eq!(query.warnings, vec!["dropped sort field \"price:\"".to_string()]);
    }

    #[test]
    fn test_with_sort_overrides() {
        let query = builder(Entity::Product, "sort=price")
            .sort_by()
            .with_sort(SortSpec::parse("-updatedAt"))
            .build()
            .unwrap();
        assert_eq!(query.sort, SortSpec::parse("-updatedAt"));
    }

    #[test]
    fn test_select_fields() {
        let query = builder(Entity::User, "fields=name,email,password").select_fields().build().unwrap();
        assert_eq!(
            query.projection,
            Projection::Include { fields: vec!["name".into(), "email".into()], with_id: true }
        );

        let query = builder(Entity::User, "fields=password").select_fields().build().unwrap();
        assert_eq!(query.projection, Projection::All);
        assert_eq!(query.warnings.len(), 1);
    }

    #[test]
    fn test_populate_fields() {
        let query = builder(Entity::Product, "").populate_fields().build().unwrap();
        assert_eq!(query.populate, vec!["category"]);

        let query = builder(Entity::Product, "populate=variants,owner,variants").populate_fields().build().unwrap();
        assert_eq!(query.populate, vec!["variants"]);

        let query = builder(Entity::Product, "populate=").populate_fields().build().unwrap();
        assert!(query.populate.is_empty());
    }

    #[test]
    fn test_search_is_or_within_and() {
        let query = builder(Entity::Product, "search=linen&isActive=true")
            .search(&["name", "sku"])
            .apply_config_filters()
            .build()
            .unwrap();
        assert_eq!(
            query.filter,
            Condition::And(vec![
                Condition::Or(vec![Condition::contains_text("name", "linen")]),
                Condition::eq("isActive", Scalar::Bool(true)),
            ])
        );
        assert_eq!(query.search.as_deref(), Some("linen"));
        assert_eq!(query.warnings, vec!["dropped search field \"sku\"".to_string()]);
    }

    #[test]
    fn test_search_uses_config_fields_and_truncates() {
        let settings = QuerySettings { max_search_length: 4, ..QuerySettings::default() };
        let query = builder(Entity::User, "search=someone@shop.test")
            .with_settings(&settings)
            .search(&[])
            .build()
            .unwrap();
        assert_eq!(query.search.as_deref(), Some("some"));
        match &query.filter {
            Condition::And(children) => match &children[..] {
                [Condition::Or(fields)] => assert_eq!(fields.len(), 3),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_search_is_noop() {
        let query = builder(Entity::Product, "search=%20%20").search(&[]).build().unwrap();
        assert!(query.filter.is_match_all());
        assert_eq!(query.search, None);
    }

    #[test]
    fn test_lenient_drops_bad_values() {
        let query = builder(Entity::Product, "minPrice=abc&maxPrice=500&category=nope")
            .apply_config_filters()
            .build()
            .unwrap();
        assert_eq!(
            query.filter,
            Condition::And(vec![Condition::Range {
                field: "price".into(),
                min: None,
                max: Some(Scalar::Number(500.0)),
            }])
        );
        assert_eq!(query.warnings.len(), 2);
    }

    #[test]
    fn test_strict_rejects_bad_values() {
        let settings = QuerySettings { validation: ValidationMode::Strict, ..QuerySettings::default() };
        let err = builder(Entity::Product, "minPrice=abc")
            .with_settings(&settings)
            .apply_config_filters()
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilterValue { ref param, .. } if param == "minPrice"));

        let query = builder(Entity::Product, "limit=500")
            .with_settings(&settings)
            .paginate()
            .build()
            .unwrap();
        assert_eq!(query.limit, 50);
    }

    #[test]
    fn test_required_filter() {
        let rules = vec![FilterRule::object_id("product").required()];
        let query = builder(Entity::Review, "").apply_filters(&rules).build().unwrap();
        assert_eq!(query.warnings, vec!["required filter product missing".to_string()]);

        let settings = QuerySettings { validation: ValidationMode::Strict, ..QuerySettings::default() };
        let err = builder(Entity::Review, "")
            .with_settings(&settings)
            .apply_filters(&rules)
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::MissingRequiredFilter(ref p) if p == "product"));
    }

    #[test]
    fn test_custom_rules_and_constraints() {
        let rules = vec![FilterRule::array("materials", ArrayMatch::All)];
        let query = builder(Entity::Product, "materials=linen,cotton")
            .apply_filters(&rules)
            .and_where(Condition::eq("isActive", Scalar::Bool(true)))
            .build()
            .unwrap();
        assert_eq!(query.filter.to_mongo(), json!({"$and": [
            {"materials": {"$all": ["linen", "cotton"]}},
            {"isActive": true}
        ]}));
    }

    #[test]
    fn test_parsed_query_serializes() {
        let query = builder(Entity::Product, "minPrice=10&sort=price&fields=name")
            .with_defaults()
            .build()
            .unwrap();
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["entity"], "product");
        assert_eq!(json["filter"], json!({"price": {"$gte": 10}}));
        assert_eq!(json["sort"], json!({"price": 1}));
        assert_eq!(json["projection"], json!({"name": 1}));
        assert_eq!(json["populate"], json!(["category"]));
        assert!(json.get("warnings").is_none());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("12.9"), Some(12));
        assert_eq!(parse_integer("1e3"), Some(1000));
        assert_eq!(parse_integer("12abc"), None);
        assert_eq!(parse_integer("inf"), None);
    }
}
