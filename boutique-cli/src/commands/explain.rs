use anyhow::Result;
use boutique_core::{Entity, MemoryDatabase};

use super::{RequestArgs, Session};

pub fn run(entity: Entity, args: &RequestArgs) -> Result<String> {
    let session = Session::load(args.config.as_deref())?;
    explain(&session, entity, args)
}

pub(crate) fn explain(session: &Session, entity: Entity, args: &RequestArgs) -> Result<String> {
    // Nothing is fetched; the models only satisfy construction
    let models = MemoryDatabase::new().models();
    let query = session.builder(&models, entity, &args.context())?.build()?;
    Ok(serde_json::to_string_pretty(&query)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boutique_core::config::BoutiqueConfig;
    use boutique_core::{AdminSortPolicy, QueryConfigRegistry};
    use serde_json::{json, Value};

    fn session() -> Session {
        let config = BoutiqueConfig::default();
        Session {
            registry: QueryConfigRegistry::storefront(),
            policy: AdminSortPolicy::from_config(&config.admin),
            config,
        }
    }

    fn explain_json(entity: Entity, query: &str, path: &str) -> Value {
        let args = RequestArgs { query: query.into(), path: path.into(), ..Default::default() };
        serde_json::from_str(&explain(&session(), entity, &args).unwrap()).unwrap()
    }

    #[test]
    fn explain_product_filters() {
        let out = explain_json(Entity::Product, "minPrice=100000&maxPrice=500000&colors=red,blue&page=2", "/products");
        assert_eq!(out["filter"], json!({"$and": [
            {"price": {"$gte": 100000, "$lte": 500000}},
            {"colors": {"$in": ["red", "blue"]}}
        ]}));
        assert_eq!(out["skip"], 12);
        assert_eq!(out["sort"], json!({"createdAt": -1}));
    }

    #[test]
    fn explain_admin_sort() {
        let out = explain_json(Entity::User, "sort=password", "/admin/users");
        assert_eq!(out["sort"], json!({"createdAt": -1, "updatedAt": -1}));
        assert_eq!(out["warnings"], json!(["dropped sort field \"password\""]));
    }
}
