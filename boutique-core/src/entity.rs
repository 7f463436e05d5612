//! Queryable entity types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Every entity type exposed through a listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Product,
    User,
    Order,
    Category,
    Review,
    Post,
    Banner,
    Variant,
}

impl Entity {
    pub const ALL: [Entity; 8] = [
        Entity::Product,
        Entity::User,
        Entity::Order,
        Entity::Category,
        Entity::Review,
        Entity::Post,
        Entity::Banner,
        Entity::Variant,
    ];

    /// Singular lowercase name, used as the config key
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Product => "product",
            Entity::User => "user",
            Entity::Order => "order",
            Entity::Category => "category",
            Entity::Review => "review",
            Entity::Post => "post",
            Entity::Banner => "banner",
            Entity::Variant => "variant",
        }
    }

    /// Name of the backing document collection
    pub fn collection_name(&self) -> &'static str {
        match self {
            Entity::Product => "products",
            Entity::User => "users",
            Entity::Order => "orders",
            Entity::Category => "categories",
            Entity::Review => "reviews",
            Entity::Post => "posts",
            Entity::Banner => "banners",
            Entity::Variant => "variants",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = QueryError;

    /// Accepts singular or collection names in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Entity::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == needle || e.collection_name() == needle)
            .ok_or_else(|| QueryError::UnknownEntity(s.to_string()))
    }
}
