//! Admin listing sort policy
//!
//! Administrative listings must page deterministically: the resolved sort
//! always ends on `createdAt` descending, so documents sharing a sort value
//! cannot repeat or vanish between pages. Storefront callers get their
//! whitelisted sort or plain newest-first.

use crate::builder::QueryBuilder;
use crate::config::AdminConfig;
use crate::entity::Entity;
use crate::params::RawParams;
use crate::registry::{EntityQueryConfig, QueryConfigRegistry};
use crate::sort::{requested_sort, resolve_sort, SortKey, SortSpec};

/// Who is calling
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Option<String>,
    pub roles: Vec<String>,
    pub authenticated: bool,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self { user_id: Some(user_id.into()), roles, authenticated: true }
    }

    /// Case-insensitive role check
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

/// The parts of an incoming listing request the policy looks at
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub path: String,
    pub auth: AuthContext,
    pub params: RawParams,
}

impl RequestContext {
    pub fn new(path: impl Into<String>, auth: AuthContext, params: RawParams) -> Self {
        Self { path: path.into(), auth, params }
    }

    /// Split `/admin/users?sort=-name` into path and parameters
    pub fn from_url(url: &str, auth: AuthContext) -> Self {
        let (path, params) = RawParams::split_path_and_query(url);
        Self { path, auth, params }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSortPolicy {
    path_prefixes: Vec<String>,
    roles: Vec<String>,
}

impl Default for AdminSortPolicy {
    fn default() -> Self {
        Self::from_config(&AdminConfig::default())
    }
}

impl AdminSortPolicy {
    pub fn from_config(config: &AdminConfig) -> Self {
        let path_prefixes = config
            .path_prefixes
            .iter()
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { path_prefixes, roles: config.roles.clone() }
    }

    /// Path equal to or nested under an admin prefix, or an admin role
    pub fn is_admin_context(&self, ctx: &RequestContext) -> bool {
        let path = ctx.path.split(['?', '#']).next().unwrap_or_default();
        let by_path = self.path_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });
        by_path || self.roles.iter().any(|role| ctx.auth.has_role(role))
    }

    /// Resolve the sort for one listing request.
    ///
    /// Requested fields outside the entity's sortable list are dropped. In an
    /// admin context an empty result falls back to `-createdAt,-updatedAt` and
    /// `-createdAt` is appended when missing; otherwise an empty result is
    /// `-createdAt` alone.
    pub fn ensure_admin_sort(&self, ctx: &RequestContext, config: &EntityQueryConfig) -> SortSpec {
        let admin = self.is_admin_context(ctx);
        let resolved = resolve_sort(requested_sort(&ctx.params), &config.sortable_fields);
        for field in &resolved.rejected {
            log::warn!("[{}] dropped sort field {:?} for {}", config.name, field, ctx.path);
        }

        let mut sort = resolved.spec;
        if !admin {
            if sort.is_empty() {
                sort.push(SortKey::desc("createdAt"));
            }
            return sort;
        }

        if sort.is_empty() {
            sort = SortSpec::new(vec![SortKey::desc("createdAt"), SortKey::desc("updatedAt")]);
        }
        if !sort.contains("createdAt") {
            sort.push(SortKey::desc("createdAt"));
        }
        log::debug!("[{}] admin sort {}", config.name, sort);
        sort
    }

    /// Install the resolved sort on `builder`, overriding its own `sort_by`
    pub fn apply(&self, ctx: &RequestContext, builder: QueryBuilder) -> QueryBuilder {
        let sort = self.ensure_admin_sort(ctx, builder.config());
        builder.with_sort(sort)
    }
}

/// [`AdminSortPolicy::ensure_admin_sort`] with the default policy
pub fn ensure_admin_sort(ctx: &RequestContext, registry: &QueryConfigRegistry, entity: Entity) -> SortSpec {
    AdminSortPolicy::default().ensure_admin_sort(ctx, &registry.get(entity))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin(url: &str) -> RequestContext {
        RequestContext::from_url(url, AuthContext::anonymous())
    }

    fn users() -> std::sync::Arc<EntityQueryConfig> {
        QueryConfigRegistry::storefront().get(Entity::User)
    }

    #[test]
    fn test_admin_context_by_path() {
        let policy = AdminSortPolicy::default();
        assert!(policy.is_admin_context(&admin("/admin")));
        assert!(policy.is_admin_context(&admin("/admin/users?page=2")));
        assert!(policy.is_admin_context(&admin("/api/admin/orders")));
        assert!(!policy.is_admin_context(&admin("/administrator")));
        assert!(!policy.is_admin_context(&admin("/products")));
    }

    #[test]
    fn test_admin_context_by_role() {
        let policy = AdminSortPolicy::default();
        let ctx = RequestContext::new("/products", AuthContext::authenticated("u1", vec!["Admin".into()]), RawParams::new());
        assert!(policy.is_admin_context(&ctx));

        let ctx = RequestContext::new("/products", AuthContext::authenticated("u2", vec!["user".into()]), RawParams::new());
        assert!(!policy.is_admin_context(&ctx));
    }

    #[test]
    fn test_admin_without_sort_is_newest_first() {
        let sort = AdminSortPolicy::default().ensure_admin_sort(&admin("/admin/users"), &users());
        assert_eq!(sort, SortSpec::parse("-createdAt,-updatedAt"));
    }

    #[test]
    fn test_admin_non_whitelisted_sort_falls_back() {
        let sort = AdminSortPolicy::default().ensure_admin_sort(&admin("/admin/users?sort=password"), &users());
        assert_eq!(sort, SortSpec::parse("-createdAt,-updatedAt"));
    }

    #[test]
    fn test_admin_sort_gets_tiebreaker() {
        let sort = AdminSortPolicy::default()
            .ensure_admin_sort(&admin("/admin/users?sortBy=name&sortOrder=asc"), &users());
        assert_eq!(sort, SortSpec::parse("name,-createdAt"));

        let sort = AdminSortPolicy::default().ensure_admin_sort(&admin("/admin/users?sort=createdAt"), &users());
        assert_eq!(sort, SortSpec::parse("createdAt"));
    }

    #[test]
    fn test_storefront_sort() {
        let policy = AdminSortPolicy::default();
        assert_eq!(policy.ensure_admin_sort(&admin("/users"), &users()), SortSpec::parse("-createdAt"));
        assert_eq!(policy.ensure_admin_sort(&admin("/users?sort=name"), &users()), SortSpec::parse("name"));
        assert_eq!(
            policy.ensure_admin_sort(&admin("/users?sort=password"), &users()),
            SortSpec::parse("-createdAt")
        );
    }

    #[test]
    fn test_custom_config() {
        let policy = AdminSortPolicy::from_config(&AdminConfig {
            path_prefixes: vec!["/backoffice/".into()],
            roles: vec!["staff".into()],
        });
        assert!(policy.is_admin_context(&admin("/backoffice/orders")));
        assert!(!policy.is_admin_context(&admin("/admin/orders")));
    }

    #[test]
    fn test_free_function_uses_registry() {
        let registry = QueryConfigRegistry::storefront();
        let sort = ensure_admin_sort(&admin("/admin/products?sort=-price"), &registry, Entity::Product);
        assert_eq!(sort, SortSpec::parse("-price,-createdAt"));
    }
}
