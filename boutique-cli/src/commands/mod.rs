pub mod entities;
pub mod explain;
pub mod query;

use anyhow::{Context, Result};
use boutique_core::config::BoutiqueConfig;
use boutique_core::logging::init_logging;
use boutique_core::{
    AdminSortPolicy, AuthContext, Entity, ModelRegistry, QueryBuilder, QueryConfigRegistry, RawParams,
    RequestContext,
};
use clap::Args;
use std::path::{Path, PathBuf};

/// Flags describing the request being simulated
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Raw query string, e.g. "minPrice=100&sort=-price"
    #[arg(long, short = 'q', default_value = "")]
    pub query: String,

    /// Request path; admin prefixes switch on the admin sort policy
    #[arg(long, default_value = "/")]
    pub path: String,

    /// Caller role (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,

    /// Config file (defaults to ./boutique.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RequestArgs {
    pub fn context(&self) -> RequestContext {
        let auth = if self.roles.is_empty() {
            AuthContext::anonymous()
        } else {
            AuthContext::authenticated("cli", self.roles.clone())
        };
        RequestContext::new(&self.path, auth, RawParams::parse(&self.query))
    }
}

/// Loaded configuration plus everything derived from it
pub struct Session {
    pub config: BoutiqueConfig,
    pub registry: QueryConfigRegistry,
    pub policy: AdminSortPolicy,
}

impl Session {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let mut config = BoutiqueConfig::from_file(path)?;
                config.apply_env_vars();
                config
            }
            None => BoutiqueConfig::load()?,
        };
        config.validate().context("Invalid configuration")?;
        init_logging(&config.logging)?;

        let registry = QueryConfigRegistry::storefront().with_overrides(&config.query);
        let policy = AdminSortPolicy::from_config(&config.admin);
        Ok(Self { config, registry, policy })
    }

    /// Builder with every reading step applied, and the admin policy when the
    /// request is administrative
    pub fn builder(&self, models: &ModelRegistry, entity: Entity, ctx: &RequestContext) -> Result<QueryBuilder> {
        let builder = QueryBuilder::for_entity(models, &self.registry, entity, ctx.params.clone())?
            .with_settings(&self.config.query)
            .with_defaults();

        if self.policy.is_admin_context(ctx) {
            log::debug!("Admin context for {}", ctx.path);
            Ok(self.policy.apply(ctx, builder))
        } else {
            Ok(builder)
        }
    }
}
