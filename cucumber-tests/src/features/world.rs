use boutique_core::config::QuerySettings;
use boutique_core::{
    AdminSortPolicy, AuthContext, Entity, MemoryDatabase, Paginated, ParsedQuery, QueryBuilder,
    QueryConfigRegistry, RawParams, RequestContext,
};
use cucumber::World;

/// State shared by the steps of one scenario
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct BoutiqueWorld {
    pub db: MemoryDatabase,
    pub registry: QueryConfigRegistry,
    pub policy: AdminSortPolicy,
    pub settings: QuerySettings,
    pub roles: Vec<String>,
    pub last_request: Option<(Entity, String, String)>,
    pub last_query: Option<ParsedQuery>,
    pub last_result: Option<Paginated>,
    pub previous_result: Option<Paginated>,
    pub last_error: Option<String>,
}

impl BoutiqueWorld {
    pub fn new() -> Self {
        Self {
            db: MemoryDatabase::new(),
            registry: QueryConfigRegistry::storefront(),
            policy: AdminSortPolicy::default(),
            settings: QuerySettings::default(),
            roles: Vec::new(),
            last_request: None,
            last_query: None,
            last_result: None,
            previous_result: None,
            last_error: None,
        }
    }

    /// Run one listing request the way a route handler would
    pub async fn list(&mut self, entity: Entity, path: &str, query: &str) {
        let auth = if self.roles.is_empty() {
            AuthContext::anonymous()
        } else {
            AuthContext::authenticated("scenario", self.roles.clone())
        };
        let ctx = RequestContext::new(path, auth, RawParams::parse(query));

        let builder = match QueryBuilder::for_entity(&self.db.models(), &self.registry, entity, ctx.params.clone()) {
            Ok(builder) => builder.with_settings(&self.settings).with_defaults(),
            Err(e) => {
                self.last_error = Some(e.to_string());
                return;
            }
        };
        let builder = if self.policy.is_admin_context(&ctx) { self.policy.apply(&ctx, builder) } else { builder };

        self.last_request = Some((entity, path.to_string(), query.to_string()));
        self.last_query = builder.build().ok();
        self.previous_result = self.last_result.take();
        match builder.execute().await {
            Ok(result) => {
                self.last_result = Some(result);
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e.to_string()),
        }
    }

    pub fn result(&self) -> &Paginated {
        match (&self.last_result, &self.last_error) {
            (Some(result), _) => result,
            (None, Some(error)) => panic!("request failed: {}", error),
            (None, None) => panic!("no request was made"),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.result()
            .documents
            .iter()
            .map(|d| d["name"].as_str().or_else(|| d["title"].as_str()).unwrap_or_default().to_string())
            .collect()
    }
}

impl Default for BoutiqueWorld {
    fn default() -> Self {
        Self::new()
    }
}
