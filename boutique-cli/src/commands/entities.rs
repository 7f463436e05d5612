use anyhow::Result;
use boutique_core::registry::EntityQueryConfig;
use std::fmt::Write;
use std::path::Path;

use super::Session;

pub fn run(config: Option<&Path>, json: bool) -> Result<String> {
    let session = Session::load(config)?;
    let configs: Vec<_> = session.registry.entities().into_iter().map(|e| session.registry.get(e)).collect();

    if json {
        let configs: Vec<&EntityQueryConfig> = configs.iter().map(|c| c.as_ref()).collect();
        return Ok(serde_json::to_string_pretty(&configs)?);
    }
    Ok(configs.iter().map(|c| describe(c)).collect::<Vec<_>>().join("\n"))
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn describe(config: &EntityQueryConfig) -> String {
    let params: Vec<String> =
        config.filters.iter().flat_map(|rule| rule.params()).map(str::to_string).collect();
    let relations: Vec<String> = config.relations.iter().map(|r| r.path.clone()).collect();

    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(
        out,
        "{} (limit {}/{}, sort {})",
        config.name, config.default_limit, config.max_limit, config.default_sort
    );
    let _ = writeln!(out, "  filters:  {}", list(&params));
    let _ = writeln!(out, "  search:   {}", list(&config.search_fields));
    let _ = writeln!(out, "  sortable: {}", list(&config.sortable_fields));
    let _ = writeln!(out, "  populate: {}", list(&relations));
    if !config.hidden_fields.is_empty() {
        let _ = writeln!(out, "  hidden:   {}", list(&config.hidden_fields));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use boutique_core::{Entity, QueryConfigRegistry};

    #[test]
    fn describe_product() {
        let text = describe(&QueryConfigRegistry::storefront().get(Entity::Product));
        assert!(text.starts_with("product (limit 12/50, sort -createdAt)"));
        assert!(text.contains("minPrice, maxPrice"));
        assert!(text.contains("populate: category, variants"));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn describe_user_lists_hidden_fields() {
        let text = describe(&QueryConfigRegistry::storefront().get(Entity::User));
        assert!(text.contains("hidden:   password"));
        assert!(text.contains("populate: -"));
    }
}
