use anyhow::{Context, Result};
use boutique_core::{Entity, MemoryDatabase};
use serde_json::Value;
use std::path::Path;

use super::{RequestArgs, Session};

pub async fn run(entity: Entity, data: &Path, args: &RequestArgs) -> Result<String> {
    let session = Session::load(args.config.as_deref())?;
    let db = load_fixtures(data).await?;
    let result = session.builder(&db.models(), entity, &args.context())?.execute().await?;
    Ok(serde_json::to_string_pretty(&result)?)
}

/// Load every `<collection>.json` array found in `dir`
pub(crate) async fn load_fixtures(dir: &Path) -> Result<MemoryDatabase> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let db = MemoryDatabase::new();
    for entity in Entity::ALL {
        let path = dir.join(format!("{}.json", entity.collection_name()));
        if !path.exists() {
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let docs: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("{} must hold a JSON array of documents", path.display()))?;
        log::info!("Loaded {} {} from {}", docs.len(), entity.collection_name(), path.display());
        db.insert_many(entity, docs).await?;
    }
    Ok(db)
}
