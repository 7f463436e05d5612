use boutique_core::Entity;
use cucumber::when;

use crate::features::world::BoutiqueWorld;

fn entity(collection: &str) -> Entity {
    collection.parse().expect("known collection")
}

async fn list_under(world: &mut BoutiqueWorld, prefix: &str, collection: &str, query: &str) {
    let entity = entity(collection);
    let path = format!("{}/{}", prefix, entity.collection_name());
    world.list(entity, &path, query).await;
}

#[when(expr = "a shopper lists {word} with {string}")]
async fn storefront(world: &mut BoutiqueWorld, collection: String, query: String) {
    list_under(world, "", &collection, &query).await;
}

#[when(expr = "a shopper lists {word}")]
async fn storefront_plain(world: &mut BoutiqueWorld, collection: String) {
    list_under(world, "", &collection, "").await;
}

#[when(expr = "an admin lists {word} with {string}")]
async fn admin(world: &mut BoutiqueWorld, collection: String, query: String) {
    list_under(world, "/admin", &collection, &query).await;
}

#[when(expr = "an admin lists {word}")]
async fn admin_plain(world: &mut BoutiqueWorld, collection: String) {
    list_under(world, "/admin", &collection, "").await;
}

#[when(expr = "{word} is requested at {string} with {string}")]
async fn at_path(world: &mut BoutiqueWorld, collection: String, path: String, query: String) {
    world.list(entity(&collection), &path, &query).await;
}

#[when("the same request is repeated")]
async fn repeat(world: &mut BoutiqueWorld) {
    let (entity, path, query) = world.last_request.clone().expect("a previous request");
    world.list(entity, &path, &query).await;
}
