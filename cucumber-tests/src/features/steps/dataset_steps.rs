use boutique_core::config::ValidationMode;
use boutique_core::Entity;
use cucumber::gherkin::Step;
use cucumber::given;
use serde_json::{json, Map, Value};

use crate::features::world::BoutiqueWorld;

/// Epoch milliseconds, `n` days after 2024-01-01T08:00:00Z
fn day(n: u32) -> i64 {
    (1_704_096_000 + i64::from(n) * 86_400) * 1000
}

#[given(expr = "{int} products priced between {int} and {int} in red or blue")]
async fn matching_products(world: &mut BoutiqueWorld, count: u32, low: u32, high: u32) {
    let step = (high - low) / count.max(1);
    for i in 1..=count {
        let color = if i % 2 == 0 { "red" } else { "blue" };
        world
            .db
            .insert(
                Entity::Product,
                json!({
                    "name": format!("P{:02}", i),
                    "price": low + step * (i - 1),
                    "colors": [color],
                    "isActive": true,
                    "createdAt": day(i),
                }),
            )
            .await
            .expect("insert product");
    }
}

#[given(expr = "{int} products that are too cheap, too expensive or green")]
async fn noise_products(world: &mut BoutiqueWorld, count: u32) {
    for i in 0..count {
        let (price, color) = match i % 3 {
            0 => (10, "red"),
            1 => (900_000, "blue"),
            _ => (200_000, "green"),
        };
        world
            .db
            .insert(
                Entity::Product,
                json!({"name": format!("N{:02}", i), "price": price, "colors": [color], "isActive": true}),
            )
            .await
            .expect("insert product");
    }
}

#[given(expr = "{int} users created on consecutive days")]
async fn users(world: &mut BoutiqueWorld, count: u32) {
    for i in 1..=count {
        world
            .db
            .insert(
                Entity::User,
                json!({
                    "name": format!("U{:02}", i),
                    "email": format!("u{:02}@shop.test", i),
                    "role": "user",
                    "password": "$2b$10$hash",
                    "resetPasswordToken": "token",
                    "createdAt": day(i),
                }),
            )
            .await
            .expect("insert user");
    }
}

#[given(expr = "{int} users inserted without timestamps")]
async fn unstamped_users(world: &mut BoutiqueWorld, count: u32) {
    for i in 1..=count {
        world
            .db
            .insert(Entity::User, json!({"name": format!("U{:02}", i), "role": "user"}))
            .await
            .expect("insert user");
    }
}

/// Table cells become strings, numbers or booleans
fn cell(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    Value::String(raw.to_string())
}

#[given(expr = "the following {word}:")]
async fn table(world: &mut BoutiqueWorld, collection: String, step: &Step) {
    let entity: Entity = collection.parse().expect("known collection");
    let table = step.table.as_ref().expect("a data table");
    let mut rows = table.rows.iter();
    let header = rows.next().expect("a header row");

    for row in rows {
        let doc: Map<String, Value> =
            header.iter().zip(row).filter(|(_, v)| !v.is_empty()).map(|(k, v)| (k.clone(), cell(v))).collect();
        world.db.insert(entity, Value::Object(doc)).await.expect("insert row");
    }
}

#[given("strict validation")]
async fn strict(world: &mut BoutiqueWorld) {
    world.settings.validation = ValidationMode::Strict;
}

#[given(expr = "the caller has the {string} role")]
async fn role(world: &mut BoutiqueWorld, role_name: String) {
    world.roles.push(role_name);
}
