use boutique_core::{Entity, MemoryDatabase, QueryBuilder, QueryConfigRegistry, RawParams};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::hint::black_box;

const COLORS: &[&str] = &["red", "blue", "black", "white", "green"];

async fn catalogue(size: usize) -> MemoryDatabase {
    let db = MemoryDatabase::new();
    let docs = (0..size).map(|i| {
        json!({
            "name": format!("Product {} {}", i, if i % 7 == 0 { "linen" } else { "cotton" }),
            "price": 50_000 + (i % 100) * 10_000,
            "colors": [COLORS[i % COLORS.len()], COLORS[(i / 5) % COLORS.len()]],
            "isActive": i % 10 != 0,
            "createdAt": 1_704_067_200_000_i64 + i as i64 * 60_000,
        })
    });
    db.insert_many(Entity::Product, docs).await.expect("seed catalogue");
    db
}

fn benchmark_execute(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let configs = QueryConfigRegistry::storefront();

    let mut group = c.benchmark_group("memory_execute");
    group.sample_size(30);

    for size in [1_000, 10_000] {
        let db = runtime.block_on(catalogue(size));
        let models = db.models();

        for (name, query) in [
            ("default", ""),
            ("price_colors_page2", "minPrice=100000&maxPrice=500000&colors=red,blue&page=2&limit=12"),
            ("search_active", "search=linen&isActive=true&sort=-price"),
        ] {
            group.bench_with_input(BenchmarkId::new(name, size), &query, |b, query| {
                b.to_async(&runtime).iter(|| async {
                    let builder =
                        QueryBuilder::for_entity(&models, &configs, Entity::Product, RawParams::parse(query))
                            .expect("product model registered")
                            .with_defaults();
                    black_box(builder.execute().await.expect("query runs"))
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_execute);
criterion_main!(benches);
