use boutique_core::document::{compare_values, get_path};
use cucumber::then;

use crate::features::world::BoutiqueWorld;

#[then(expr = "the page has {int} documents")]
async fn page_size(world: &mut BoutiqueWorld, count: usize) {
    assert_eq!(world.result().documents.len(), count);
}

#[then(expr = "the documents are {string}")]
async fn documents(world: &mut BoutiqueWorld, expected: String) {
    let expected: Vec<String> = expected.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
    assert_eq!(world.names(), expected);
}

#[then(expr = "the documents are {word} through {word}")]
async fn document_span(world: &mut BoutiqueWorld, first: String, last: String) {
    let names = world.names();
    assert_eq!(names.first(), Some(&first), "{:?}", names);
    assert_eq!(names.last(), Some(&last), "{:?}", names);
}

#[then(expr = "pagination reports {int} items over {int} pages")]
async fn totals(world: &mut BoutiqueWorld, items: u64, pages: u64) {
    let meta = world.result().pagination;
    assert_eq!((meta.total_items, meta.total_pages), (items, pages));
}

#[then(expr = "the page is {int} with limit {int}")]
async fn position(world: &mut BoutiqueWorld, page: u32, limit: u32) {
    let meta = world.result().pagination;
    assert_eq!((meta.page, meta.limit), (page, limit));
}

#[then("there is a next page")]
async fn has_next(world: &mut BoutiqueWorld) {
    assert!(world.result().pagination.has_next_page);
}

#[then("there is no next page")]
async fn no_next(world: &mut BoutiqueWorld) {
    assert!(!world.result().pagination.has_next_page);
}

#[then("there is a previous page")]
async fn has_prev(world: &mut BoutiqueWorld) {
    assert!(world.result().pagination.has_prev_page);
}

#[then("there is no previous page")]
async fn no_prev(world: &mut BoutiqueWorld) {
    assert!(!world.result().pagination.has_prev_page);
}

#[then(expr = "the applied sort is {string}")]
async fn applied_sort(world: &mut BoutiqueWorld, sort: String) {
    let query = world.last_query.as_ref().expect("a built query");
    assert_eq!(query.sort.to_string(), sort);
}

#[then(expr = "the documents are ordered by {word} descending")]
async fn ordered_desc(world: &mut BoutiqueWorld, field: String) {
    let docs = &world.result().documents;
    for pair in docs.windows(2) {
        let ord = compare_values(get_path(&pair[0], &field), get_path(&pair[1], &field));
        assert!(ord.is_gt(), "{} not strictly descending: {} then {}", field, pair[0], pair[1]);
    }
}

#[then(expr = "no document exposes {string}")]
async fn hidden(world: &mut BoutiqueWorld, field: String) {
    assert!(world.result().documents.iter().all(|d| d.get(&field).is_none()));
}

#[then("the request succeeds with warnings")]
async fn warned(world: &mut BoutiqueWorld) {
    assert!(world.last_error.is_none(), "{:?}", world.last_error);
    let query = world.last_query.as_ref().expect("a built query");
    assert!(!query.warnings.is_empty());
}

#[then(expr = "the request fails mentioning {string}")]
async fn failed(world: &mut BoutiqueWorld, text: String) {
    let error = world.last_error.as_ref().expect("an error");
    assert!(error.contains(&text), "{}", error);
}

#[then("both responses are identical")]
async fn identical(world: &mut BoutiqueWorld) {
    let previous = world.previous_result.as_ref().expect("a previous response");
    assert_eq!(previous, world.result());
}
