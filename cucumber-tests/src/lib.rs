//! Behaviour scenarios for listing queries, run by `tests/cucumber_tests.rs`

pub mod features;
