pub mod dataset_steps;
pub mod listing_steps;
pub mod result_steps;
