//! Error types for query building and execution

use crate::entity::Entity;
use crate::store::StoreError;

/// Query result type
pub type QueryResult<T> = Result<T, QueryError>;

/// Failures surfaced to callers.
///
/// Malformed filter values never produce an error in lenient mode; they are
/// dropped and reported as warnings on the parsed query instead.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
    #[error("No model registered for entity {0}")]
    ModelNotRegistered(Entity),
    #[error("Invalid value for {param}: {value:?} ({reason})")]
    InvalidFilterValue { param: String, value: String, reason: String },
    #[error("Missing required filter: {0}")]
    MissingRequiredFilter(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
