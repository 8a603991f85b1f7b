//! Engine error types.

use thiserror::Error;

/// Schema resolution failures: the caller's filter, sort, or mutation
/// references something the schema does not define. Raised before any
/// store call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The entity type is not defined.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// A field path does not resolve on the entity.
    #[error("unknown field '{path}' on entity '{entity}'")]
    UnknownField { entity: String, path: String },

    /// A relation name does not resolve on the entity.
    #[error("unknown relation '{relation}' on entity '{entity}'")]
    UnknownRelation { entity: String, relation: String },

    /// An operation requires a different field type.
    #[error("field '{field}' on entity '{entity}' is not {expected}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: &'static str,
    },
}

/// A failure inside the storage collaborator, tagged with the operation
/// that was running. Never retried here; propagated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("store error during {operation}: {message}")]
pub struct StoreError {
    /// The failing store operation ("query", "count", "mutation", "session").
    pub operation: &'static str,
    /// Backend-provided failure detail.
    pub message: String,
}

impl StoreError {
    /// Create a store error for an operation.
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Engine errors surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Filter/sort/mutation referenced something the schema lacks.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid page parameters.
    #[error("invalid page request: {0}")]
    Paging(String),

    /// The storage collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
