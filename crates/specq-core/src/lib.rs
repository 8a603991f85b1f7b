//! specq core - specification engine and paged query executor.
//!
//! Callers describe their schema, build specifications, combine them, and
//! hand the resulting predicate to the executor together with page and
//! sort parameters. The executor compiles everything up front (schema
//! failures never reach the store), then runs a content query and a count
//! query on one store session and assembles a page result.

pub mod error;
pub mod query;
pub mod schema;
pub mod spec;
pub mod store;

pub use error::{Error, SchemaError, StoreError};
pub use query::{CompiledMutation, CompiledQuery, Compiler, Executor};
pub use schema::{Cardinality, EntityDef, FieldDef, RelationDef, ScalarType, Schema};
pub use spec::{all_of, any_of, not, related, related_left, Specification};
pub use store::{MemoryStore, Store, StoreSession};

/// Re-export the query IR.
pub use specq_ir as ir;
