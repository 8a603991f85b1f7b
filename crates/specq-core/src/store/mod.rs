//! The storage collaborator boundary.
//!
//! The engine consumes a narrow, object-safe interface: acquire a session,
//! run a content query, a count query, or a set-based mutation against it.
//! Connection pooling, transactions, and retries live behind this boundary,
//! not in the engine.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::query::{CompiledMutation, CompiledQuery};
use specq_ir::Row;

/// One acquired unit of store access.
///
/// A session is held for the scope of a single executor call and released
/// on drop, on every exit path. Count and content queries issued on the
/// same session must observe the same logical snapshot of the data; a
/// backend that cannot pin a snapshot per session must document the
/// count/content race as a known limitation.
pub trait StoreSession {
    /// Run a content query: filter, order, and slice applied.
    fn execute_query(&self, query: &CompiledQuery) -> Result<Vec<Row>, StoreError>;

    /// Count the rows matching a query's filter. Order, limit, offset, and
    /// fetch projections are ignored.
    fn execute_count(&self, query: &CompiledQuery) -> Result<u64, StoreError>;

    /// Apply a set-based mutation, returning the affected row count.
    fn execute_mutation(&self, mutation: &CompiledMutation) -> Result<u64, StoreError>;
}

/// A store backend that hands out sessions.
pub trait Store {
    /// Acquire a session for one executor call.
    fn session(&self) -> Result<Box<dyn StoreSession + '_>, StoreError>;
}
