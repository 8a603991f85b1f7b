//! The paged query executor.
//!
//! Compiles a query once, acquires one store session, and issues the
//! content and count queries against it. The session is released on every
//! exit path when the `Box` drops.

use tracing::warn;

use super::compile::{Compiler, CompiledQuery};
use crate::error::{Error, StoreError};
use crate::schema::Schema;
use crate::store::Store;
use specq_ir::{BulkUpdate, OrderSpec, PageRequest, PageResult, Predicate, Query, Row, UpdateMode};

/// Executes queries and bulk updates against a store, validating against a
/// schema first.
///
/// The executor holds no state between calls: no caching, no retries, no
/// connection. Values passed in are borrowed only for the duration of the
/// call.
pub struct Executor<'a> {
    store: &'a dyn Store,
    schema: &'a Schema,
}

impl<'a> Executor<'a> {
    /// Create an executor over a store and schema.
    pub fn new(store: &'a dyn Store, schema: &'a Schema) -> Self {
        Self { store, schema }
    }

    /// Execute a paged query: content slice plus total count.
    ///
    /// The content query applies the page's sort and slice; the count query
    /// shares its filter and runs on the same session, so both observe the
    /// same snapshot wherever the backend can pin one.
    pub fn execute(&self, query: &Query, page: &PageRequest) -> Result<PageResult<Row>, Error> {
        if page.size == 0 {
            return Err(Error::Paging("page size must be positive".into()));
        }

        let compiled = Compiler::new(self.schema).compile_query(query, &page.sort)?;
        let mut content_query = compiled.clone();
        content_query.limit = Some(u64::from(page.size));
        content_query.offset = page.offset();

        let session = self.store.session().map_err(log_store_error)?;
        let content = session
            .execute_query(&content_query)
            .map_err(log_store_error)?;
        let total = session.execute_count(&compiled).map_err(log_store_error)?;

        Ok(PageResult::new(content, page.page, page.size, total))
    }

    /// Execute an unpaged query: filter and sort only.
    pub fn find_all(&self, query: &Query, sort: &[OrderSpec]) -> Result<Vec<Row>, Error> {
        let compiled = Compiler::new(self.schema).compile_query(query, sort)?;
        let session = self.store.session().map_err(log_store_error)?;
        Ok(session.execute_query(&compiled).map_err(log_store_error)?)
    }

    /// Count the rows of an entity matching a predicate.
    pub fn count(&self, entity: &str, predicate: &Predicate) -> Result<u64, Error> {
        let query = Query::new(entity).with_predicate(predicate.clone());
        let compiled = Compiler::new(self.schema).compile_query(&query, &[])?;
        let session = self.store.session().map_err(log_store_error)?;
        Ok(session.execute_count(&compiled).map_err(log_store_error)?)
    }

    /// Execute a set-based update, returning the affected row count.
    ///
    /// Bulk updates bypass per-row mutation tracking: any in-memory copy of
    /// affected rows is stale after this call and must be refreshed by the
    /// caller before a dependent read. In [`UpdateMode::DryRun`] the
    /// statement is compiled and validated, and the count of rows that
    /// would be affected is returned without writing anything.
    pub fn execute_bulk_update(&self, update: &BulkUpdate) -> Result<u64, Error> {
        let compiled = Compiler::new(self.schema).compile_mutation(update)?;
        let session = self.store.session().map_err(log_store_error)?;
        let affected = match update.mode {
            UpdateMode::Apply => session
                .execute_mutation(&compiled)
                .map_err(log_store_error)?,
            UpdateMode::DryRun => session
                .execute_count(&compiled.to_count_query())
                .map_err(log_store_error)?,
        };
        Ok(affected)
    }
}

fn log_store_error(err: StoreError) -> StoreError {
    warn!(operation = err.operation, error = %err.message, "store call failed");
    err
}
