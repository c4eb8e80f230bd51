//! SQL translation and execution plumbing
//!
//! Translates the model-level operations (ordered scan, grouped
//! relationship count, relationship expansion, batch load-by-id, raw
//! execute) into parameterized SQL for a specific dialect and executes
//! them through a pluggable [`RelationalClient`], returning forward-only
//! row cursors.

pub mod client;
pub mod counted_rows;
pub mod dialect;
pub mod errors;
pub mod sql;
pub mod value;

pub use client::{RelationalClient, Row, RowCursor, VecRowCursor};
pub use counted_rows::{CountCursor, CountedRow, CountedRowSource};
pub use dialect::SqlDialect;
pub use errors::QueryEngineError;
pub use value::SqlValue;

/// Dialect-aware query engine over one pooled connection.
///
/// The engine performs no caching and holds no state beyond the client
/// handle; the orchestrator calls [`QueryEngine::close`] at the end of a
/// top-level operation to release the connection.
pub struct QueryEngine<'a> {
    client: &'a dyn RelationalClient,
    dialect: SqlDialect,
}

impl<'a> QueryEngine<'a> {
    pub fn new(client: &'a dyn RelationalClient, dialect: SqlDialect) -> Self {
        QueryEngine { client, dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Ordered table scan from caller-supplied query text, capped at
    /// `limit` rows (0 = no cap).
    pub async fn ordered_scan(
        &self,
        query_text: &str,
        order_columns: &[String],
        limit: usize,
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        let statement = sql::build_ordered_scan(self.dialect, query_text, order_columns, limit)?;
        log::debug!("ordered scan: {}", statement);
        self.client.execute_query(&statement, &[]).await
    }

    /// Grouped joinable-record count on the far side of a relationship,
    /// optionally restricted to an id list.
    pub async fn relationship_count(
        &self,
        table: &str,
        join_columns: &[String],
        id_filter: Option<&[Vec<SqlValue>]>,
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        let (statement, params) =
            sql::build_relationship_count(self.dialect, table, join_columns, id_filter);
        log::debug!("relationship count: {}", statement);
        self.client.execute_query(&statement, &params).await
    }

    /// Entering-entity rows whose columns match the given values directly
    pub async fn expand_direct(
        &self,
        entering_table: &str,
        filter_columns: &[String],
        ids: &[Vec<SqlValue>],
        order_columns: &[String],
        limit: usize,
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        let (statement, params) = sql::build_expand_direct(
            self.dialect,
            entering_table,
            filter_columns,
            ids,
            order_columns,
            limit,
        );
        log::debug!("expand direct: {}", statement);
        self.client.execute_query(&statement, &params).await
    }

    /// Entering-entity rows reachable from the given root rows through a
    /// join, with root key columns aliased into the result.
    #[allow(clippy::too_many_arguments)]
    pub async fn expand_join(
        &self,
        entering_table: &str,
        entering_join_columns: &[String],
        root_table: &str,
        root_join_columns: &[String],
        root_key_columns: &[String],
        root_ids: &[Vec<SqlValue>],
        order_columns: &[String],
        limit: usize,
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        let (statement, params) = sql::build_expand_join(
            self.dialect,
            entering_table,
            entering_join_columns,
            root_table,
            root_join_columns,
            root_key_columns,
            root_ids,
            order_columns,
            limit,
        );
        log::debug!("expand join: {}", statement);
        self.client.execute_query(&statement, &params).await
    }

    /// Exactly the requested rows of one table, by key
    pub async fn load(
        &self,
        table: &str,
        key_columns: &[String],
        ids: &[Vec<SqlValue>],
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        let (statement, params) = sql::build_load(self.dialect, table, key_columns, ids);
        log::debug!("load: {}", statement);
        self.client.execute_query(&statement, &params).await
    }

    /// Arbitrary select passthrough (bulk-export collaborators)
    pub async fn execute_raw(
        &self,
        statement: &str,
    ) -> Result<Box<dyn RowCursor>, QueryEngineError> {
        log::debug!("raw execute: {}", statement);
        self.client.execute_query(statement, &[]).await
    }

    /// Release the pooled connection
    pub async fn close(&self) -> Result<(), QueryEngineError> {
        self.client
            .close()
            .await
            .map_err(|e| QueryEngineError::ConnectionRelease {
                error: e.to_string(),
            })
    }
}
