//! Relational client interface
//!
//! Opening connections and shipping statements to the database is an
//! external collaborator; the engine consumes this narrow surface. An
//! implementation typically wraps a driver with a finite connection pool:
//! one pooled connection per engine instance, released on `close()`.
//!
//! Cursors are forward-only and must be explicitly closed by the caller
//! on every exit path - leaked cursors pin pooled connections.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use super::errors::QueryEngineError;
use super::value::SqlValue;

/// One result row: column name -> JSON value
pub type Row = HashMap<String, Value>;

/// Forward-only result cursor
#[async_trait]
pub trait RowCursor: Send {
    /// Advance to the next row; `None` once the result set is exhausted
    async fn advance(&mut self) -> Result<Option<Row>, QueryEngineError>;

    /// Release the cursor. Idempotent.
    async fn close(&mut self) -> Result<(), QueryEngineError>;
}

/// Statement execution surface over one pooled connection
#[async_trait]
pub trait RelationalClient: Send + Sync {
    /// Execute a parameterized select and return its cursor
    async fn execute_query(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Box<dyn RowCursor>, QueryEngineError>;

    /// Cheap connectivity probe
    async fn ping(&self) -> Result<(), QueryEngineError>;

    /// Release the pooled connection held by this client handle
    async fn close(&self) -> Result<(), QueryEngineError>;
}

/// In-memory cursor over pre-materialized rows. The building block for
/// test fixtures and small adapters that buffer a full result set.
pub struct VecRowCursor {
    rows: std::vec::IntoIter<Row>,
    closed: bool,
}

impl VecRowCursor {
    pub fn new(rows: Vec<Row>) -> Self {
        VecRowCursor {
            rows: rows.into_iter(),
            closed: false,
        }
    }
}

#[async_trait]
impl RowCursor for VecRowCursor {
    async fn advance(&mut self) -> Result<Option<Row>, QueryEngineError> {
        if self.closed {
            return Err(QueryEngineError::CursorClosed);
        }
        Ok(self.rows.next())
    }

    async fn close(&mut self) -> Result<(), QueryEngineError> {
        self.closed = true;
        Ok(())
    }
}
