//! Source-schema metadata interface
//!
//! The raw connection layer (listing tables, columns and keys for a
//! datasource) is an external collaborator; this module defines the
//! read-only metadata surface the schema builder consumes. Implementations
//! typically wrap a driver's catalog queries (`information_schema`,
//! `system.columns`, JDBC-style metadata and so on).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::DatabaseSchemaError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    /// 1-based position within the table
    pub ordinal_position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrimaryKeyMetadata {
    /// Ordered key columns
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyMetadata {
    /// Ordered columns on the owning table
    pub columns: Vec<String>,
    pub referenced_table: String,
    /// Ordered referenced columns, aligned with `columns`
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnMetadata>,
    pub primary_key: PrimaryKeyMetadata,
    pub foreign_keys: Vec<ForeignKeyMetadata>,
}

/// Read-only view of the source schema catalog.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// All table names visible to the connection, in a stable order
    async fn table_names(&self) -> Result<Vec<String>, DatabaseSchemaError>;

    /// Full metadata for one table
    async fn table(&self, name: &str) -> Result<TableMetadata, DatabaseSchemaError>;
}
