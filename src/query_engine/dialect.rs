use serde::{Deserialize, Serialize};

/// SQL dialect of the source datasource.
///
/// The generated query subset is deliberately narrow (scans, grouped
/// counts, joins, id filters), so dialects differ only in identifier
/// quoting, parameter placeholders and the row-ordinal column rule.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[serde(rename = "postgresql")]
    #[default]
    PostgreSQL,

    #[serde(rename = "mysql")]
    MySQL,

    #[serde(rename = "sqlite")]
    SQLite,

    #[serde(rename = "clickhouse")]
    ClickHouse,

    #[serde(rename = "duckdb")]
    DuckDB,
}

impl SqlDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlDialect::PostgreSQL => "postgresql",
            SqlDialect::MySQL => "mysql",
            SqlDialect::SQLite => "sqlite",
            SqlDialect::ClickHouse => "clickhouse",
            SqlDialect::DuckDB => "duckdb",
        }
    }

    /// Quote an identifier for this dialect
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            SqlDialect::MySQL | SqlDialect::ClickHouse => format!("`{}`", ident),
            _ => format!("\"{}\"", ident),
        }
    }

    /// Parameter placeholder for the 1-based parameter index
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::PostgreSQL => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    /// Whether scans on this dialect append a row-ordinal column to the
    /// select list when the query does not already carry one
    pub fn appends_row_ordinal(&self) -> bool {
        matches!(self, SqlDialect::SQLite)
    }

    /// Name of the row-ordinal column for dialects that append one
    pub fn row_ordinal_column(&self) -> &'static str {
        "rowid"
    }
}
