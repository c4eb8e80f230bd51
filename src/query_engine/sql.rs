//! SQL builders for the constrained query subset
//!
//! Every builder produces a statement string plus its bound parameters.
//! Only a narrow shape of SQL is generated: ordered scans, grouped
//! relationship counts, expand joins, and load-by-id filters. Full
//! dialect compilation is out of scope.

use lazy_static::lazy_static;
use regex::Regex;

use super::dialect::SqlDialect;
use super::errors::QueryEngineError;
use super::value::SqlValue;

/// Alias prefix for root-side key columns selected by the expand join;
/// the fetcher reads them back to build source ids.
pub const ROOT_KEY_ALIAS_PREFIX: &str = "__root_";

/// Column alias produced by grouped relationship counts.
pub const CONNECTIONS_COUNT_COLUMN: &str = "connectionsCount";

lazy_static! {
    static ref FROM_TABLE_RE: Regex =
        Regex::new(r#"(?i)\bfrom\s+["'`\[]?([A-Za-z_][A-Za-z0-9_.$]*)"#).expect("valid regex");
    static ref ORDER_BY_RE: Regex = Regex::new(r"(?i)\border\s+by\b").expect("valid regex");
    static ref SELECT_RE: Regex = Regex::new(r"(?i)^\s*select\s+").expect("valid regex");
}

/// Extract the target table name from a `SELECT ... FROM <table> ...`
/// query string.
pub fn extract_table_name(query: &str) -> Result<String, QueryEngineError> {
    FROM_TABLE_RE
        .captures(query)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| QueryEngineError::MalformedQuery {
            message: format!("no FROM clause found in `{}`", query),
        })
}

/// Statement assembly helper that renders dialect-correct placeholders
/// and collects bound parameters.
pub(crate) struct ParamSql {
    dialect: SqlDialect,
    sql: String,
    params: Vec<SqlValue>,
}

impl ParamSql {
    pub(crate) fn new(dialect: SqlDialect) -> Self {
        ParamSql {
            dialect,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Append a placeholder and bind its value
    pub(crate) fn bind(&mut self, value: SqlValue) {
        let placeholder = self.dialect.placeholder(self.params.len() + 1);
        self.sql.push_str(&placeholder);
        self.params.push(value);
    }

    pub(crate) fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

fn quoted_list(dialect: SqlDialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append `(<cols>) matches one of <ids>` to the statement. Single-column
/// filters render as `col IN (...)`; composite filters as OR-ed AND
/// groups, which every supported dialect accepts.
fn push_id_filter(
    statement: &mut ParamSql,
    qualified_columns: &[String],
    ids: &[Vec<SqlValue>],
) {
    if qualified_columns.len() == 1 {
        statement.push(&qualified_columns[0]);
        statement.push(" IN (");
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                statement.push(", ");
            }
            statement.bind(id[0].clone());
        }
        statement.push(")");
        return;
    }
    statement.push("(");
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            statement.push(" OR ");
        }
        statement.push("(");
        for (j, column) in qualified_columns.iter().enumerate() {
            if j > 0 {
                statement.push(" AND ");
            }
            statement.push(column);
            statement.push(" = ");
            statement.bind(id.get(j).cloned().unwrap_or(SqlValue::Null));
        }
        statement.push(")");
    }
    statement.push(")");
}

/// Ordered scan over caller-supplied query text: primary-key ORDER BY is
/// appended when the text carries none, the row cap is applied, and - for
/// dialects that require it - a row-ordinal column is injected into the
/// select list.
pub fn build_ordered_scan(
    dialect: SqlDialect,
    query_text: &str,
    order_columns: &[String],
    limit: usize,
) -> Result<String, QueryEngineError> {
    if !SELECT_RE.is_match(query_text) {
        return Err(QueryEngineError::MalformedQuery {
            message: format!("expected a SELECT statement, got `{}`", query_text),
        });
    }

    let mut text = query_text.trim().trim_end_matches(';').to_string();

    if dialect.appends_row_ordinal() {
        let ordinal = dialect.row_ordinal_column();
        let lowered = text.to_lowercase();
        if !lowered.contains(ordinal) {
            text = SELECT_RE
                .replace(&text, format!("SELECT {}, ", ordinal))
                .into_owned();
        }
    }

    if !ORDER_BY_RE.is_match(&text) && !order_columns.is_empty() {
        text.push_str(" ORDER BY ");
        text.push_str(&quoted_list(dialect, order_columns));
    }
    if limit > 0 {
        text.push_str(&format!(" LIMIT {}", limit));
    }
    Ok(text)
}

/// Grouped relationship count over the far side of a relationship:
/// `SELECT <joinCols>, COUNT(*) AS connectionsCount FROM <table>
/// GROUP BY <joinCols> ORDER BY <joinCols>`, optionally filtered to an
/// id list. The ORDER BY keeps count cursors aligned with the primary
/// cursor during lock-step advancement.
pub fn build_relationship_count(
    dialect: SqlDialect,
    table: &str,
    join_columns: &[String],
    id_filter: Option<&[Vec<SqlValue>]>,
) -> (String, Vec<SqlValue>) {
    let columns = quoted_list(dialect, join_columns);
    let mut statement = ParamSql::new(dialect);
    statement.push(&format!(
        "SELECT {}, COUNT(*) AS {} FROM {}",
        columns,
        CONNECTIONS_COUNT_COLUMN,
        dialect.quote_ident(table)
    ));
    if let Some(ids) = id_filter {
        if !ids.is_empty() {
            statement.push(" WHERE ");
            let qualified: Vec<String> = join_columns
                .iter()
                .map(|c| dialect.quote_ident(c))
                .collect();
            push_id_filter(&mut statement, &qualified, ids);
        }
    }
    statement.push(&format!(" GROUP BY {} ORDER BY {}", columns, columns));
    statement.finish()
}

/// Expansion without a join: entering rows whose join columns match the
/// supplied values directly (the foreign-key side references the root's
/// primary key, so root ids are usable as filter values).
pub fn build_expand_direct(
    dialect: SqlDialect,
    entering_table: &str,
    filter_columns: &[String],
    ids: &[Vec<SqlValue>],
    order_columns: &[String],
    limit: usize,
) -> (String, Vec<SqlValue>) {
    let mut statement = ParamSql::new(dialect);
    statement.push(&format!(
        "SELECT * FROM {} WHERE ",
        dialect.quote_ident(entering_table)
    ));
    let qualified: Vec<String> = filter_columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect();
    push_id_filter(&mut statement, &qualified, ids);
    if !order_columns.is_empty() {
        statement.push(&format!(" ORDER BY {}", quoted_list(dialect, order_columns)));
    }
    if limit > 0 {
        statement.push(&format!(" LIMIT {}", limit));
    }
    statement.finish()
}

/// Expansion through a join: entering rows reachable from the given root
/// rows, with the root's key columns selected under `__root_<i>` aliases
/// so edge records can name their source.
#[allow(clippy::too_many_arguments)]
pub fn build_expand_join(
    dialect: SqlDialect,
    entering_table: &str,
    entering_join_columns: &[String],
    root_table: &str,
    root_join_columns: &[String],
    root_key_columns: &[String],
    root_ids: &[Vec<SqlValue>],
    order_columns: &[String],
    limit: usize,
) -> (String, Vec<SqlValue>) {
    let mut statement = ParamSql::new(dialect);
    let root_keys: Vec<String> = root_key_columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "r.{} AS {}{}",
                dialect.quote_ident(c),
                ROOT_KEY_ALIAS_PREFIX,
                i
            )
        })
        .collect();
    statement.push(&format!(
        "SELECT e.*, {} FROM {} e JOIN {} r ON ",
        root_keys.join(", "),
        dialect.quote_ident(entering_table),
        dialect.quote_ident(root_table)
    ));
    for (i, (entering, root)) in entering_join_columns
        .iter()
        .zip(root_join_columns.iter())
        .enumerate()
    {
        if i > 0 {
            statement.push(" AND ");
        }
        statement.push(&format!(
            "e.{} = r.{}",
            dialect.quote_ident(entering),
            dialect.quote_ident(root)
        ));
    }
    statement.push(" WHERE ");
    let qualified: Vec<String> = root_key_columns
        .iter()
        .map(|c| format!("r.{}", dialect.quote_ident(c)))
        .collect();
    push_id_filter(&mut statement, &qualified, root_ids);
    if !order_columns.is_empty() {
        let order: Vec<String> = order_columns
            .iter()
            .map(|c| format!("e.{}", dialect.quote_ident(c)))
            .collect();
        statement.push(&format!(" ORDER BY {}", order.join(", ")));
    }
    if limit > 0 {
        statement.push(&format!(" LIMIT {}", limit));
    }
    statement.finish()
}

/// Load-by-id query: exactly the requested rows of one table, ordered by
/// key so the count cursors stay aligned.
pub fn build_load(
    dialect: SqlDialect,
    table: &str,
    key_columns: &[String],
    ids: &[Vec<SqlValue>],
) -> (String, Vec<SqlValue>) {
    let mut statement = ParamSql::new(dialect);
    statement.push(&format!("SELECT * FROM {} WHERE ", dialect.quote_ident(table)));
    let qualified: Vec<String> = key_columns
        .iter()
        .map(|c| dialect.quote_ident(c))
        .collect();
    push_id_filter(&mut statement, &qualified, ids);
    statement.push(&format!(" ORDER BY {}", quoted_list(dialect, key_columns)));
    statement.finish()
}
