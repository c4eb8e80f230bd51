//! Lock-step advancement of a primary cursor and its count cursors
//!
//! Relationship-count queries return one row per grouping key, ordered by
//! the same key as the primary result, so row *i* of every cursor belongs
//! to the same record. [`CountedRowSource`] makes that contract explicit:
//! it advances all underlying cursors together and yields one combined
//! row, instead of leaving the alignment to the caller.

use super::client::{Row, RowCursor};
use super::errors::QueryEngineError;
use super::sql::CONNECTIONS_COUNT_COLUMN;

/// One relationship-count cursor, tagged with the relationship (edge
/// type) name its counts belong to.
pub struct CountCursor {
    pub relationship_name: String,
    pub cursor: Box<dyn RowCursor>,
}

/// A primary row combined with the cardinality contributions of every
/// count cursor for that row. Repeated relationship names are not merged
/// here; the fetcher accumulates them by addition.
pub struct CountedRow {
    pub row: Row,
    pub out_counts: Vec<(String, i64)>,
    pub in_counts: Vec<(String, i64)>,
}

pub struct CountedRowSource {
    primary: Box<dyn RowCursor>,
    out_cursors: Vec<CountCursor>,
    in_cursors: Vec<CountCursor>,
}

impl CountedRowSource {
    pub fn new(
        primary: Box<dyn RowCursor>,
        out_cursors: Vec<CountCursor>,
        in_cursors: Vec<CountCursor>,
    ) -> Self {
        CountedRowSource {
            primary,
            out_cursors,
            in_cursors,
        }
    }

    /// Advance the primary cursor; when it yields a row, advance every
    /// count cursor exactly one step. An exhausted count cursor
    /// contributes zero.
    pub async fn advance(&mut self) -> Result<Option<CountedRow>, QueryEngineError> {
        let Some(row) = self.primary.advance().await? else {
            return Ok(None);
        };

        let mut out_counts = Vec::with_capacity(self.out_cursors.len());
        for counted in &mut self.out_cursors {
            let count = Self::step(counted).await?;
            out_counts.push((counted.relationship_name.clone(), count));
        }
        let mut in_counts = Vec::with_capacity(self.in_cursors.len());
        for counted in &mut self.in_cursors {
            let count = Self::step(counted).await?;
            in_counts.push((counted.relationship_name.clone(), count));
        }

        Ok(Some(CountedRow {
            row,
            out_counts,
            in_counts,
        }))
    }

    async fn step(counted: &mut CountCursor) -> Result<i64, QueryEngineError> {
        match counted.cursor.advance().await? {
            Some(row) => Ok(extract_count(&row)),
            None => Ok(0),
        }
    }

    /// Close every underlying cursor, attempting all of them even when
    /// one fails; the first error is reported.
    pub async fn close(&mut self) -> Result<(), QueryEngineError> {
        let mut first_error = None;
        if let Err(e) = self.primary.close().await {
            first_error.get_or_insert(e);
        }
        for counted in self.out_cursors.iter_mut().chain(self.in_cursors.iter_mut()) {
            if let Err(e) = counted.cursor.close().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Read the `connectionsCount` column, tolerating numeric or string
/// representations (drivers differ).
fn extract_count(row: &Row) -> i64 {
    match row.get(CONNECTIONS_COUNT_COLUMN) {
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
            .or_else(|| value.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        None => 0,
    }
}
