//! Tabular results and their normalization into records.

use crate::models::value::SqlValue;
use serde_json::Value as JsonValue;

/// One normalized row: column name to JSON value, in column order.
pub type Record = serde_json::Map<String, JsonValue>;

/// Raw result of one statement: column names plus positional rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Normalize into records. See [`rows_to_records`].
    pub fn into_records(self) -> Vec<Record> {
        rows_to_records(&self.columns, &self.rows)
    }
}

/// Zip every row against the column names and serialize each value.
///
/// No columns or no rows yields an empty list. Rows keep their order and
/// each record keeps the column order. A row shorter or longer than the
/// column list is paired up to the shorter of the two.
pub fn rows_to_records(columns: &[String], rows: &[Vec<SqlValue>]) -> Vec<Record> {
    if columns.is_empty() || rows.is_empty() {
        return Vec::new();
    }

    rows.iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect()
        })
        .collect()
}
