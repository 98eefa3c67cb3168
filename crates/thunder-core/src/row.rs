//! Row values and row identity

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A table row: ordered mapping of column name to scalar value
pub type Row = IndexMap<String, serde_json::Value>;

/// Identity of a persisted row, expressed as its primary-key column and value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowKey {
    pub column: String,
    pub value: serde_json::Value,
}

impl RowKey {
    pub fn new(column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Build the identity of `row` from its `column` value, if present
    pub fn from_row(column: &str, row: &Row) -> Option<Self> {
        row.get(column).map(|value| Self {
            column: column.to_string(),
            value: value.clone(),
        })
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.column, self.value)
    }
}
