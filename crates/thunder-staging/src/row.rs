//! Staged row shapes

use serde::{Deserialize, Serialize};
use thunder_core::{Row, RowKey};

/// Marker key that flags a pending row in serialized buffers
pub const PENDING_MARKER: &str = "_isNew";

/// A row inserted client-side that the backend has not seen yet.
///
/// Pending rows are told apart from persisted ones by the `_isNew` marker,
/// never by a missing primary key: a table may have no primary key at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRow {
    #[serde(flatten)]
    pub values: Row,
    #[serde(rename = "_isNew")]
    pub is_new: bool,
}

impl StagedRow {
    pub fn pending(values: Row) -> Self {
        Self {
            values: without_marker(values),
            is_new: true,
        }
    }

    /// Overwrite the fields present in `patch`, keeping the others
    pub fn merge(&mut self, patch: Row) {
        self.values.extend(without_marker(patch));
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.values.get(column)
    }
}

/// Strip the pending marker so it is neither serialized twice nor sent as a column
pub(crate) fn without_marker(mut values: Row) -> Row {
    values.shift_remove(PENDING_MARKER);
    values
}

/// An update or delete of a persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEdit {
    pub key: RowKey,
    pub values: Row,
}

impl RowEdit {
    pub fn new(key: RowKey, values: Row) -> Self {
        Self { key, values }
    }
}
