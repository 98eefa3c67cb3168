//! Transactional edit buffer for one table or create-table view

use serde::{Deserialize, Serialize};
use thunder_core::{ColumnDraft, CreateTableDraft, IndexDraft, Row, RowKey, TableRef};

use crate::row::without_marker;
use crate::{
    ColumnUpdate, DataLedger, IgnoreReason, IndexLedger, RowEdit, StageOutcome, StagedRow,
    StructureLedger,
};

/// Pending edits that have not been sent to the backend.
///
/// The buffer never touches the schema cache; cached column descriptors only
/// change once a commit is reconciled and the affected tables are refetched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedChangeBuffer {
    /// Connection the target table belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    connection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<TableRef>,
    data: DataLedger,
    structure: StructureLedger,
    indices: IndexLedger,
    create_table: CreateTableDraft,
}

impl StagedChangeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer bound to an existing table
    pub fn with_target(target: TableRef) -> Self {
        Self {
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<&TableRef> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<TableRef>) {
        self.target = target;
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Bind the buffer to a connection. Table names in it are resolved there.
    pub fn bind_connection(&mut self, connection: Option<String>) {
        self.connection = connection;
    }

    // ========== Rows ==========

    /// Append a pending row. Each call adds a distinct row.
    pub fn stage_row_insert(&mut self, row: Row) -> StageOutcome {
        self.data.added.push(StagedRow::pending(row));
        tracing::trace!(pending = self.data.added.len(), "staged row insert");
        StageOutcome::Applied
    }

    /// Patch a pending row in place. Out-of-range indices leave the buffer unchanged.
    pub fn update_staged_row(&mut self, index: usize, patch: Row) -> StageOutcome {
        let len = self.data.added.len();
        match self.data.added.get_mut(index) {
            Some(row) => {
                row.merge(patch);
                StageOutcome::Coalesced
            }
            None => {
                tracing::debug!(index, len, "ignoring update of unknown pending row");
                StageOutcome::Ignored(IgnoreReason::StaleIndex { index, len })
            }
        }
    }

    /// Drop a pending row before it is ever committed
    pub fn remove_staged_row(&mut self, index: usize) -> StageOutcome {
        let len = self.data.added.len();
        if index >= len {
            tracing::debug!(index, len, "ignoring removal of unknown pending row");
            return StageOutcome::Ignored(IgnoreReason::StaleIndex { index, len });
        }
        self.data.added.remove(index);
        StageOutcome::Applied
    }

    /// Stage new values for a persisted row.
    ///
    /// A second update for the same key merges into the first one field by
    /// field; later values win.
    pub fn stage_row_update(&mut self, key: RowKey, values: Row) -> StageOutcome {
        let values = without_marker(values);
        if self.data.deleted.iter().any(|edit| edit.key == key) {
            return StageOutcome::Ignored(IgnoreReason::Deleted);
        }
        if let Some(existing) = self.data.updated.iter_mut().find(|edit| edit.key == key) {
            existing.values.extend(values);
            return StageOutcome::Coalesced;
        }
        self.data.updated.push(RowEdit::new(key, values));
        StageOutcome::Applied
    }

    /// Stage deletion of a persisted row. Any staged update for it is dropped.
    pub fn stage_row_delete(&mut self, key: RowKey, snapshot: Row) -> StageOutcome {
        if self.data.deleted.iter().any(|edit| edit.key == key) {
            return StageOutcome::Ignored(IgnoreReason::AlreadyStaged);
        }
        self.data.updated.retain(|edit| edit.key != key);
        self.data.deleted.push(RowEdit::new(key, snapshot));
        StageOutcome::Applied
    }

    pub fn unstage_row_delete(&mut self, key: &RowKey) -> StageOutcome {
        let before = self.data.deleted.len();
        self.data.deleted.retain(|edit| &edit.key != key);
        if self.data.deleted.len() == before {
            StageOutcome::Ignored(IgnoreReason::NotStaged)
        } else {
            StageOutcome::Applied
        }
    }

    // ========== Columns ==========

    /// Stage a new column. Re-adding a name that is already staged replaces it.
    pub fn stage_column_add(&mut self, column: ColumnDraft) -> StageOutcome {
        if let Some(existing) = self
            .structure
            .added
            .iter_mut()
            .find(|c| c.name == column.name)
        {
            *existing = column;
            return StageOutcome::Coalesced;
        }
        self.structure.added.push(column);
        StageOutcome::Applied
    }

    /// Stage an alteration of the column currently named `original_name`
    pub fn stage_column_update(&mut self, original_name: &str, column: ColumnDraft) -> StageOutcome {
        if self.structure.deleted.iter().any(|c| c.name == original_name) {
            return StageOutcome::Ignored(IgnoreReason::Deleted);
        }
        // A column that only exists in this buffer is edited in place
        if let Some(added) = self
            .structure
            .added
            .iter_mut()
            .find(|c| c.name == original_name)
        {
            *added = column;
            return StageOutcome::Coalesced;
        }
        if let Some(existing) = self
            .structure
            .updated
            .iter_mut()
            .find(|u| u.original_name == original_name)
        {
            existing.column = column;
            return StageOutcome::Coalesced;
        }
        self.structure.updated.push(ColumnUpdate {
            original_name: original_name.to_string(),
            column,
        });
        StageOutcome::Applied
    }

    /// Stage a column drop. Dropping a column that was only staged as added
    /// cancels the add instead.
    pub fn stage_column_delete(&mut self, column: ColumnDraft) -> StageOutcome {
        if let Some(pos) = self
            .structure
            .added
            .iter()
            .position(|c| c.name == column.name)
        {
            self.structure.added.remove(pos);
            return StageOutcome::Coalesced;
        }
        if self.structure.deleted.iter().any(|c| c.name == column.name) {
            return StageOutcome::Ignored(IgnoreReason::AlreadyStaged);
        }
        self.structure
            .updated
            .retain(|u| u.original_name != column.name);
        self.structure.deleted.push(column);
        StageOutcome::Applied
    }

    // ========== Indices ==========

    pub fn stage_index_add(&mut self, index: IndexDraft) -> StageOutcome {
        if let Some(existing) = self
            .indices
            .added
            .iter_mut()
            .find(|i| i.name == index.name)
        {
            *existing = index;
            return StageOutcome::Coalesced;
        }
        self.indices.added.push(index);
        StageOutcome::Applied
    }

    /// Stage an index drop. Dropping an index that was only staged as added
    /// cancels the add instead.
    pub fn stage_index_delete(&mut self, index: IndexDraft) -> StageOutcome {
        if let Some(pos) = self.indices.added.iter().position(|i| i.name == index.name) {
            self.indices.added.remove(pos);
            return StageOutcome::Coalesced;
        }
        if self.indices.deleted.iter().any(|i| i.name == index.name) {
            return StageOutcome::Ignored(IgnoreReason::AlreadyStaged);
        }
        self.indices.deleted.push(index);
        StageOutcome::Applied
    }

    // ========== Create Table ==========

    /// Replace the whole create-table draft
    pub fn set_create_table_draft(
        &mut self,
        schema: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<ColumnDraft>,
    ) -> StageOutcome {
        self.create_table = CreateTableDraft::new(schema, table_name, columns);
        StageOutcome::Applied
    }

    pub fn clear_create_table_draft(&mut self) -> StageOutcome {
        if self.create_table.is_empty() {
            return StageOutcome::Ignored(IgnoreReason::NotStaged);
        }
        self.create_table = CreateTableDraft::default();
        StageOutcome::Applied
    }

    // ========== Bulk ==========

    /// Reset every ledger. The connection and table binding are kept.
    pub fn discard(&mut self) {
        tracing::debug!(
            target_table = ?self.target,
            changes = self.change_count(),
            "discarding staged changes"
        );
        self.data = DataLedger::default();
        self.structure = StructureLedger::default();
        self.indices = IndexLedger::default();
        self.create_table = CreateTableDraft::default();
    }

    pub fn clear_data(&mut self) {
        self.data = DataLedger::default();
    }

    pub fn clear_structure(&mut self) {
        self.structure = StructureLedger::default();
    }

    pub fn clear_indices(&mut self) {
        self.indices = IndexLedger::default();
    }

    /// Drop the first `count` data edits after the backend applied them
    pub fn drain_committed_data(&mut self, count: usize) {
        self.data.drain_committed(count);
    }

    pub fn drain_committed_structure(&mut self, count: usize) {
        self.structure.drain_committed(count);
    }

    pub fn drain_committed_indices(&mut self, count: usize) {
        self.indices.drain_committed(count);
    }

    // ========== Queries ==========

    /// True if the data, structure or index ledger holds an edit
    pub fn has_changes(&self) -> bool {
        !self.data.is_empty() || !self.structure.is_empty() || !self.indices.is_empty()
    }

    /// True if the create-table draft has a table name and a named column
    pub fn has_create_table_changes(&self) -> bool {
        self.create_table.has_changes()
    }

    /// True if closing the buffer would lose work
    pub fn has_unsaved_changes(&self) -> bool {
        self.has_changes() || self.has_create_table_changes()
    }

    /// Number of staged entries across the data, structure and index ledgers
    pub fn change_count(&self) -> usize {
        self.data.len() + self.structure.len() + self.indices.len()
    }

    /// True if all four ledgers are empty
    pub fn is_pristine(&self) -> bool {
        !self.has_changes() && self.create_table.is_empty()
    }

    pub fn data(&self) -> &DataLedger {
        &self.data
    }

    pub fn structure(&self) -> &StructureLedger {
        &self.structure
    }

    pub fn indices(&self) -> &IndexLedger {
        &self.indices
    }

    pub fn create_table(&self) -> &CreateTableDraft {
        &self.create_table
    }

    pub fn added_rows(&self) -> &[StagedRow] {
        &self.data.added
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
