//! The independent ledgers of a staged change buffer

use serde::{Deserialize, Serialize};
use thunder_core::{ColumnDraft, IndexDraft};

use crate::{RowEdit, StagedRow};

/// Row-level edits for the bound table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataLedger {
    pub added: Vec<StagedRow>,
    pub updated: Vec<RowEdit>,
    pub deleted: Vec<RowEdit>,
}

impl DataLedger {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    /// Forget the first `count` edits in commit order: inserts, updates, deletes
    pub fn drain_committed(&mut self, count: usize) {
        let count = drain_front(&mut self.added, count);
        let count = drain_front(&mut self.updated, count);
        drain_front(&mut self.deleted, count);
    }
}

/// Alteration of an existing column, addressed by its name before the change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnUpdate {
    pub original_name: String,
    pub column: ColumnDraft,
}

/// Column-level edits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureLedger {
    pub added: Vec<ColumnDraft>,
    pub updated: Vec<ColumnUpdate>,
    pub deleted: Vec<ColumnDraft>,
}

impl StructureLedger {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.deleted.len()
    }

    /// Forget the first `count` edits in commit order: adds, alterations, drops
    pub fn drain_committed(&mut self, count: usize) {
        let count = drain_front(&mut self.added, count);
        let count = drain_front(&mut self.updated, count);
        drain_front(&mut self.deleted, count);
    }
}

/// Index-level edits. There is no update list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexLedger {
    pub added: Vec<IndexDraft>,
    pub deleted: Vec<IndexDraft>,
}

impl IndexLedger {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.deleted.len()
    }

    /// Forget the first `count` edits in commit order: drops, then adds
    pub fn drain_committed(&mut self, count: usize) {
        let count = drain_front(&mut self.deleted, count);
        drain_front(&mut self.added, count);
    }
}

/// Remove up to `count` leading entries, returning how many are still owed
fn drain_front<T>(list: &mut Vec<T>, count: usize) -> usize {
    let taken = count.min(list.len());
    list.drain(..taken);
    count - taken
}
