//! Commit of staged changes to the backend
//!
//! A buffer is turned into a `CommitPlan`: either a single create-table
//! operation, or operations grouped by ledger in the order structure, data,
//! indices. Column existence is a precondition for row edits that reference
//! those columns, hence structure first.
//!
//! Groups are applied in order without a cross-group transaction. Every
//! operation the backend accepted is removed from the buffer, so a failed
//! group keeps only the operations that did not go through and a retry
//! never sends an operation twice.

use std::sync::Arc;

use thunder_core::{Backend, ColumnDraft, Envelope, IndexDraft, Row, RowKey, TableRef};
use thunder_staging::StagedChangeBuffer;

use crate::error::{ServiceError, ServiceResult};
use crate::observer::{CommitEffects, CommitObserver};

/// Ledger a group of operations comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerGroup {
    Structure,
    Data,
    Indices,
    CreateTable,
}

impl std::fmt::Display for LedgerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LedgerGroup::Structure => "structure",
            LedgerGroup::Data => "data",
            LedgerGroup::Indices => "indices",
            LedgerGroup::CreateTable => "create table",
        };
        f.write_str(name)
    }
}

/// One backend call
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AddColumn(ColumnDraft),
    AlterColumn {
        original_name: String,
        column: ColumnDraft,
    },
    DropColumn(String),
    InsertRow(Row),
    UpdateRow {
        key: RowKey,
        values: Row,
    },
    DeleteRow(RowKey),
    CreateIndex(IndexDraft),
    DropIndex(String),
    CreateTable(Vec<ColumnDraft>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedGroup {
    pub group: LedgerGroup,
    pub operations: Vec<Operation>,
}

/// Ordered operations for one commit against one table
#[derive(Debug, Clone, PartialEq)]
pub struct CommitPlan {
    pub target: Option<TableRef>,
    pub groups: Vec<PlannedGroup>,
}

impl CommitPlan {
    fn empty() -> Self {
        Self {
            target: None,
            groups: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.groups.iter().map(|g| g.operations.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStatus {
    Applied,
    /// `applied` operations succeeded before `error`
    Failed { applied: usize, error: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub group: LedgerGroup,
    pub operations: usize,
    pub status: GroupStatus,
}

impl GroupReport {
    pub fn is_applied(&self) -> bool {
        self.status == GroupStatus::Applied
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, GroupStatus::Failed { .. })
    }
}

impl std::fmt::Display for GroupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            GroupStatus::Applied => write!(f, "{}: {} applied", self.group, self.operations),
            GroupStatus::Failed { applied, error } => write!(
                f,
                "{}: failed after {} of {} ({})",
                self.group, applied, self.operations, error
            ),
            GroupStatus::Skipped => write!(f, "{}: skipped", self.group),
        }
    }
}

/// Outcome of one commit, per ledger group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub target: Option<TableRef>,
    pub groups: Vec<GroupReport>,
}

impl CommitReport {
    fn noop() -> Self {
        Self {
            target: None,
            groups: Vec::new(),
        }
    }

    /// Nothing was staged, so nothing was sent
    pub fn is_noop(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.groups.iter().all(GroupReport::is_applied)
    }

    /// Some groups were applied and some were not
    pub fn is_partial(&self) -> bool {
        self.groups.iter().any(GroupReport::is_applied) && !self.is_success()
    }

    pub fn failed(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.is_failed())
    }

    pub fn group(&self, group: LedgerGroup) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.group == group)
    }

    pub fn applied_operations(&self) -> usize {
        self.groups
            .iter()
            .map(|g| match &g.status {
                GroupStatus::Applied => g.operations,
                GroupStatus::Failed { applied, .. } => *applied,
                GroupStatus::Skipped => 0,
            })
            .sum()
    }

    /// One line per group, e.g. `structure: 2 applied; data: skipped`
    pub fn summary(&self) -> String {
        self.groups
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Applies staged buffers to the backend
pub struct ReconciliationService {
    backend: Arc<dyn Backend>,
    observer: Option<Arc<dyn CommitObserver>>,
    stop_on_group_failure: bool,
}

impl ReconciliationService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            observer: None,
            stop_on_group_failure: true,
        }
    }

    /// Builder: notify `observer` after every commit that changed the backend
    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Builder: keep applying later groups after one fails
    pub fn stop_on_group_failure(mut self, stop: bool) -> Self {
        self.stop_on_group_failure = stop;
        self
    }

    /// Translate a buffer into backend operations without sending anything.
    ///
    /// A pristine buffer yields an empty plan. A create-table draft that was
    /// started but is not valid is rejected.
    pub fn plan(&self, buffer: &StagedChangeBuffer) -> ServiceResult<CommitPlan> {
        if buffer.has_changes() {
            return plan_ledgers(buffer);
        }

        let draft = buffer.create_table();
        if draft.table_name.trim().is_empty() && draft.columns.is_empty() {
            return Ok(CommitPlan::empty());
        }
        let errors = draft.validate();
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ServiceError::Validation(message));
        }

        Ok(CommitPlan {
            target: Some(draft.table_ref()),
            groups: vec![PlannedGroup {
                group: LedgerGroup::CreateTable,
                operations: vec![Operation::CreateTable(draft.named_columns())],
            }],
        })
    }

    /// Send the buffer's edits to the backend and update the buffer to match.
    #[tracing::instrument(skip(self, buffer), fields(target_table = ?buffer.target()))]
    pub async fn apply(&self, buffer: &mut StagedChangeBuffer) -> ServiceResult<CommitReport> {
        let plan = self.plan(buffer)?;
        if plan.is_empty() {
            tracing::debug!("nothing to commit");
            return Ok(CommitReport::noop());
        }
        let Some(target) = plan.target.clone() else {
            return Err(ServiceError::NoActiveTable);
        };

        tracing::info!(
            table = %target,
            operations = plan.operation_count(),
            groups = plan.groups.len(),
            "committing staged changes"
        );

        let mut reports = Vec::with_capacity(plan.groups.len());
        let mut halted = false;
        for planned in &plan.groups {
            let operations = planned.operations.len();
            if halted {
                reports.push(GroupReport {
                    group: planned.group,
                    operations,
                    status: GroupStatus::Skipped,
                });
                continue;
            }

            let status = self.apply_group(&target, planned).await;
            match &status {
                GroupStatus::Applied => {
                    clear_group(buffer, planned.group);
                    tracing::debug!(table = %target, group = %planned.group, operations, "group applied");
                }
                GroupStatus::Failed { applied, error } => {
                    drain_group(buffer, planned.group, *applied);
                    tracing::error!(
                        table = %target,
                        group = %planned.group,
                        applied,
                        operations,
                        error = %error,
                        "group failed"
                    );
                    halted = self.stop_on_group_failure;
                }
                GroupStatus::Skipped => {}
            }
            reports.push(GroupReport {
                group: planned.group,
                operations,
                status,
            });
        }

        let report = CommitReport {
            target: Some(target.clone()),
            groups: reports,
        };

        if report.is_success() {
            buffer.discard();
        }

        if report.applied_operations() > 0 {
            self.notify(&plan, &target).await;
        }

        Ok(report)
    }

    async fn apply_group(&self, target: &TableRef, planned: &PlannedGroup) -> GroupStatus {
        for (applied, operation) in planned.operations.iter().enumerate() {
            if let Err(err) = self.execute(target, operation).await.into_result() {
                return GroupStatus::Failed {
                    applied,
                    error: err.to_string(),
                };
            }
        }
        GroupStatus::Applied
    }

    async fn execute(&self, table: &TableRef, operation: &Operation) -> Envelope<bool> {
        tracing::trace!(table = %table, ?operation, "executing");
        match operation {
            Operation::AddColumn(column) => self.backend.add_column(table, column).await,
            Operation::AlterColumn {
                original_name,
                column,
            } => self.backend.alter_column(table, original_name, column).await,
            Operation::DropColumn(name) => self.backend.drop_column(table, name).await,
            Operation::InsertRow(row) => self.backend.insert_row(table, row).await,
            Operation::UpdateRow { key, values } => {
                self.backend.update_row(table, values, key).await
            }
            Operation::DeleteRow(key) => self.backend.delete_row(table, key).await,
            Operation::CreateIndex(index) => self.backend.create_index(table, index).await,
            Operation::DropIndex(name) => self.backend.drop_index(table, name).await,
            Operation::CreateTable(columns) => self.backend.create_table(table, columns).await,
        }
    }

    async fn notify(&self, plan: &CommitPlan, target: &TableRef) {
        let Some(observer) = &self.observer else {
            return;
        };
        let effects = if plan.groups.iter().any(|g| g.group == LedgerGroup::CreateTable) {
            CommitEffects {
                touched: Vec::new(),
                created: Some(target.clone()),
            }
        } else {
            CommitEffects {
                touched: vec![target.clone()],
                created: None,
            }
        };
        observer.after_commit(&effects).await;
    }
}

// Operation order inside each group must match the ledgers' `drain_committed` order
fn plan_ledgers(buffer: &StagedChangeBuffer) -> ServiceResult<CommitPlan> {
    let Some(target) = buffer.target().cloned() else {
        return Err(ServiceError::NoActiveTable);
    };
    let mut groups = Vec::new();

    let structure = buffer.structure();
    if !structure.is_empty() {
        let operations = structure
            .added
            .iter()
            .cloned()
            .map(Operation::AddColumn)
            .chain(structure.updated.iter().map(|u| Operation::AlterColumn {
                original_name: u.original_name.clone(),
                column: u.column.clone(),
            }))
            .chain(
                structure
                    .deleted
                    .iter()
                    .map(|c| Operation::DropColumn(c.name.clone())),
            )
            .collect();
        groups.push(PlannedGroup {
            group: LedgerGroup::Structure,
            operations,
        });
    }

    let data = buffer.data();
    if !data.is_empty() {
        let operations = data
            .added
            .iter()
            .map(|row| Operation::InsertRow(row.values.clone()))
            .chain(data.updated.iter().map(|edit| Operation::UpdateRow {
                key: edit.key.clone(),
                values: edit.values.clone(),
            }))
            .chain(
                data.deleted
                    .iter()
                    .map(|edit| Operation::DeleteRow(edit.key.clone())),
            )
            .collect();
        groups.push(PlannedGroup {
            group: LedgerGroup::Data,
            operations,
        });
    }

    // Drops first so that replacing an index under the same name works
    let indices = buffer.indices();
    if !indices.is_empty() {
        let operations = indices
            .deleted
            .iter()
            .map(|i| Operation::DropIndex(i.name.clone()))
            .chain(indices.added.iter().cloned().map(Operation::CreateIndex))
            .collect();
        groups.push(PlannedGroup {
            group: LedgerGroup::Indices,
            operations,
        });
    }

    Ok(CommitPlan {
        target: Some(target),
        groups,
    })
}

fn clear_group(buffer: &mut StagedChangeBuffer, group: LedgerGroup) {
    match group {
        LedgerGroup::Structure => buffer.clear_structure(),
        LedgerGroup::Data => buffer.clear_data(),
        LedgerGroup::Indices => buffer.clear_indices(),
        LedgerGroup::CreateTable => {
            buffer.clear_create_table_draft();
        }
    }
}

/// Remove the `applied` leading operations of a partly applied group
fn drain_group(buffer: &mut StagedChangeBuffer, group: LedgerGroup, applied: usize) {
    match group {
        LedgerGroup::Structure => buffer.drain_committed_structure(applied),
        LedgerGroup::Data => buffer.drain_committed_data(applied),
        LedgerGroup::Indices => buffer.drain_committed_indices(applied),
        // A single operation; nothing ran before it failed
        LedgerGroup::CreateTable => {}
    }
}
