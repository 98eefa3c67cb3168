//! Thunder Staging - edits recorded client-side before the backend applies them
//!
//! A `StagedChangeBuffer` holds four independent ledgers:
//! - data: pending row inserts plus updates and deletes of persisted rows
//! - structure: column adds, alterations and drops
//! - indices: index adds and drops (an index change is a drop plus an add)
//! - create table: the draft of a table that does not exist yet
//!
//! Every mutator returns a `StageOutcome` so callers can tell an applied edit
//! from one that was merged into an existing entry or ignored.
//! `StagingSessions` gives each tab its own buffer.

mod buffer;
mod ledger;
mod outcome;
mod row;
mod sessions;

pub use buffer::StagedChangeBuffer;
pub use ledger::{ColumnUpdate, DataLedger, IndexLedger, StructureLedger};
pub use outcome::{IgnoreReason, StageOutcome};
pub use row::{PENDING_MARKER, RowEdit, StagedRow};
pub use sessions::StagingSessions;
