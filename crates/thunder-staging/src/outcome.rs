//! Result of a staging call

/// What a staging mutator did with its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// A new ledger entry was recorded
    Applied,
    /// The edit was folded into an existing entry for the same row, column or index
    Coalesced,
    /// Nothing changed
    Ignored(IgnoreReason),
}

/// Why a staging call left the buffer untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The pending-row index is outside the added list
    StaleIndex { index: usize, len: usize },
    /// The same delete is already staged
    AlreadyStaged,
    /// There is no staged entry to undo
    NotStaged,
    /// The row or column is staged for deletion
    Deleted,
    /// The buffer still holds edits for its current table
    PendingChanges,
}

impl StageOutcome {
    /// True if the buffer changed
    pub fn changed(&self) -> bool {
        !self.is_ignored()
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, StageOutcome::Ignored(_))
    }

    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        match self {
            StageOutcome::Ignored(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoreReason::StaleIndex { index, len } => {
                write!(f, "row index {} out of range ({} pending rows)", index, len)
            }
            IgnoreReason::AlreadyStaged => write!(f, "already staged"),
            IgnoreReason::NotStaged => write!(f, "not staged"),
            IgnoreReason::Deleted => write!(f, "staged for deletion"),
            IgnoreReason::PendingChanges => write!(f, "buffer has pending changes"),
        }
    }
}
