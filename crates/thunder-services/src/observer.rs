//! Post-commit notification

use async_trait::async_trait;
use thunder_core::TableRef;

/// Tables a commit changed on the backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitEffects {
    /// Existing tables whose structure, rows or indices changed
    pub touched: Vec<TableRef>,
    /// Table created by a create-table commit
    pub created: Option<TableRef>,
}

impl CommitEffects {
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.created.is_none()
    }
}

/// Called after a commit applied at least one operation, including partial commits
#[async_trait]
pub trait CommitObserver: Send + Sync {
    async fn after_commit(&self, effects: &CommitEffects);
}
