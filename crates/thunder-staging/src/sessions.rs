//! One staged change buffer per tab

use std::collections::HashMap;

use thunder_core::{TabId, TableRef};

use crate::{IgnoreReason, StageOutcome, StagedChangeBuffer};

/// Edit sessions keyed by tab.
///
/// Each table or create-table tab owns its own buffer, so switching tabs
/// never mixes or loses pending edits. At most one session is active.
#[derive(Debug, Default)]
pub struct StagingSessions {
    buffers: HashMap<TabId, StagedChangeBuffer>,
    active: Option<TabId>,
}

impl StagingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the buffer of `tab`, bound to `target` when created
    pub fn open(&mut self, tab: TabId, target: Option<TableRef>) -> &mut StagedChangeBuffer {
        self.buffers.entry(tab).or_insert_with(|| {
            tracing::debug!(tab = %tab, target_table = ?target, "opening staging session");
            let mut buffer = StagedChangeBuffer::new();
            buffer.set_target(target);
            buffer
        })
    }

    /// Make `tab` the active session, creating an unbound buffer if needed
    pub fn activate(&mut self, tab: TabId) {
        self.open(tab, None);
        self.active = Some(tab);
    }

    pub fn deactivate(&mut self) {
        self.active = None;
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active(&self) -> Option<&StagedChangeBuffer> {
        self.active.and_then(|id| self.buffers.get(&id))
    }

    pub fn active_mut(&mut self) -> Option<&mut StagedChangeBuffer> {
        self.active.and_then(|id| self.buffers.get_mut(&id))
    }

    pub fn get(&self, tab: TabId) -> Option<&StagedChangeBuffer> {
        self.buffers.get(&tab)
    }

    pub fn get_mut(&mut self, tab: TabId) -> Option<&mut StagedChangeBuffer> {
        self.buffers.get_mut(&tab)
    }

    /// Remove the session of a closed tab, returning its buffer
    pub fn close(&mut self, tab: TabId) -> Option<StagedChangeBuffer> {
        if self.active == Some(tab) {
            self.active = None;
        }
        let buffer = self.buffers.remove(&tab);
        if buffer
            .as_ref()
            .is_some_and(StagedChangeBuffer::has_unsaved_changes)
        {
            let changes = buffer.as_ref().map_or(0, StagedChangeBuffer::change_count);
            tracing::warn!(tab = %tab, changes, "closing tab with unsaved changes");
        }
        buffer
    }

    /// Tabs whose buffers hold uncommitted edits
    pub fn unsaved(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self
            .buffers
            .iter()
            .filter(|(_, b)| b.has_unsaved_changes())
            .map(|(id, _)| *id)
            .collect();
        tabs.sort();
        tabs
    }

    /// Bind sessions to the now-active connection.
    ///
    /// Unbound buffers and buffers without unsaved changes follow the
    /// connection. Buffers holding edits for another connection keep their
    /// binding; their tabs are returned.
    pub fn bind_connection(&mut self, connection: Option<&str>) -> Vec<TabId> {
        let mut stranded = Vec::new();
        for (tab, buffer) in self.buffers.iter_mut() {
            if buffer.connection() == connection {
                continue;
            }
            if buffer.connection().is_none() || !buffer.has_unsaved_changes() {
                buffer.bind_connection(connection.map(str::to_string));
            } else {
                stranded.push(*tab);
            }
        }
        stranded.sort();
        if !stranded.is_empty() {
            tracing::warn!(
                tabs = stranded.len(),
                connection = ?connection,
                "sessions hold edits staged on another connection"
            );
        }
        stranded
    }

    /// Rebind a tab's buffer to another table.
    ///
    /// Refused while the buffer still holds edits for its current table.
    pub fn retarget(&mut self, tab: TabId, target: TableRef) -> StageOutcome {
        let Some(buffer) = self.buffers.get_mut(&tab) else {
            return StageOutcome::Ignored(IgnoreReason::NotStaged);
        };
        if buffer.target() == Some(&target) {
            return StageOutcome::Coalesced;
        }
        if buffer.has_changes() {
            tracing::warn!(tab = %tab, "refusing to retarget buffer with pending changes");
            return StageOutcome::Ignored(IgnoreReason::PendingChanges);
        }
        buffer.set_target(Some(target));
        StageOutcome::Applied
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use thunder_testing::row;

    use super::*;

    #[test]
    fn test_tabs_keep_separate_buffers() {
        let mut sessions = StagingSessions::new();
        let users = TabId::new();
        let orders = TabId::new();

        sessions.open(users, Some(TableRef::new("public", "users")));
        sessions.open(orders, Some(TableRef::new("public", "orders")));

        sessions.activate(users);
        sessions
            .active_mut()
            .unwrap()
            .stage_row_insert(row([("name", json!("Alice"))]));

        sessions.activate(orders);
        assert!(!sessions.active().unwrap().has_changes());

        sessions.activate(users);
        assert_eq!(sessions.active().unwrap().data().added.len(), 1);
        assert_eq!(sessions.unsaved(), vec![users]);
    }

    #[test]
    fn test_retarget_refuses_pending_changes() {
        let mut sessions = StagingSessions::new();
        let tab = TabId::new();
        sessions
            .open(tab, Some(TableRef::new("public", "users")))
            .stage_row_insert(row([("name", json!("x"))]));

        assert_eq!(
            sessions.retarget(tab, TableRef::new("public", "orders")),
            StageOutcome::Ignored(IgnoreReason::PendingChanges)
        );

        sessions.get_mut(tab).unwrap().discard();
        assert_eq!(
            sessions.retarget(tab, TableRef::new("public", "orders")),
            StageOutcome::Applied
        );
        assert_eq!(
            sessions.get(tab).unwrap().target(),
            Some(&TableRef::new("public", "orders"))
        );
    }

    #[test]
    fn test_edits_stay_bound_to_their_connection() {
        let mut sessions = StagingSessions::new();
        let users = TabId::new();
        let orders = TabId::new();
        sessions.open(users, Some(TableRef::new("public", "users")));
        sessions.open(orders, Some(TableRef::new("public", "orders")));
        assert!(sessions.bind_connection(Some("local")).is_empty());

        sessions
            .get_mut(users)
            .unwrap()
            .stage_row_insert(row([("name", json!("x"))]));

        assert_eq!(sessions.bind_connection(Some("staging")), vec![users]);
        assert_eq!(sessions.get(users).unwrap().connection(), Some("local"));
        assert_eq!(sessions.get(orders).unwrap().connection(), Some("staging"));

        assert!(sessions.bind_connection(Some("local")).is_empty());
    }

    #[test]
    fn test_close_active_tab_deactivates() {
        let mut sessions = StagingSessions::new();
        let tab = TabId::new();
        sessions.activate(tab);

        assert!(sessions.close(tab).is_some());
        assert!(sessions.active().is_none());
        assert!(sessions.is_empty());
    }
}
