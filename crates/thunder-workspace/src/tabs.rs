//! Open tabs and the active selection

use serde::{Deserialize, Serialize};
use thunder_core::{TabId, TableRef};

use crate::StatusLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabKind {
    Query,
    Table,
    CreateTable,
}

/// Structure or data view of a table tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubTab {
    #[default]
    Structure,
    Data,
}

/// An open view. Tabs reference a table but never own edit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub kind: TabKind,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub sql: Option<String>,
    pub status: Option<String>,
    pub level: StatusLevel,
    pub active_sub_tab: Option<SubTab>,
}

impl Tab {
    fn new(title: impl Into<String>, kind: TabKind) -> Self {
        Self {
            id: TabId::new(),
            title: title.into(),
            kind,
            schema: None,
            table: None,
            sql: None,
            status: None,
            level: StatusLevel::Info,
            active_sub_tab: None,
        }
    }

    /// The table this tab shows, for table tabs
    pub fn table_ref(&self) -> Option<TableRef> {
        match (&self.schema, &self.table) {
            (Some(schema), Some(table)) => Some(TableRef::new(schema.clone(), table.clone())),
            _ => None,
        }
    }

    fn shows(&self, schema: &str, table: &str) -> bool {
        self.kind == TabKind::Table
            && self.schema.as_deref() == Some(schema)
            && self.table.as_deref() == Some(table)
    }
}

/// Partial update merged into a tab; `None` fields are left alone
#[derive(Debug, Clone, Default)]
pub struct TabPatch {
    pub title: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub sql: Option<String>,
    pub status: Option<String>,
    pub level: Option<StatusLevel>,
    pub active_sub_tab: Option<SubTab>,
}

impl TabPatch {
    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..Default::default()
        }
    }

    pub fn status(status: impl Into<String>, level: StatusLevel) -> Self {
        Self {
            status: Some(status.into()),
            level: Some(level),
            ..Default::default()
        }
    }

    fn apply(self, tab: &mut Tab) {
        if let Some(title) = self.title {
            tab.title = title;
        }
        if let Some(schema) = self.schema {
            tab.schema = Some(schema);
        }
        if let Some(table) = self.table {
            tab.table = Some(table);
        }
        if let Some(sql) = self.sql {
            tab.sql = Some(sql);
        }
        if let Some(status) = self.status {
            tab.status = Some(status);
        }
        if let Some(level) = self.level {
            tab.level = level;
        }
        if let Some(sub_tab) = self.active_sub_tab {
            tab.active_sub_tab = Some(sub_tab);
        }
    }
}

/// Ordered list of open tabs with one active selection
#[derive(Debug, Default)]
pub struct TabRegistry {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    active_sub_tab: SubTab,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, tab: Tab) -> TabId {
        let id = tab.id;
        tracing::debug!(tab = %id, title = %tab.title, kind = ?tab.kind, "opening tab");
        self.tabs.push(tab);
        self.active = Some(id);
        id
    }

    pub fn new_query_tab(&mut self) -> TabId {
        let mut tab = Tab::new("SQL Query", TabKind::Query);
        tab.sql = Some(String::new());
        self.push(tab)
    }

    /// Always creates a new tab; see `open_table_tab` for the de-duplicating form
    pub fn new_table_tab(&mut self, schema: &str, table: &str) -> TabId {
        let mut tab = Tab::new(format!("{}.{}", schema, table), TabKind::Table);
        tab.schema = Some(schema.to_string());
        tab.table = Some(table.to_string());
        self.push(tab)
    }

    /// Activate the tab already showing `schema.table`, or open one.
    ///
    /// Returns the tab id and whether a new tab was created.
    pub fn open_table_tab(&mut self, schema: &str, table: &str) -> (TabId, bool) {
        if let Some(id) = self.find_table_tab(schema, table).map(|t| t.id) {
            self.active = Some(id);
            return (id, false);
        }
        (self.new_table_tab(schema, table), true)
    }

    pub fn new_create_table_tab(&mut self, schema: &str) -> TabId {
        let mut tab = Tab::new("New Table", TabKind::CreateTable);
        tab.schema = Some(schema.to_string());
        self.push(tab)
    }

    /// Remove a tab. Closing the active tab activates the last tab in the list.
    pub fn close_tab(&mut self, id: TabId) -> Option<Tab> {
        let pos = self.tabs.iter().position(|t| t.id == id)?;
        let tab = self.tabs.remove(pos);
        if self.active == Some(id) {
            self.active = self.tabs.last().map(|t| t.id);
        }
        Some(tab)
    }

    /// Returns false for an unknown id
    pub fn set_active(&mut self, id: TabId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active = Some(id);
        true
    }

    pub fn update_tab(&mut self, id: TabId, patch: TabPatch) -> bool {
        match self.tabs.iter_mut().find(|t| t.id == id) {
            Some(tab) => {
                patch.apply(tab);
                true
            }
            None => false,
        }
    }

    pub fn find_table_tab(&self, schema: &str, table: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.shows(schema, table))
    }

    pub fn set_active_sub_tab(&mut self, sub_tab: SubTab) {
        self.active_sub_tab = sub_tab;
        let active = self.active;
        if let Some(tab) = self.tabs.iter_mut().find(|t| Some(t.id) == active) {
            tab.active_sub_tab = Some(sub_tab);
        }
    }

    pub fn active_sub_tab(&self) -> SubTab {
        self.active_sub_tab
    }

    pub fn active_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_open_table_tab_deduplicates() {
        let mut tabs = TabRegistry::new();
        let (users, created) = tabs.open_table_tab("public", "users");
        assert!(created);
        tabs.new_query_tab();

        let (again, created) = tabs.open_table_tab("public", "users");

        assert!(!created);
        assert_eq!(again, users);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs.active_id(), Some(users));
        assert_eq!(tabs.active_tab().unwrap().title, "public.users");
    }

    #[test]
    fn test_close_active_activates_last_tab() {
        let mut tabs = TabRegistry::new();
        let first = tabs.new_query_tab();
        let second = tabs.new_create_table_tab("public");
        let third = tabs.new_table_tab("public", "orders");

        tabs.set_active(first);
        tabs.close_tab(second);
        assert_eq!(tabs.active_id(), Some(first));

        tabs.close_tab(first);
        assert_eq!(tabs.active_id(), Some(third));

        tabs.close_tab(third);
        assert_eq!(tabs.active_id(), None);
        assert!(tabs.close_tab(third).is_none());
    }

    #[test]
    fn test_update_tab_merges_patch() {
        let mut tabs = TabRegistry::new();
        let id = tabs.new_query_tab();

        assert!(tabs.update_tab(id, TabPatch::sql("select 1")));
        assert!(tabs.update_tab(id, TabPatch::status("1 row", StatusLevel::Info)));

        let tab = tabs.get(id).unwrap();
        assert_eq!(tab.sql.as_deref(), Some("select 1"));
        assert_eq!(tab.status.as_deref(), Some("1 row"));
        assert_eq!(tab.title, "SQL Query");
        assert!(!tabs.update_tab(TabId::new(), TabPatch::default()));
    }

    #[test]
    fn test_set_active_rejects_unknown_id() {
        let mut tabs = TabRegistry::new();
        let id = tabs.new_query_tab();
        assert!(!tabs.set_active(TabId::new()));
        assert_eq!(tabs.active_id(), Some(id));
    }

    #[test]
    fn test_sub_tab_follows_active_tab() {
        let mut tabs = TabRegistry::new();
        let id = tabs.new_table_tab("public", "users");
        tabs.set_active_sub_tab(SubTab::Data);

        assert_eq!(tabs.active_sub_tab(), SubTab::Data);
        assert_eq!(tabs.get(id).unwrap().active_sub_tab, Some(SubTab::Data));
        assert_eq!(
            tabs.get(id).unwrap().table_ref(),
            Some(TableRef::new("public", "users"))
        );
    }
}
