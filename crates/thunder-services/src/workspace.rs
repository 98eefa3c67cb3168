//! Editor workspace: connection, schema cache, tabs and their edit sessions

use std::sync::Arc;

use thunder_core::{Backend, ColumnDescriptor, IndexDraft, RequestToken, TabId, TableRef};
use thunder_schema::{LoadOutcome, SchemaCache, SharedSchemaCache};
use thunder_staging::{StagedChangeBuffer, StagingSessions};
use thunder_workspace::{
    ConnectionContext, QueryHistory, QueryHistoryEntry, StatusBar, StatusLevel, TabKind, TabPatch,
    TabRegistry,
};

use crate::error::{ServiceError, ServiceResult};
use crate::reconcile::{CommitReport, ReconciliationService};
use crate::refresher::SchemaRefresher;
use crate::settings::ThunderSettings;

/// Column fetch for one table tab, detached from the workspace
#[must_use = "a column request does nothing until fetched"]
pub struct ColumnRequest {
    token: RequestToken,
    target: TableRef,
    cache: SharedSchemaCache,
}

impl ColumnRequest {
    pub fn token(&self) -> &RequestToken {
        &self.token
    }

    /// Load the columns through the schema cache. The workspace stays usable
    /// while this runs; hand the response to `EditorWorkspace::accept_columns`.
    pub async fn fetch(self) -> ColumnResponse {
        let result = self
            .cache
            .columns_or_load(&self.target.schema, &self.target.name)
            .await
            .map_err(|e| ServiceError::SchemaLoadFailed(e.to_string()));
        ColumnResponse {
            token: self.token,
            result,
        }
    }
}

/// Columns returned for a `ColumnRequest`, still tagged with its token
pub struct ColumnResponse {
    token: RequestToken,
    result: ServiceResult<Vec<ColumnDescriptor>>,
}

/// Everything one editor window holds.
///
/// Table and create-table tabs each own a staging buffer; the buffer of the
/// active tab is the one edits go to. The schema cache is keyed by the active
/// connection and reset whenever it changes. Buffers remember the connection
/// their edits were staged on and cannot be committed anywhere else.
pub struct EditorWorkspace {
    backend: Arc<dyn Backend>,
    connection: ConnectionContext,
    cache: SharedSchemaCache,
    tabs: TabRegistry,
    sessions: StagingSessions,
    status: StatusBar,
    history: QueryHistory,
    reconciler: ReconciliationService,
}

impl EditorWorkspace {
    /// Create a workspace with in-memory query history
    pub fn new(backend: Arc<dyn Backend>, settings: &ThunderSettings) -> Self {
        let history = QueryHistory::new(settings.history.max_entries);
        Self::with_history(backend, settings, history)
    }

    /// Create a workspace whose query history is persisted at the configured file
    pub fn open(backend: Arc<dyn Backend>, settings: &ThunderSettings) -> anyhow::Result<Self> {
        let path = settings.history_path()?;
        let history = QueryHistory::with_file(path, settings.history.max_entries);
        Ok(Self::with_history(backend, settings, history))
    }

    pub fn with_history(
        backend: Arc<dyn Backend>,
        settings: &ThunderSettings,
        history: QueryHistory,
    ) -> Self {
        let cache = Arc::new(SchemaCache::with_config(
            backend.clone(),
            settings.schema_cache_config(),
        ));
        let reconciler = ReconciliationService::new(backend.clone())
            .with_observer(Arc::new(SchemaRefresher::new(cache.clone())))
            .stop_on_group_failure(settings.commit.stop_on_group_failure);

        Self {
            connection: ConnectionContext::new(backend.clone()),
            backend,
            cache,
            tabs: TabRegistry::new(),
            sessions: StagingSessions::new(),
            status: StatusBar::new(),
            history,
            reconciler,
        }
    }

    // ========== Connections ==========

    /// Reload the connection list and re-key the schema cache to the active connection
    #[tracing::instrument(skip(self))]
    pub async fn refresh_connections(&mut self) -> ServiceResult<()> {
        self.connection
            .refresh()
            .await
            .map_err(|e| ServiceError::ConnectionFailed(e.to_string()))?;
        self.cache
            .reset_for_connection(self.connection.active_connection_id());
        self.rebind_sessions();
        Ok(())
    }

    /// Switch the active connection, reset the schema cache and load the new schema
    #[tracing::instrument(skip(self))]
    pub async fn switch_connection(&mut self, connection_id: &str) -> ServiceResult<()> {
        let switched = match self.connection.switch_to(connection_id).await {
            Ok(switched) => switched,
            Err(err) => {
                self.status
                    .error(format!("Failed to switch connection: {}", err));
                return Err(ServiceError::ConnectionFailed(err.to_string()));
            }
        };
        if !switched {
            return Err(ServiceError::ConnectionFailed(format!(
                "backend declined switch to {}",
                connection_id
            )));
        }

        self.cache
            .reset_for_connection(self.connection.active_connection_id());
        let name = self
            .connection
            .active_connection()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| connection_id.to_string());
        self.status.info(format!("Connected to {}", name));
        self.load_schema_info().await;
        self.rebind_sessions();
        Ok(())
    }

    /// Disconnect a connection. If it was the active one the cache is reset.
    #[tracing::instrument(skip(self))]
    pub async fn disconnect(&mut self, connection_id: &str) -> ServiceResult<bool> {
        let removed = self
            .connection
            .remove(connection_id)
            .await
            .map_err(|e| ServiceError::ConnectionFailed(e.to_string()))?;
        self.cache
            .reset_for_connection(self.connection.active_connection_id());
        self.rebind_sessions();
        Ok(removed)
    }

    /// Move sessions without unsaved edits to the active connection and warn
    /// about tabs whose edits belong to another one
    fn rebind_sessions(&mut self) {
        let active = self.connection.active_connection_id();
        let stranded = self.sessions.bind_connection(active.as_deref());
        if !stranded.is_empty() {
            self.status.warn(format!(
                "{} tab(s) hold edits staged on another connection",
                stranded.len()
            ));
        }
    }

    // ========== Schema ==========

    /// Load schemas, tables and eager columns plus database info.
    ///
    /// Failures are reported through the status bar and never propagate;
    /// the cache keeps whatever it held before.
    pub async fn load_schema_info(&mut self) -> Option<LoadOutcome> {
        match self.backend.get_database_info().await.into_result() {
            Ok(info) => self.status.set_database_info(Some(info)),
            Err(err) => tracing::warn!(error = %err, "failed to load database info"),
        }

        match self.cache.load_schemas().await {
            Ok(outcome) => {
                if outcome == LoadOutcome::Loaded {
                    self.status.info(format!(
                        "Loaded {} tables",
                        self.cache.all_tables().len()
                    ));
                }
                Some(outcome)
            }
            Err(err) => {
                let err = ServiceError::SchemaLoadFailed(err.to_string());
                self.status.error(err.to_string());
                None
            }
        }
    }

    /// Token describing the context a load for `target` is issued in
    pub fn request_token(&self, target: Option<TableRef>) -> RequestToken {
        RequestToken::new(
            self.cache.connection_id(),
            self.cache.generation(),
            target,
        )
    }

    /// True if a response issued under `token` still applies to the active tab
    pub fn is_current(&self, token: &RequestToken) -> bool {
        token.matches(&self.request_token(self.active_target()))
    }

    fn active_target(&self) -> Option<TableRef> {
        self.tabs.active_tab().and_then(|t| t.table_ref())
    }

    /// Issue a column fetch for the active table tab
    pub fn column_request(&self) -> ServiceResult<ColumnRequest> {
        let Some(target) = self.active_target() else {
            return Err(ServiceError::NoActiveTable);
        };
        Ok(ColumnRequest {
            token: self.request_token(Some(target.clone())),
            target,
            cache: self.cache.clone(),
        })
    }

    /// Take a column response if its tab and connection are still current.
    ///
    /// Returns `None` for a response that went stale while in flight, whether
    /// it succeeded or not; the cache keeps whatever it memoized.
    pub fn accept_columns(
        &self,
        response: ColumnResponse,
    ) -> ServiceResult<Option<Vec<ColumnDescriptor>>> {
        if !self.is_current(&response.token) {
            tracing::debug!(target_table = ?response.token.target, "discarding stale column response");
            return Ok(None);
        }
        response.result.map(Some)
    }

    /// Issue, fetch and accept in one step, for callers that do not switch
    /// context while waiting
    pub async fn load_active_columns(&self) -> ServiceResult<Option<Vec<ColumnDescriptor>>> {
        let response = self.column_request()?.fetch().await;
        self.accept_columns(response)
    }

    /// Indices of the active table tab as the backend reports them
    pub async fn load_active_indices(&self) -> ServiceResult<Vec<IndexDraft>> {
        let Some(target) = self.active_target() else {
            return Err(ServiceError::NoActiveTable);
        };
        self.backend
            .get_indices(&target)
            .await
            .into_result()
            .map_err(|e| {
                tracing::warn!(table = %target, error = %e, "failed to load indices");
                ServiceError::SchemaLoadFailed(e.to_string())
            })
    }

    // ========== Tabs ==========

    pub fn new_query_tab(&mut self) -> TabId {
        let id = self.tabs.new_query_tab();
        self.sessions.deactivate();
        id
    }

    /// Open or re-activate the tab of `schema.table` and its edit session
    pub fn open_table(&mut self, schema: &str, table: &str) -> TabId {
        let (id, _created) = self.tabs.open_table_tab(schema, table);
        self.open_session(id, Some(TableRef::new(schema, table)));
        self.sessions.activate(id);
        id
    }

    pub fn new_create_table_tab(&mut self, schema: &str) -> TabId {
        let id = self.tabs.new_create_table_tab(schema);
        self.open_session(id, None)
            .set_create_table_draft(schema, "", Vec::new());
        self.sessions.activate(id);
        id
    }

    pub fn activate_tab(&mut self, id: TabId) -> bool {
        if !self.tabs.set_active(id) {
            return false;
        }
        self.sync_active_session();
        true
    }

    /// Close a tab, returning any edits it still held
    pub fn close_tab(&mut self, id: TabId) -> Option<StagedChangeBuffer> {
        self.tabs.close_tab(id)?;
        let buffer = self.sessions.close(id);
        self.sync_active_session();
        buffer
    }

    fn sync_active_session(&mut self) {
        let editable = self
            .tabs
            .active_tab()
            .filter(|tab| tab.kind != TabKind::Query)
            .map(|tab| (tab.id, tab.table_ref()));
        match editable {
            Some((id, target)) => {
                self.open_session(id, target);
                self.sessions.activate(id);
            }
            None => self.sessions.deactivate(),
        }
    }

    /// Get or create a tab's buffer, bound to the active connection unless it
    /// holds edits for another one
    fn open_session(&mut self, id: TabId, target: Option<TableRef>) -> &mut StagedChangeBuffer {
        let connection = self.connection.active_connection_id();
        let buffer = self.sessions.open(id, target);
        if buffer.connection().is_none() || !buffer.has_unsaved_changes() {
            buffer.bind_connection(connection);
        }
        buffer
    }

    /// Edit buffer of the active tab
    pub fn staged(&self) -> Option<&StagedChangeBuffer> {
        self.sessions.active()
    }

    pub fn staged_mut(&mut self) -> Option<&mut StagedChangeBuffer> {
        self.sessions.active_mut()
    }

    pub fn discard_staged_changes(&mut self) {
        if let Some(buffer) = self.sessions.active_mut() {
            buffer.discard();
        }
    }

    // ========== Commit ==========

    /// Commit the active tab's buffer and report the outcome per ledger group
    #[tracing::instrument(skip(self))]
    pub async fn commit_active(&mut self) -> ServiceResult<CommitReport> {
        let tab_id = self.tabs.active_id();
        let active_connection = self.connection.active_connection_id();
        let Some(buffer) = self.sessions.active_mut() else {
            return Err(ServiceError::NoActiveTable);
        };
        if buffer.connection() != active_connection.as_deref() {
            let err = ServiceError::ConnectionMismatch {
                staged: buffer.connection().unwrap_or("none").to_string(),
                active: active_connection.unwrap_or_else(|| "none".to_string()),
            };
            self.status.error(err.to_string());
            return Err(err);
        }

        let report = match self.reconciler.apply(buffer).await {
            Ok(report) => report,
            Err(err) => {
                self.status.error(err.to_string());
                return Err(err);
            }
        };

        let (message, level) = if report.is_noop() {
            ("No changes to commit".to_string(), StatusLevel::Info)
        } else if report.is_success() {
            (
                format!("Committed {} changes", report.applied_operations()),
                StatusLevel::Info,
            )
        } else {
            (
                ServiceError::CommitFailed(report.summary()).to_string(),
                StatusLevel::Error,
            )
        };
        self.status.update_status(message.clone(), level);
        if let Some(id) = tab_id {
            self.tabs.update_tab(id, TabPatch::status(message, level));
        }
        Ok(report)
    }

    // ========== History ==========

    pub fn record_query(&mut self, entry: QueryHistoryEntry) {
        self.history.add(entry);
    }

    // ========== Accessors ==========

    pub fn cache(&self) -> &SharedSchemaCache {
        &self.cache
    }

    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    pub fn tabs_mut(&mut self) -> &mut TabRegistry {
        &mut self.tabs
    }

    pub fn sessions(&self) -> &StagingSessions {
        &self.sessions
    }

    pub fn status(&self) -> &StatusBar {
        &self.status
    }

    pub fn connection(&self) -> &ConnectionContext {
        &self.connection
    }

    pub fn history(&self) -> &QueryHistory {
        &self.history
    }
}
