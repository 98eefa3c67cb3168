//! Scriptable in-memory backend

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use thunder_core::{
    Backend, ColumnDescriptor, ColumnDraft, ConnectionInfo, DatabaseInfo, Envelope, ErrorDetail,
    IndexDraft, Row, RowKey, TableRef,
};
use tokio::sync::Notify;

/// Backend operation, used to script failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetSchemas,
    GetCollections,
    GetCollectionStructures,
    GetIndices,
    GetDatabaseInfo,
    InsertRow,
    UpdateRow,
    DeleteRow,
    AddColumn,
    AlterColumn,
    DropColumn,
    CreateIndex,
    DropIndex,
    CreateTable,
    GetActiveConnections,
    SwitchConnection,
    DisconnectConnection,
}

/// One recorded backend invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub op: Op,
    /// Human-readable argument summary, e.g. `public.users` or `public.users:id=1`
    pub target: String,
}

#[derive(Default)]
struct MockState {
    schemas: Vec<String>,
    tables: IndexMap<String, Vec<String>>,
    columns: HashMap<TableRef, Vec<ColumnDescriptor>>,
    indices: HashMap<TableRef, Vec<IndexDraft>>,
    rows: HashMap<TableRef, Vec<Row>>,
    connections: Vec<ConnectionInfo>,
    database_info: DatabaseInfo,
}

/// In-memory `Backend` for service-layer tests.
///
/// Write operations mutate the in-memory catalog so that refreshes after a
/// commit observe the new state.
pub struct MockBackend {
    state: Mutex<MockState>,
    failures: Mutex<HashMap<Op, ErrorDetail>>,
    failing_schemas: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<Op, Arc<Notify>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            failures: Mutex::new(HashMap::new()),
            failing_schemas: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a schema with its table names
    pub fn with_schema(self, schema: &str, tables: &[&str]) -> Self {
        {
            let mut state = self.state.lock();
            if !state.schemas.iter().any(|s| s == schema) {
                state.schemas.push(schema.to_string());
            }
            state.tables.insert(
                schema.to_string(),
                tables.iter().map(|t| t.to_string()).collect(),
            );
        }
        self
    }

    /// Register the columns of one table
    pub fn with_columns(self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.state
            .lock()
            .columns
            .insert(TableRef::new(schema, table), columns);
        self
    }

    pub fn with_connection(self, connection: ConnectionInfo) -> Self {
        self.state.lock().connections.push(connection);
        self
    }

    pub fn with_database_info(self, info: DatabaseInfo) -> Self {
        self.state.lock().database_info = info;
        self
    }

    /// Make every call of `op` answer with an error envelope
    pub fn failing(self, op: Op, detail: &str) -> Self {
        self.fail_on(op, detail);
        self
    }

    /// Make `get_collections` fail for one schema only
    pub fn failing_collections_for(self, schema: &str) -> Self {
        self.failing_schemas.lock().insert(schema.to_string());
        self
    }

    pub fn fail_on(&self, op: Op, detail: &str) {
        self.failures
            .lock()
            .insert(op, ErrorDetail::new("Mock Failure", 500, detail));
    }

    pub fn clear_failure(&self, op: Op) {
        self.failures.lock().remove(&op);
    }

    /// Block calls of `op` until the returned handle is notified
    pub fn gate(&self, op: Op) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates.lock().insert(op, notify.clone());
        notify
    }

    /// Replace the table list of a schema after construction
    pub fn set_tables(&self, schema: &str, tables: &[&str]) {
        let mut state = self.state.lock();
        if !state.schemas.iter().any(|s| s == schema) {
            state.schemas.push(schema.to_string());
        }
        state.tables.insert(
            schema.to_string(),
            tables.iter().map(|t| t.to_string()).collect(),
        );
    }

    pub fn set_columns(&self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) {
        self.state
            .lock()
            .columns
            .insert(TableRef::new(schema, table), columns);
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.calls.lock().iter().filter(|c| c.op == op).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// Targets of every recorded call of `op`, in call order
    pub fn targets(&self, op: Op) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.target.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Rows inserted into `table` so far
    pub fn rows(&self, table: &TableRef) -> Vec<Row> {
        self.state.lock().rows.get(table).cloned().unwrap_or_default()
    }

    pub fn columns(&self, table: &TableRef) -> Vec<ColumnDescriptor> {
        self.state
            .lock()
            .columns
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn indices(&self, table: &TableRef) -> Vec<IndexDraft> {
        self.state
            .lock()
            .indices
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn enter(&self, op: Op, target: impl Into<String>) -> Option<ErrorDetail> {
        self.calls.lock().push(RecordedCall {
            op,
            target: target.into(),
        });
        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.failures.lock().get(&op).cloned()
    }

    async fn write(&self, op: Op, target: String, apply: impl FnOnce(&mut MockState)) -> Envelope<bool> {
        if let Some(err) = self.enter(op, target).await {
            return Envelope::error(err);
        }
        apply(&mut self.state.lock());
        Envelope::ok(true)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn get_schemas(&self) -> Envelope<Vec<String>> {
        if let Some(err) = self.enter(Op::GetSchemas, "").await {
            return Envelope::error(err);
        }
        Envelope::ok(self.state.lock().schemas.clone())
    }

    async fn get_collections(&self, schema: &str) -> Envelope<Vec<String>> {
        if let Some(err) = self.enter(Op::GetCollections, schema).await {
            return Envelope::error(err);
        }
        if self.failing_schemas.lock().contains(schema) {
            return Envelope::error(ErrorDetail::new(
                "Mock Failure",
                500,
                format!("cannot list tables of {}", schema),
            ));
        }
        Envelope::ok(
            self.state
                .lock()
                .tables
                .get(schema)
                .cloned()
                .unwrap_or_default(),
        )
    }

    async fn get_collection_structures(&self, table: &TableRef) -> Envelope<Vec<ColumnDescriptor>> {
        if let Some(err) = self
            .enter(Op::GetCollectionStructures, table.qualified())
            .await
        {
            return Envelope::error(err);
        }
        Envelope::ok(
            self.state
                .lock()
                .columns
                .get(table)
                .cloned()
                .unwrap_or_default(),
        )
    }

    async fn get_indices(&self, table: &TableRef) -> Envelope<Vec<IndexDraft>> {
        if let Some(err) = self.enter(Op::GetIndices, table.qualified()).await {
            return Envelope::error(err);
        }
        Envelope::ok(self.indices(table))
    }

    async fn get_database_info(&self) -> Envelope<DatabaseInfo> {
        if let Some(err) = self.enter(Op::GetDatabaseInfo, "").await {
            return Envelope::error(err);
        }
        Envelope::ok(self.state.lock().database_info.clone())
    }

    async fn insert_row(&self, table: &TableRef, row: &Row) -> Envelope<bool> {
        let row = row.clone();
        let table_ref = table.clone();
        self.write(Op::InsertRow, table.qualified(), move |state| {
            state.rows.entry(table_ref).or_default().push(row);
        })
        .await
    }

    async fn update_row(&self, table: &TableRef, row: &Row, key: &RowKey) -> Envelope<bool> {
        let row = row.clone();
        let key = key.clone();
        let table_ref = table.clone();
        let target = format!("{}:{}", table.qualified(), key);
        self.write(Op::UpdateRow, target, move |state| {
            if let Some(rows) = state.rows.get_mut(&table_ref) {
                for existing in rows.iter_mut() {
                    if existing.get(&key.column) == Some(&key.value) {
                        existing.extend(row.clone());
                    }
                }
            }
        })
        .await
    }

    async fn delete_row(&self, table: &TableRef, key: &RowKey) -> Envelope<bool> {
        let key = key.clone();
        let table_ref = table.clone();
        let target = format!("{}:{}", table.qualified(), key);
        self.write(Op::DeleteRow, target, move |state| {
            if let Some(rows) = state.rows.get_mut(&table_ref) {
                rows.retain(|r| r.get(&key.column) != Some(&key.value));
            }
        })
        .await
    }

    async fn add_column(&self, table: &TableRef, column: &ColumnDraft) -> Envelope<bool> {
        let descriptor = descriptor_from_draft(column);
        let table_ref = table.clone();
        let target = format!("{}.{}", table.qualified(), column.name);
        self.write(Op::AddColumn, target, move |state| {
            state.columns.entry(table_ref).or_default().push(descriptor);
        })
        .await
    }

    async fn alter_column(
        &self,
        table: &TableRef,
        original_name: &str,
        column: &ColumnDraft,
    ) -> Envelope<bool> {
        let descriptor = descriptor_from_draft(column);
        let table_ref = table.clone();
        let original = original_name.to_string();
        let target = format!("{}.{}", table.qualified(), original_name);
        self.write(Op::AlterColumn, target, move |state| {
            if let Some(columns) = state.columns.get_mut(&table_ref) {
                for existing in columns.iter_mut() {
                    if existing.name == original {
                        *existing = descriptor.clone();
                    }
                }
            }
        })
        .await
    }

    async fn drop_column(&self, table: &TableRef, name: &str) -> Envelope<bool> {
        let table_ref = table.clone();
        let name = name.to_string();
        let target = format!("{}.{}", table.qualified(), name);
        self.write(Op::DropColumn, target, move |state| {
            if let Some(columns) = state.columns.get_mut(&table_ref) {
                columns.retain(|c| c.name != name);
            }
        })
        .await
    }

    async fn create_index(&self, table: &TableRef, index: &IndexDraft) -> Envelope<bool> {
        let index = index.clone();
        let table_ref = table.clone();
        let target = format!("{}:{}", table.qualified(), index.name);
        self.write(Op::CreateIndex, target, move |state| {
            state.indices.entry(table_ref).or_default().push(index);
        })
        .await
    }

    async fn drop_index(&self, table: &TableRef, name: &str) -> Envelope<bool> {
        let table_ref = table.clone();
        let name = name.to_string();
        let target = format!("{}:{}", table.qualified(), name);
        self.write(Op::DropIndex, target, move |state| {
            if let Some(indices) = state.indices.get_mut(&table_ref) {
                indices.retain(|i| i.name != name);
            }
        })
        .await
    }

    async fn create_table(&self, table: &TableRef, columns: &[ColumnDraft]) -> Envelope<bool> {
        let descriptors: Vec<_> = columns.iter().map(descriptor_from_draft).collect();
        let table_ref = table.clone();
        self.write(Op::CreateTable, table.qualified(), move |state| {
            if !state.schemas.contains(&table_ref.schema) {
                state.schemas.push(table_ref.schema.clone());
            }
            state
                .tables
                .entry(table_ref.schema.clone())
                .or_default()
                .push(table_ref.name.clone());
            state.columns.insert(table_ref, descriptors);
        })
        .await
    }

    async fn get_active_connections(&self) -> Envelope<Vec<ConnectionInfo>> {
        if let Some(err) = self.enter(Op::GetActiveConnections, "").await {
            return Envelope::error(err);
        }
        Envelope::ok(self.state.lock().connections.clone())
    }

    async fn switch_connection(&self, connection_id: &str) -> Envelope<bool> {
        let id = connection_id.to_string();
        if let Some(err) = self.enter(Op::SwitchConnection, connection_id).await {
            return Envelope::error(err);
        }
        let mut state = self.state.lock();
        if !state.connections.iter().any(|c| c.id == id) {
            return Envelope::error(ErrorDetail::new(
                "Not Found",
                404,
                format!("connection {} not found", id),
            ));
        }
        for connection in state.connections.iter_mut() {
            connection.is_active = connection.id == id;
        }
        Envelope::ok(true)
    }

    async fn disconnect_connection(&self, connection_id: &str) -> Envelope<bool> {
        let id = connection_id.to_string();
        self.write(Op::DisconnectConnection, id.clone(), move |state| {
            state.connections.retain(|c| c.id != id);
        })
        .await
    }
}

fn descriptor_from_draft(column: &ColumnDraft) -> ColumnDescriptor {
    ColumnDescriptor {
        name: column.name.clone(),
        data_type: column.data_type.clone(),
        length: column.size.map(i64::from),
        nullable: column.nullable,
        default: (!column.default.is_empty()).then(|| column.default.clone()),
        is_primary: column.primary_key,
        is_unique: column.unique,
        ..Default::default()
    }
}
