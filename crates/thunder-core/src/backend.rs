//! Backend boundary
//!
//! The backend executes connect/list/fetch/apply operations on behalf of the
//! client state layer. It is implemented outside this workspace; the core only
//! relies on the request and response shapes below.

use async_trait::async_trait;

use crate::{
    ColumnDescriptor, ColumnDraft, ConnectionInfo, DatabaseInfo, Envelope, IndexDraft, Row,
    RowKey, TableRef,
};

/// Service that answers schema reads and executes staged edits.
///
/// Every call returns an [`Envelope`]. Implementations report transport
/// failures as error envelopes rather than panicking.
#[async_trait]
pub trait Backend: Send + Sync {
    // ========== Schema reads ==========

    /// List schema names for the active connection
    async fn get_schemas(&self) -> Envelope<Vec<String>>;

    /// List table names in `schema`
    async fn get_collections(&self, schema: &str) -> Envelope<Vec<String>>;

    /// Column metadata for one table
    async fn get_collection_structures(&self, table: &TableRef) -> Envelope<Vec<ColumnDescriptor>>;

    /// Indices defined on one table
    async fn get_indices(&self, table: &TableRef) -> Envelope<Vec<IndexDraft>>;

    /// Engine, version and database name of the active connection
    async fn get_database_info(&self) -> Envelope<DatabaseInfo>;

    // ========== Row edits ==========

    async fn insert_row(&self, table: &TableRef, row: &Row) -> Envelope<bool>;

    /// Update the row identified by `key` with the values in `row`
    async fn update_row(&self, table: &TableRef, row: &Row, key: &RowKey) -> Envelope<bool>;

    async fn delete_row(&self, table: &TableRef, key: &RowKey) -> Envelope<bool>;

    // ========== Structure edits ==========

    async fn add_column(&self, table: &TableRef, column: &ColumnDraft) -> Envelope<bool>;

    /// Alter the column currently named `original_name` to match `column`
    async fn alter_column(
        &self,
        table: &TableRef,
        original_name: &str,
        column: &ColumnDraft,
    ) -> Envelope<bool>;

    async fn drop_column(&self, table: &TableRef, name: &str) -> Envelope<bool>;

    // ========== Index edits ==========

    async fn create_index(&self, table: &TableRef, index: &IndexDraft) -> Envelope<bool>;

    async fn drop_index(&self, table: &TableRef, name: &str) -> Envelope<bool>;

    // ========== Table management ==========

    async fn create_table(&self, table: &TableRef, columns: &[ColumnDraft]) -> Envelope<bool>;

    // ========== Connection lifecycle ==========

    async fn get_active_connections(&self) -> Envelope<Vec<ConnectionInfo>>;

    async fn switch_connection(&self, connection_id: &str) -> Envelope<bool>;

    async fn disconnect_connection(&self, connection_id: &str) -> Envelope<bool>;
}
