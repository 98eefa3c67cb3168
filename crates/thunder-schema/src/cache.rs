//! Schema cache for the active connection
//!
//! Holds schema names, table names per schema and column descriptors per
//! table. Column descriptors are fetched lazily and memoized; an initial bulk
//! load only fetches columns for the first few tables of each schema.
//!
//! Every load captures the cache generation when it is issued. Clearing the
//! cache or switching connection bumps the generation, and responses that
//! arrive for an older generation are dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use thunder_core::{Backend, ColumnDescriptor, Result, TableRef};

use crate::entry::CacheEntry;
use crate::keywords::sql_keywords;

/// Number of tables per schema whose columns are fetched during a bulk load
pub const DEFAULT_EAGER_COLUMN_TABLES: usize = 10;

/// Configuration for the schema cache
#[derive(Debug, Clone)]
pub struct SchemaCacheConfig {
    /// Tables per schema that get their columns loaded eagerly
    pub eager_column_tables: usize,
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        Self {
            eager_column_tables: DEFAULT_EAGER_COLUMN_TABLES,
        }
    }
}

/// Result of a load request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Data was fetched and stored
    Loaded,
    /// Data was already cached; no backend call was made
    AlreadyCached,
    /// An identical load is in flight; this call was dropped
    AlreadyLoading,
    /// The response arrived after the cache was cleared or re-keyed and was discarded
    Stale,
}

#[derive(Debug, Default)]
struct SchemaEntry {
    tables: Vec<String>,
    columns: IndexMap<String, CacheEntry<Vec<ColumnDescriptor>>>,
}

#[derive(Debug, Default)]
struct CacheState {
    connection_id: Option<String>,
    schema_names: Vec<String>,
    schemas: IndexMap<String, SchemaEntry>,
    generation: u64,
}

/// Clears the bulk-load flag when the load finishes, including on early return
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Marks one schema's table list as loading
struct SchemaLoading<'a> {
    set: &'a Mutex<HashSet<String>>,
    schema: String,
}

impl<'a> SchemaLoading<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, schema: &str) -> Option<Self> {
        set.lock().insert(schema.to_string()).then(|| Self {
            set,
            schema: schema.to_string(),
        })
    }
}

impl Drop for SchemaLoading<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.schema);
    }
}

/// Removes a table's `Loading` marker if the column fetch is cancelled mid-flight
struct ColumnsLoading<'a> {
    state: &'a RwLock<CacheState>,
    generation: u64,
    schema: &'a str,
    table: &'a str,
    armed: bool,
}

impl ColumnsLoading<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ColumnsLoading<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.write();
        if state.generation != self.generation {
            return;
        }
        if let Some(entry) = state.schemas.get_mut(self.schema) {
            if entry.columns.get(self.table).is_some_and(CacheEntry::is_loading) {
                entry.columns.shift_remove(self.table);
                tracing::debug!(schema = %self.schema, table = %self.table, "column load cancelled");
            }
        }
    }
}

/// Memoized schema metadata of the active connection
pub struct SchemaCache {
    backend: Arc<dyn Backend>,
    config: SchemaCacheConfig,
    state: RwLock<CacheState>,
    loading: AtomicBool,
    tables_loading: Mutex<HashSet<String>>,
}

/// Thread-safe handle for sharing the cache between the workspace and services
pub type SharedSchemaCache = Arc<SchemaCache>;

impl SchemaCache {
    /// Create a cache with the default configuration
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, SchemaCacheConfig::default())
    }

    pub fn with_config(backend: Arc<dyn Backend>, config: SchemaCacheConfig) -> Self {
        Self {
            backend,
            config,
            state: RwLock::new(CacheState::default()),
            loading: AtomicBool::new(false),
            tables_loading: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &SchemaCacheConfig {
        &self.config
    }

    // ========== Loading ==========

    /// Bulk load: schema names, the table list of every schema, and columns
    /// for the first `eager_column_tables` tables of each schema.
    ///
    /// A call made while another bulk load is in flight returns
    /// `AlreadyLoading` without touching the backend. If the schema list
    /// cannot be fetched the previous list is kept and the error is returned.
    /// A schema whose table list fails to load is skipped; the others proceed.
    #[tracing::instrument(skip(self))]
    pub async fn load_schemas(&self) -> Result<LoadOutcome> {
        let Some(_flag) = LoadingFlag::acquire(&self.loading) else {
            tracing::debug!("schema load already in flight, skipping");
            return Ok(LoadOutcome::AlreadyLoading);
        };
        let generation = self.generation();

        let schemas = match self.backend.get_schemas().await.into_result() {
            Ok(schemas) => schemas,
            Err(err) => {
                tracing::error!(error = %err, "failed to load schemas");
                return Err(err.into());
            }
        };

        {
            let mut state = self.state.write();
            if state.generation != generation {
                tracing::debug!(generation, "discarding stale schema list");
                return Ok(LoadOutcome::Stale);
            }
            let mut previous = std::mem::take(&mut state.schemas);
            for schema in &schemas {
                let entry = previous.shift_remove(schema).unwrap_or_default();
                state.schemas.insert(schema.clone(), entry);
            }
            state.schema_names = schemas.clone();
        }

        for schema in &schemas {
            match self.load_tables_for_schema(schema).await {
                Ok(LoadOutcome::Stale) => return Ok(LoadOutcome::Stale),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(schema = %schema, error = %err, "failed to load tables, skipping schema");
                    continue;
                }
            }

            let eager: Vec<String> = self
                .tables_for_schema(schema)
                .into_iter()
                .take(self.config.eager_column_tables)
                .collect();
            let loads = eager
                .iter()
                .map(|table| self.load_columns_for_table(schema, table));
            for (table, result) in eager.iter().zip(join_all(loads).await) {
                if let Err(err) = result {
                    tracing::warn!(schema = %schema, table = %table, error = %err, "failed to load columns");
                }
            }

            if self.generation() != generation {
                return Ok(LoadOutcome::Stale);
            }
        }

        tracing::info!(
            schemas = schemas.len(),
            tables = self.all_tables().len(),
            "schema info loaded"
        );
        Ok(LoadOutcome::Loaded)
    }

    /// Fetch the table names of one schema.
    ///
    /// On failure the schema keeps its previous table list (empty if it was
    /// never loaded) and the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn load_tables_for_schema(&self, schema: &str) -> Result<LoadOutcome> {
        let Some(_guard) = SchemaLoading::acquire(&self.tables_loading, schema) else {
            tracing::debug!(schema = %schema, "tables already loading, skipping");
            return Ok(LoadOutcome::AlreadyLoading);
        };
        let generation = self.generation();

        let result = self.backend.get_collections(schema).await.into_result();

        let mut state = self.state.write();
        if state.generation != generation {
            return Ok(LoadOutcome::Stale);
        }
        if !state.schema_names.iter().any(|s| s == schema) {
            state.schema_names.push(schema.to_string());
        }
        let entry = state.schemas.entry(schema.to_string()).or_default();
        match result {
            Ok(tables) => {
                entry.columns.retain(|table, _| tables.contains(table));
                tracing::debug!(schema = %schema, table_count = tables.len(), "cached tables");
                entry.tables = tables;
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                tracing::warn!(schema = %schema, error = %err, "failed to load tables");
                Err(err.into())
            }
        }
    }

    /// Fetch and memoize the columns of one table.
    ///
    /// Returns `AlreadyCached` without a backend call when the columns are
    /// present, and `AlreadyLoading` when a fetch for the same table is in flight.
    /// Dropping the future before the fetch completes leaves the table unloaded.
    #[tracing::instrument(skip(self))]
    pub async fn load_columns_for_table(&self, schema: &str, table: &str) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.state.write();
            let generation = state.generation;
            let entry = state.schemas.entry(schema.to_string()).or_default();
            match entry.columns.get(table) {
                Some(CacheEntry::Loaded(_)) => return Ok(LoadOutcome::AlreadyCached),
                Some(CacheEntry::Loading) => return Ok(LoadOutcome::AlreadyLoading),
                _ => {
                    entry
                        .columns
                        .insert(table.to_string(), CacheEntry::Loading);
                }
            }
            generation
        };
        let mut guard = ColumnsLoading {
            state: &self.state,
            generation,
            schema,
            table,
            armed: true,
        };

        let table_ref = TableRef::new(schema, table);
        let result = self
            .backend
            .get_collection_structures(&table_ref)
            .await
            .into_result();
        guard.disarm();

        let mut state = self.state.write();
        if state.generation != generation {
            return Ok(LoadOutcome::Stale);
        }
        let entry = state.schemas.entry(schema.to_string()).or_default();
        // Invalidated while the fetch was in flight
        if !entry.columns.get(table).is_some_and(CacheEntry::is_loading) {
            return Ok(LoadOutcome::Stale);
        }
        match result {
            Ok(columns) => {
                tracing::debug!(table = %table_ref, column_count = columns.len(), "cached columns");
                entry
                    .columns
                    .insert(table.to_string(), CacheEntry::Loaded(columns));
                Ok(LoadOutcome::Loaded)
            }
            Err(err) => {
                entry.columns.shift_remove(table);
                tracing::warn!(table = %table_ref, error = %err, "failed to load columns");
                Err(err.into())
            }
        }
    }

    /// Columns of a table, loading them on first access
    pub async fn columns_or_load(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        self.load_columns_for_table(schema, table).await?;
        Ok(self.columns_for_table(schema, table))
    }

    // ========== Lookups ==========

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Connection the cached data belongs to
    pub fn connection_id(&self) -> Option<String> {
        self.state.read().connection_id.clone()
    }

    pub fn schemas(&self) -> Vec<String> {
        self.state.read().schema_names.clone()
    }

    pub fn tables_for_schema(&self, schema: &str) -> Vec<String> {
        self.state
            .read()
            .schemas
            .get(schema)
            .map(|s| s.tables.clone())
            .unwrap_or_default()
    }

    /// Cached columns of a table, or an empty list if not loaded
    pub fn columns_for_table(&self, schema: &str, table: &str) -> Vec<ColumnDescriptor> {
        self.state
            .read()
            .schemas
            .get(schema)
            .and_then(|s| s.columns.get(table))
            .and_then(|entry| entry.get().cloned())
            .unwrap_or_default()
    }

    pub fn column_state(&self, schema: &str, table: &str) -> CacheEntry<Vec<ColumnDescriptor>> {
        self.state
            .read()
            .schemas
            .get(schema)
            .and_then(|s| s.columns.get(table).cloned())
            .unwrap_or_default()
    }

    /// `schema.table` for every cached table, in schema-then-table cache order
    pub fn all_tables(&self) -> Vec<String> {
        let state = self.state.read();
        state
            .schemas
            .iter()
            .flat_map(|(schema, entry)| {
                entry
                    .tables
                    .iter()
                    .map(move |table| format!("{}.{}", schema, table))
            })
            .collect()
    }

    /// Distinct column names across all cached tables, first-seen order
    pub fn all_columns(&self) -> Vec<String> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for entry in state.schemas.values() {
            for cached in entry.columns.values() {
                for column in cached.get().into_iter().flatten() {
                    if seen.insert(column.name.as_str()) {
                        columns.push(column.name.clone());
                    }
                }
            }
        }
        columns
    }

    /// Keywords, `schema.table` identifiers and column names for autocomplete
    pub fn completion_words(&self) -> Vec<String> {
        sql_keywords()
            .iter()
            .map(|k| k.to_string())
            .chain(self.all_tables())
            .chain(self.all_columns())
            .collect()
    }

    // ========== Cache Management ==========

    /// Drop the cached columns of one table so the next access refetches them
    pub fn invalidate_table(&self, schema: &str, table: &str) {
        let mut state = self.state.write();
        if let Some(entry) = state.schemas.get_mut(schema) {
            entry.columns.shift_remove(table);
            tracing::debug!(schema = %schema, table = %table, "invalidated table cache");
        }
    }

    /// Invalidate and refetch the columns of one table
    pub async fn refresh_table(&self, schema: &str, table: &str) -> Result<LoadOutcome> {
        self.invalidate_table(schema, table);
        self.load_columns_for_table(schema, table).await
    }

    /// Refetch the table list of one schema
    pub async fn refresh_schema(&self, schema: &str) -> Result<LoadOutcome> {
        self.load_tables_for_schema(schema).await
    }

    /// Drop everything. Loads in flight are discarded when they complete.
    pub fn clear(&self) {
        let mut state = self.state.write();
        tracing::info!(schemas = state.schemas.len(), "clearing schema cache");
        state.schema_names.clear();
        state.schemas.clear();
        state.generation += 1;
    }

    /// Re-key the cache to `connection_id`, clearing it if the connection changed.
    ///
    /// Returns true if the cache was cleared.
    pub fn reset_for_connection(&self, connection_id: Option<String>) -> bool {
        let mut state = self.state.write();
        if state.connection_id == connection_id {
            return false;
        }
        tracing::info!(
            from = ?state.connection_id,
            to = ?connection_id,
            "connection changed, resetting schema cache"
        );
        state.connection_id = connection_id;
        state.schema_names.clear();
        state.schemas.clear();
        state.generation += 1;
        true
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
