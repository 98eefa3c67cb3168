//! Thunder Schema - lazily loaded schema metadata
//!
//! This crate provides:
//! - `SchemaCache`, the memoized schema/table/column catalog of the active
//!   connection, used for autocomplete and for validating staged edits
//! - `CacheEntry`, the per-table loading state that prevents duplicate fetches
//! - The SQL keyword list offered by autocomplete

mod cache;
mod entry;
mod keywords;

pub use cache::{
    DEFAULT_EAGER_COLUMN_TABLES, LoadOutcome, SchemaCache, SchemaCacheConfig, SharedSchemaCache,
};
pub use entry::CacheEntry;
pub use keywords::sql_keywords;
