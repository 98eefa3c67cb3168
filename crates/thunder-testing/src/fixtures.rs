//! Shared fixtures for Thunder tests

use thunder_core::{ColumnDescriptor, ConnectionInfo, DatabaseInfo, Row};

use crate::MockBackend;

/// Backend with `public` (users, orders) and `audit` (log) schemas
pub fn sample_backend() -> MockBackend {
    MockBackend::new()
        .with_schema("public", &["users", "orders"])
        .with_schema("audit", &["log"])
        .with_columns(
            "public",
            "users",
            vec![
                ColumnDescriptor::new("id", "int4").primary(),
                ColumnDescriptor::new("name", "text"),
                ColumnDescriptor::new("email", "varchar"),
            ],
        )
        .with_columns(
            "public",
            "orders",
            vec![
                ColumnDescriptor::new("id", "int4").primary(),
                ColumnDescriptor::new("user_id", "int4"),
                ColumnDescriptor::new("total", "numeric"),
            ],
        )
        .with_columns(
            "audit",
            "log",
            vec![
                ColumnDescriptor::new("id", "int8").primary(),
                ColumnDescriptor::new("message", "text"),
            ],
        )
        .with_database_info(DatabaseInfo {
            engine: "PostgreSQL".to_string(),
            version: "16.2".to_string(),
            database: "shop".to_string(),
        })
}

/// Connection record as listed by the backend
pub fn connection(id: &str, name: &str, is_active: bool) -> ConnectionInfo {
    ConnectionInfo {
        id: id.to_string(),
        name: name.to_string(),
        database: name.to_string(),
        host: "localhost".to_string(),
        color: "#3b82f6".to_string(),
        is_active,
    }
}

/// Build a row from `(column, value)` pairs
pub fn row<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> Row {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Initialize logging for tests if not already initialized
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("thunder=debug"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
