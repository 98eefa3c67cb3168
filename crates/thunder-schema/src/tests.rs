use std::sync::Arc;

use pretty_assertions::assert_eq;
use thunder_core::ColumnDescriptor;
use thunder_testing::{MockBackend, Op, sample_backend};

use super::*;

fn cache_for(backend: &Arc<MockBackend>) -> SchemaCache {
    SchemaCache::new(backend.clone())
}

fn wide_backend(table_count: usize) -> MockBackend {
    let names: Vec<String> = (1..=table_count).map(|i| format!("t{:02}", i)).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let mut backend = MockBackend::new().with_schema("big", &refs);
    for name in &names {
        backend = backend.with_columns("big", name, vec![ColumnDescriptor::new("id", "int4")]);
    }
    backend
}

#[tokio::test]
async fn test_load_schemas_populates_tables_and_columns() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);

    let outcome = cache.load_schemas().await.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(cache.schemas(), vec!["public", "audit"]);
    assert_eq!(cache.tables_for_schema("public"), vec!["users", "orders"]);
    assert_eq!(
        cache.all_tables(),
        vec!["public.users", "public.orders", "audit.log"]
    );
    assert_eq!(cache.columns_for_table("audit", "log").len(), 2);
    assert_eq!(backend.call_count(Op::GetSchemas), 1);
    assert_eq!(backend.call_count(Op::GetCollections), 2);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 3);
}

#[tokio::test]
async fn test_all_columns_are_distinct_in_first_seen_order() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();

    assert_eq!(
        cache.all_columns(),
        vec!["id", "name", "email", "user_id", "total", "message"]
    );
}

#[tokio::test]
async fn test_columns_are_fetched_once() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);

    let first = cache.load_columns_for_table("public", "users").await.unwrap();
    let second = cache.load_columns_for_table("public", "users").await.unwrap();

    assert_eq!(first, LoadOutcome::Loaded);
    assert_eq!(second, LoadOutcome::AlreadyCached);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 1);
    assert_eq!(cache.columns_for_table("public", "users")[0].name, "id");
}

#[tokio::test]
async fn test_bulk_load_only_fetches_first_tables_eagerly() {
    let backend = Arc::new(wide_backend(12));
    let cache = cache_for(&backend);

    cache.load_schemas().await.unwrap();

    assert_eq!(
        backend.call_count(Op::GetCollectionStructures),
        DEFAULT_EAGER_COLUMN_TABLES
    );
    assert!(cache.column_state("big", "t10").is_loaded());
    assert!(cache.column_state("big", "t11").is_not_loaded());

    let columns = cache.columns_or_load("big", "t11").await.unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 11);
}

#[tokio::test]
async fn test_eager_limit_is_configurable() {
    let backend = Arc::new(wide_backend(5));
    let cache = SchemaCache::with_config(
        backend.clone(),
        SchemaCacheConfig {
            eager_column_tables: 2,
        },
    );

    cache.load_schemas().await.unwrap();

    assert_eq!(backend.call_count(Op::GetCollectionStructures), 2);
}

#[tokio::test]
async fn test_schema_failure_keeps_previous_list() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();

    backend.fail_on(Op::GetSchemas, "connection reset");
    let err = cache.load_schemas().await.unwrap_err();

    assert!(err.is_backend());
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(cache.schemas(), vec!["public", "audit"]);
    assert!(!cache.is_loading());
}

#[tokio::test]
async fn test_failing_schema_is_skipped() {
    let backend = Arc::new(sample_backend().failing_collections_for("audit"));
    let cache = cache_for(&backend);

    let outcome = cache.load_schemas().await.unwrap();

    assert_eq!(outcome, LoadOutcome::Loaded);
    assert_eq!(cache.schemas(), vec!["public", "audit"]);
    assert!(cache.tables_for_schema("audit").is_empty());
    assert_eq!(cache.all_tables(), vec!["public.users", "public.orders"]);
}

#[tokio::test]
async fn test_failed_table_reload_keeps_previous_tables() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();

    backend.fail_on(Op::GetCollections, "timeout");
    assert!(cache.refresh_schema("public").await.is_err());

    assert_eq!(cache.tables_for_schema("public"), vec!["users", "orders"]);
}

#[tokio::test]
async fn test_table_reload_drops_columns_of_removed_tables() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();

    backend.set_tables("public", &["users"]);
    cache.refresh_schema("public").await.unwrap();

    assert_eq!(cache.tables_for_schema("public"), vec!["users"]);
    assert!(cache.column_state("public", "orders").is_not_loaded());
    assert!(cache.column_state("public", "users").is_loaded());
}

#[tokio::test]
async fn test_concurrent_bulk_load_is_dropped() {
    let backend = Arc::new(sample_backend());
    let gate = backend.gate(Op::GetSchemas);
    let cache = Arc::new(cache_for(&backend));

    let first = tokio::spawn({
        let cache = cache.clone();
        async move { cache.load_schemas().await }
    });
    tokio::task::yield_now().await;

    assert!(cache.is_loading());
    assert_eq!(
        cache.load_schemas().await.unwrap(),
        LoadOutcome::AlreadyLoading
    );

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Loaded);
    assert_eq!(backend.call_count(Op::GetSchemas), 1);
    assert!(!cache.is_loading());
}

#[tokio::test]
async fn test_concurrent_column_load_is_dropped() {
    let backend = Arc::new(sample_backend());
    let gate = backend.gate(Op::GetCollectionStructures);
    let cache = Arc::new(cache_for(&backend));

    let first = tokio::spawn({
        let cache = cache.clone();
        async move { cache.load_columns_for_table("public", "users").await }
    });
    tokio::task::yield_now().await;

    assert!(cache.column_state("public", "users").is_loading());
    assert_eq!(
        cache.load_columns_for_table("public", "users").await.unwrap(),
        LoadOutcome::AlreadyLoading
    );

    gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Loaded);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 1);
}

#[tokio::test]
async fn test_cancelled_column_load_can_be_retried() {
    let backend = Arc::new(sample_backend());
    let gate = backend.gate(Op::GetCollectionStructures);
    let cache = cache_for(&backend);

    let timed_out = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        cache.load_columns_for_table("public", "users"),
    )
    .await;
    assert!(timed_out.is_err());
    assert!(!cache.column_state("public", "users").is_loading());

    // Let the retry through the gate
    gate.notify_one();
    assert_eq!(
        cache.load_columns_for_table("public", "users").await.unwrap(),
        LoadOutcome::Loaded
    );
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 2);
    assert_eq!(cache.columns_for_table("public", "users").len(), 3);
}

#[tokio::test]
async fn test_response_after_connection_switch_is_discarded() {
    let backend = Arc::new(sample_backend());
    let gate = backend.gate(Op::GetSchemas);
    let cache = Arc::new(cache_for(&backend));
    cache.reset_for_connection(Some("conn-a".to_string()));

    let first = tokio::spawn({
        let cache = cache.clone();
        async move { cache.load_schemas().await }
    });
    tokio::task::yield_now().await;

    assert!(cache.reset_for_connection(Some("conn-b".to_string())));
    gate.notify_one();

    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Stale);
    assert!(cache.schemas().is_empty());
    assert_eq!(cache.connection_id().as_deref(), Some("conn-b"));
}

#[tokio::test]
async fn test_reset_for_same_connection_keeps_data() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.reset_for_connection(Some("conn-a".to_string()));
    cache.load_schemas().await.unwrap();
    let generation = cache.generation();

    assert!(!cache.reset_for_connection(Some("conn-a".to_string())));
    assert_eq!(cache.generation(), generation);
    assert_eq!(cache.schemas().len(), 2);
}

#[tokio::test]
async fn test_refresh_table_refetches_columns() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_columns_for_table("public", "users").await.unwrap();

    backend.set_columns(
        "public",
        "users",
        vec![
            ColumnDescriptor::new("id", "int4").primary(),
            ColumnDescriptor::new("nickname", "text"),
        ],
    );
    cache.refresh_table("public", "users").await.unwrap();

    let names: Vec<_> = cache
        .columns_for_table("public", "users")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["id", "nickname"]);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 2);
}

#[tokio::test]
async fn test_column_failure_resets_entry() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);

    backend.fail_on(Op::GetCollectionStructures, "permission denied");
    assert!(cache.load_columns_for_table("public", "users").await.is_err());
    assert!(cache.column_state("public", "users").is_not_loaded());

    backend.clear_failure(Op::GetCollectionStructures);
    assert_eq!(
        cache.load_columns_for_table("public", "users").await.unwrap(),
        LoadOutcome::Loaded
    );
}

#[tokio::test]
async fn test_clear_empties_cache_and_bumps_generation() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();
    let generation = cache.generation();

    cache.clear();

    assert!(cache.schemas().is_empty());
    assert!(cache.all_tables().is_empty());
    assert!(cache.all_columns().is_empty());
    assert_eq!(cache.generation(), generation + 1);
}

#[tokio::test]
async fn test_completion_words_include_keywords_tables_and_columns() {
    let backend = Arc::new(sample_backend());
    let cache = cache_for(&backend);
    cache.load_schemas().await.unwrap();

    let words = cache.completion_words();

    assert_eq!(words[0], "SELECT");
    assert!(words.contains(&"public.orders".to_string()));
    assert!(words.contains(&"email".to_string()));
}
