//! Integration tests for EditorWorkspace

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use thunder_core::{ColumnDraft, IndexDraft, RowKey, TableRef};
use thunder_schema::LoadOutcome;
use thunder_services::{EditorWorkspace, LedgerGroup, ServiceError, ThunderSettings};
use thunder_testing::{Op, row};
use thunder_workspace::{QueryHistoryEntry, StatusLevel};

use common::{backend, workspace};

#[tokio::test]
async fn switching_connection_resets_cache_and_loads_schema() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.refresh_connections().await.unwrap();
    assert_eq!(ws.cache().connection_id().as_deref(), Some("local"));
    ws.load_schema_info().await;
    let generation = ws.cache().generation();

    ws.switch_connection("staging").await.unwrap();

    assert_eq!(ws.cache().connection_id().as_deref(), Some("staging"));
    assert!(ws.cache().generation() > generation);
    assert_eq!(ws.cache().schemas(), vec!["public", "audit"]);
    assert_eq!(backend.call_count(Op::GetSchemas), 2);
    assert_eq!(ws.status().level(), StatusLevel::Info);
    assert_eq!(
        ws.status().segments(),
        vec!["PostgreSQL", "16.2", "shop", "Loaded 3 tables"]
    );
}

#[tokio::test]
async fn switching_to_unknown_connection_reports_error() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.refresh_connections().await.unwrap();

    let err = ws.switch_connection("nope").await.unwrap_err();

    assert!(matches!(err, ServiceError::ConnectionFailed(_)));
    assert_eq!(ws.status().level(), StatusLevel::Error);
    assert_eq!(ws.cache().connection_id().as_deref(), Some("local"));
}

#[tokio::test]
async fn schema_load_failure_is_reported_not_raised() {
    let backend = backend();
    let mut ws = workspace(&backend);
    assert_eq!(ws.load_schema_info().await, Some(LoadOutcome::Loaded));

    backend.fail_on(Op::GetSchemas, "server closed the connection");
    let outcome = ws.load_schema_info().await;

    assert_eq!(outcome, None);
    assert_eq!(ws.status().level(), StatusLevel::Error);
    assert!(ws.status().status().contains("server closed the connection"));
    assert!(ws.status().console_revealed());
    assert_eq!(ws.cache().all_tables().len(), 3);
}

#[tokio::test]
async fn each_table_tab_keeps_its_own_edits() {
    let backend = backend();
    let mut ws = workspace(&backend);

    let users = ws.open_table("public", "users");
    ws.staged_mut()
        .unwrap()
        .stage_row_insert(row([("name", json!("Alice"))]));

    let orders = ws.open_table("public", "orders");
    assert_ne!(users, orders);
    assert!(!ws.staged().unwrap().has_changes());

    let again = ws.open_table("public", "users");
    assert_eq!(again, users);
    assert_eq!(ws.tabs().len(), 2);
    assert_eq!(ws.staged().unwrap().data().added.len(), 1);
    assert_eq!(ws.sessions().unsaved(), vec![users]);
}

#[tokio::test]
async fn query_tab_has_no_edit_session() {
    let backend = backend();
    let mut ws = workspace(&backend);
    let users = ws.open_table("public", "users");

    let query = ws.new_query_tab();
    assert!(ws.staged().is_none());

    assert!(ws.activate_tab(users));
    assert_eq!(
        ws.staged().unwrap().target(),
        Some(&TableRef::new("public", "users"))
    );
    assert!(ws.activate_tab(query));
    assert!(ws.staged().is_none());
}

#[tokio::test]
async fn closing_tab_returns_unsaved_edits() {
    let backend = backend();
    let mut ws = workspace(&backend);
    let orders = ws.open_table("public", "orders");
    let users = ws.open_table("public", "users");
    ws.staged_mut()
        .unwrap()
        .stage_row_delete(RowKey::new("id", 1), row([("id", json!(1))]));

    let buffer = ws.close_tab(users).unwrap();

    assert_eq!(buffer.data().deleted.len(), 1);
    assert_eq!(ws.tabs().active_id(), Some(orders));
    assert_eq!(
        ws.staged().unwrap().target(),
        Some(&TableRef::new("public", "orders"))
    );
}

#[tokio::test]
async fn commit_reports_status_per_group() {
    let backend = backend();
    backend.fail_on(Op::InsertRow, "null value in column \"id\"");
    let mut ws = workspace(&backend);
    let users = ws.open_table("public", "users");
    {
        let buffer = ws.staged_mut().unwrap();
        buffer.stage_column_add(ColumnDraft::named("age").data_type("int4"));
        buffer.stage_row_insert(row([("name", json!("Alice"))]));
    }

    let report = ws.commit_active().await.unwrap();

    assert!(report.group(LedgerGroup::Structure).unwrap().is_applied());
    assert!(report.group(LedgerGroup::Data).unwrap().is_failed());
    assert_eq!(ws.status().level(), StatusLevel::Error);
    assert!(ws.status().status().starts_with("Commit failed: structure: 1 applied"));
    let tab = ws.tabs().get(users).unwrap();
    assert_eq!(tab.level, StatusLevel::Error);
    assert_eq!(ws.staged().unwrap().data().added.len(), 1);
}

#[tokio::test]
async fn successful_commit_clears_buffer_and_refreshes_columns() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.load_schema_info().await;
    ws.open_table("public", "users");
    ws.staged_mut()
        .unwrap()
        .stage_column_add(ColumnDraft::named("age").data_type("int4"));

    let report = ws.commit_active().await.unwrap();

    assert!(report.is_success());
    assert!(ws.staged().unwrap().is_pristine());
    assert_eq!(ws.status().status(), "Committed 1 changes");
    assert_eq!(ws.cache().columns_for_table("public", "users").len(), 4);
}

#[tokio::test]
async fn commit_without_active_session_fails() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.new_query_tab();

    let err = ws.commit_active().await.unwrap_err();
    assert!(matches!(err, ServiceError::NoActiveTable));
}

#[tokio::test]
async fn create_table_tab_validates_before_commit() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.new_create_table_tab("public");

    let report = ws.commit_active().await.unwrap();
    assert!(report.is_noop());

    ws.staged_mut()
        .unwrap()
        .set_create_table_draft("public", "", vec![ColumnDraft::named("id").data_type("int")]);
    let err = ws.commit_active().await.unwrap_err();

    assert!(matches!(err, ServiceError::Validation(_)));
    assert_eq!(ws.status().level(), StatusLevel::Error);
    assert_eq!(backend.call_count(Op::CreateTable), 0);
}

#[tokio::test]
async fn response_token_goes_stale_on_tab_switch() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.open_table("public", "users");
    let token = ws.request_token(Some(TableRef::new("public", "users")));
    assert!(ws.is_current(&token));

    ws.open_table("public", "orders");
    assert!(!ws.is_current(&token));

    ws.open_table("public", "users");
    assert!(ws.is_current(&token));
    ws.cache().clear();
    assert!(!ws.is_current(&token));
}

#[tokio::test]
async fn active_columns_load_lazily() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.open_table("audit", "log");

    let columns = ws.load_active_columns().await.unwrap().unwrap();

    assert_eq!(columns.len(), 2);
    assert_eq!(backend.targets(Op::GetCollectionStructures), vec!["audit.log"]);
}

#[tokio::test]
async fn executed_queries_are_recorded() {
    let backend = backend();
    let mut ws = workspace(&backend);

    ws.record_query(QueryHistoryEntry::success("select 1", 1, 2));
    ws.record_query(QueryHistoryEntry::failure("select x", "column x does not exist", 1));

    let queries: Vec<_> = ws.history().entries().map(|e| e.query.clone()).collect();
    assert_eq!(queries, vec!["select x", "select 1"]);
}

#[tokio::test]
async fn edits_are_not_committed_to_another_connection() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.refresh_connections().await.unwrap();
    ws.open_table("public", "users");
    ws.staged_mut()
        .unwrap()
        .stage_row_insert(row([("name", json!("Alice"))]));
    assert_eq!(ws.staged().unwrap().connection(), Some("local"));

    ws.switch_connection("staging").await.unwrap();
    assert_eq!(ws.status().level(), StatusLevel::Warn);

    let err = ws.commit_active().await.unwrap_err();
    assert!(matches!(err, ServiceError::ConnectionMismatch { .. }));
    assert_eq!(backend.call_count(Op::InsertRow), 0);
    assert_eq!(ws.staged().unwrap().data().added.len(), 1);

    // Tabs without edits follow the connection
    ws.open_table("public", "orders");
    assert_eq!(ws.staged().unwrap().connection(), Some("staging"));

    ws.switch_connection("local").await.unwrap();
    ws.open_table("public", "users");
    let report = ws.commit_active().await.unwrap();
    assert!(report.is_success());
    assert_eq!(backend.call_count(Op::InsertRow), 1);
}

#[tokio::test]
async fn column_response_goes_stale_when_tab_changes_in_flight() {
    let backend = backend();
    let gate = backend.gate(Op::GetCollectionStructures);
    let mut ws = workspace(&backend);
    let log = ws.open_table("audit", "log");

    let pending = tokio::spawn(ws.column_request().unwrap().fetch());
    tokio::task::yield_now().await;

    ws.open_table("public", "users");
    gate.notify_one();
    let response = pending.await.unwrap();

    assert_eq!(ws.accept_columns(response).unwrap(), None);
    // The cache still memoized the fetch
    assert_eq!(ws.cache().columns_for_table("audit", "log").len(), 2);

    assert!(ws.activate_tab(log));
    let columns = ws.load_active_columns().await.unwrap().unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(backend.call_count(Op::GetCollectionStructures), 1);
}

#[tokio::test]
async fn active_table_indices_come_from_backend() {
    let backend = backend();
    let mut ws = workspace(&backend);
    ws.new_query_tab();
    assert!(matches!(
        ws.load_active_indices().await.unwrap_err(),
        ServiceError::NoActiveTable
    ));

    ws.open_table("public", "users");
    ws.staged_mut()
        .unwrap()
        .stage_index_add(IndexDraft::named("users_email_idx").column("email"));
    ws.commit_active().await.unwrap();

    let indices = ws.load_active_indices().await.unwrap();
    let names: Vec<_> = indices.into_iter().map(|i| i.name).collect();
    assert_eq!(names, vec!["users_email_idx"]);
    assert_eq!(backend.targets(Op::GetIndices), vec!["public.users"]);
}

#[tokio::test]
async fn history_is_persisted_to_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = ThunderSettings::default();
    settings.history.file = Some(dir.path().join("history.json"));
    let backend = backend();

    let mut ws = EditorWorkspace::open(backend.clone(), &settings).unwrap();
    ws.record_query(QueryHistoryEntry::success("select 1", 1, 2));
    drop(ws);

    let reopened = EditorWorkspace::open(backend, &settings).unwrap();
    let queries: Vec<_> = reopened.history().entries().map(|e| e.query.clone()).collect();
    assert_eq!(queries, vec!["select 1"]);
}
