//! Query history management

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entries kept when no other limit is configured
pub const DEFAULT_MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Error,
}

/// A single query history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryEntry {
    /// Unique identifier
    pub id: Uuid,

    /// The SQL text, trimmed
    pub query: String,

    /// When the query was executed
    pub timestamp: DateTime<Utc>,

    pub status: HistoryStatus,

    /// Number of rows returned/affected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,

    /// Error message if failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Execution time in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

impl QueryHistoryEntry {
    /// Create a successful history entry
    pub fn success(query: &str, row_count: u64, execution_time: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.trim().to_string(),
            timestamp: Utc::now(),
            status: HistoryStatus::Success,
            row_count: Some(row_count),
            error_message: None,
            execution_time: Some(execution_time),
        }
    }

    /// Create a failed history entry
    pub fn failure(query: &str, error: impl Into<String>, execution_time: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.trim().to_string(),
            timestamp: Utc::now(),
            status: HistoryStatus::Error,
            row_count: None,
            error_message: Some(error.into()),
            execution_time: Some(execution_time),
        }
    }
}

/// Bounded, most-recent-first history of executed queries.
///
/// When backed by a file the history is written after every change. Storage
/// failures are logged and never surface to the caller.
#[derive(Debug)]
pub struct QueryHistory {
    /// History entries (most recent first)
    entries: VecDeque<QueryHistoryEntry>,

    /// Maximum entries to keep
    max_entries: usize,

    path: Option<PathBuf>,
}

impl QueryHistory {
    /// Create an in-memory history
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
            path: None,
        }
    }

    /// Create a history persisted at `path`, loading any entries already stored there
    pub fn with_file(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        let path = path.into();
        let mut entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load query history");
                VecDeque::new()
            }
        };
        entries.truncate(max_entries);
        tracing::debug!(path = %path.display(), entries = entries.len(), "query history loaded");
        Self {
            entries,
            max_entries,
            path: Some(path),
        }
    }

    /// Add an entry to the front, dropping the oldest beyond the limit
    pub fn add(&mut self, entry: QueryHistoryEntry) {
        tracing::debug!(
            query_id = %entry.id,
            status = ?entry.status,
            execution_time = ?entry.execution_time,
            "adding query to history"
        );
        self.entries.push_front(entry);
        self.entries.truncate(self.max_entries);
        self.persist();
    }

    /// Remove a single entry; returns false if it was not present
    pub fn delete(&mut self, id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.persist();
        }
        removed
    }

    /// Clear all history
    pub fn clear(&mut self) {
        let count = self.entries.len();
        tracing::info!(entries_cleared = count, "clearing query history");
        self.entries.clear();
        self.persist();
    }

    /// Get all entries
    pub fn entries(&self) -> impl Iterator<Item = &QueryHistoryEntry> {
        self.entries.iter()
    }

    /// Search history by SQL content
    pub fn search(&self, query: &str) -> impl Iterator<Item = &QueryHistoryEntry> {
        let query_lower = query.to_lowercase();
        self.entries
            .iter()
            .filter(move |e| e.query.to_lowercase().contains(&query_lower))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = save_entries(path, &self.entries) {
            tracing::error!(path = %path.display(), error = %err, "failed to save query history");
        }
    }
}

impl Default for QueryHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

fn load_entries(path: &Path) -> thunder_core::Result<VecDeque<QueryHistoryEntry>> {
    if !path.exists() {
        return Ok(VecDeque::new());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn save_entries(path: &Path, entries: &VecDeque<QueryHistoryEntry>) -> thunder_core::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, content)?;
    Ok(())
}
