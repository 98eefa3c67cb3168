//! Thunder Workspace - view-level state around the staging engine
//!
//! - `TabRegistry` - open query, table and create-table tabs and the active selection
//! - `StatusBar` - status message, severity and database info segments
//! - `ConnectionContext` - the backend connection that schema names are relative to
//! - `QueryHistory` - bounded, most-recent-first log of executed queries

mod connection;
mod history;
mod status;
mod tabs;

pub use connection::ConnectionContext;
pub use history::{DEFAULT_MAX_HISTORY, HistoryStatus, QueryHistory, QueryHistoryEntry};
pub use status::{StatusBar, StatusLevel};
pub use tabs::{SubTab, Tab, TabKind, TabPatch, TabRegistry};
