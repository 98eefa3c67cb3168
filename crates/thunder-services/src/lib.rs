//! Thunder Services Layer
//!
//! Orchestrates the staging engine against the backend.
//!
//! ```text
//! EditorWorkspace (this crate)
//!     ↓
//! ReconciliationService ──→ CommitObserver (SchemaRefresher)
//!     ↓                            ↓
//! thunder-staging            thunder-schema
//!     ↓                            ↓
//! thunder-core (Backend, Envelope, models)
//! ```
//!
//! - [`ReconciliationService`] - turns a staged buffer into grouped backend operations
//! - [`SchemaRefresher`] - refetches the cache entries a commit touched
//! - [`EditorWorkspace`] - connection switching, tabs with per-tab buffers, status reporting
//! - [`ThunderSettings`] and [`logging`] - configuration and tracing setup

mod error;
pub mod logging;
mod observer;
mod reconcile;
mod refresher;
mod settings;
mod workspace;

pub use error::{ServiceError, ServiceResult};
pub use observer::{CommitEffects, CommitObserver};
pub use reconcile::{
    CommitPlan, CommitReport, GroupReport, GroupStatus, LedgerGroup, Operation, PlannedGroup,
    ReconciliationService,
};
pub use refresher::SchemaRefresher;
pub use settings::{
    CommitSettings, HistorySettings, SchemaSettings, ThunderSettings, config_dir, data_dir,
    history_file, settings_file,
};
pub use workspace::{ColumnRequest, ColumnResponse, EditorWorkspace};
