//! Status bar state

use serde::{Deserialize, Serialize};
use thunder_core::DatabaseInfo;

/// Severity of a status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    #[default]
    Info,
    Warn,
    Error,
}

/// Status message, severity and connection details shown at the bottom of the window
#[derive(Debug, Clone, Default)]
pub struct StatusBar {
    status: String,
    level: StatusLevel,
    database_info: Option<DatabaseInfo>,
    console_revealed: bool,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set message and level. An error-level update reveals the console panel.
    pub fn update_status(&mut self, status: impl Into<String>, level: StatusLevel) {
        self.status = status.into();
        self.level = level;
        match level {
            StatusLevel::Error => {
                tracing::error!(status = %self.status, "status");
                self.console_revealed = true;
            }
            StatusLevel::Warn => tracing::warn!(status = %self.status, "status"),
            StatusLevel::Info => tracing::info!(status = %self.status, "status"),
        }
    }

    pub fn info(&mut self, status: impl Into<String>) {
        self.update_status(status, StatusLevel::Info);
    }

    pub fn warn(&mut self, status: impl Into<String>) {
        self.update_status(status, StatusLevel::Warn);
    }

    pub fn error(&mut self, status: impl Into<String>) {
        self.update_status(status, StatusLevel::Error);
    }

    pub fn set_database_info(&mut self, info: Option<DatabaseInfo>) {
        self.database_info = info;
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn level(&self) -> StatusLevel {
        self.level
    }

    pub fn database_info(&self) -> Option<&DatabaseInfo> {
        self.database_info.as_ref()
    }

    /// Engine, version, database and the current message. Empty without database info.
    pub fn segments(&self) -> Vec<String> {
        let Some(info) = &self.database_info else {
            return Vec::new();
        };
        let mut segments = vec![
            info.engine.clone(),
            info.version.clone(),
            info.database.clone(),
        ];
        if !self.status.is_empty() {
            segments.push(self.status.clone());
        }
        segments
    }

    pub fn console_revealed(&self) -> bool {
        self.console_revealed
    }

    /// Hide the console again after the user dismissed it
    pub fn dismiss_console(&mut self) {
        self.console_revealed = false;
    }
}
