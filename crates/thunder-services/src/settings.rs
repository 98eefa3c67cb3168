//! User settings and their on-disk location

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thunder_schema::{DEFAULT_EAGER_COLUMN_TABLES, SchemaCacheConfig};
use thunder_workspace::DEFAULT_MAX_HISTORY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaSettings {
    /// Tables per schema whose columns are loaded with the schema list
    pub eager_column_tables: usize,
}

impl Default for SchemaSettings {
    fn default() -> Self {
        Self {
            eager_column_tables: DEFAULT_EAGER_COLUMN_TABLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_entries: usize,
    /// Overrides the default history file location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_HISTORY,
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitSettings {
    /// Skip the remaining ledger groups once one fails
    pub stop_on_group_failure: bool,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            stop_on_group_failure: true,
        }
    }
}

/// All user-tunable settings. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThunderSettings {
    pub schema: SchemaSettings,
    pub history: HistorySettings,
    pub commit: CommitSettings,
}

impl ThunderSettings {
    /// Load from the default settings file, falling back to defaults if it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn schema_cache_config(&self) -> SchemaCacheConfig {
        SchemaCacheConfig {
            eager_column_tables: self.schema.eager_column_tables,
        }
    }

    /// History file from the settings, or the default location
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.history.file {
            Some(path) => Ok(path.clone()),
            None => history_file(),
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("rollingthunder"))
}

pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .context("Could not determine data directory")
        .map(|p| p.join("rollingthunder"))
}

pub fn settings_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

pub fn history_file() -> Result<PathBuf> {
    data_dir().map(|p| p.join("query_history.json"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ThunderSettings::load_from(&dir.path().join("settings.json")).unwrap();

        assert_eq!(settings, ThunderSettings::default());
        assert_eq!(settings.schema.eager_column_tables, 10);
        assert_eq!(settings.history.max_entries, 50);
        assert!(settings.commit.stop_on_group_failure);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"schema": {"eager_column_tables": 3}}"#).unwrap();

        let settings = ThunderSettings::load_from(&path).unwrap();

        assert_eq!(settings.schema.eager_column_tables, 3);
        assert_eq!(settings.history, HistorySettings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = ThunderSettings::default();
        settings.commit.stop_on_group_failure = false;
        settings.history.file = Some(dir.path().join("history.json"));

        settings.save_to(&path).unwrap();

        let loaded = ThunderSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.history_path().unwrap(), dir.path().join("history.json"));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();

        let err = ThunderSettings::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
    }
}
