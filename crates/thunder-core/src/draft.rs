//! Draft models for structure edits and new tables

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{ColumnDescriptor, TableRef};

/// Column definition used for "add column" edits and create-table drafts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    pub nullable: bool,
    #[serde(default)]
    pub default: String,
    pub primary_key: bool,
    pub unique: bool,
}

impl ColumnDraft {
    /// Create a nullable column with an empty type
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: String::new(),
            size: None,
            nullable: true,
            default: String::new(),
            primary_key: false,
            unique: false,
        }
    }

    /// Start a draft from an existing column, e.g. before altering it
    pub fn from_descriptor(column: &ColumnDescriptor) -> Self {
        Self {
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            size: column.length.and_then(|l| u32::try_from(l).ok()),
            nullable: column.nullable,
            default: column.default.clone().unwrap_or_default(),
            primary_key: column.is_primary,
            unique: column.is_unique,
        }
    }

    /// Builder: set data type
    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// Builder: set length
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Builder: set as primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Builder: set as not null
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Builder: set as unique
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Builder: set default value expression
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Index definition. There is no "update": changing an index is delete + add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDraft {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    #[serde(default)]
    pub algorithm: String,
}

impl IndexDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            is_unique: false,
            algorithm: "btree".to_string(),
        }
    }

    /// Builder: add a column
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Builder: set as unique
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    /// Builder: set the index algorithm (btree, hash, ...)
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }
}

/// Draft of a table that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableDraft {
    pub schema: String,
    pub table_name: String,
    pub columns: Vec<ColumnDraft>,
}

impl CreateTableDraft {
    pub fn new(
        schema: impl Into<String>,
        table_name: impl Into<String>,
        columns: Vec<ColumnDraft>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table_name: table_name.into(),
            columns,
        }
    }

    /// A draft is committable once it has a table name and one named column
    pub fn has_changes(&self) -> bool {
        !self.table_name.trim().is_empty() && self.columns.iter().any(ColumnDraft::has_name)
    }

    /// True if nothing has been entered at all
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.schema.clone(), self.table_name.clone())
    }

    /// Columns that carry a name; unnamed rows in the composer are skipped
    pub fn named_columns(&self) -> Vec<ColumnDraft> {
        self.columns.iter().filter(|c| c.has_name()).cloned().collect()
    }

    /// Check the draft for problems that must be fixed before submission
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.table_name.trim().is_empty() {
            errors.push(ValidationError::new("table_name", "Table name is required"));
        }

        if !self.columns.iter().any(ColumnDraft::has_name) {
            errors.push(ValidationError::new(
                "columns",
                "At least one named column is required",
            ));
        }

        for (i, col) in self.columns.iter().enumerate() {
            if col.has_name() && col.data_type.trim().is_empty() {
                errors.push(ValidationError::new(
                    format!("columns[{}].type", i),
                    format!("Column '{}' needs a data type", col.name),
                ));
            }
        }

        let mut seen = HashSet::new();
        for col in self.columns.iter().filter(|c| c.has_name()) {
            if !seen.insert(col.name.to_lowercase()) {
                errors.push(ValidationError::new(
                    "columns",
                    format!("Duplicate column name: {}", col.name),
                ));
            }
        }

        errors
    }
}

/// Field-addressed validation problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_changes_need_name_and_named_column() {
        assert!(!CreateTableDraft::default().has_changes());
        assert!(!CreateTableDraft::new("public", "t", vec![ColumnDraft::named("")]).has_changes());
        assert!(CreateTableDraft::new("public", "t", vec![ColumnDraft::named("id")]).has_changes());
        assert!(!CreateTableDraft::new("public", "  ", vec![ColumnDraft::named("id")]).has_changes());
    }

    #[test]
    fn validate_reports_missing_type_and_duplicates() {
        let draft = CreateTableDraft::new(
            "public",
            "orders",
            vec![
                ColumnDraft::named("id").data_type("int"),
                ColumnDraft::named("ID").data_type("int"),
                ColumnDraft::named("note"),
            ],
        );
        let errors = draft.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "columns[2].type"));
        assert!(errors.iter().any(|e| e.message.contains("Duplicate column name")));
    }

    #[test]
    fn empty_draft_fails_validation_on_name_and_columns() {
        let errors = CreateTableDraft::default().validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["table_name", "columns"]);
    }

    #[test]
    fn column_draft_serializes_with_wire_names() {
        let col = ColumnDraft::named("id").data_type("int").primary_key();
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "int");
        assert_eq!(json["primaryKey"], true);
        assert_eq!(json["nullable"], false);
    }

    #[test]
    fn from_descriptor_copies_length_and_flags() {
        let mut desc = ColumnDescriptor::new("email", "varchar");
        desc.length = Some(255);
        desc.is_unique = true;
        let draft = ColumnDraft::from_descriptor(&desc);
        assert_eq!(draft.size, Some(255));
        assert!(draft.unique);
        assert!(draft.nullable);
    }
}
