//! Schema snapshots in the introspection hand-off format.
//!
//! A snapshot is the plain-data shape an introspection run produces:
//!
//! ```yaml
//! name: ooo_rubin
//! tables:
//!   User: [id, user_name]
//! primary_keys:
//!   User: [id]
//! foreign_keys:
//!   User:
//!     - Personal_data: [id, id]
//! column_types:
//!   User: { id: integer, user_name: text }
//! ```
//!
//! Maps keep their file order, which is the order tables are laid out in.

use super::{Column, Relationship, SchemaModel, SchemaProvider, Table};
use crate::error::ErdError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Type shown for columns missing from `column_types`
pub const UNKNOWN_TYPE: &str = "unknown";

/// Serialized schema in the introspection hand-off format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Database name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Table name -> ordered column names
    pub tables: IndexMap<String, Vec<String>>,
    /// Table name -> primary key column names
    pub primary_keys: IndexMap<String, Vec<String>>,
    /// Table name -> list of `{target_table: [local_key, remote_key]}`
    pub foreign_keys: IndexMap<String, Vec<IndexMap<String, (String, String)>>>,
    /// Table name -> column name -> declared type
    pub column_types: IndexMap<String, IndexMap<String, String>>,
}

impl Snapshot {
    /// Load a snapshot from a JSON (`.json`) or YAML file
    pub fn from_path(path: &Path) -> Result<Self, ErdError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ErdError::Configuration(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        };

        parsed.map_err(|e| match e {
            ErdError::Configuration(msg) => {
                ErdError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_json_str(content: &str) -> Result<Self, ErdError> {
        serde_json::from_str(content)
            .map_err(|e| ErdError::Configuration(format!("invalid snapshot: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ErdError> {
        serde_yaml_ng::from_str(content)
            .map_err(|e| ErdError::Configuration(format!("invalid snapshot: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, ErdError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ErdError::Configuration(format!("cannot serialize snapshot: {}", e)))
    }

    pub fn to_yaml(&self) -> Result<String, ErdError> {
        serde_yaml_ng::to_string(self)
            .map_err(|e| ErdError::Configuration(format!("cannot serialize snapshot: {}", e)))
    }

    /// Write the snapshot, choosing JSON or YAML from the file extension
    pub fn save(&self, path: &Path) -> Result<(), ErdError> {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| matches!(e.to_lowercase().as_str(), "yaml" | "yml"))
            .unwrap_or(false);

        let content = if is_yaml {
            self.to_yaml()?
        } else {
            self.to_json()?
        };
        fs::write(path, content)?;
        Ok(())
    }

    /// Build the schema model described by this snapshot
    pub fn to_model(&self) -> SchemaModel {
        let mut schema = SchemaModel::new(self.name.clone());

        for (table_name, columns) in &self.tables {
            let types = self.column_types.get(table_name);
            let mut table = Table::new(table_name.clone());
            for column in columns {
                let col_type = types
                    .and_then(|t| t.get(column))
                    .map(String::as_str)
                    .unwrap_or(UNKNOWN_TYPE);
                table.columns.push(Column::new(column.clone(), col_type));
            }
            if let Some(pk) = self.primary_keys.get(table_name) {
                table.set_primary_key(pk.as_slice());
            }
            schema.add_table(table);
        }

        for (source_table, descriptors) in &self.foreign_keys {
            for descriptor in descriptors {
                for (target_table, (local_key, remote_key)) in descriptor {
                    schema.add_relationship(Relationship::new(
                        source_table.clone(),
                        local_key.clone(),
                        target_table.clone(),
                        remote_key.clone(),
                    ));
                }
            }
        }

        schema
    }

    /// Capture a schema model in snapshot form
    pub fn from_model(schema: &SchemaModel) -> Self {
        let mut snapshot = Snapshot {
            name: schema.name.clone(),
            ..Snapshot::default()
        };

        for table in schema.tables() {
            snapshot.tables.insert(
                table.name.clone(),
                table.columns.iter().map(|c| c.name.clone()).collect(),
            );
            let pk: Vec<String> = table.primary_key().into_iter().map(String::from).collect();
            if !pk.is_empty() {
                snapshot.primary_keys.insert(table.name.clone(), pk);
            }
            snapshot.column_types.insert(
                table.name.clone(),
                table
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.col_type.clone()))
                    .collect(),
            );
        }

        for rel in schema.relationships() {
            let mut descriptor = IndexMap::new();
            descriptor.insert(
                rel.target_table.clone(),
                (rel.source_key.clone(), rel.target_key.clone()),
            );
            snapshot
                .foreign_keys
                .entry(rel.source_table.clone())
                .or_default()
                .push(descriptor);
        }

        snapshot
    }
}

/// Reads the schema from a snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotProvider {
    path: PathBuf,
}

impl SnapshotProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchemaProvider for SnapshotProvider {
    fn describe(&self) -> String {
        format!("snapshot {}", self.path.display())
    }

    fn load(&self) -> Result<SchemaModel, ErdError> {
        let snapshot = Snapshot::from_path(&self.path)?;
        let mut schema = snapshot.to_model();
        if schema.name.is_empty() {
            schema.name = self
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("schema")
                .to_string();
        }
        Ok(schema)
    }
}
