//! Schema model handed to the layout core.
//!
//! This module provides:
//! - Data models for tables, columns and foreign-key relationships
//! - The `SchemaProvider` capability and its implementations (snapshot files,
//!   SQL DDL dumps, live PostgreSQL introspection)
//! - Glob-based table filtering

mod ddl;
mod postgres;
mod provider;
mod snapshot;

pub use ddl::*;
pub use postgres::{ConnectionConfig, PostgresProvider};
pub use provider::SchemaProvider;
pub use snapshot::{Snapshot, SnapshotProvider};

use ahash::{AHashMap, AHashSet};
use glob::Pattern;
use std::fmt;

/// Column definition within a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type as reported by the database (e.g. `integer`, `character varying`)
    pub col_type: String,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Whether this column is the local side of a foreign key
    pub is_foreign_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, col_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            col_type: col_type.into(),
            is_primary_key: false,
            is_foreign_key: false,
        }
    }
}

/// A table and its columns in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Get a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Names of the primary key columns, in column order
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Mark the named columns as primary key columns, ignoring unknown names
    pub fn set_primary_key<S: AsRef<str>>(&mut self, columns: &[S]) {
        for name in columns {
            if let Some(col) = self.column_mut(name.as_ref()) {
                col.is_primary_key = true;
            }
        }
    }
}

/// One endpoint of a relationship: a (table, key column) pair
pub type Endpoint = (String, String);

/// A foreign-key relationship between two tables.
///
/// The schema does not carry direction: which side is drawn on the left is
/// decided by the layout engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    /// Table declaring the foreign key
    pub source_table: String,
    /// Local key column
    pub source_key: String,
    /// Referenced table
    pub target_table: String,
    /// Referenced key column
    pub target_key: String,
}

impl Relationship {
    pub fn new(
        source_table: impl Into<String>,
        source_key: impl Into<String>,
        target_table: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_key: source_key.into(),
            target_table: target_table.into(),
            target_key: target_key.into(),
        }
    }

    /// The same edge seen from the other side
    pub fn reversed(&self) -> Self {
        Self {
            source_table: self.target_table.clone(),
            source_key: self.target_key.clone(),
            target_table: self.source_table.clone(),
            target_key: self.source_key.clone(),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.source_table == self.target_table
    }

    /// Undirected identity of this relationship
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(
            (self.source_table.clone(), self.source_key.clone()),
            (self.target_table.clone(), self.target_key.clone()),
        )
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_table, self.source_key, self.target_table, self.target_key
        )
    }
}

/// Unordered pair of endpoints; a relationship and its mirror share one key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey(Endpoint, Endpoint);

impl EdgeKey {
    pub fn new(a: Endpoint, b: Endpoint) -> Self {
        if a <= b {
            EdgeKey(a, b)
        } else {
            EdgeKey(b, a)
        }
    }
}

/// Complete schema as handed over by a `SchemaProvider`
#[derive(Debug, Clone, Default)]
pub struct SchemaModel {
    /// Database (or dump) name, used for artifact names
    pub name: String,
    tables: Vec<Table>,
    index: AHashMap<String, usize>,
    relationships: Vec<Relationship>,
}

impl SchemaModel {
    /// Create a new empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a table, returning its position. A table that already exists is kept as is.
    pub fn add_table(&mut self, table: Table) -> usize {
        if let Some(&pos) = self.index.get(&table.name) {
            return pos;
        }
        let pos = self.tables.len();
        self.index.insert(table.name.clone(), pos);
        self.tables.push(table);
        pos
    }

    /// Record a relationship and flag its local column as a foreign key.
    ///
    /// Table names that match a declared table case-insensitively are
    /// rewritten to the declared spelling. Exact duplicates are ignored.
    pub fn add_relationship(&mut self, mut rel: Relationship) {
        if let Some(table) = self.get_table(&rel.source_table) {
            rel.source_table = table.name.clone();
        }
        if let Some(table) = self.get_table(&rel.target_table) {
            rel.target_table = table.name.clone();
        }
        if self.relationships.contains(&rel) {
            return;
        }
        if let Some(col) = self
            .get_table_mut(&rel.source_table)
            .and_then(|t| t.column_mut(&rel.source_key))
        {
            col.is_foreign_key = true;
        }
        self.relationships.push(rel);
    }

    /// Get table by name, exact match first then case-insensitive
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.position(name).map(|pos| &self.tables[pos])
    }

    pub(crate) fn get_table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.position(name).map(|pos| &mut self.tables[pos])
    }

    fn position(&self, name: &str) -> Option<usize> {
        if let Some(&pos) = self.index.get(name) {
            return Some(pos);
        }
        let lower = name.to_lowercase();
        self.index
            .iter()
            .find(|(k, _)| k.to_lowercase() == lower)
            .map(|(_, &pos)| pos)
    }

    /// Tables in provider order
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    /// Relationships in provider order
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Whether a column takes part in a key: primary key, foreign key, or referenced by one
    pub fn is_key_column(&self, table: &str, column: &str) -> bool {
        let own = self
            .get_table(table)
            .and_then(|t| t.column(column))
            .map(|c| c.is_primary_key || c.is_foreign_key)
            .unwrap_or(false);

        own || self
            .relationships
            .iter()
            .any(|r| r.target_table == table && r.target_key.eq_ignore_ascii_case(column))
    }

    /// Get the number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if schema is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Keep only tables matching the given patterns
    pub fn filter_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }

        let matching: AHashSet<String> = self
            .table_names()
            .filter(|name| patterns.iter().any(|p| p.matches(name)))
            .map(str::to_string)
            .collect();

        self.retain_tables(&matching);
    }

    /// Drop tables matching the given patterns
    pub fn exclude_tables(&mut self, patterns: &[Pattern]) {
        if patterns.is_empty() {
            return;
        }

        let remaining: AHashSet<String> = self
            .table_names()
            .filter(|name| !patterns.iter().any(|p| p.matches(name)))
            .map(str::to_string)
            .collect();

        self.retain_tables(&remaining);
    }

    fn retain_tables(&mut self, keep: &AHashSet<String>) {
        self.tables.retain(|t| keep.contains(&t.name));
        self.relationships
            .retain(|r| keep.contains(&r.source_table) && keep.contains(&r.target_table));
        self.index = self
            .tables
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.name.clone(), pos))
            .collect();
    }
}
