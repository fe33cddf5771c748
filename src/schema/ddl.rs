//! SQL DDL parsing for schema extraction.
//!
//! Parses CREATE TABLE and ALTER TABLE statements from a schema dump to extract:
//! - Column definitions with declared types
//! - Primary key constraints (table-level and inline)
//! - Foreign key constraints (table-level, inline `REFERENCES`, and `ALTER TABLE ... ADD`)

use super::{Column, Relationship, SchemaModel, SchemaProvider, Table};
use crate::error::ErdError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table` (MySQL), "table" (PostgreSQL), [table] (MSSQL), table (unquoted), schema.table
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+(?:UNLOGGED\s+|TEMP(?:ORARY)?\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?"#)
        .unwrap()
});

/// Regex to extract table name from ALTER TABLE
static ALTER_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s]+)[\]`"]?"#).unwrap()
});

/// Regex for column definition: name followed by a (possibly multi-word) type
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?\s+((?:double\s+precision|character\s+varying|bit\s+varying|\w+)(?:\s*\([^)]*\))?(?:\s+unsigned|\s+with(?:out)?\s+time\s+zone)?(?:\[\])?)"#,
    )
    .unwrap()
});

/// Regex for PRIMARY KEY constraint
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)PRIMARY\s+KEY\s*(?:CLUSTERED\s+|NONCLUSTERED\s+)?\(([^)]+)\)").unwrap()
});

/// Regex for inline PRIMARY KEY on column
static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

/// Regex for FOREIGN KEY constraint with optional constraint name
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:CONSTRAINT\s+[\[`"]?[^\[\]`"\s]+[\]`"]?\s+)?FOREIGN\s+KEY\s*\(([^)]+)\)\s*REFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*(?:\(([^)]+)\))?"#,
    )
    .unwrap()
});

/// Regex for inline `REFERENCES table(column)` on a column definition
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bREFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*(?:\(([^)]+)\))?"#,
    )
    .unwrap()
});

/// Referenced column assumed when a REFERENCES clause names none
const DEFAULT_REFERENCED_COLUMN: &str = "id";

/// Builder for constructing a schema model from DDL statements
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: SchemaModel,
    pending: Vec<Relationship>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: SchemaModel::new(name),
            pending: Vec::new(),
        }
    }

    /// Feed one SQL statement; anything other than CREATE/ALTER TABLE is ignored
    pub fn parse_statement(&mut self, stmt: &str) {
        let upper = stmt.trim_start().to_uppercase();
        if upper.starts_with("CREATE") && CREATE_TABLE_NAME_RE.is_match(stmt) {
            self.parse_create_table(stmt);
        } else if upper.starts_with("ALTER TABLE") {
            self.parse_alter_table(stmt);
        }
    }

    /// Parse a CREATE TABLE statement and add to schema
    pub fn parse_create_table(&mut self, stmt: &str) -> Option<usize> {
        let table_name = extract_create_table_name(stmt)?;
        if self.schema.get_table(&table_name).is_some() {
            return None;
        }

        let body = extract_table_body(stmt)?;
        let mut table = Table::new(table_name);
        let mut primary_key = Vec::new();

        for part in split_table_body(&body) {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }

            let upper = trimmed.to_uppercase();
            if upper.starts_with("PRIMARY KEY")
                || upper.starts_with("CONSTRAINT")
                || upper.starts_with("FOREIGN KEY")
                || upper.starts_with("KEY ")
                || upper.starts_with("INDEX ")
                || upper.starts_with("UNIQUE")
                || upper.starts_with("CHECK")
                || upper.starts_with("EXCLUDE")
            {
                if let Some(cols) = parse_primary_key_constraint(trimmed) {
                    primary_key.extend(cols);
                }
                for (local, target_table, target) in parse_foreign_keys(trimmed) {
                    self.pending
                        .push(Relationship::new(&table.name, local, target_table, target));
                }
            } else if let Some(col) = parse_column_def(trimmed) {
                if INLINE_PRIMARY_KEY_RE.is_match(trimmed) {
                    primary_key.push(col.name.clone());
                }
                if let Some((target_table, target)) = parse_inline_reference(trimmed) {
                    self.pending
                        .push(Relationship::new(&table.name, &col.name, target_table, target));
                }
                table.columns.push(col);
            }
        }

        table.set_primary_key(primary_key.as_slice());
        Some(self.schema.add_table(table))
    }

    /// Parse an ALTER TABLE statement, collecting added keys
    pub fn parse_alter_table(&mut self, stmt: &str) {
        let Some(table_name) = extract_alter_table_name(stmt) else {
            return;
        };

        if let Some(cols) = parse_primary_key_constraint(stmt) {
            if let Some(table) = self.schema.get_table_mut(&table_name) {
                table.set_primary_key(cols.as_slice());
            }
        }

        for (local, target_table, target) in parse_foreign_keys(stmt) {
            self.pending
                .push(Relationship::new(&table_name, local, target_table, target));
        }
    }

    /// Finalize the schema, attaching all collected relationships
    pub fn build(mut self) -> SchemaModel {
        for rel in std::mem::take(&mut self.pending) {
            self.schema.add_relationship(rel);
        }
        self.schema
    }
}

/// Split a SQL script into statements on `;`, skipping quoted text and `--` comments
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            ';' => {
                if !current.trim().is_empty() {
                    statements.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        statements.push(current.trim().to_string());
    }

    statements
}

/// Extract table name from CREATE TABLE statement
pub fn extract_create_table_name(stmt: &str) -> Option<String> {
    CREATE_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract table name from ALTER TABLE statement
pub fn extract_alter_table_name(stmt: &str) -> Option<String> {
    ALTER_TABLE_NAME_RE
        .captures(stmt)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;

    for (i, b) in stmt.bytes().enumerate() {
        if b == b'\'' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return start.map(|s| stmt[s..i].to_string());
            }
        }
    }

    None
}

/// Split table body by commas, respecting nested parentheses and strings
pub fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string = false;

    for ch in body.chars() {
        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Parse a column definition
fn parse_column_def(def: &str) -> Option<Column> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = caps.get(1)?.as_str();
    let col_type = caps.get(2)?.as_str();
    let col_type = col_type.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(Column::new(name, col_type.to_lowercase()))
}

/// Parse PRIMARY KEY constraint, returns column names
fn parse_primary_key_constraint(constraint: &str) -> Option<Vec<String>> {
    let caps = PRIMARY_KEY_RE.captures(constraint)?;
    Some(parse_column_list(caps.get(1)?.as_str()))
}

/// Parse FOREIGN KEY constraints, one (local, table, referenced) triple per column pair
fn parse_foreign_keys(stmt: &str) -> Vec<(String, String, String)> {
    let mut fks = Vec::new();

    for caps in FOREIGN_KEY_RE.captures_iter(stmt) {
        let local_cols = caps
            .get(1)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();
        let Some(ref_table) = caps.get(2).map(|m| m.as_str().to_string()) else {
            continue;
        };
        let ref_cols = caps
            .get(3)
            .map(|m| parse_column_list(m.as_str()))
            .unwrap_or_default();

        for (i, local) in local_cols.into_iter().enumerate() {
            let target = ref_cols
                .get(i)
                .cloned()
                .unwrap_or_else(|| DEFAULT_REFERENCED_COLUMN.to_string());
            fks.push((local, ref_table.clone(), target));
        }
    }

    fks
}

/// Parse an inline `REFERENCES` clause on a column definition
fn parse_inline_reference(def: &str) -> Option<(String, String)> {
    let caps = INLINE_REFERENCES_RE.captures(def)?;
    let table = caps.get(1)?.as_str().to_string();
    let column = caps
        .get(2)
        .and_then(|m| parse_column_list(m.as_str()).into_iter().next())
        .unwrap_or_else(|| DEFAULT_REFERENCED_COLUMN.to_string());
    Some((table, column))
}

/// Parse a comma-separated column list, stripping quotes (backticks, double quotes, brackets)
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| {
            c.trim()
                .trim_matches('`')
                .trim_matches('"')
                .trim_matches('[')
                .trim_matches(']')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

/// Reads the schema from a SQL file of DDL statements
#[derive(Debug, Clone)]
pub struct DdlProvider {
    path: PathBuf,
}

impl DdlProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SchemaProvider for DdlProvider {
    fn describe(&self) -> String {
        format!("DDL file {}", self.path.display())
    }

    fn load(&self) -> Result<SchemaModel, ErdError> {
        let sql = fs::read_to_string(&self.path).map_err(|e| {
            ErdError::Configuration(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let name = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("schema");

        Ok(parse_ddl(name, &sql))
    }
}

/// Build a schema model from a DDL script
pub fn parse_ddl(name: &str, sql: &str) -> SchemaModel {
    let mut builder = SchemaBuilder::new(name);
    for stmt in split_statements(sql) {
        builder.parse_statement(&stmt);
    }
    builder.build()
}
