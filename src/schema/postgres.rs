//! Live PostgreSQL introspection.
//!
//! The catalog is read through an embedded DuckDB connection with the
//! `postgres` extension attached read-only. Catalog queries run on the server
//! verbatim via `postgres_query`, so the results follow PostgreSQL's own
//! `information_schema` semantics.

use super::{Column, Relationship, SchemaModel, SchemaProvider, Table};
use crate::error::ErdError;
use ahash::AHashMap;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

/// Alias the PostgreSQL database is attached under inside DuckDB
const ATTACH_ALIAS: &str = "pg";

/// Connection parameters for a PostgreSQL server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_name: Option<String>,
    pub schema_name: Option<String>,
}

impl ConnectionConfig {
    /// Fill unset fields from `other`
    pub fn or(self, other: &ConnectionConfig) -> Self {
        Self {
            host: self.host.or_else(|| other.host.clone()),
            port: self.port.or(other.port),
            user: self.user.or_else(|| other.user.clone()),
            password: self.password.or_else(|| other.password.clone()),
            db_name: self.db_name.or_else(|| other.db_name.clone()),
            schema_name: self.schema_name.or_else(|| other.schema_name.clone()),
        }
    }

    /// Whether any connection parameter was given
    pub fn is_set(&self) -> bool {
        self.host.is_some() || self.db_name.is_some() || self.schema_name.is_some()
    }

    /// libpq connection string, failing on missing required parameters
    pub fn dsn(&self) -> Result<String, ErdError> {
        let host = require(&self.host, "host")?;
        let user = require(&self.user, "user")?;
        let db_name = require(&self.db_name, "db-name")?;

        let mut dsn = format!(
            "host={} port={} user={} dbname={}",
            quote_dsn_value(host),
            self.port.unwrap_or(5432),
            quote_dsn_value(user),
            quote_dsn_value(db_name)
        );
        if let Some(ref password) = self.password {
            dsn.push_str(&format!(" password={}", quote_dsn_value(password)));
        }
        Ok(dsn)
    }

    pub fn schema(&self) -> Result<&str, ErdError> {
        require(&self.schema_name, "schema-name")
    }
}

fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ErdError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ErdError::Configuration(format!("missing connection parameter --{}", name)))
}

/// Quote a value for a libpq key=value connection string
fn quote_dsn_value(value: &str) -> String {
    if !value.is_empty() && !value.contains([' ', '\'', '\\']) {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Escape a string for use inside a single-quoted SQL literal
fn sql_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// Reads the schema from a live PostgreSQL database
#[derive(Debug, Clone)]
pub struct PostgresProvider {
    config: ConnectionConfig,
}

impl PostgresProvider {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn connect(&self) -> Result<Connection, ErdError> {
        let dsn = self.config.dsn()?;
        let conn = Connection::open_in_memory().map_err(|e| {
            ErdError::Configuration(format!("failed to create DuckDB connection: {}", e))
        })?;

        conn.execute_batch("INSTALL postgres; LOAD postgres;")
            .map_err(|e| {
                ErdError::Configuration(format!("failed to load DuckDB postgres extension: {}", e))
            })?;

        conn.execute_batch(&format!(
            "ATTACH '{}' AS {} (TYPE POSTGRES, READ_ONLY);",
            sql_literal(&dsn),
            ATTACH_ALIAS
        ))
        .map_err(|e| {
            ErdError::Configuration(format!(
                "error connecting to the database, please check your connection parameters: {}",
                e
            ))
        })?;

        Ok(conn)
    }

    /// Run a query on the PostgreSQL server, returning every column as text
    fn server_query(conn: &Connection, sql: &str) -> Result<Vec<Vec<String>>, ErdError> {
        let wrapped = format!(
            "SELECT * FROM postgres_query('{}', '{}')",
            ATTACH_ALIAS,
            sql_literal(sql)
        );

        let mut stmt = conn
            .prepare(&wrapped)
            .map_err(|e| ErdError::Configuration(format!("catalog query failed: {}", e)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| ErdError::Configuration(format!("catalog query failed: {}", e)))?;

        let mut result = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| ErdError::Configuration(format!("catalog query failed: {}", e)))?
        {
            let count = row.as_ref().column_count();
            let mut values = Vec::with_capacity(count);
            for i in 0..count {
                let value: Option<String> = row
                    .get(i)
                    .map_err(|e| ErdError::Configuration(format!("catalog query failed: {}", e)))?;
                values.push(value.unwrap_or_default());
            }
            result.push(values);
        }
        Ok(result)
    }

    fn check_schema(conn: &Connection, schema: &str) -> Result<(), ErdError> {
        let schemas = Self::server_query(
            conn,
            "SELECT schema_name::text FROM information_schema.schemata \
             WHERE schema_name NOT LIKE 'pg_%' AND schema_name <> 'information_schema'",
        )?;

        if schemas.iter().any(|row| row[0] == schema) {
            Ok(())
        } else {
            Err(ErdError::Configuration(format!(
                "the selected schema '{}' does not exist",
                schema
            )))
        }
    }
}

impl SchemaProvider for PostgresProvider {
    fn describe(&self) -> String {
        format!(
            "PostgreSQL schema '{}' in database '{}'",
            self.config.schema_name.as_deref().unwrap_or("?"),
            self.config.db_name.as_deref().unwrap_or("?")
        )
    }

    fn load(&self) -> Result<SchemaModel, ErdError> {
        let schema_name = self.config.schema()?;
        let conn = self.connect()?;
        Self::check_schema(&conn, schema_name)?;

        let schema_lit = sql_literal(schema_name);
        let mut model = SchemaModel::new(self.config.db_name.clone().unwrap_or_default());

        // Views are skipped
        let tables = Self::server_query(
            &conn,
            &format!(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = '{}' AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                schema_lit
            ),
        )?;
        if tables.is_empty() {
            return Err(ErdError::EmptySchema(self.describe()));
        }

        let columns = Self::server_query(
            &conn,
            &format!(
                "SELECT table_name::text, column_name::text, data_type::text \
                 FROM information_schema.columns WHERE table_schema = '{}' \
                 ORDER BY table_name, ordinal_position",
                schema_lit
            ),
        )?;
        let mut by_table: AHashMap<&str, Vec<Column>> = AHashMap::new();
        for row in &columns {
            by_table
                .entry(row[0].as_str())
                .or_default()
                .push(Column::new(row[1].clone(), row[2].clone()));
        }

        let primary_keys = Self::server_query(
            &conn,
            &format!(
                "SELECT tc.table_name::text, kcu.column_name::text \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = '{}' \
                 ORDER BY tc.table_name, kcu.ordinal_position",
                schema_lit
            ),
        )?;
        let mut pk_by_table: AHashMap<&str, Vec<&str>> = AHashMap::new();
        for row in &primary_keys {
            pk_by_table
                .entry(row[0].as_str())
                .or_default()
                .push(row[1].as_str());
        }

        for row in &tables {
            let name = row[0].as_str();
            let mut table = Table::new(name);
            table.columns = by_table.remove(name).unwrap_or_default();
            if let Some(pk) = pk_by_table.get(name) {
                table.set_primary_key(pk.as_slice());
            }
            model.add_table(table);
        }

        let foreign_keys = Self::server_query(
            &conn,
            &format!(
                "SELECT tc.table_name::text, kcu.column_name::text, \
                        ccu.table_name::text, ccu.column_name::text \
                 FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                   ON tc.constraint_name = kcu.constraint_name \
                  AND tc.table_schema = kcu.table_schema \
                 JOIN information_schema.constraint_column_usage ccu \
                   ON ccu.constraint_name = tc.constraint_name \
                  AND ccu.table_schema = tc.table_schema \
                 WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = '{}' \
                 ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position",
                schema_lit
            ),
        )?;
        // add_relationship drops the duplicate rows the constraint join produces
        for row in &foreign_keys {
            model.add_relationship(Relationship::new(
                row[0].clone(),
                row[1].clone(),
                row[2].clone(),
                row[3].clone(),
            ));
        }

        Ok(model)
    }
}
