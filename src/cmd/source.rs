//! Schema source selection shared by the commands.

use crate::config::Config;
use crate::error::ErdError;
use crate::schema::{
    ConnectionConfig, DdlProvider, PostgresProvider, SchemaModel, SchemaProvider, SnapshotProvider,
};
use anyhow::{bail, Context, Result};
use clap::Args;
use glob::Pattern;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Read the schema from a JSON or YAML snapshot file
    #[arg(long, conflicts_with = "ddl")]
    pub snapshot: Option<PathBuf>,

    /// Read the schema from a SQL file of CREATE TABLE / ALTER TABLE statements
    #[arg(long)]
    pub ddl: Option<PathBuf>,

    /// Database host
    #[arg(long)]
    pub host: Option<String>,

    /// Database port (default: 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database user
    #[arg(long)]
    pub user: Option<String>,

    /// Database password
    #[arg(long)]
    pub password: Option<String>,

    /// Database name
    #[arg(long)]
    pub db_name: Option<String>,

    /// Schema to introspect
    #[arg(long)]
    pub schema_name: Option<String>,

    /// Only include these tables (comma-separated, supports globs: "user*,order*")
    #[arg(short, long)]
    pub tables: Option<String>,

    /// Exclude these tables (comma-separated, supports globs)
    #[arg(short = 'x', long)]
    pub exclude: Option<String>,

    /// YAML configuration file (default: <config dir>/erd-builder/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl SourceArgs {
    fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            db_name: self.db_name.clone(),
            schema_name: self.schema_name.clone(),
        }
    }

    /// Pick the provider for the given flags, falling back to the connection
    /// section of the config file
    pub fn provider(&self, config: &Config) -> Result<Box<dyn SchemaProvider>> {
        if let Some(ref path) = self.snapshot {
            return Ok(Box::new(SnapshotProvider::new(path)));
        }
        if let Some(ref path) = self.ddl {
            return Ok(Box::new(DdlProvider::new(path)));
        }

        let connection = self.connection().or(&config.connection);
        if !connection.is_set() {
            bail!("no schema source given: use --snapshot, --ddl, or --host/--user/--db-name/--schema-name");
        }
        Ok(Box::new(PostgresProvider::new(connection)))
    }

    /// Load the schema and apply the table filters
    pub fn load(&self, config: &Config) -> Result<SchemaModel> {
        let provider = self.provider(config)?;
        eprintln!("Loading schema from {}", provider.describe());

        let mut schema = provider.load_non_empty()?;

        if let Some(ref tables) = self.tables {
            schema.filter_tables(&parse_patterns(tables)?);
        }
        if let Some(ref exclude) = self.exclude {
            schema.exclude_tables(&parse_patterns(exclude)?);
        }
        if schema.is_empty() {
            return Err(ErdError::EmptySchema(format!(
                "{} after applying table filters",
                provider.describe()
            ))
            .into());
        }

        Ok(schema)
    }
}

fn parse_patterns(list: &str) -> Result<Vec<Pattern>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Pattern::new(s).with_context(|| format!("invalid table pattern '{}'", s)))
        .collect()
}
