//! YAML configuration file.
//!
//! ```yaml
//! layout:
//!   hub_threshold: 4
//!   palette: ["#f51505", "#877951"]
//!   direction: heuristic
//! render:
//!   plantuml_jar: /opt/plantuml/plantuml.jar
//!   timeout_secs: 60
//!   output_dir: diagram_folder
//! connection:
//!   host: localhost
//!   user: app
//!   db_name: shop
//!   schema_name: public
//! ```
//!
//! Every section and key is optional. Command-line flags take precedence.

use crate::error::ErdError;
use crate::graph::LayoutConfig;
use crate::render::RenderConfig;
use crate::schema::ConnectionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Complete YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
    pub connection: ConnectionConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ErdError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ErdError::Configuration(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ErdError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml_ng::from_str(content)
            .map_err(|e| ErdError::Configuration(format!("invalid config: {}", e)))?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Explicit path if given, else the per-user config file when it exists,
    /// else defaults. An explicit path that does not exist is an error.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ErdError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// `<config_dir>/erd-builder/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("erd-builder").join("config.yaml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DirectionMode;
    use tempfile::TempDir;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_yaml_str(
            "layout:\n  hub_threshold: 2\nrender:\n  dot: /usr/local/bin/dot\n",
        )
        .unwrap();

        assert_eq!(config.layout.hub_threshold, 2);
        assert_eq!(config.layout.palette.len(), 12);
        assert_eq!(config.layout.direction, DirectionMode::Heuristic);
        assert_eq!(config.render.dot, "/usr/local/bin/dot");
        assert_eq!(config.render.timeout_secs, 120);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_direction_and_connection() {
        let config = Config::from_yaml_str(
            "layout:\n  direction: left-to-right\nconnection:\n  host: db\n  port: 6543\n  db_name: shop\n",
        )
        .unwrap();
        assert_eq!(config.layout.direction, DirectionMode::LeftToRight);
        assert_eq!(config.connection.port, Some(6543));
        assert_eq!(config.connection.db_name.as_deref(), Some("shop"));
    }

    #[test]
    fn test_empty_palette_is_configuration_error() {
        let err = Config::from_yaml_str("layout:\n  palette: []\n").unwrap_err();
        assert!(matches!(err, ErdError::Configuration(_)));
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(Config::from_yaml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_explicit_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = Config::resolve(Some(&tmp.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, ErdError::Configuration(_)));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "render:\n  output_dir: out\n").unwrap();
        let config = Config::resolve(Some(&path)).unwrap();
        assert_eq!(config.render.output_dir, PathBuf::from("out"));
    }
}
