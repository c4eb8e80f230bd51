//! Data source configuration
//!
//! One [`DataSourceInfo`] per relational source: connection coordinates,
//! SQL dialect, table selection filters, and the optional object-relational
//! inheritance descriptor (inline or referenced by file path). Loaded from
//! YAML files, YAML strings, or a JSON value carried in a request payload.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::database_schema::{DatabaseSchemaError, InheritanceDescriptor};
use crate::query_engine::SqlDialect;

fn default_aggregation() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    #[serde(default)]
    pub dialect: SqlDialect,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Collapse qualifying join tables into aggregator edges
    #[serde(default = "default_aggregation")]
    pub aggregation_enabled: bool,
    /// When non-empty, only these tables are mapped (wins over excludes)
    #[serde(default)]
    pub include_tables: Vec<String>,
    #[serde(default)]
    pub exclude_tables: Vec<String>,
    /// Inline inheritance descriptor
    #[serde(default)]
    pub inheritance: Option<InheritanceDescriptor>,
    /// Path to a YAML inheritance descriptor, used when no inline
    /// descriptor is present
    #[serde(default)]
    pub inheritance_file: Option<String>,
}

impl Default for DataSourceInfo {
    fn default() -> Self {
        DataSourceInfo {
            dialect: SqlDialect::default(),
            url: String::new(),
            username: String::new(),
            password: String::new(),
            database: String::new(),
            aggregation_enabled: default_aggregation(),
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            inheritance: None,
            inheritance_file: None,
        }
    }
}

impl DataSourceInfo {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
                error: format!("{}: {}", path.as_ref().display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Parse {
            error: e.to_string(),
        })
    }

    /// Resolve the inheritance descriptor: the inline form wins, then the
    /// file reference, then none.
    pub fn inheritance_descriptor(
        &self,
    ) -> Result<Option<InheritanceDescriptor>, DatabaseSchemaError> {
        if let Some(descriptor) = &self.inheritance {
            return Ok(Some(descriptor.clone()));
        }
        match &self.inheritance_file {
            Some(path) => InheritanceDescriptor::from_yaml_file(path).map(Some),
            None => Ok(None),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {error}")]
    Read { error: String },
    #[error("Failed to parse configuration: {error}")]
    Parse { error: String },
}
