use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const DEFAULT_FHIR_URL: &str = "http://fhir-internal:8080/fhir/";
pub const DEFAULT_MIGRATION_SYSTEM: &str = "http://fhir.migration.system";
pub const DEFAULT_MIGRATION_RESOURCE_ID: &str = "e61c4580-2493-417f-a26c-26faa8eb70ba";
pub const DEFAULT_MIGRATIONS_DIR: &str = "src/migration/migrations";
pub const DEFAULT_MARKER_FILE: &str = ".migration-marker.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Where the applied-migration marker is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerBackend {
    /// A `Basic` resource on the FHIR server
    #[default]
    Fhir,
    /// A local JSON file
    File,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MIGRATIONS_DIR)
}

fn default_fhir_url() -> String {
    DEFAULT_FHIR_URL.to_string()
}

fn default_migration_system() -> String {
    DEFAULT_MIGRATION_SYSTEM.to_string()
}

fn default_migration_resource_id() -> String {
    DEFAULT_MIGRATION_RESOURCE_ID.to_string()
}

fn default_marker_file() -> PathBuf {
    PathBuf::from(DEFAULT_MARKER_FILE)
}

/// Migration tooling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MigrationConfig {
    /// Directory new migration stubs are written to
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
    /// FHIR server base URL
    #[serde(default = "default_fhir_url")]
    pub fhir_url: String,
    /// Identifier system of the marker resource
    #[serde(default = "default_migration_system")]
    pub migration_system: String,
    /// Identifier value of the marker resource
    #[serde(default = "default_migration_resource_id")]
    pub migration_resource_id: String,
    #[serde(default)]
    pub marker_store: MarkerBackend,
    /// Marker file used by the file backend
    #[serde(default = "default_marker_file")]
    pub marker_file: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            migrations_dir: default_migrations_dir(),
            fhir_url: default_fhir_url(),
            migration_system: default_migration_system(),
            migration_resource_id: default_migration_resource_id(),
            marker_store: MarkerBackend::default(),
            marker_file: default_marker_file(),
        }
    }
}

/// Read a configuration file, `None` if it does not exist
pub async fn read_config(path: &Path) -> Result<Option<MigrationConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    let config: MigrationConfig = serde_json::from_str(&content)?;
    Ok(Some(config))
}

/// Write a configuration file
pub async fn write_config(path: &Path, config: &MigrationConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).await?;
    Ok(())
}
