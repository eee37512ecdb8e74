//! Types for the migration system.

use super::catalog::CatalogError;
use crate::chain::ChainError;
use crate::state::MarkerError;
use crate::template::StubError;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Error returned by a migration body.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("FHIR error: {0}")]
    FhirError(#[from] crate::fhir::FhirError),

    #[error("{0}")]
    Failed(String),
}

/// Error types for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Sequence error: {0}")]
    Chain(#[from] ChainError),

    #[error("Marker error: {0}")]
    Marker(#[from] MarkerError),

    #[error("Stub error: {0}")]
    Stub(#[from] StubError),

    #[error("Applied migration {0} does not exist in the migration sequence")]
    AppliedStateNotInChain(String),

    #[error("Invalid migration direction '{0}'. Use 'upgrade' or 'downgrade'")]
    InvalidDirection(String),

    #[error("Migration name '{0}' already exists. Use a new name for the migration")]
    NameAlreadyExists(String),

    #[error("There exists a migration that has not been applied (applied: {applied}, latest: {head})")]
    UnappliedMigrationExists { applied: String, head: String },

    #[error("Migration {revision} failed: {source}")]
    MigrationFailed {
        revision: String,
        /// Revisions completed earlier in the same run; the marker reflects them.
        completed: Vec<String>,
        #[source]
        source: MigrationError,
    },

    #[error("Migration {0} is in the sequence but not in the catalog")]
    UnitNotFound(String),
}

/// A single migration unit.
///
/// Each unit names its own revision and the revision it follows. The
/// catalog constructs units with whatever clients their bodies need.
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Unique revision identifier.
    fn revision(&self) -> &str;

    /// Revision this migration follows, `None` for the first migration.
    fn down_revision(&self) -> Option<&str>;

    /// Module name of the migration, unique within a catalog.
    fn name(&self) -> &str;

    /// Apply the migration.
    async fn upgrade(&self) -> Result<(), MigrationError>;

    /// Revert the migration.
    async fn downgrade(&self) -> Result<(), MigrationError>;
}

/// Direction of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    /// Apply every unapplied migration up to head.
    Upgrade,
    /// Revert the applied migration only.
    Downgrade,
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationDirection::Upgrade => write!(f, "upgrade"),
            MigrationDirection::Downgrade => write!(f, "downgrade"),
        }
    }
}

impl FromStr for MigrationDirection {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upgrade" => Ok(MigrationDirection::Upgrade),
            "downgrade" => Ok(MigrationDirection::Downgrade),
            other => Err(EngineError::InvalidDirection(other.to_string())),
        }
    }
}

/// Result of a completed migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub direction: MigrationDirection,
    /// Marker before the run.
    pub from_revision: Option<String>,
    /// Marker after the run.
    pub to_revision: Option<String>,
    /// Revisions whose body ran, in execution order.
    pub migrations_run: Vec<String>,
}

impl MigrationResult {
    pub fn is_noop(&self) -> bool {
        self.migrations_run.is_empty()
    }
}

/// Snapshot of the migration state without running anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStatus {
    pub applied: Option<String>,
    pub head: Option<String>,
    /// Revisions an upgrade would run, oldest first.
    pub pending: Vec<String>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A migration stub written by `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMigration {
    pub name: String,
    pub revision: String,
    pub down_revision: Option<String>,
    pub path: PathBuf,
}
