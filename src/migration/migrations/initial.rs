//! Initial migration - starts revision tracking for a FHIR store.
//!
//! Applying it only records the first revision in the marker; every later
//! migration follows it.

use crate::migration::{MigrationError, MigrationUnit};
use async_trait::async_trait;

pub const REVISION: &str = "3f9b2c1e-7a64-4d0b-9e55-1c8f6a2d7b40";
pub const DOWN_REVISION: Option<&str> = None;

/// Root of the migration history.
///
/// This migration doesn't transform any resources; the marker is set by the
/// engine after it runs.
pub struct InitialMigration;

impl InitialMigration {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InitialMigration {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MigrationUnit for InitialMigration {
    fn revision(&self) -> &str {
        REVISION
    }

    fn down_revision(&self) -> Option<&str> {
        DOWN_REVISION
    }

    fn name(&self) -> &str {
        "initial"
    }

    async fn upgrade(&self) -> Result<(), MigrationError> {
        Ok(())
    }

    async fn downgrade(&self) -> Result<(), MigrationError> {
        Ok(())
    }
}
