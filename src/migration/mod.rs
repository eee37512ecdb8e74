//! Migration system for FHIR resource stores.
//!
//! Migrations form a single linear history: each one names its own
//! revision and the revision it follows. The engine applies or reverts them
//! against the store and records the last applied revision after each step.
//!
//! # Overview
//!
//! - Migrations implement the `MigrationUnit` trait with `upgrade()` and `downgrade()`
//! - A `MigrationCatalog` lists the available units; `StaticCatalog` registers them in code
//! - The `MigrationEngine` resolves the catalog into an `OrderedChain` on every call
//! - Upgrade runs every unapplied migration; downgrade reverts only the applied one
//! - A failed migration stops the run; earlier steps stay recorded
//! - New migrations can only be created when every existing one is applied
//!
//! # Usage
//!
//! ```ignore
//! let catalog = create_catalog(FhirClient::new("http://localhost:8080/fhir/")?);
//! let store = Arc::new(MemoryMarkerStore::new());
//! let engine = MigrationEngine::new(catalog, store, "src/migration/migrations");
//! let result = engine.upgrade().await?;
//! ```

mod catalog;
mod engine;
pub mod migrations;
mod plan;
mod types;

pub use catalog::{
    normalize_down_revision, CatalogError, MigrationCatalog, ResolvedCatalog, StaticCatalog,
};
pub use engine::MigrationEngine;
pub use plan::{compute_work, WorkPlan};
pub use types::{
    CreatedMigration, EngineError, MigrationDirection, MigrationError, MigrationResult,
    MigrationStatus, MigrationUnit,
};

use crate::fhir::FhirClient;
use migrations::add_patient_identifier::AddPatientIdentifierMigration;
use migrations::initial::InitialMigration;
use std::sync::Arc;

/// Create the catalog of built-in migrations. Bodies that touch resources
/// run against `client`.
pub fn create_catalog(client: FhirClient) -> Arc<StaticCatalog> {
    let mut catalog = StaticCatalog::new();

    catalog.register(Arc::new(InitialMigration::new()));
    catalog.register(Arc::new(AddPatientIdentifierMigration::new(client)));

    Arc::new(catalog)
}
