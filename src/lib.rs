pub mod chain;
pub mod config;
pub mod fhir;
pub mod migration;
pub mod state;
pub mod template;

// Re-export commonly used types
pub use chain::{ChainError, ChainNode, OrderedChain};
pub use config::{read_config, write_config, ConfigError, MarkerBackend, MigrationConfig};
pub use fhir::{FhirClient, FhirError};
pub use migration::{
    create_catalog, CatalogError, CreatedMigration, EngineError, MigrationCatalog,
    MigrationDirection, MigrationEngine, MigrationError, MigrationResult, MigrationStatus,
    MigrationUnit, StaticCatalog,
};
pub use state::{FhirMarkerStore, FileMarkerStore, MarkerError, MarkerStore, MemoryMarkerStore};
pub use template::{StubError, StubGenerator};
