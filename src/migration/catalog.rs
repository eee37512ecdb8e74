//! Migration catalog: the source of truth for which migrations exist.

use super::types::MigrationUnit;
use crate::chain::{ChainError, OrderedChain};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Migration '{name}' is malformed: {reason}")]
    MalformedUnit { name: String, reason: String },
}

/// Source of migration units.
///
/// Units are returned unordered; ordering comes from their declared
/// revisions once resolved into an `OrderedChain`.
pub trait MigrationCatalog: Send + Sync {
    /// List every available unit. Any malformed unit fails the whole listing.
    fn list_units(&self) -> Result<Vec<Arc<dyn MigrationUnit>>, CatalogError>;
}

/// Normalize a declared down revision: absent, blank or the literal `"None"`
/// mark the first migration in history.
pub fn normalize_down_revision(down_revision: Option<&str>) -> Option<&str> {
    down_revision.filter(|d| !d.trim().is_empty() && *d != "None")
}

/// Catalog backed by units registered in code.
pub struct StaticCatalog {
    units: Vec<Arc<dyn MigrationUnit>>,
}

impl StaticCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Register a migration unit.
    pub fn register(&mut self, unit: Arc<dyn MigrationUnit>) {
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationCatalog for StaticCatalog {
    fn list_units(&self) -> Result<Vec<Arc<dyn MigrationUnit>>, CatalogError> {
        let mut names = HashSet::new();

        for unit in &self.units {
            if unit.name().trim().is_empty() {
                return Err(CatalogError::MalformedUnit {
                    name: unit.revision().to_string(),
                    reason: "missing name".to_string(),
                });
            }
            if unit.revision().trim().is_empty() {
                return Err(CatalogError::MalformedUnit {
                    name: unit.name().to_string(),
                    reason: "missing revision".to_string(),
                });
            }
            if !names.insert(unit.name()) {
                return Err(CatalogError::MalformedUnit {
                    name: unit.name().to_string(),
                    reason: "name is used by another migration".to_string(),
                });
            }
        }

        Ok(self.units.clone())
    }
}

/// Catalog units resolved into a validated chain.
pub struct ResolvedCatalog {
    chain: OrderedChain,
    units: HashMap<String, Arc<dyn MigrationUnit>>,
}

impl ResolvedCatalog {
    /// Build the chain from the units' declared revisions.
    pub fn resolve(units: Vec<Arc<dyn MigrationUnit>>) -> Result<Self, ChainError> {
        let chain = OrderedChain::build_from_pairs(units.iter().map(|unit| {
            (
                unit.revision().to_string(),
                normalize_down_revision(unit.down_revision()).map(str::to_string),
            )
        }))?;

        let units = units
            .into_iter()
            .map(|unit| (unit.revision().to_string(), unit))
            .collect();

        Ok(Self { chain, units })
    }

    pub fn chain(&self) -> &OrderedChain {
        &self.chain
    }

    /// Unit registered under `revision`.
    pub fn unit(&self, revision: &str) -> Option<&Arc<dyn MigrationUnit>> {
        self.units.get(revision)
    }

    /// Whether any unit uses `name`.
    pub fn has_name(&self, name: &str) -> bool {
        self.units.values().any(|unit| unit.name() == name)
    }
}
