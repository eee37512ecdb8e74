#![allow(dead_code)]

use async_trait::async_trait;
use fhir_migrations::state::{MarkerError, MarkerStore, MemoryMarkerStore};
use fhir_migrations::{
    CatalogError, MigrationCatalog, MigrationEngine, MigrationError, MigrationUnit,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tempfile::TempDir;

/// Ordered record of bodies run, e.g. `upgrade:A`
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// In-memory migration that records its calls
pub struct FakeUnit {
    revision: String,
    down_revision: Option<String>,
    name: String,
    log: EventLog,
    fail_upgrade: AtomicBool,
    fail_downgrade: AtomicBool,
}

impl FakeUnit {
    pub fn new(revision: &str, down_revision: Option<&str>, log: &EventLog) -> Self {
        Self {
            revision: revision.to_string(),
            down_revision: down_revision.map(str::to_string),
            name: format!("migration_{}", revision.to_lowercase()),
            log: Arc::clone(log),
            fail_upgrade: AtomicBool::new(false),
            fail_downgrade: AtomicBool::new(false),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn set_fail_upgrade(&self, fail: bool) {
        self.fail_upgrade.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_downgrade(&self, fail: bool) {
        self.fail_downgrade.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MigrationUnit for FakeUnit {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn down_revision(&self) -> Option<&str> {
        self.down_revision.as_deref()
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn upgrade(&self) -> Result<(), MigrationError> {
        self.log.lock().unwrap().push(format!("upgrade:{}", self.revision));
        if self.fail_upgrade.load(Ordering::SeqCst) {
            return Err(MigrationError::Failed(format!("{} upgrade failed", self.revision)));
        }
        Ok(())
    }

    async fn downgrade(&self) -> Result<(), MigrationError> {
        self.log.lock().unwrap().push(format!("downgrade:{}", self.revision));
        if self.fail_downgrade.load(Ordering::SeqCst) {
            return Err(MigrationError::Failed(format!("{} downgrade failed", self.revision)));
        }
        Ok(())
    }
}

/// Catalog whose contents can change between engine calls
#[derive(Default)]
pub struct TestCatalog {
    units: RwLock<Vec<Arc<dyn MigrationUnit>>>,
}

impl TestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, unit: Arc<dyn MigrationUnit>) {
        self.units.write().unwrap().push(unit);
    }
}

impl MigrationCatalog for TestCatalog {
    fn list_units(&self) -> Result<Vec<Arc<dyn MigrationUnit>>, CatalogError> {
        let units = self.units.read().unwrap().clone();
        for unit in &units {
            if unit.revision().is_empty() {
                return Err(CatalogError::MalformedUnit {
                    name: unit.name().to_string(),
                    reason: "missing revision".to_string(),
                });
            }
        }
        Ok(units)
    }
}

/// Marker store that records every write and can be made to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryMarkerStore,
    writes: Mutex<Vec<Option<String>>>,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn with_marker(revision: Option<&str>) -> Self {
        Self {
            inner: MemoryMarkerStore::with_marker(revision.map(str::to_string)),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<Option<String>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarkerStore for RecordingStore {
    async fn get(&self) -> Result<Option<String>, MarkerError> {
        self.inner.get().await
    }

    async fn set(&self, revision: Option<String>) -> Result<(), MarkerError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MarkerError::MalformedResource("store unavailable".to_string()));
        }
        self.writes.lock().unwrap().push(revision.clone());
        self.inner.set(revision).await
    }
}

/// Units `A -> B -> C`, returned in declaration order
pub fn abc_units(log: &EventLog) -> Vec<Arc<FakeUnit>> {
    vec![
        Arc::new(FakeUnit::new("A", None, log)),
        Arc::new(FakeUnit::new("B", Some("A"), log)),
        Arc::new(FakeUnit::new("C", Some("B"), log)),
    ]
}

pub fn catalog_of(units: &[Arc<FakeUnit>]) -> Arc<TestCatalog> {
    let catalog = TestCatalog::new();
    for unit in units {
        catalog.add(Arc::clone(unit) as Arc<dyn MigrationUnit>);
    }
    Arc::new(catalog)
}

pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn engine(
    catalog: &Arc<TestCatalog>,
    store: &Arc<RecordingStore>,
    migrations_dir: &Path,
) -> MigrationEngine {
    MigrationEngine::new(
        Arc::clone(catalog) as Arc<dyn MigrationCatalog>,
        Arc::clone(store) as Arc<dyn MarkerStore>,
        migrations_dir,
    )
}
