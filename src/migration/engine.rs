//! Migration engine for resolving and running migrations.

use super::catalog::{MigrationCatalog, ResolvedCatalog};
use super::plan::{compute_work, WorkPlan};
use super::types::{
    CreatedMigration, EngineError, MigrationDirection, MigrationResult, MigrationStatus,
    MigrationUnit,
};
use crate::state::MarkerStore;
use crate::template::{StubContext, StubGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Engine that keeps the applied marker in step with the catalog.
///
/// Every operation rebuilds the chain from the catalog, so changes to the
/// catalog between calls are always picked up. Runs are sequential and
/// stop at the first failing migration; the marker is written after each
/// completed step, never batched.
pub struct MigrationEngine {
    catalog: Arc<dyn MigrationCatalog>,
    store: Arc<dyn MarkerStore>,
    stubs: StubGenerator,
}

impl MigrationEngine {
    /// Create a new engine. Generated stubs are written to `migrations_dir`.
    pub fn new(
        catalog: Arc<dyn MigrationCatalog>,
        store: Arc<dyn MarkerStore>,
        migrations_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            store,
            stubs: StubGenerator::new(migrations_dir),
        }
    }

    /// List the catalog and resolve it into a validated chain.
    pub fn rebuild(&self) -> Result<ResolvedCatalog, EngineError> {
        let units = self.catalog.list_units().map_err(|e| {
            error!(error = %e, "Failed to list migrations");
            EngineError::from(e)
        })?;
        ResolvedCatalog::resolve(units).map_err(|e| {
            error!(error = %e, "Failed to build migration sequence");
            EngineError::from(e)
        })
    }

    /// Most recently applied revision.
    pub async fn applied_marker(&self) -> Result<Option<String>, EngineError> {
        Ok(self.store.get().await?)
    }

    /// Apply every unapplied migration, oldest first.
    pub async fn upgrade(&self) -> Result<MigrationResult, EngineError> {
        self.run(MigrationDirection::Upgrade).await
    }

    /// Revert the currently applied migration.
    pub async fn downgrade(&self) -> Result<MigrationResult, EngineError> {
        self.run(MigrationDirection::Downgrade).await
    }

    /// Resolve, compute the work for `direction` and execute it.
    pub async fn run(&self, direction: MigrationDirection) -> Result<MigrationResult, EngineError> {
        let resolved = self.rebuild()?;
        let applied = self.applied_marker().await?;
        let plan = compute_work(resolved.chain(), direction, applied.as_deref())?;

        if plan.is_empty() {
            info!(direction = %direction, "No migrations to run");
            return Ok(MigrationResult {
                direction,
                from_revision: applied.clone(),
                to_revision: applied,
                migrations_run: vec![],
            });
        }

        info!(
            direction = %direction,
            from = applied.as_deref().unwrap_or("None"),
            count = plan.revisions().len(),
            "Starting migration run"
        );

        let result = self.execute(&resolved, direction, plan, applied).await?;

        info!(
            direction = %direction,
            to = result.to_revision.as_deref().unwrap_or("None"),
            count = result.migrations_run.len(),
            "Migration run completed"
        );
        Ok(result)
    }

    /// Execute a computed plan against the resolved catalog.
    pub async fn execute(
        &self,
        resolved: &ResolvedCatalog,
        direction: MigrationDirection,
        plan: WorkPlan,
        applied: Option<String>,
    ) -> Result<MigrationResult, EngineError> {
        let mut migrations_run = Vec::new();
        let mut marker = applied.clone();

        match plan {
            WorkPlan::Nothing => {}
            WorkPlan::Upgrade { pending } => {
                for revision in pending {
                    let unit = Self::unit_for(resolved, &revision)?;
                    info!(revision = %revision, migration = unit.name(), "Applying migration");

                    if let Err(e) = unit.upgrade().await {
                        error!(revision = %revision, error = %e, "Migration failed");
                        return Err(EngineError::MigrationFailed {
                            revision,
                            completed: migrations_run,
                            source: e,
                        });
                    }

                    self.store.set(Some(revision.clone())).await?;
                    marker = Some(revision.clone());
                    migrations_run.push(revision);
                }
            }
            WorkPlan::Downgrade { revert, new_marker } => {
                let unit = Self::unit_for(resolved, &revert)?;
                info!(revision = %revert, migration = unit.name(), "Reverting migration");

                if let Err(e) = unit.downgrade().await {
                    error!(revision = %revert, error = %e, "Migration downgrade failed");
                    return Err(EngineError::MigrationFailed {
                        revision: revert,
                        completed: vec![],
                        source: e,
                    });
                }

                self.store.set(new_marker.clone()).await?;
                marker = new_marker;
                migrations_run.push(revert);
            }
        }

        Ok(MigrationResult {
            direction,
            from_revision: applied,
            to_revision: marker,
            migrations_run,
        })
    }

    /// Clear the applied marker without consulting the catalog.
    pub async fn reset(&self) -> Result<(), EngineError> {
        warn!("Resetting applied migration marker");
        self.store.set(None).await?;
        Ok(())
    }

    /// Report the applied marker, head and pending migrations.
    pub async fn status(&self) -> Result<MigrationStatus, EngineError> {
        let resolved = self.rebuild()?;
        let applied = self.applied_marker().await?;
        let pending = compute_work(resolved.chain(), MigrationDirection::Upgrade, applied.as_deref())?
            .revisions();

        Ok(MigrationStatus {
            applied,
            head: resolved.chain().head().map(str::to_string),
            pending,
        })
    }

    /// Generate a new migration stub following the applied marker.
    ///
    /// Refused while any migration is unapplied, including stubs already in
    /// the migrations directory that the catalog does not register yet, so
    /// the history can never branch.
    pub async fn create(&self, name: &str) -> Result<CreatedMigration, EngineError> {
        let resolved = self.rebuild()?;
        StubGenerator::validate_name(name)?;

        if resolved.has_name(name) || self.stubs.existing_names().contains(name) {
            error!(migration = %name, "Migration name already exists");
            return Err(EngineError::NameAlreadyExists(name.to_string()));
        }

        let applied = self.applied_marker().await?;

        // Stubs written but not registered yet are unapplied too
        let unregistered = self
            .stubs
            .existing_names()
            .into_iter()
            .find(|stub| !resolved.has_name(stub));
        if let Some(stub) = unregistered {
            let revision = self.stubs.stub_revision(&stub).await?;
            error!(
                migration = %stub,
                path = %self.stubs.stub_path(&stub).display(),
                "Unregistered migration stub exists"
            );
            return Err(EngineError::UnappliedMigrationExists {
                applied: applied.unwrap_or_else(|| "None".to_string()),
                head: revision.unwrap_or(stub),
            });
        }

        let head = resolved.chain().head();
        if applied.as_deref() != head {
            error!(
                applied = applied.as_deref().unwrap_or("None"),
                head = head.unwrap_or("None"),
                "Unapplied migration exists"
            );
            return Err(EngineError::UnappliedMigrationExists {
                applied: applied.unwrap_or_else(|| "None".to_string()),
                head: head.unwrap_or("None").to_string(),
            });
        }

        let revision = Uuid::new_v4().to_string();
        let context = StubContext::new(name, revision.clone(), applied.clone());
        let path = self.stubs.write(&context).await?;

        info!(migration = %name, revision = %revision, path = %path.display(), "Generated new migration");

        Ok(CreatedMigration {
            name: name.to_string(),
            revision,
            down_revision: applied,
            path,
        })
    }

    fn unit_for<'a>(
        resolved: &'a ResolvedCatalog,
        revision: &str,
    ) -> Result<&'a Arc<dyn MigrationUnit>, EngineError> {
        resolved
            .unit(revision)
            .ok_or_else(|| EngineError::UnitNotFound(revision.to_string()))
    }
}
