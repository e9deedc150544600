use log::info;
use semver::Version;

use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::migration::MigrationCatalog;
use crate::store::DocumentStore;

/// Applies a selected range of migrations sequentially against the store.
///
/// The runner halts on the first failing migration and propagates the
/// error; later migrations do not run and no per-migration version
/// bookkeeping is performed. A failure therefore leaves the recorded
/// version at its pre-run value even though earlier migrations in the
/// range have executed; operators are expected to inspect and intervene.
pub struct MigrationRunner {
    store: DocumentStore,
    catalog: MigrationCatalog,
}

impl MigrationRunner {
    pub fn new(store: DocumentStore, catalog: MigrationCatalog) -> Self {
        MigrationRunner { store, catalog }
    }

    /// Runs every migration strictly greater than `current` and up to
    /// `target`, in ascending semantic-version order.
    pub fn apply_range(&self, current: &Version, target: &Version) -> SchemaResult<()> {
        let pending = self.catalog.select_range(current, target);
        if pending.is_empty() {
            return Ok(());
        }

        for version in &pending {
            info!(" > Pending schema migration: {}", version);

            // A selected version without a registered migration is a
            // structural defect, not a transient condition.
            let migration = self.catalog.get(version).ok_or_else(|| {
                SchemaError::new(
                    &format!("No migration is registered for version {}", version),
                    ErrorKind::MigrationError,
                )
            })?;

            migration.migrate(&self.store)?;
        }

        info!("All schema migrations done");
        Ok(())
    }
}
