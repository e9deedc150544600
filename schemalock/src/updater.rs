//! The coordinator driving one "check and apply" cycle.

use log::{error, info, warn};
use semver::Version;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::common::SCHEMALOCK_VERSION;
use crate::config::UpdaterConfig;
use crate::errors::SchemaResult;
use crate::lock::LockManager;
use crate::migration::{Migration, MigrationCatalog, MigrationRunner};
use crate::store::DocumentStore;
use crate::version_store::VersionStore;

/// Coordinates schema migrations across concurrently-starting
/// application instances that share one document store.
///
/// Intended startup sequence, after a store connection is established
/// and before the application begins serving requests:
///
/// ```rust,ignore
/// use schemalock::{DocumentStore, MemoryStore, SchemaUpdater};
///
/// let store = DocumentStore::new(MemoryStore::new());
/// let updater = SchemaUpdater::builder()
///     .add_migration("1.0.0", |store: &DocumentStore| { /* ... */ Ok(()) })
///     .open(store)?;
///
/// updater.check_installation()?;
/// updater.check_updates()?;
/// ```
///
/// Both entry points fail loudly; there is no silent partial-migration
/// mode. Clones share the same state.
#[derive(Clone)]
pub struct SchemaUpdater {
    inner: Arc<SchemaUpdaterInner>,
}

impl std::fmt::Debug for SchemaUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaUpdater")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

struct SchemaUpdaterInner {
    config: UpdaterConfig,
    catalog: MigrationCatalog,
    version_store: VersionStore,
    lock_manager: LockManager,
    runner: MigrationRunner,
}

impl SchemaUpdater {
    pub fn builder() -> SchemaUpdaterBuilder {
        SchemaUpdaterBuilder::new()
    }

    /// Idempotently ensures the coordination collection and its singleton
    /// record exist. Always invoked first in the normal startup path.
    pub fn check_installation(&self) -> SchemaResult<()> {
        let inner = &self.inner;
        info!(
            "Validating that the {:?} collection required by the application has been installed.",
            inner.config.collection_name()
        );

        if inner.version_store.collection_exists()? {
            info!(
                " > The {:?} collection was found. No installation required.",
                inner.config.collection_name()
            );
            return Ok(());
        }

        info!(
            " > The {:?} collection was not found... Starting a new installation.",
            inner.config.collection_name()
        );
        inner.version_store.install()
    }

    /// Checks whether the schema needs updating and applies the pending
    /// migrations if so.
    ///
    /// The acquisition loop has no iteration cap: it re-reads the
    /// recorded version on every pass (another instance may have
    /// completed the migration while we waited) and relies on lock
    /// staleness to break deadlocks left by crashed holders. Once the
    /// lock is acquired it is always released before any error
    /// propagates.
    pub fn check_updates(&self) -> SchemaResult<()> {
        let inner = &self.inner;
        info!("Checking for app schema updates (schemalock {}):", SCHEMALOCK_VERSION);

        let target = inner.catalog.target_version();

        let current = loop {
            let current = inner.version_store.read_version()?;
            if current >= target {
                info!(" > Current app schema is up to date: {}", current);
                return Ok(());
            }

            if inner.lock_manager.try_acquire()? {
                info!(" > Lock acquired.");
                break current;
            }

            warn!(
                "The lock can't be acquired. The maximum age it can be before being considered \
                 to be too old is {} seconds. Waiting for {:?}...",
                inner.config.lock_max_age_seconds(),
                inner.config.retry_interval()
            );
            thread::sleep(inner.config.retry_interval());
        };

        // the lock is held from here on; release before propagating
        // anything, whatever the outcome
        info!(" > Applying some required updates...");
        let outcome = inner
            .runner
            .apply_range(&current, &target)
            .and_then(|_| inner.version_store.write_version(&current, &target));

        let released = inner.lock_manager.release();

        match (outcome, released) {
            (Ok(()), Ok(_)) => Ok(()),
            (Ok(()), Err(release_err)) => Err(release_err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(release_err)) => {
                error!("Failed to release the coordination lock: {:?}", release_err);
                Err(err)
            }
        }
    }

    /// Returns the schema version currently recorded in the store.
    pub fn current_version(&self) -> SchemaResult<Version> {
        self.inner.version_store.read_version()
    }

    /// Returns the highest version available in the migration catalog.
    pub fn target_version(&self) -> Version {
        self.inner.catalog.target_version()
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.inner.config
    }
}

/// Fluent builder for [`SchemaUpdater`].
#[derive(Default)]
pub struct SchemaUpdaterBuilder {
    config: UpdaterConfig,
    catalog: MigrationCatalog,
}

impl SchemaUpdaterBuilder {
    pub fn new() -> Self {
        SchemaUpdaterBuilder {
            config: UpdaterConfig::new(),
            catalog: MigrationCatalog::new(),
        }
    }

    /// Sets the coordination collection name (default `"appSchema"`).
    pub fn collection_name(mut self, name: &str) -> Self {
        self.config.set_collection_name(name);
        self
    }

    /// Sets the age beyond which a lock counts as abandoned (default 60).
    pub fn lock_max_age_seconds(mut self, seconds: u64) -> Self {
        self.config.set_lock_max_age_seconds(seconds);
        self
    }

    /// Sets the backoff between lock-acquisition attempts (default 1 s).
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.set_retry_interval(interval);
        self
    }

    /// Registers a migration under a semantic-version identifier.
    ///
    /// Identifiers that do not parse as semantic versions are skipped
    /// with a warning, see [`MigrationCatalog::register`].
    pub fn add_migration<M: Migration + 'static>(self, version: &str, migration: M) -> Self {
        self.catalog.register(version, migration);
        self
    }

    /// Validates the configuration and opens the coordinator over the
    /// given store handle.
    pub fn open(self, store: DocumentStore) -> SchemaResult<SchemaUpdater> {
        self.config.validate()?;

        let collection_name = self.config.collection_name().to_string();
        let version_store = VersionStore::new(store.clone(), &collection_name);
        let lock_manager =
            LockManager::new(store.clone(), &collection_name, self.config.lock_max_age());
        let runner = MigrationRunner::new(store, self.catalog.clone());

        Ok(SchemaUpdater {
            inner: Arc::new(SchemaUpdaterInner {
                config: self.config,
                catalog: self.catalog,
                version_store,
                lock_manager,
                runner,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::errors::{ErrorKind, SchemaError};
    use crate::filter::all;
    use crate::store::MemoryStore;

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    fn open(builder: SchemaUpdaterBuilder) -> (DocumentStore, SchemaUpdater) {
        let store = DocumentStore::new(MemoryStore::new());
        let updater = builder.open(store.clone()).unwrap();
        (store, updater)
    }

    #[test]
    fn test_check_updates_with_empty_catalog_is_a_no_op() {
        let (_, updater) = open(SchemaUpdater::builder());
        updater.check_updates().unwrap();
        assert_eq!(updater.target_version(), Version::new(0, 0, 0));
    }

    #[test]
    fn test_full_cycle_advances_to_target() {
        let builder = SchemaUpdater::builder()
            .add_migration("1.0.0", |store: &DocumentStore| {
                store.insert_one("settings", doc! { step: 1 })
            })
            .add_migration("1.0.1", |store: &DocumentStore| {
                store.insert_one("settings", doc! { step: 2 })
            });
        let (store, updater) = open(builder);
        let target = updater.target_version();

        updater.check_installation().unwrap();
        updater.check_updates().unwrap();

        assert_eq!(updater.current_version().unwrap(), target);
        assert_eq!(store.count("settings", &all()).unwrap(), 2);

        // lock was released
        let record = store.find_one("appSchema", &all()).unwrap().unwrap();
        assert_eq!(record.get_bool("locked"), Some(false));
        assert_eq!(record.get_i64("lockTimestamp"), Some(0));
    }

    #[test]
    fn test_failed_migration_releases_lock_and_keeps_version() {
        let builder = SchemaUpdater::builder()
            .add_migration("1.0.0", |_store: &DocumentStore| {
                Err(SchemaError::new("bad script", ErrorKind::MigrationError))
            });
        let (store, updater) = open(builder);

        updater.check_installation().unwrap();
        let err = updater.check_updates().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MigrationError);

        // version not advanced, lock not left behind
        assert_eq!(updater.current_version().unwrap(), Version::new(0, 0, 0));
        let record = store.find_one("appSchema", &all()).unwrap().unwrap();
        assert_eq!(record.get_bool("locked"), Some(false));
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let store = DocumentStore::new(MemoryStore::new());
        let err = SchemaUpdater::builder()
            .collection_name("")
            .open(store)
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ValidationError);
    }

    #[test]
    fn test_check_installation_is_idempotent() {
        let (store, updater) = open(SchemaUpdater::builder());

        updater.check_installation().unwrap();
        updater.check_installation().unwrap();

        assert_eq!(store.count("appSchema", &all()).unwrap(), 1);
    }
}
