use log::warn;
use parking_lot::RwLock;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::migration::Migration;

/// Registry of available migrations, ordered by semantic version.
///
/// The catalog answers "which migrations must run to go from version A to
/// version B?". It is re-read on every query, so a catalog that grows
/// while the process runs is picked up by later cycles.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct MigrationCatalog {
    inner: Arc<RwLock<BTreeMap<Version, Arc<dyn Migration>>>>,
}

impl MigrationCatalog {
    pub fn new() -> Self {
        MigrationCatalog::default()
    }

    /// Registers a migration under a semantic-version identifier.
    ///
    /// A non-conforming identifier does not poison the catalog: it is
    /// skipped with a warning and `false` is returned, the same way
    /// unrelated files in a migration directory are not part of the
    /// catalog.
    pub fn register<M: Migration + 'static>(&self, version: &str, migration: M) -> bool {
        match Version::parse(version) {
            Ok(version) => {
                self.inner.write().insert(version, Arc::new(migration));
                true
            }
            Err(err) => {
                warn!(
                    "Ignoring migration with invalid version identifier {:?}: {}",
                    version, err
                );
                false
            }
        }
    }

    /// Returns the full installed catalog, ascending.
    pub fn versions(&self) -> Vec<Version> {
        self.inner.read().keys().cloned().collect()
    }

    /// Returns the versions strictly greater than `current` and less than
    /// or equal to `target`, ascending. Empty when nothing qualifies.
    pub fn select_range(&self, current: &Version, target: &Version) -> Vec<Version> {
        self.inner
            .read()
            .keys()
            .filter(|version| *version > current && *version <= target)
            .cloned()
            .collect()
    }

    /// Returns the highest version in the catalog, or the `0.0.0`
    /// baseline when the catalog is empty (nothing to migrate to).
    pub fn target_version(&self) -> Version {
        self.inner
            .read()
            .keys()
            .next_back()
            .cloned()
            .unwrap_or_else(|| Version::new(0, 0, 0))
    }

    /// Looks up the migration registered for an exact version.
    pub fn get(&self, version: &Version) -> Option<Arc<dyn Migration>> {
        self.inner.read().get(version).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
