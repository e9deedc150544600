use crate::errors::SchemaResult;
use crate::store::DocumentStore;

/// A single versioned unit of schema-mutating work.
///
/// Implementations receive the shared store handle and perform their
/// changes synchronously. Under normal operation each migration runs at
/// most once per deployment, but a crash between a partial run and the
/// version advancement means the whole pending range is re-run on the
/// next startup. Migrations that need crash-recovery correctness must
/// therefore be written to be safe to re-run; the coordinator only
/// provides the exclusion mechanism.
///
/// Any `Fn(&DocumentStore) -> SchemaResult<()>` closure is a migration:
///
/// ```rust,ignore
/// use schemalock::doc;
///
/// let updater = SchemaUpdater::builder()
///     .add_migration("1.0.0", |store: &DocumentStore| {
///         store.insert_one("settings", doc! { theme: "dark" })
///     })
///     .open(store)?;
/// ```
pub trait Migration: Send + Sync {
    /// Applies the migration against the store.
    fn migrate(&self, store: &DocumentStore) -> SchemaResult<()>;
}

impl<F> Migration for F
where
    F: Fn(&DocumentStore) -> SchemaResult<()> + Send + Sync,
{
    fn migrate(&self, store: &DocumentStore) -> SchemaResult<()> {
        self(store)
    }
}
