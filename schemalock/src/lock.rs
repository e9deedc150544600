//! Mutual exclusion over migration execution.
//!
//! The coordination record itself is the lock object: its `locked` flag
//! and `lockTimestamp` field form a lease, and every state change goes
//! through the store's atomic conditional update. Staleness is the sole
//! liveness mechanism. There is no heartbeat renewal during a migration
//! run, so the configured maximum lock age must exceed the worst-case
//! migration duration.

use log::info;
use std::time::Duration;

use crate::common::{epoch_millis, LOCKED_FIELD, LOCK_TIMESTAMP_FIELD};
use crate::errors::SchemaResult;
use crate::filter::field;
use crate::store::{DocumentStore, UpdateSpec};

/// Acquires and releases the lock embedded in the coordination record,
/// tolerant of crashed lock-holders.
pub struct LockManager {
    store: DocumentStore,
    collection_name: String,
    lock_max_age: Duration,
}

impl LockManager {
    pub fn new(store: DocumentStore, collection_name: &str, lock_max_age: Duration) -> Self {
        LockManager {
            store,
            collection_name: collection_name.to_string(),
            lock_max_age,
        }
    }

    /// Tries to take the lock.
    ///
    /// Returns `true` when this caller now owns the lock, either because
    /// it was free or because an existing lock exceeded the maximum age
    /// and was reclaimed (its holder presumably crashed). Returns `false`
    /// when another holder owns a still-valid lock, or when a concurrent
    /// reclaim attempt won the race. Both are normal contention, not
    /// errors.
    ///
    /// Note: ownership is not re-validated afterwards. A migration run
    /// that outlives `lock_max_age` can race with a reclaiming instance,
    /// which is why the age must be sized above the worst-case run.
    pub fn try_acquire(&self) -> SchemaResult<bool> {
        loop {
            let matched = self.store.find_one_and_update(
                &self.collection_name,
                &field(LOCKED_FIELD).eq(false),
                &UpdateSpec::new()
                    .set(LOCKED_FIELD, true)
                    .set(LOCK_TIMESTAMP_FIELD, epoch_millis()),
            )?;
            if matched.is_some() {
                info!(
                    " > Successfully locked the {} document",
                    self.collection_name
                );
                return Ok(true);
            }

            let existing = self
                .store
                .find_one(&self.collection_name, &field(LOCKED_FIELD).eq(true))?;
            let Some(existing) = existing else {
                // released between the two steps; try again
                continue;
            };

            let lock_timestamp = existing.get_i64(LOCK_TIMESTAMP_FIELD).unwrap_or(0);
            let lock_age_millis = epoch_millis() - lock_timestamp;

            if lock_age_millis <= self.lock_max_age.as_millis() as i64 {
                // the existing lock is still valid; we can't get it
                return Ok(false);
            }

            // The lock is too old, its holder presumably crashed.
            // Reclaim it keyed on the exact timestamp we observed so two
            // concurrent reclaims yield exactly one winner.
            let matched = self.store.find_one_and_update(
                &self.collection_name,
                &field(LOCK_TIMESTAMP_FIELD).eq(lock_timestamp),
                &UpdateSpec::new()
                    .set(LOCKED_FIELD, true)
                    .set(LOCK_TIMESTAMP_FIELD, epoch_millis()),
            )?;

            if matched.is_some() {
                info!(
                    " > Reclaimed a stale lock on the {} document",
                    self.collection_name
                );
                return Ok(true);
            }

            // just taken by another instance
            return Ok(false);
        }
    }

    /// Releases the lock.
    ///
    /// Returns `false` when the record was not locked; that is a no-op
    /// signal, not an error.
    pub fn release(&self) -> SchemaResult<bool> {
        let matched = self.store.find_one_and_update(
            &self.collection_name,
            &field(LOCKED_FIELD).eq(true),
            &UpdateSpec::new()
                .set(LOCKED_FIELD, false)
                .set(LOCK_TIMESTAMP_FIELD, 0i64),
        )?;

        if matched.is_some() {
            info!(
                " > Successfully unlocked the {} document",
                self.collection_name
            );
            return Ok(true);
        }

        info!(" > The {} document was not locked", self.collection_name);
        Ok(false)
    }

    pub fn lock_max_age(&self) -> Duration {
        self.lock_max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::filter::all;
    use crate::store::MemoryStore;

    const COLLECTION: &str = "appSchema";

    fn seeded_store() -> DocumentStore {
        let store = DocumentStore::new(MemoryStore::new());
        store
            .insert_one(
                COLLECTION,
                doc! { name: "singleton", version: "0.0.0", locked: false, lockTimestamp: 0i64 },
            )
            .unwrap();
        store
    }

    fn manager(store: &DocumentStore, max_age: Duration) -> LockManager {
        LockManager::new(store.clone(), COLLECTION, max_age)
    }

    #[test]
    fn test_acquire_and_release() {
        let store = seeded_store();
        let lock = manager(&store, Duration::from_secs(60));

        assert!(lock.try_acquire().unwrap());

        let record = store.find_one(COLLECTION, &all()).unwrap().unwrap();
        assert_eq!(record.get_bool("locked"), Some(true));
        assert!(record.get_i64("lockTimestamp").unwrap() > 0);

        assert!(lock.release().unwrap());
        let record = store.find_one(COLLECTION, &all()).unwrap().unwrap();
        assert_eq!(record.get_bool("locked"), Some(false));
        assert_eq!(record.get_i64("lockTimestamp"), Some(0));
    }

    #[test]
    fn test_valid_lock_blocks_other_callers() {
        let store = seeded_store();
        let holder = manager(&store, Duration::from_secs(60));
        let contender = manager(&store, Duration::from_secs(60));

        assert!(holder.try_acquire().unwrap());
        assert!(!contender.try_acquire().unwrap());
    }

    #[test]
    fn test_stale_lock_is_reclaimed() {
        let store = seeded_store();
        let lock = manager(&store, Duration::from_secs(3));

        // a holder that locked 5 seconds ago and never came back
        let stale_timestamp = epoch_millis() - 5000;
        store
            .find_one_and_update(
                COLLECTION,
                &all(),
                &UpdateSpec::new()
                    .set("locked", true)
                    .set("lockTimestamp", stale_timestamp),
            )
            .unwrap();

        assert!(lock.try_acquire().unwrap());

        let record = store.find_one(COLLECTION, &all()).unwrap().unwrap();
        assert!(record.get_i64("lockTimestamp").unwrap() > stale_timestamp);
    }

    #[test]
    fn test_reclaimed_lock_blocks_later_contenders() {
        let store = seeded_store();
        let lock = manager(&store, Duration::from_secs(60));

        store
            .find_one_and_update(
                COLLECTION,
                &all(),
                &UpdateSpec::new()
                    .set("locked", true)
                    .set("lockTimestamp", epoch_millis() - 120_000),
            )
            .unwrap();

        // the stale lock is reclaimed, refreshing its timestamp
        assert!(lock.try_acquire().unwrap());
        // the refreshed lock is valid again and blocks everyone else
        assert!(!manager(&store, Duration::from_secs(60)).try_acquire().unwrap());
    }

    #[test]
    fn test_release_when_not_locked_is_a_no_op() {
        let store = seeded_store();
        let lock = manager(&store, Duration::from_secs(60));

        assert!(!lock.release().unwrap());
    }
}
