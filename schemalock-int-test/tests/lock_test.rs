use std::thread;
use std::time::Duration;

use schemalock::common::epoch_millis;
use schemalock::store::UpdateSpec;
use schemalock::{all, LockManager};
use schemalock_int_test::test_util::seeded_store;

#[ctor::ctor]
fn init() {
    colog::init();
}

const COLLECTION: &str = "appSchema";

#[test]
fn test_mutual_exclusion_across_threads() {
    let store = seeded_store();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                LockManager::new(store, COLLECTION, Duration::from_secs(60))
                    .try_acquire()
                    .unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|&acquired| acquired)
        .count();

    assert_eq!(winners, 1);
}

#[test]
fn test_stale_lock_reclaim_has_exactly_one_winner() {
    let store = seeded_store();

    // a holder that crashed 10 seconds ago
    store
        .find_one_and_update(
            COLLECTION,
            &all(),
            &UpdateSpec::new()
                .set("locked", true)
                .set("lockTimestamp", epoch_millis() - 10_000),
        )
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                LockManager::new(store, COLLECTION, Duration::from_secs(3))
                    .try_acquire()
                    .unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|&acquired| acquired)
        .count();

    assert_eq!(winners, 1);
}

#[test]
fn test_lock_five_seconds_old_with_three_second_max_age_is_reclaimable() {
    let store = seeded_store();
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

    let lock = LockManager::new(store.clone(), COLLECTION, Duration::from_secs(3));
    assert!(lock.try_acquire().unwrap());

    let record = store.find_one(COLLECTION, &all()).unwrap().unwrap();
    assert_eq!(record.get_bool("locked"), Some(true));
    assert!(record.get_i64("lockTimestamp").unwrap() > stale_timestamp);
}

#[test]
fn test_lock_becomes_acquirable_after_release() {
    let store = seeded_store();
    let holder = LockManager::new(store.clone(), COLLECTION, Duration::from_secs(60));
    let contender = LockManager::new(store, COLLECTION, Duration::from_secs(60));

    assert!(holder.try_acquire().unwrap());
    assert!(!contender.try_acquire().unwrap());

    assert!(holder.release().unwrap());
    assert!(contender.try_acquire().unwrap());
}
