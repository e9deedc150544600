use std::thread;

use schemalock::{all, DocumentStore, SchemaUpdater};
use schemalock_int_test::test_util::{memory_store, CountingStore};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_second_installation_check_creates_nothing() {
    let counting = CountingStore::new(memory_store());
    let counters = counting.counters();
    let updater = SchemaUpdater::builder()
        .open(DocumentStore::new(counting))
        .unwrap();

    updater.check_installation().unwrap();
    assert_eq!(counters.create_collection_calls(), 1);
    assert_eq!(counters.insert_one_calls(), 1);

    // install is skipped once the collection exists
    updater.check_installation().unwrap();
    assert_eq!(counters.create_collection_calls(), 1);
    assert_eq!(counters.insert_one_calls(), 1);
}

#[test]
fn test_concurrent_installation_leaves_a_single_record() {
    let store = memory_store();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let updater = SchemaUpdater::builder().open(store).unwrap();
                updater.check_installation()
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_eq!(store.count("appSchema", &all()).unwrap(), 1);

    let record = store.find_one("appSchema", &all()).unwrap().unwrap();
    assert_eq!(record.get_string("name").as_deref(), Some("singleton"));
    assert_eq!(record.get_string("version").as_deref(), Some("0.0.0"));
}

#[test]
fn test_custom_collection_name() {
    let store = memory_store();
    let updater = SchemaUpdater::builder()
        .collection_name("testAppSchema")
        .open(store.clone())
        .unwrap();

    updater.check_installation().unwrap();

    assert_eq!(
        store.list_collections().unwrap(),
        vec!["testAppSchema".to_string()]
    );
    assert_eq!(store.count("testAppSchema", &all()).unwrap(), 1);
}
