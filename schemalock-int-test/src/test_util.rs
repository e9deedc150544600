use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use schemalock::store::{DocumentStoreProvider, FindOptions, UpdateSpec};
use schemalock::{doc, Document, DocumentStore, Filter, MemoryStore, SchemaResult};

/// Per-operation call counters for a [`CountingStore`].
#[derive(Default)]
pub struct StoreCounters {
    pub create_collection: AtomicUsize,
    pub create_unique_index: AtomicUsize,
    pub insert_one: AtomicUsize,
    pub find_one_and_update: AtomicUsize,
}

impl StoreCounters {
    pub fn create_collection_calls(&self) -> usize {
        self.create_collection.load(Ordering::SeqCst)
    }

    pub fn insert_one_calls(&self) -> usize {
        self.insert_one.load(Ordering::SeqCst)
    }

    pub fn find_one_and_update_calls(&self) -> usize {
        self.find_one_and_update.load(Ordering::SeqCst)
    }
}

/// Decorator around any store that counts write-path calls, used to
/// assert that idempotent re-runs really perform no work.
#[derive(Clone)]
pub struct CountingStore {
    inner: DocumentStore,
    counters: Arc<StoreCounters>,
}

impl CountingStore {
    pub fn new(inner: DocumentStore) -> Self {
        CountingStore {
            inner,
            counters: Arc::new(StoreCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<StoreCounters> {
        self.counters.clone()
    }
}

impl DocumentStoreProvider for CountingStore {
    fn list_collections(&self) -> SchemaResult<Vec<String>> {
        self.inner.list_collections()
    }

    fn create_collection(&self, name: &str) -> SchemaResult<()> {
        self.counters.create_collection.fetch_add(1, Ordering::SeqCst);
        self.inner.create_collection(name)
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> SchemaResult<()> {
        self.counters
            .create_unique_index
            .fetch_add(1, Ordering::SeqCst);
        self.inner.create_unique_index(collection, field)
    }

    fn insert_one(&self, collection: &str, document: Document) -> SchemaResult<()> {
        self.counters.insert_one.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_one(collection, document)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> SchemaResult<Option<Document>> {
        self.inner.find_one(collection, filter)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> SchemaResult<Vec<Document>> {
        self.inner.find(collection, filter, options)
    }

    fn count(&self, collection: &str, filter: &Filter) -> SchemaResult<u64> {
        self.inner.count(collection, filter)
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> SchemaResult<Option<Document>> {
        self.counters
            .find_one_and_update
            .fetch_add(1, Ordering::SeqCst);
        self.inner.find_one_and_update(collection, filter, update)
    }
}

/// Fresh in-memory store handle.
pub fn memory_store() -> DocumentStore {
    DocumentStore::new(MemoryStore::new())
}

/// Store handle pre-seeded with an unlocked coordination record, for
/// tests that exercise the lock manager directly.
pub fn seeded_store() -> DocumentStore {
    let store = memory_store();
    store
        .insert_one(
            "appSchema",
            doc! { name: "singleton", version: "0.0.0", locked: false, lockTimestamp: 0i64 },
        )
        .expect("seeding the coordination record");
    store
}
