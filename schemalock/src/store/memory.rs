use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::document::Document;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::filter::Filter;
use crate::store::{DocumentStoreProvider, FindOptions, UpdateSpec};

/// In-memory document store.
///
/// # Purpose
/// Reference [`DocumentStoreProvider`] used by the test suites and by
/// embedders that want coordination semantics without an external
/// database. Thread-safe: clones share the same collections.
///
/// # Atomicity
/// Every collection guards its documents with a single mutex, so
/// `find_one_and_update` is a genuine one-step conditional update with
/// respect to concurrent callers.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            inner: Arc::new(MemoryStoreInner {
                collections: DashMap::new(),
            }),
        }
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    collections: DashMap<String, Arc<MemoryCollection>>,
}

#[derive(Default)]
struct MemoryCollection {
    state: Mutex<CollectionState>,
}

#[derive(Default)]
struct CollectionState {
    documents: Vec<Document>,
    unique_indexes: Vec<String>,
}

impl MemoryStoreInner {
    /// Inserts and index paths auto-create the collection, as document
    /// stores commonly do.
    fn collection_or_create(&self, name: &str) -> Arc<MemoryCollection> {
        self.collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::default()))
            .value()
            .clone()
    }

    fn collection(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections.get(name).map(|entry| entry.value().clone())
    }
}

impl DocumentStoreProvider for MemoryStore {
    fn list_collections(&self) -> SchemaResult<Vec<String>> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn create_collection(&self, name: &str) -> SchemaResult<()> {
        match self.inner.collections.entry(name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                log::error!("A collection with name {} already exists", name);
                Err(SchemaError::new(
                    &format!("A collection with name {} already exists", name),
                    ErrorKind::CollectionAlreadyExists,
                ))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(MemoryCollection::default()));
                Ok(())
            }
        }
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> SchemaResult<()> {
        let collection = self.inner.collection_or_create(collection);
        let mut state = collection.state.lock();

        if state.unique_indexes.iter().any(|f| f == field) {
            return Ok(());
        }

        // existing data must already satisfy the constraint
        let mut seen = Vec::new();
        for document in &state.documents {
            if let Some(value) = document.get(field) {
                if seen.contains(&value) {
                    return Err(SchemaError::new(
                        &format!("Existing documents violate unique index on {}", field),
                        ErrorKind::UniqueConstraintViolation,
                    ));
                }
                seen.push(value);
            }
        }

        state.unique_indexes.push(field.to_string());
        Ok(())
    }

    fn insert_one(&self, collection: &str, document: Document) -> SchemaResult<()> {
        let collection = self.inner.collection_or_create(collection);
        let mut state = collection.state.lock();

        for field in &state.unique_indexes {
            if let Some(value) = document.get(field) {
                let duplicate = state
                    .documents
                    .iter()
                    .any(|existing| existing.get(field) == Some(value));
                if duplicate {
                    return Err(SchemaError::new(
                        &format!("Duplicate value for unique index on {}", field),
                        ErrorKind::UniqueConstraintViolation,
                    ));
                }
            }
        }

        state.documents.push(document);
        Ok(())
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> SchemaResult<Option<Document>> {
        let Some(collection) = self.inner.collection(collection) else {
            return Ok(None);
        };
        let state = collection.state.lock();
        Ok(state
            .documents
            .iter()
            .find(|document| filter.matches(document))
            .cloned())
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> SchemaResult<Vec<Document>> {
        let Some(collection) = self.inner.collection(collection) else {
            return Ok(Vec::new());
        };
        let state = collection.state.lock();

        let matching = state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .skip(options.skip_count());

        let documents = match options.limit_count() {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        };
        Ok(documents)
    }

    fn count(&self, collection: &str, filter: &Filter) -> SchemaResult<u64> {
        let Some(collection) = self.inner.collection(collection) else {
            return Ok(0);
        };
        let state = collection.state.lock();
        Ok(state
            .documents
            .iter()
            .filter(|document| filter.matches(document))
            .count() as u64)
    }

    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> SchemaResult<Option<Document>> {
        let Some(collection) = self.inner.collection(collection) else {
            return Ok(None);
        };
        let mut state = collection.state.lock();

        let position = state
            .documents
            .iter()
            .position(|document| filter.matches(document));
        let Some(position) = position else {
            return Ok(None);
        };

        let before = state.documents[position].clone();
        update.apply(&mut state.documents[position]);
        Ok(Some(before))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::filter::{all, field};

    #[test]
    fn test_create_collection_twice_fails() {
        let store = MemoryStore::new();
        store.create_collection("appSchema").unwrap();

        let err = store.create_collection("appSchema").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CollectionAlreadyExists);
    }

    #[test]
    fn test_insert_auto_creates_collection() {
        let store = MemoryStore::new();
        store.insert_one("users", doc! { id: 1 }).unwrap();

        assert_eq!(store.list_collections().unwrap(), vec!["users".to_string()]);
        assert_eq!(store.count("users", &all()).unwrap(), 1);
    }

    #[test]
    fn test_unique_index_rejects_duplicates() {
        let store = MemoryStore::new();
        store.create_collection("appSchema").unwrap();
        store.create_unique_index("appSchema", "name").unwrap();
        store.insert_one("appSchema", doc! { name: "singleton" }).unwrap();

        let err = store
            .insert_one("appSchema", doc! { name: "singleton" })
            .unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
        assert_eq!(store.count("appSchema", &all()).unwrap(), 1);
    }

    #[test]
    fn test_unique_index_on_dirty_collection_fails() {
        let store = MemoryStore::new();
        store.insert_one("users", doc! { name: "a" }).unwrap();
        store.insert_one("users", doc! { name: "a" }).unwrap();

        let err = store.create_unique_index("users", "name").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
    }

    #[test]
    fn test_find_one_and_update_returns_pre_image() {
        let store = MemoryStore::new();
        store
            .insert_one("appSchema", doc! { locked: false, lockTimestamp: 0 })
            .unwrap();

        let before = store
            .find_one_and_update(
                "appSchema",
                &field("locked").eq(false),
                &UpdateSpec::new().set("locked", true).set("lockTimestamp", 99i64),
            )
            .unwrap()
            .expect("document should match");

        assert_eq!(before.get_bool("locked"), Some(false));

        let after = store.find_one("appSchema", &all()).unwrap().unwrap();
        assert_eq!(after.get_bool("locked"), Some(true));
        assert_eq!(after.get_i64("lockTimestamp"), Some(99));
    }

    #[test]
    fn test_find_one_and_update_without_match() {
        let store = MemoryStore::new();
        store
            .insert_one("appSchema", doc! { locked: true })
            .unwrap();

        let matched = store
            .find_one_and_update(
                "appSchema",
                &field("locked").eq(false),
                &UpdateSpec::new().set("locked", true),
            )
            .unwrap();
        assert!(matched.is_none());

        // untouched collection
        let document = store.find_one("appSchema", &all()).unwrap().unwrap();
        assert_eq!(document.get_bool("locked"), Some(true));
    }

    #[test]
    fn test_find_with_window() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.insert_one("items", doc! { seq: (i as i64) }).unwrap();
        }

        let page = store
            .find("items", &all(), &FindOptions::new().skip(1).limit(2))
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].get_i64("seq"), Some(1));
        assert_eq!(page[1].get_i64("seq"), Some(2));

        let missing = store.find("nope", &all(), &FindOptions::new()).unwrap();
        assert!(missing.is_empty());
    }
}
