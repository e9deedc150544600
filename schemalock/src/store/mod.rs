//! The document-store seam.
//!
//! The coordinator never talks to a concrete database. It talks to a
//! [`DocumentStore`], a cheap-clone handle over any
//! [`DocumentStoreProvider`] implementation. The provider contract is the
//! small set of primitives the coordination protocol consumes: collection
//! management, single-document reads/inserts, and the atomic
//! `find_one_and_update` conditional update that backs the lock.

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use crate::document::{Document, Value};
use crate::errors::SchemaResult;
use crate::filter::Filter;

/// A `$set`-style update applied to one matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    sets: Vec<(String, Value)>,
}

impl UpdateSpec {
    pub fn new() -> Self {
        UpdateSpec { sets: Vec::new() }
    }

    /// Adds a field assignment to the update.
    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.sets.push((field.to_string(), value.into()));
        self
    }

    /// Applies the assignments to a document in place.
    pub fn apply(&self, document: &mut Document) {
        for (field, value) in &self.sets {
            document.put(field, value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Result-window options for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    skip: usize,
    limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip_count(&self) -> usize {
        self.skip
    }

    pub fn limit_count(&self) -> Option<usize> {
        self.limit
    }
}

/// Low-level contract a document store must fulfill for the coordinator.
///
/// # Atomicity
/// `find_one_and_update` is the single primitive every coordination-record
/// mutation goes through. Implementations MUST evaluate the filter and
/// apply the update as one atomic step with respect to concurrent calls;
/// a read-then-write emulation re-introduces the lost-update races this
/// crate exists to prevent.
///
/// # Thread safety
/// Implementers must be `Send + Sync`; one store handle is shared by all
/// application instances within a process.
pub trait DocumentStoreProvider: Send + Sync {
    /// Returns the names of all collections in the store.
    fn list_collections(&self) -> SchemaResult<Vec<String>>;

    /// Creates a collection.
    ///
    /// # Errors
    /// `CollectionAlreadyExists` if a collection with the name exists.
    /// Concurrent first-time installs rely on this signal.
    fn create_collection(&self, name: &str) -> SchemaResult<()>;

    /// Creates a unique index on a field of the collection.
    fn create_unique_index(&self, collection: &str, field: &str) -> SchemaResult<()>;

    /// Inserts one document.
    ///
    /// # Errors
    /// `UniqueConstraintViolation` if a unique index rejects the document.
    fn insert_one(&self, collection: &str, document: Document) -> SchemaResult<()>;

    /// Returns the first document matching the filter, if any.
    fn find_one(&self, collection: &str, filter: &Filter) -> SchemaResult<Option<Document>>;

    /// Returns all documents matching the filter, windowed by `options`.
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> SchemaResult<Vec<Document>>;

    /// Counts documents matching the filter.
    fn count(&self, collection: &str, filter: &Filter) -> SchemaResult<u64>;

    /// Atomically updates the first document matching the filter.
    ///
    /// Returns the matched document as it was **before** the update, or
    /// `None` if nothing matched.
    fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> SchemaResult<Option<Document>>;
}

/// Shareable handle over a [`DocumentStoreProvider`].
///
/// Clones are cheap and refer to the same underlying store.
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<dyn DocumentStoreProvider>,
}

impl DocumentStore {
    pub fn new<P: DocumentStoreProvider + 'static>(provider: P) -> Self {
        DocumentStore {
            inner: Arc::new(provider),
        }
    }

    pub fn list_collections(&self) -> SchemaResult<Vec<String>> {
        self.inner.list_collections()
    }

    pub fn create_collection(&self, name: &str) -> SchemaResult<()> {
        self.inner.create_collection(name)
    }

    pub fn create_unique_index(&self, collection: &str, field: &str) -> SchemaResult<()> {
        self.inner.create_unique_index(collection, field)
    }

    pub fn insert_one(&self, collection: &str, document: Document) -> SchemaResult<()> {
        self.inner.insert_one(collection, document)
    }

    pub fn find_one(&self, collection: &str, filter: &Filter) -> SchemaResult<Option<Document>> {
        self.inner.find_one(collection, filter)
    }

    pub fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> SchemaResult<Vec<Document>> {
        self.inner.find(collection, filter, options)
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> SchemaResult<u64> {
        self.inner.count(collection, filter)
    }

    pub fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &UpdateSpec,
    ) -> SchemaResult<Option<Document>> {
        self.inner.find_one_and_update(collection, filter, update)
    }
}
