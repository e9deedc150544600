//! # schemalock - schema version coordination for shared document stores
//!
//! `schemalock` lets multiple application instances that start
//! concurrently against the same document store run schema migrations
//! exactly once, in order, without corrupting or double-applying state.
//!
//! ## How it works
//!
//! One singleton **coordination record** in a well-known collection
//! tracks the installed schema version and embeds a lock:
//!
//! - a unique index on the record's `name` field guarantees singleton
//!   semantics even under concurrent first-time creation;
//! - every mutation of the record goes through the store's atomic
//!   conditional update, never read-then-write;
//! - the lock's timestamp is a lease: a lock older than the configured
//!   maximum age is treated as abandoned and reclaimed, which is the
//!   sole recovery mechanism for crashed holders.
//!
//! Migrations are registered under semantic-version identifiers and the
//! pending range (strictly above the recorded version, up to the catalog
//! maximum) runs in ascending order inside the critical section.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use schemalock::{doc, DocumentStore, MemoryStore, SchemaUpdater};
//!
//! let store = DocumentStore::new(MemoryStore::new());
//!
//! let updater = SchemaUpdater::builder()
//!     .lock_max_age_seconds(60)
//!     .add_migration("1.0.0", |store: &DocumentStore| {
//!         store.insert_one("settings", doc! { theme: "dark" })
//!     })
//!     .open(store)?;
//!
//! updater.check_installation()?;
//! updater.check_updates()?;
//! ```

pub mod common;
pub mod config;
pub mod document;
pub mod errors;
pub mod filter;
pub mod lock;
pub mod migration;
pub mod paginate;
pub mod store;
pub mod updater;
pub mod version_store;

pub use config::UpdaterConfig;
pub use document::{Document, Value};
pub use errors::{ErrorKind, SchemaError, SchemaResult};
pub use filter::{all, field, Filter};
pub use lock::LockManager;
pub use migration::{Migration, MigrationCatalog, MigrationRunner};
pub use paginate::{paginate, PaginateOptions, PaginatedResult, Paging};
pub use store::{DocumentStore, DocumentStoreProvider, FindOptions, MemoryStore, UpdateSpec};
pub use updater::{SchemaUpdater, SchemaUpdaterBuilder};
pub use version_store::VersionStore;
