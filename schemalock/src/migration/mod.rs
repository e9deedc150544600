//! Versioned schema migrations.
//!
//! A migration is a unit of schema-mutating work identified by a semantic
//! version. Migrations are registered in a [`MigrationCatalog`] and the
//! [`MigrationRunner`] applies the pending range in ascending version
//! order. The runner never advances the recorded schema version itself;
//! that single step belongs to the coordinator once the whole range has
//! succeeded.

mod catalog;
mod migration;
mod runner;

pub use catalog::MigrationCatalog;
pub use migration::Migration;
pub use runner::MigrationRunner;
