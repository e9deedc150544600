//! Access to the singleton coordination record.

use log::info;
use semver::Version;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::{
    BASELINE_VERSION, INSTALL_MAX_WAIT_MILLIS, INSTALL_POLL_INTERVAL_MILLIS, NAME_FIELD,
    SINGLETON_NAME, VERSION_FIELD,
};
use crate::doc;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::filter::all;
use crate::store::{DocumentStore, UpdateSpec};

/// Reads and writes the coordination record in its well-known collection.
///
/// Exactly one record exists per deployment; the unique index on the
/// `name` field guarantees singleton semantics even when several
/// instances race through a first-time install.
pub struct VersionStore {
    store: DocumentStore,
    collection_name: String,
    install_max_wait: Duration,
    install_poll_interval: Duration,
}

impl VersionStore {
    pub fn new(store: DocumentStore, collection_name: &str) -> Self {
        VersionStore {
            store,
            collection_name: collection_name.to_string(),
            install_max_wait: Duration::from_millis(INSTALL_MAX_WAIT_MILLIS),
            install_poll_interval: Duration::from_millis(INSTALL_POLL_INTERVAL_MILLIS),
        }
    }

    /// Overrides the bounded wait used to recover from a concurrent
    /// first-time install. Mainly useful in tests.
    pub fn with_install_poll(mut self, max_wait: Duration, poll_interval: Duration) -> Self {
        self.install_max_wait = max_wait;
        self.install_poll_interval = poll_interval;
        self
    }

    /// Checks whether the coordination collection exists.
    pub fn collection_exists(&self) -> SchemaResult<bool> {
        let collections = self.store.list_collections()?;
        Ok(collections.iter().any(|name| name == &self.collection_name))
    }

    /// Creates the coordination collection, its unique index on `name`,
    /// and the baseline record.
    ///
    /// Collection creation is not atomic across processes. When the
    /// creation fails because another instance got there first, this is
    /// not an error: the record is polled for (bounded wait) and the
    /// install succeeds once it becomes visible. The original failure is
    /// surfaced only if the record never appears within the bound.
    pub fn install(&self) -> SchemaResult<()> {
        info!(" > Installing the {:?} collection.", self.collection_name);

        let result = self.install_once();
        let Err(err) = result else {
            return Ok(());
        };

        let start = Instant::now();
        while start.elapsed() < self.install_max_wait {
            thread::sleep(self.install_poll_interval);

            let record = self.store.find_one(&self.collection_name, &all())?;
            if record.is_some() {
                // another instance completed the install; the error was a
                // creation race, not a real failure
                return Ok(());
            }
        }

        Err(SchemaError::new_with_cause(
            &format!(
                "Installation of the {:?} collection failed and no coordination record appeared within {:?}",
                self.collection_name, self.install_max_wait
            ),
            ErrorKind::InstallationError,
            err,
        ))
    }

    fn install_once(&self) -> SchemaResult<()> {
        self.store.create_collection(&self.collection_name)?;

        // makes sure only one coordination record can ever exist
        self.store
            .create_unique_index(&self.collection_name, NAME_FIELD)?;

        self.store.insert_one(
            &self.collection_name,
            doc! {
                name: SINGLETON_NAME,
                version: BASELINE_VERSION,
                locked: false,
                lockTimestamp: 0i64,
            },
        )
    }

    /// Returns the installed schema version, or the `0.0.0` baseline when
    /// no record exists yet.
    pub fn read_version(&self) -> SchemaResult<Version> {
        let record = self.store.find_one(&self.collection_name, &all())?;

        let Some(record) = record else {
            return parse_version(BASELINE_VERSION);
        };

        let raw = record.get_string(VERSION_FIELD).ok_or_else(|| {
            SchemaError::new(
                "Coordination record has no version field",
                ErrorKind::InternalError,
            )
        })?;
        parse_version(&raw)
    }

    /// Advances the recorded schema version.
    ///
    /// The write is unconditional: the caller holds the coordination
    /// lock, which is the actual guard against concurrent writers.
    pub fn write_version(&self, current: &Version, new: &Version) -> SchemaResult<()> {
        let matched = self.store.find_one_and_update(
            &self.collection_name,
            &all(),
            &UpdateSpec::new().set(VERSION_FIELD, new.to_string()),
        )?;

        if matched.is_none() {
            return Err(SchemaError::new(
                "Coordination record disappeared while advancing the schema version",
                ErrorKind::InternalError,
            ));
        }

        info!(
            " > App schema upgraded from version {} to version {}",
            current, new
        );
        Ok(())
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }
}

fn parse_version(raw: &str) -> SchemaResult<Version> {
    Version::parse(raw).map_err(|err| {
        SchemaError::new(
            &format!("Invalid semantic version {:?}: {}", raw, err),
            ErrorKind::InvalidVersion,
        )
    })
}
