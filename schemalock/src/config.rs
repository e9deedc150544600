//! Coordinator configuration.

use std::time::Duration;

use crate::common::{DEFAULT_COLLECTION_NAME, DEFAULT_LOCK_MAX_AGE_SECONDS, LOCK_RETRY_INTERVAL_MILLIS};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};

/// Configuration surface of the [`SchemaUpdater`].
///
/// [`SchemaUpdater`]: crate::updater::SchemaUpdater
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    collection_name: String,
    lock_max_age_seconds: u64,
    retry_interval: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        UpdaterConfig {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            lock_max_age_seconds: DEFAULT_LOCK_MAX_AGE_SECONDS,
            retry_interval: Duration::from_millis(LOCK_RETRY_INTERVAL_MILLIS),
        }
    }
}

impl UpdaterConfig {
    pub fn new() -> Self {
        UpdaterConfig::default()
    }

    /// Name of the collection holding the coordination record.
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn set_collection_name(&mut self, name: &str) {
        self.collection_name = name.to_string();
    }

    /// Age beyond which a held lock is considered abandoned.
    ///
    /// Must be larger than the worst-case duration of a full migration
    /// run; there is no heartbeat renewal while migrations execute.
    pub fn lock_max_age_seconds(&self) -> u64 {
        self.lock_max_age_seconds
    }

    pub fn set_lock_max_age_seconds(&mut self, seconds: u64) {
        self.lock_max_age_seconds = seconds;
    }

    pub fn lock_max_age(&self) -> Duration {
        Duration::from_secs(self.lock_max_age_seconds)
    }

    /// Backoff between lock-acquisition attempts.
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn set_retry_interval(&mut self, interval: Duration) {
        self.retry_interval = interval;
    }

    /// Rejects configurations the protocol cannot run with.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.collection_name.trim().is_empty() {
            return Err(SchemaError::new(
                "Coordination collection name must not be empty",
                ErrorKind::ValidationError,
            ));
        }
        if self.lock_max_age_seconds == 0 {
            return Err(SchemaError::new(
                "lock_max_age_seconds must be at least 1",
                ErrorKind::ValidationError,
            ));
        }
        if self.retry_interval.is_zero() {
            return Err(SchemaError::new(
                "retry_interval must not be zero",
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }
}
