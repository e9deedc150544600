// coordination record fields
pub const NAME_FIELD: &str = "name";
pub const VERSION_FIELD: &str = "version";
pub const LOCKED_FIELD: &str = "locked";
pub const LOCK_TIMESTAMP_FIELD: &str = "lockTimestamp";

// coordination record constants
pub const SINGLETON_NAME: &str = "singleton"; // do not change!
pub const BASELINE_VERSION: &str = "0.0.0";

// defaults
pub const DEFAULT_COLLECTION_NAME: &str = "appSchema";
pub const DEFAULT_LOCK_MAX_AGE_SECONDS: u64 = 60;
pub const LOCK_RETRY_INTERVAL_MILLIS: u64 = 1000;

// first-install race recovery bounds
pub const INSTALL_MAX_WAIT_MILLIS: u64 = 10_000;
pub const INSTALL_POLL_INTERVAL_MILLIS: u64 = 1000;

pub const SCHEMALOCK_VERSION: &str = env!("CARGO_PKG_VERSION");
