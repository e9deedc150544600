use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for schema coordination operations.
///
/// Each kind describes one category of failure so callers can decide
/// whether a condition is retryable (store connectivity) or structural
/// (a bad migration will not fix itself).
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Configuration or input validation failed
    ValidationError,
    /// Generic IO error
    IOError,
    /// The backing document store failed or is unreachable
    StoreError,
    /// Collection does not exist
    CollectionNotFound,
    /// Collection already exists at the requested name
    CollectionAlreadyExists,
    /// A unique index rejected a duplicate document
    UniqueConstraintViolation,
    /// A version identifier does not parse as a semantic version
    InvalidVersion,
    /// A migration failed or is missing from the catalog
    MigrationError,
    /// First-time installation of the coordination record failed
    InstallationError,
    /// The coordination lock could not be manipulated
    LockError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::StoreError => write!(f, "Store error"),
            ErrorKind::CollectionNotFound => write!(f, "Collection not found"),
            ErrorKind::CollectionAlreadyExists => write!(f, "Collection already exists"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::InvalidVersion => write!(f, "Invalid version"),
            ErrorKind::MigrationError => write!(f, "Migration error"),
            ErrorKind::InstallationError => write!(f, "Installation error"),
            ErrorKind::LockError => write!(f, "Lock error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom error type used throughout the crate.
///
/// `SchemaError` carries the error message, kind, an optional cause for
/// error chaining, and a backtrace captured at construction time.
///
/// # Examples
///
/// ```rust,ignore
/// use schemalock::errors::{ErrorKind, SchemaError, SchemaResult};
///
/// fn example() -> SchemaResult<()> {
///     Err(SchemaError::new("no migration registered", ErrorKind::MigrationError))
/// }
/// ```
#[derive(Clone)]
pub struct SchemaError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<SchemaError>>,
    backtrace: Atomic<Backtrace>,
}

impl SchemaError {
    /// Creates a new `SchemaError` with the specified message and kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        SchemaError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `SchemaError` with an underlying cause attached.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: SchemaError) -> Self {
        SchemaError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<SchemaError>> {
        self.cause.as_ref()
    }
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for schema coordination operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_uses_message() {
        let err = SchemaError::new("lock is busy", ErrorKind::LockError);
        assert_eq!(format!("{}", err), "lock is busy");
        assert_eq!(err.kind(), &ErrorKind::LockError);
    }

    #[test]
    fn test_error_chain_preserves_cause() {
        let cause = SchemaError::new("connection reset", ErrorKind::StoreError);
        let err = SchemaError::new_with_cause("install failed", ErrorKind::InstallationError, cause);

        let source = err.cause().expect("cause should be set");
        assert_eq!(source.kind(), &ErrorKind::StoreError);
        assert!(format!("{:?}", err).contains("Caused by"));
    }
}
