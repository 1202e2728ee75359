use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for docrepo operations.
///
/// Every fallible operation in the crate reports one of these kinds so callers can
/// branch on the category of failure without inspecting messages.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{DocRepoError, ErrorKind, DocRepoResult};
///
/// fn example() -> DocRepoResult<()> {
///     Err(DocRepoError::new("then_by requires order_by", ErrorKind::OrderingRequired))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Repository configuration
    /// The collection name was changed after the collection handle was resolved
    CollectionAlreadyResolved,

    // Query composition
    /// A secondary sort key was added before a primary one
    OrderingRequired,
    /// Error during filter evaluation or construction
    FilterError,

    // Transactions
    /// A transaction scope from another backend was passed to a repository
    IncompatibleTransactionScope,
    /// The backend deployment cannot run multi-document transactions
    NotSupportedByBackend,
    /// The store rejected a commit or a transactional write because of a conflict
    TransactionFailed,

    // Writes
    /// The store rejected an insert, replace, update or delete
    WriteFailed,

    // Identity and mapping
    /// The provided ID is invalid
    InvalidId,
    /// Error mapping an object to or from a document
    ObjectMappingError,

    // Operation errors
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Invalid connection or store configuration
    InvalidConfiguration,
    /// Failure while decrypting a configuration secret
    SecurityError,

    // Backend and IO
    /// Error from the storage backend
    BackendError,
    /// Generic IO error
    IOError,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::CollectionAlreadyResolved => write!(f, "Collection already resolved"),
            ErrorKind::OrderingRequired => write!(f, "Ordering required"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::IncompatibleTransactionScope => {
                write!(f, "Incompatible transaction scope")
            }
            ErrorKind::NotSupportedByBackend => write!(f, "Not supported by backend"),
            ErrorKind::TransactionFailed => write!(f, "Transaction failed"),
            ErrorKind::WriteFailed => write!(f, "Write failed"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::SecurityError => write!(f, "Security error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Error type of the crate.
///
/// `DocRepoError` carries a message, a kind, an optional cause and a lazily
/// resolved backtrace.
///
/// # Examples
///
/// ```rust,ignore
/// use docrepo::errors::{DocRepoError, ErrorKind};
///
/// let cause = DocRepoError::new("write conflict on posts", ErrorKind::TransactionFailed);
/// let err = DocRepoError::new_with_cause("Commit failed", ErrorKind::TransactionFailed, cause);
/// ```
#[derive(Clone)]
pub struct DocRepoError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<DocRepoError>>,
    backtrace: Atomic<Backtrace>,
}

impl DocRepoError {
    /// Creates a new error with the specified message and kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        DocRepoError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new error that keeps `cause` in its chain.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: DocRepoError) -> Self {
        DocRepoError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&DocRepoError> {
        self.cause.as_deref()
    }
}

impl Display for DocRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for DocRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let mut backtrace = self.backtrace.write();
                backtrace.resolve();
                write!(f, "{}\n{:?}", self.message, *backtrace)
            }
        }
    }
}

impl Error for DocRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// Shorthand for `Result<T, DocRepoError>`.
pub type DocRepoResult<T> = Result<T, DocRepoError>;

impl From<std::io::Error> for DocRepoError {
    fn from(err: std::io::Error) -> Self {
        DocRepoError::new(&format!("IO error: {}", err), ErrorKind::IOError)
    }
}

impl From<std::num::ParseIntError> for DocRepoError {
    fn from(err: std::num::ParseIntError) -> Self {
        DocRepoError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::ObjectMappingError,
        )
    }
}

impl From<chrono::ParseError> for DocRepoError {
    fn from(err: chrono::ParseError) -> Self {
        DocRepoError::new(
            &format!("Date parsing error: {}", err),
            ErrorKind::ObjectMappingError,
        )
    }
}
