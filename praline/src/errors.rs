use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

/// Error kinds for praline operations.
///
/// Each kind describes a category of failure so callers can match on the
/// class of problem without parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use praline::errors::{PralineError, ErrorKind, PralineResult};
///
/// fn example() -> PralineResult<()> {
///     Err(PralineError::new("database name cannot be empty", ErrorKind::ConnectionConfig))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// Bad connection, database, or collection configuration.
    ConnectionConfig,
    /// A value or key shape that has no storage representation.
    EncodingType,
    /// An invalid sort or index direction token.
    IndexDirection,
    /// An operation that is not valid in the current context
    /// (malformed query options, empty field names).
    InvalidOperation,
    /// A failure reported by the storage backend, propagated unchanged.
    Backend,
    /// Internal error (usually indicates a bug).
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConnectionConfig => write!(f, "Connection configuration error"),
            ErrorKind::EncodingType => write!(f, "Encoding type error"),
            ErrorKind::IndexDirection => write!(f, "Index direction error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::Backend => write!(f, "Backend error"),
            ErrorKind::Internal => write!(f, "Internal error"),
        }
    }
}

/// Custom praline error type.
///
/// `PralineError` encapsulates the error message, its [ErrorKind], and an
/// optional cause. It supports error chaining and captures a backtrace at
/// construction time for debugging.
///
/// # Type alias
///
/// The `PralineResult<T>` type alias is equivalent to `Result<T, PralineError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct PralineError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<PralineError>>,
    backtrace: Backtrace,
}

impl PralineError {
    /// Creates a new `PralineError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        PralineError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: Backtrace::new_unresolved(),
        }
    }

    /// Creates a new `PralineError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for
    /// debugging.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: PralineError) -> Self {
        PralineError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: Backtrace::new_unresolved(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&PralineError> {
        self.cause.as_deref()
    }
}

impl Display for PralineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for PralineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let mut backtrace = self.backtrace.clone();
                backtrace.resolve();
                write!(f, "{}\n{:?}", self.message, backtrace)
            }
        }
    }
}

impl Error for PralineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for praline operations.
///
/// `PralineResult<T>` is shorthand for `Result<T, PralineError>`.
/// All fallible praline operations return this type.
pub type PralineResult<T> = Result<T, PralineError>;
