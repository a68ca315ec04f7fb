//! Error types and result definitions for coordination operations.
//!
//! Every failure inside a handler is a [`SyncError`]. Handlers never let one cross the request
//! boundary: the action layer converts it into an ERROR [`crate::types::Reply`] whose value is
//! derived from [`SyncError::reply_message`].

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Literal reply value for an elapsed wait, callers match on it to tell timeouts apart.
pub const TIMEOUT_MESSAGE: &str = "TIMEOUT";

/// Result type used throughout the crate.
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type of the coordination core.
///
/// Carries an [`ErrorKind`] for classification, a static description, an optional dynamic
/// detail, an optional source error and the call site that created it.
#[derive(Debug, Clone)]
pub struct SyncError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Categories of failures a request can run into.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Caller errors
    ValidationError,
    UnknownRequestKind,
    DeserializationError,

    // Resource errors
    NotFound,
    ResourceDestroyed,

    // Wait errors
    WaitTimeout,
    Interrupted,

    // State errors
    InvalidState,
}

impl ErrorKind {
    /// Returns `true` when retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::NotFound | ErrorKind::WaitTimeout)
    }
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the text sent back to the caller in an ERROR reply.
    ///
    /// Timeouts always produce [`TIMEOUT_MESSAGE`]. Other errors produce the description,
    /// followed by the detail when one is present.
    pub fn reply_message(&self) -> String {
        if self.kind == ErrorKind::WaitTimeout {
            return TIMEOUT_MESSAGE.to_owned();
        }

        match &self.detail {
            Some(detail) => format!("{}: {detail}", self.description),
            None => self.description.to_string(),
        }
    }

    /// Attaches the originating error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
    ) -> Self {
        SyncError {
            kind,
            description,
            detail,
            source: None,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for SyncError {
    /// Errors compare equal when their kinds match.
    fn eq(&self, other: &SyncError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = &self.detail {
            write!(f, "\n  Detail: {detail}")?;
        }

        Ok(())
    }
}

impl error::Error for SyncError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`SyncError`] from a kind and a static description.
impl From<(ErrorKind, &'static str)> for SyncError {
    #[track_caller]
    fn from((kind, description): (ErrorKind, &'static str)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(description), None)
    }
}

/// Creates a [`SyncError`] from a kind, a static description and a dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SyncError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, description, detail): (ErrorKind, &'static str, D)) -> SyncError {
        SyncError::from_components(kind, Cow::Borrowed(description), Some(detail.into()))
    }
}

/// Converts [`serde_json::Error`] into a [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for SyncError {
    #[track_caller]
    fn from(err: serde_json::Error) -> SyncError {
        let detail = err.to_string();
        SyncError::from_components(
            ErrorKind::DeserializationError,
            Cow::Borrowed("JSON deserialization failed"),
            Some(Cow::Owned(detail)),
        )
        .with_source(err)
    }
}
