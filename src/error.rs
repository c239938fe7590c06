//! The error callers see when a chain does not produce a value.
//!
//! Inside a chain nothing unwinds across threads. An action that returns
//! `Err` or panics becomes a [`Failure`](crate::types::Failure) and travels
//! down the links as state; [`Error`] is what finally comes out of `get()`,
//! `fork()`, `set()` and the configuration loaders.
//!
//! Every [`ErrorKind`] maps to one [`ErrorCategory`] and one
//! [`Recoverability`]. Cascade never retries on its own; the classification
//! is there for callers writing their own retry loops.

use core::fmt;
use std::sync::Arc;

use crate::types::CancelReason;

/// What a user action may fail with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return type of the actions passed to `then`.
pub type ActionResult<T> = core::result::Result<T, BoxError>;

/// `Result` with [`Error`] as the error type.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;

/// Which part of the machinery an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The action returned an error or panicked.
    ActionFailure,
    /// A member of an `await_all` join failed.
    JoinFailure,
    /// The node was cancelled before it produced a value.
    Cancelled,
    /// A blocking wait gave up before the node settled.
    Timeout,
    /// An illegal transition: a repeated fork, a second upstream, a second
    /// `set`, or a `get` that would deadlock its own thread.
    StateConflict,
    /// A chain shape that cannot be built, such as a broken compound.
    ConstructionError,
    /// The target ThreadType has shut down.
    RejectedExecution,
    /// An environment variable or config file could not be used.
    InvalidConfig,
    /// A bug in cascade.
    Internal,
}

/// Coarse grouping of [`ErrorKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Raised by user code.
    Action,
    /// Cancellation and timed-out waits.
    Cancellation,
    /// Chain state machine.
    State,
    /// Chain construction.
    Construction,
    /// Work submission.
    Scheduling,
    /// Settings.
    Configuration,
    /// Invariant violations.
    Internal,
}

/// Whether trying the same thing again can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recoverability {
    /// Likely to succeed if repeated.
    Transient,
    /// Will fail the same way again.
    Permanent,
    /// Depends on what the action did, which cascade cannot see.
    Unknown,
}

impl ErrorKind {
    const fn classify(self) -> (ErrorCategory, Recoverability) {
        use ErrorCategory as C;
        use Recoverability as R;
        match self {
            Self::ActionFailure | Self::JoinFailure => (C::Action, R::Unknown),
            Self::Cancelled => (C::Cancellation, R::Permanent),
            Self::Timeout => (C::Cancellation, R::Transient),
            Self::StateConflict => (C::State, R::Permanent),
            Self::ConstructionError => (C::Construction, R::Permanent),
            Self::RejectedExecution => (C::Scheduling, R::Permanent),
            Self::InvalidConfig => (C::Configuration, R::Permanent),
            Self::Internal => (C::Internal, R::Permanent),
        }
    }

    /// The category this kind belongs to.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.classify().0
    }

    /// Whether retrying can help.
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.classify().1
    }

    /// Shorthand for a [`Recoverability::Transient`] kind.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.recoverability().should_retry()
    }

    /// The variant name, as printed by `Display` for [`Error`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ActionFailure => "ActionFailure",
            Self::JoinFailure => "JoinFailure",
            Self::Cancelled => "Cancelled",
            Self::Timeout => "Timeout",
            Self::StateConflict => "StateConflict",
            Self::ConstructionError => "ConstructionError",
            Self::RejectedExecution => "RejectedExecution",
            Self::InvalidConfig => "InvalidConfig",
            Self::Internal => "Internal",
        }
    }
}

impl Recoverability {
    /// True for [`Recoverability::Transient`].
    #[must_use]
    pub const fn should_retry(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// True for [`Recoverability::Permanent`].
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }
}

type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// A kind, an optional message and an optional underlying cause.
///
/// Cloning is cheap; the source is shared because a failure fans out to
/// every node downstream of where it happened.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<SharedSource>,
}

impl Error {
    /// An error of `kind` with no message.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    fn described(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind).with_message(message)
    }

    /// Replaces the message.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Records `source` as the underlying cause.
    #[must_use]
    pub fn with_source(self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Arc::new(source)),
            ..self
        }
    }

    /// Wraps whatever an action returned as its `Err`.
    #[must_use]
    pub fn action(source: BoxError) -> Self {
        Self {
            kind: ErrorKind::ActionFailure,
            message: Some(source.to_string()),
            source: Some(SharedSource::from(source)),
        }
    }

    /// Turns a caught panic into an action failure.
    #[must_use]
    pub fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_owned()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            String::from("non-string panic payload")
        };
        Self::described(ErrorKind::ActionFailure, format!("action panicked: {detail}"))
    }

    /// What `get()` returns for a node cancelled with `reason`.
    #[must_use]
    pub fn cancelled(reason: &CancelReason) -> Self {
        Self::described(ErrorKind::Cancelled, reason.to_string())
    }

    /// An illegal transition, described by `detail`.
    #[must_use]
    pub fn state_conflict(detail: impl Into<String>) -> Self {
        Self::described(ErrorKind::StateConflict, detail)
    }

    /// A chain that cannot be built.
    #[must_use]
    pub fn construction(detail: impl Into<String>) -> Self {
        Self::described(ErrorKind::ConstructionError, detail)
    }

    /// Submission to the ThreadType named `thread_type` after shutdown.
    #[must_use]
    pub fn rejected(thread_type: &str) -> Self {
        Self::described(
            ErrorKind::RejectedExecution,
            format!("thread type {thread_type} is shut down"),
        )
    }

    /// An invariant inside cascade did not hold.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::described(ErrorKind::Internal, detail)
    }

    /// The kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The message, if one was attached.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Category of [`Error::kind`].
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Recoverability of [`Error::kind`].
    #[must_use]
    pub const fn recoverability(&self) -> Recoverability {
        self.kind.recoverability()
    }

    /// Whether retrying can help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// True for [`ErrorKind::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// True for [`ErrorKind::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// True for [`ErrorKind::StateConflict`].
    #[must_use]
    pub const fn is_state_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::StateConflict)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.kind.name()),
            None => f.write_str(self.kind.name()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let source: &(dyn std::error::Error + 'static) = self.source.as_deref()?;
        Some(source)
    }
}

impl From<crate::runtime::ConfigError> for Error {
    fn from(e: crate::runtime::ConfigError) -> Self {
        Self::described(ErrorKind::InvalidConfig, e.to_string()).with_source(e)
    }
}

/// Adds caller context to an error on its way out.
///
/// The context is put in front of any message the error already has, so
/// `"loading settings: CASCADE_WORKER_THREADS ..."` keeps both parts.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Prefixes the error message with `context`.
    fn context(self, context: impl Into<String>) -> Result<T>;
    /// Like [`ResultExt::context`], building the text only on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.with_context(|| context.into())
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let error: Error = e.into();
            let context = f();
            let message = match error.message() {
                Some(existing) => format!("{context}: {existing}"),
                None => context,
            };
            error.with_message(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug)]
    struct DiskFull;

    impl fmt::Display for DiskFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk full")
        }
    }

    impl std::error::Error for DiskFull {}

    #[test]
    fn display_is_kind_then_message() {
        assert_eq!(Error::new(ErrorKind::Internal).to_string(), "Internal");
        assert_eq!(
            Error::state_conflict("fork called twice").to_string(),
            "StateConflict: fork called twice"
        );
    }

    #[test]
    fn join_failure_exposes_the_member_error() {
        let err = Error::new(ErrorKind::JoinFailure)
            .with_message("member 2 failed")
            .with_source(DiskFull);
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("disk full"));
    }

    #[test]
    fn action_error_keeps_source_and_message() {
        let err = Error::action(Box::new(DiskFull));
        assert_eq!(err.kind(), ErrorKind::ActionFailure);
        assert_eq!(err.message(), Some("disk full"));
        assert!(err.source().is_some());
    }

    #[test]
    fn panic_payloads_are_described() {
        let borrowed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            Error::panicked(borrowed.as_ref()).message(),
            Some("action panicked: boom")
        );

        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert_eq!(
            Error::panicked(owned.as_ref()).message(),
            Some("action panicked: owned boom")
        );

        let opaque: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        let err = Error::panicked(opaque.as_ref());
        assert_eq!(err.kind(), ErrorKind::ActionFailure);
        assert_eq!(err.message(), Some("action panicked: non-string panic payload"));
    }

    #[test]
    fn cancelled_error_carries_reason() {
        let err = Error::cancelled(&CancelReason::user("stop"));
        assert!(err.is_cancelled());
        assert_eq!(err.to_string(), "Cancelled: user: stop");
    }

    #[test]
    fn context_prefixes_existing_messages() {
        let bare: Result<()> = Err(Error::new(ErrorKind::Timeout));
        let err = bare.context("waiting for node").unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timeout: waiting for node");

        let described: Result<()> = Err(Error::rejected("io"));
        let err = described.with_context(|| "starting chain".into()).unwrap_err();
        assert_eq!(
            err.message(),
            Some("starting chain: thread type io is shut down")
        );
    }

    #[test]
    fn classification_follows_kind() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
        assert!(ErrorKind::StateConflict.recoverability().is_permanent());
        assert_eq!(ErrorKind::JoinFailure.recoverability(), Recoverability::Unknown);
        assert_eq!(
            ErrorKind::JoinFailure.category(),
            ErrorKind::ActionFailure.category()
        );
        assert_eq!(Error::rejected("worker").category(), ErrorCategory::Scheduling);
    }
}
