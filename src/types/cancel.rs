//! Why a node was cancelled.
//!
//! Cancellation is a state of its own, separate from failure. A cancelled
//! node never runs its action, and every node downstream of it ends up
//! cancelled with the same reason, so a reason is cloned once per node it
//! reaches.

use crate::error::Error;
use core::fmt;
use std::sync::Arc;

/// What caused a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CancelKind {
    /// `cancel` was called on the node or on one upstream of it.
    User,
    /// A `filter` predicate rejected the value.
    Filtered,
    /// An `on_error` handler took the failure and asked for cancellation.
    ErrorConsumed,
    /// The node's ThreadType stopped before the action could run.
    Shutdown,
}

impl CancelKind {
    /// Short lowercase label used in logs and `Display`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Filtered => "filtered",
            Self::ErrorConsumed => "error consumed",
            Self::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for CancelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A [`CancelKind`] plus optional free text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReason {
    kind: CancelKind,
    detail: Option<Arc<str>>,
}

impl CancelReason {
    /// A reason of `kind` with no text.
    #[must_use]
    pub const fn new(kind: CancelKind) -> Self {
        Self { kind, detail: None }
    }

    /// An explicit cancellation, described by `message`.
    #[must_use]
    pub fn user(message: impl Into<String>) -> Self {
        Self::new(CancelKind::User).with_message(message)
    }

    /// A value rejected by `filter`.
    #[must_use]
    pub const fn filtered() -> Self {
        Self::new(CancelKind::Filtered)
    }

    /// Recorded when an `on_error` handler swallows `error`; keeps its text.
    #[must_use]
    pub fn error_consumed(error: &Error) -> Self {
        Self::new(CancelKind::ErrorConsumed).with_message(error.to_string())
    }

    /// The ThreadType stopped first.
    #[must_use]
    pub const fn shutdown() -> Self {
        Self::new(CancelKind::Shutdown)
    }

    /// Replaces the text of this reason.
    #[must_use]
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let text: String = message.into();
        Self {
            detail: Some(Arc::from(text)),
            ..self
        }
    }

    /// What caused the cancellation.
    #[must_use]
    pub const fn kind(&self) -> CancelKind {
        self.kind
    }

    /// Free text, if any was attached.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl Default for CancelReason {
    fn default() -> Self {
        Self::new(CancelKind::User)
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(text) => write!(f, "{}: {text}", self.kind),
            None => fmt::Display::fmt(&self.kind, f),
        }
    }
}
