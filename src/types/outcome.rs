//! Three-valued outcome of a settled alt-future.
//!
//! - `Ok(T)`: the node produced a value
//! - `Err(Failure)`: the node, or a node upstream of it, failed
//! - `Cancelled(CancelReason)`: the node was cancelled
//!
//! A [`Failure`] remembers which node actually failed and where that node
//! was created, so a failure observed at the end of a long chain still
//! points at its origin.

use super::cancel::CancelReason;
use super::id::NodeId;
use crate::error::{Error, Result};
use crate::observability::Origin;
use core::fmt;

/// A failure travelling down a chain.
#[derive(Debug, Clone)]
pub struct Failure {
    error: Error,
    node: NodeId,
    origin: Origin,
}

impl Failure {
    /// Creates a failure raised by `node`.
    #[must_use]
    pub const fn new(error: Error, node: NodeId, origin: Origin) -> Self {
        Self {
            error,
            node,
            origin,
        }
    }

    /// Returns the error.
    #[must_use]
    pub const fn error(&self) -> &Error {
        &self.error
    }

    /// Consumes the failure, returning the error.
    #[must_use]
    pub fn into_error(self) -> Error {
        self.error
    }

    /// Returns the id of the node whose action failed.
    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    /// Returns where the failing node was created.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raised by {} at {})", self.error, self.node, self.origin)
    }
}

/// The outcome of a settled node.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// The node produced a value.
    Ok(T),
    /// The node failed.
    Err(Failure),
    /// The node was cancelled.
    Cancelled(CancelReason),
}

impl<T> Outcome<T> {
    /// The node produced a value.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The node, or one upstream of it, failed.
    #[must_use]
    pub const fn is_err(&self) -> bool {
        matches!(self, Self::Err(_))
    }

    /// The node was cancelled or filtered out.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Converts into a `Result`, mapping cancellation to [`ErrorKind::Cancelled`].
    ///
    /// [`ErrorKind::Cancelled`]: crate::error::ErrorKind::Cancelled
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Err(failure) => Err(failure.into_error()),
            Self::Cancelled(reason) => Err(Error::cancelled(&reason)),
        }
    }

    /// Maps the success value.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Err(failure) => Outcome::Err(failure),
            Self::Cancelled(reason) => Outcome::Cancelled(reason),
        }
    }

    /// Returns the value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Ok(v) => v,
            _ => default,
        }
    }

    /// Returns the failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Err(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub const fn cancel_reason(&self) -> Option<&CancelReason> {
        match self {
            Self::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }
}
