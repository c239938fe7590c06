//! Type-erased handles to alt-futures.

use super::node::Erased;
use crate::error::Result;
use crate::observability::Origin;
use crate::runtime::ThreadType;
use crate::types::{CancelReason, NodeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Observable lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Created, not yet forked (also while running when fork checking is lenient).
    Unforked,
    /// Forked and waiting for input or running.
    Forked,
    /// Settled with a value.
    Completed,
    /// Settled with a failure.
    Failed,
    /// Settled as cancelled.
    Cancelled,
}

impl Status {
    /// True for the three terminal states.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A node of any input and output type.
///
/// Used where chains of different types meet: `await_all` members,
/// compound subchains and upchain walks.
#[derive(Clone)]
pub struct AnyAltFuture(pub(crate) Arc<dyn Erased>);

impl AnyAltFuture {
    /// Node identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.0.id()
    }

    /// Where the node was created.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.0.origin()
    }

    /// ThreadType the node runs on.
    #[must_use]
    pub fn thread_type(&self) -> &ThreadType {
        self.0.thread_type()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status()
    }

    /// True once settled.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status().is_settled()
    }

    /// True if settled as cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }

    /// True once forked.
    #[must_use]
    pub fn is_forked(&self) -> bool {
        self.0.is_forked()
    }

    /// Forks the node and everything upstream of it.
    pub fn fork(&self) -> Result<()> {
        self.0.fork()
    }

    pub(crate) fn ensure_forked(&self) -> Result<()> {
        self.0.ensure_forked()
    }

    /// Cancels the node. Returns false if it had already settled.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.0.cancel(reason)
    }

    /// The node this one receives values from.
    #[must_use]
    pub fn upchain(&self) -> Option<Self> {
        self.0.upchain()
    }

    /// Blocks until settled. Returns false on timeout.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        self.0.wait_settled(Some(timeout))
    }
}

impl PartialEq for AnyAltFuture {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for AnyAltFuture {}

impl fmt::Debug for AnyAltFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyAltFuture")
            .field("id", &self.id())
            .field("origin", &self.origin())
            .field("status", &self.status())
            .finish()
    }
}
