//! A node settled from outside the chain.

use super::any::{AnyAltFuture, Status};
use super::chain::Chain;
use super::future::AltFuture;
use super::node::{Erased, Link, NodeSpec, Payload, Step};
use crate::error::{Error, Result};
use crate::observability::{state_conflict, Origin};
use crate::runtime::ThreadType;
use crate::types::{CancelReason, Failure, NodeId};
use std::fmt;

/// A head node whose value is supplied by [`set`](Self::set).
///
/// Downstream nodes run when the value arrives. Setting forks the node,
/// so a chain hanging off a settable never needs an explicit fork unless
/// it awaits other work.
pub struct SettableAltFuture<T> {
    inner: AltFuture<T, T>,
}

impl<T> Clone for SettableAltFuture<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Payload> SettableAltFuture<T> {
    pub(crate) fn new(thread_type: ThreadType, origin: Origin) -> Self {
        let node = NodeSpec::new(thread_type, origin)
            .action(Box::new(Step::Value))
            .build();
        Self {
            inner: AltFuture::from_node(node),
        }
    }

    /// Settles with `value` and notifies downstream.
    ///
    /// Setting a node that already settled, including losing a race with a
    /// concurrent `set`, is a state conflict: an error under `fail_fast`,
    /// otherwise logged and ignored.
    pub fn set(&self, value: T) -> Result<()> {
        let node = self.inner.node();
        node.ensure_forked()?;
        let (won, delivered) = node.try_complete(value);
        if !won {
            return self.conflict("set() on an already settled node");
        }
        delivered
    }

    /// Settles with `error` raised by this node. Conflicts like [`set`](Self::set).
    pub fn set_error(&self, error: Error) -> Result<()> {
        let node = self.inner.node();
        node.ensure_forked()?;
        let (won, delivered) = node.try_fail(Failure::new(error, node.id(), node.origin()));
        if !won {
            return self.conflict("set_error() on an already settled node");
        }
        delivered
    }

    fn conflict(&self, what: &str) -> Result<()> {
        let config = Chain::thread_type(&self.inner).config();
        state_conflict(config, self.inner.node().origin(), what)
    }

    /// The underlying node.
    #[must_use]
    pub const fn future(&self) -> &AltFuture<T, T> {
        &self.inner
    }

    /// Node identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.status()
    }
}

impl<T: Payload> Chain<T> for SettableAltFuture<T> {
    fn link(&self) -> Link<T> {
        self.inner.link()
    }

    fn thread_type(&self) -> &ThreadType {
        Chain::thread_type(&self.inner)
    }

    fn erased(&self) -> AnyAltFuture {
        self.inner.erased()
    }

    fn fork(&self) -> Result<()> {
        self.inner.fork()
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        self.inner.cancel(reason)
    }

    fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    fn is_forked(&self) -> bool {
        self.inner.is_forked()
    }
}

impl<T: Payload> fmt::Debug for SettableAltFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettableAltFuture")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
