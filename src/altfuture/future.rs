//! The single-node alt-future handle.

use super::any::{AnyAltFuture, Status};
use super::chain::Chain;
use super::node::{Downchain, Erased, Link, Node, NodeSpec, Payload, Source};
use crate::error::Result;
use crate::observability::Origin;
use crate::runtime::ThreadType;
use crate::types::{CancelReason, Failure, NodeId};
use std::fmt;
use std::sync::Arc;

/// One node of a chain: receives `IN`, produces `OUT`.
///
/// Cloning the handle does not copy the node.
pub struct AltFuture<IN, OUT> {
    node: Arc<Node<IN, OUT>>,
}

impl<IN, OUT> Clone for AltFuture<IN, OUT> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<IN: Payload, OUT: Payload> AltFuture<IN, OUT> {
    pub(crate) fn from_node(node: Arc<Node<IN, OUT>>) -> Self {
        Self { node }
    }

    /// Builds a node from `spec` and subscribes it below `link`.
    pub(crate) fn attached(link: Link<IN>, spec: NodeSpec<IN, OUT>) -> Self {
        let node = spec.build();
        if let Err(error) = node.attach(link) {
            tracing::warn!(node = %node.id(), error = %error, "attaching new node failed");
        }
        Self { node }
    }

    pub(crate) const fn node(&self) -> &Arc<Node<IN, OUT>> {
        &self.node
    }

    /// Node identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Where the node was created.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.node.origin()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> Status {
        Erased::status(&*self.node)
    }

    /// The node this one receives values from, if any.
    #[must_use]
    pub fn upchain(&self) -> Option<AnyAltFuture> {
        Erased::upchain(&*self.node)
    }

    /// Subscribes this node below `upstream`.
    ///
    /// Only valid for nodes created without an upchain, such as
    /// [`ThreadType::detached`]; a second attachment is a `StateConflict`.
    /// If this node is already forked, `upstream` is forked too.
    pub fn set_upchain<C: Chain<IN>>(&self, upstream: &C) -> Result<()> {
        self.node.attach(upstream.link())
    }

    /// Delivers `value` as if it came from the upchain.
    pub fn receive(&self, value: IN) -> Result<()> {
        Downchain::receive(&*self.node, value)
    }

    /// Delivers an upstream failure to this node.
    pub fn do_on_error(&self, failure: Failure) -> Result<()> {
        Downchain::do_on_error(&*self.node, failure)
    }

    /// Delivers an upstream cancellation to this node.
    pub fn do_on_cancelled(&self, reason: CancelReason) -> Result<()> {
        Downchain::do_on_cancelled(&*self.node, reason)
    }
}

impl<IN: Payload, OUT: Payload> Chain<OUT> for AltFuture<IN, OUT> {
    fn link(&self) -> Link<OUT> {
        Link {
            source: Arc::clone(&self.node) as Arc<dyn Source<OUT>>,
            node: self.erased(),
        }
    }

    fn thread_type(&self) -> &ThreadType {
        Source::thread_type(&*self.node)
    }

    fn erased(&self) -> AnyAltFuture {
        AnyAltFuture(Arc::clone(&self.node) as Arc<dyn Erased>)
    }

    fn fork(&self) -> Result<()> {
        Erased::fork(&*self.node)
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        Erased::cancel(&*self.node, reason)
    }

    fn is_done(&self) -> bool {
        self.status().is_settled()
    }

    fn is_cancelled(&self) -> bool {
        self.status() == Status::Cancelled
    }

    fn is_forked(&self) -> bool {
        Erased::is_forked(&*self.node)
    }
}

impl<IN: Payload, OUT: Payload> From<AltFuture<IN, OUT>> for AnyAltFuture {
    fn from(future: AltFuture<IN, OUT>) -> Self {
        future.erased()
    }
}

impl<IN: Payload, OUT: Payload> fmt::Debug for AltFuture<IN, OUT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AltFuture")
            .field("id", &self.id())
            .field("origin", &self.origin())
            .field("status", &self.status())
            .field("thread_type", &Chain::thread_type(self).name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::init_test;
    use crate::types::CancelKind;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    #[test]
    fn map_chain_produces_value() {
        init_test("map_chain_produces_value");
        let tt = ThreadType::serial("future-map");
        let tail = tt.from(5).map(|n: i32| n + 1).map(|n| n * 2);
        tail.fork().unwrap();
        assert_eq!(tail.get_timeout(WAIT).unwrap(), 12);
        assert_eq!(tail.status(), Status::Completed);
        crate::test_complete!("map_chain_produces_value");
    }

    #[test]
    fn action_error_fails_downstream() {
        init_test("action_error_fails_downstream");
        let tt = ThreadType::serial("future-err");
        let head = tt.then(|| -> crate::error::ActionResult<i32> { Err("boom".into()) });
        let tail = head.map(|n| n + 1);
        tail.fork().unwrap();

        let err = tail.get_timeout(WAIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ActionFailure);
        crate::assert_outcome_err!(tail.outcome(), node = head.id());
        crate::test_complete!("action_error_fails_downstream");
    }

    #[test]
    fn filter_rejection_cancels() {
        init_test("filter_rejection_cancels");
        let tt = ThreadType::serial("future-filter");
        let tail = tt.from(3).filter(|n| *n > 10).map(|n| n * 2);
        tail.fork().unwrap();
        let err = tail.get_timeout(WAIT).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        crate::assert_outcome_cancelled!(tail.outcome(), CancelKind::Filtered);
        crate::test_complete!("filter_rejection_cancels");
    }

    #[test]
    fn set_upchain_twice_conflicts() {
        init_test("set_upchain_twice_conflicts");
        let tt = ThreadType::serial("future-upchain");
        let detached = tt.detached(|n: i32| Ok(n * 3));
        detached.set_upchain(&tt.from(1)).unwrap();
        let err = detached.set_upchain(&tt.from(2)).unwrap_err();
        assert!(err.is_state_conflict());

        detached.fork().unwrap();
        assert_eq!(detached.get_timeout(WAIT).unwrap(), 3);
        crate::test_complete!("set_upchain_twice_conflicts");
    }

    #[test]
    fn receive_runs_detached_node() {
        init_test("receive_runs_detached_node");
        let tt = ThreadType::serial("future-receive");
        let detached = tt.detached(|s: String| Ok(s.len()));
        detached.receive("four".to_string()).unwrap();
        assert_eq!(detached.get_timeout(WAIT).unwrap(), 4);
        crate::test_complete!("receive_runs_detached_node");
    }
}
