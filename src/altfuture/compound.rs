//! A subchain presented as one node.
//!
//! A [`CompoundAltFuture`] wraps an existing `head -> ... -> tail` run of
//! nodes. It owns no state of its own: lifecycle operations go to the head,
//! results and downstream attachment go to the tail, and cancellation goes
//! to the first subchain node that is still live.
//!
//! The head must not have an upchain yet. Attaching the compound below
//! another chain with [`set_upchain`](CompoundAltFuture::set_upchain)
//! feeds the whole subchain.

use super::any::AnyAltFuture;
use super::chain::Chain;
use super::future::AltFuture;
use super::node::{Head, Link, Payload};
use crate::error::{Error, Result};
use crate::runtime::ThreadType;
use crate::types::{CancelReason, Failure};
use std::fmt;
use std::sync::Arc;

/// A `head -> ... -> tail` subchain used as a single node.
pub struct CompoundAltFuture<IN, OUT> {
    head: Arc<dyn Head<IN>>,
    head_erased: AnyAltFuture,
    tail: Link<OUT>,
    /// Head first, tail last.
    subchain: Vec<AnyAltFuture>,
}

impl<IN, OUT> Clone for CompoundAltFuture<IN, OUT> {
    fn clone(&self) -> Self {
        Self {
            head: Arc::clone(&self.head),
            head_erased: self.head_erased.clone(),
            tail: self.tail.clone(),
            subchain: self.subchain.clone(),
        }
    }
}

impl<IN: Payload, OUT: Payload> CompoundAltFuture<IN, OUT> {
    /// Wraps the subchain from `head` to `tail`.
    ///
    /// Fails with `ConstructionError` if `head` already has an upchain,
    /// if `head` and `tail` are the same node, or if `tail` is not
    /// downstream of `head`.
    pub fn new<M, C>(head: &AltFuture<IN, M>, tail: &C) -> Result<Self>
    where
        M: Payload,
        C: Chain<OUT>,
    {
        let head_erased = head.erased();
        let tail_erased = tail.erased();

        if head_erased.upchain().is_some() {
            return Err(Error::construction(format!(
                "compound head {} created at {} already has an upchain",
                head_erased.id(),
                head_erased.origin()
            )));
        }
        if head_erased.id() == tail_erased.id() {
            return Err(Error::construction(format!(
                "compound head and tail are the same node {}",
                head_erased.id()
            )));
        }

        let mut subchain = vec![tail_erased.clone()];
        let mut cursor = tail_erased.upchain();
        loop {
            let Some(node) = cursor else {
                return Err(Error::construction(format!(
                    "tail {} is not downstream of head {}",
                    tail_erased.id(),
                    head_erased.id()
                )));
            };
            let reached_head = node.id() == head_erased.id();
            cursor = node.upchain();
            subchain.push(node);
            if reached_head {
                break;
            }
        }
        subchain.reverse();

        tracing::trace!(
            head = %head_erased.id(),
            tail = %tail_erased.id(),
            nodes = subchain.len(),
            "compound created"
        );

        Ok(Self {
            head: Arc::clone(head.node()) as Arc<dyn Head<IN>>,
            head_erased,
            tail: tail.link(),
            subchain,
        })
    }

    /// Guards the head's input: a rejected input cancels the head with
    /// [`CancelKind::Filtered`](crate::types::CancelKind::Filtered).
    ///
    /// Shadows [`Chain::filter`], which filters the tail's output. Fails
    /// with `StateConflict` once the head has started or already has a
    /// guard.
    pub fn filter<F>(&self, predicate: F) -> Result<&Self>
    where
        F: FnOnce(&IN) -> bool + Send + 'static,
    {
        self.head.guard_input(Box::new(predicate))?;
        Ok(self)
    }

    /// Subscribes the head below `upstream`.
    pub fn set_upchain<C: Chain<IN>>(&self, upstream: &C) -> Result<()> {
        self.head.set_upchain(upstream.link())
    }

    /// The head's upchain, if attached.
    #[must_use]
    pub fn upchain(&self) -> Option<AnyAltFuture> {
        self.head_erased.upchain()
    }

    /// Delivers an input value to the head.
    pub fn receive(&self, value: IN) -> Result<()> {
        self.head.receive(value)
    }

    /// Delivers an upstream failure to the head.
    pub fn do_on_error(&self, failure: Failure) -> Result<()> {
        self.head.do_on_error(failure)
    }

    /// Delivers an upstream cancellation to the head.
    pub fn do_on_cancelled(&self, reason: CancelReason) -> Result<()> {
        self.head.do_on_cancelled(reason)
    }

    /// The wrapped nodes, head first.
    #[must_use]
    pub fn subchain(&self) -> &[AnyAltFuture] {
        &self.subchain
    }
}

impl<IN: Payload, OUT: Payload> Chain<OUT> for CompoundAltFuture<IN, OUT> {
    fn link(&self) -> Link<OUT> {
        self.tail.clone()
    }

    fn thread_type(&self) -> &ThreadType {
        self.head_erased.thread_type()
    }

    fn erased(&self) -> AnyAltFuture {
        self.tail.node.clone()
    }

    fn fork(&self) -> Result<()> {
        self.head_erased.fork()
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        self.subchain
            .iter()
            .any(|node| node.cancel(reason.clone()))
    }

    fn is_done(&self) -> bool {
        self.tail.node.is_done()
    }

    fn is_cancelled(&self) -> bool {
        self.subchain.iter().any(AnyAltFuture::is_cancelled)
    }

    fn is_forked(&self) -> bool {
        self.head_erased.is_forked()
    }
}

impl<IN: Payload, OUT: Payload> fmt::Debug for CompoundAltFuture<IN, OUT> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompoundAltFuture")
            .field("head", &self.head_erased.id())
            .field("tail", &self.tail.node.id())
            .field("nodes", &self.subchain.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::init_test;
    use std::time::Duration;

    #[test]
    fn walks_subchain_in_order() {
        init_test("walks_subchain_in_order");
        let tt = ThreadType::serial("compound-walk");
        let head = tt.detached(|n: i32| Ok(n + 1));
        let middle = head.map(|n| n * 2);
        let tail = middle.map(|n| n.to_string());
        let compound = CompoundAltFuture::new(&head, &tail).unwrap();

        let ids: Vec<_> = compound.subchain().iter().map(AnyAltFuture::id).collect();
        assert_eq!(ids, vec![head.id(), middle.id(), tail.id()]);
        crate::test_complete!("walks_subchain_in_order");
    }

    #[test]
    fn rejects_invalid_subchains() {
        init_test("rejects_invalid_subchains");
        let tt = ThreadType::serial("compound-invalid");
        let head = tt.detached(|n: i32| Ok(n));
        let err = CompoundAltFuture::<i32, i32>::new(&head, &head).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionError);

        let unrelated = tt.from(1).map(|n| n);
        let err = CompoundAltFuture::new(&head, &unrelated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionError);

        let attached = tt.from(1);
        let below = attached.map(|n| n + 1);
        let tail = below.map(|n| n + 1);
        let err = CompoundAltFuture::new(&below, &tail).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstructionError);
        crate::test_complete!("rejects_invalid_subchains");
    }

    #[test]
    fn feeds_through_set_upchain() {
        init_test("feeds_through_set_upchain");
        let tt = ThreadType::serial("compound-feed");
        let head = tt.detached(|n: i32| Ok(n + 1));
        let tail = head.map(|n| n * 3);
        let compound = CompoundAltFuture::new(&head, &tail).unwrap();

        compound.set_upchain(&tt.from(4)).unwrap();
        assert!(compound.upchain().is_some());
        compound.fork().unwrap();
        assert_eq!(compound.get_timeout(Duration::from_secs(2)).unwrap(), 15);
        assert!(compound.is_done());
        crate::test_complete!("feeds_through_set_upchain");
    }
}
