//! The combinator surface shared by every alt-future flavour.
//!
//! Each combinator creates one new node subscribed to this chain's
//! attach point and running on the attach point's ThreadType (except
//! [`Chain::on`], which names its own). Nothing runs until some node in
//! the chain is forked.

use super::any::AnyAltFuture;
use super::future::AltFuture;
use super::join::JoinGate;
use super::node::{Link, NodeSpec, Payload, Step};
use crate::error::{ActionResult, Error, Result};
use crate::observability::Origin;
use crate::reactive::ReactiveTarget;
use crate::runtime::ThreadType;
use crate::types::{CancelReason, Failure, Outcome};
use std::sync::Arc;
use std::time::Duration;

/// Operations on a chain producing `T`.
pub trait Chain<T: Payload> {
    /// Where downstream nodes subscribe.
    #[doc(hidden)]
    fn link(&self) -> Link<T>;

    /// ThreadType new downstream nodes inherit.
    fn thread_type(&self) -> &ThreadType;

    /// The node representing this chain's completion.
    fn erased(&self) -> AnyAltFuture;

    /// Forks the chain: every upstream node is forked and heads start.
    fn fork(&self) -> Result<()>;

    /// Cancels the chain. Returns false if nothing was left to cancel.
    fn cancel(&self, reason: CancelReason) -> bool;

    /// True once settled.
    fn is_done(&self) -> bool;

    /// True if settled as cancelled.
    fn is_cancelled(&self) -> bool;

    /// True once forked.
    fn is_forked(&self) -> bool;

    /// Runs `f` on the upstream value; an `Err` fails the new node.
    #[track_caller]
    fn then<R, F>(&self, f: F) -> AltFuture<T, R>
    where
        R: Payload,
        F: FnOnce(T) -> ActionResult<R> + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here()).action(
            Box::new(move |input| match f(input) {
                Ok(value) => Step::Value(value),
                Err(source) => Step::Fail(Error::action(source)),
            }),
        );
        AltFuture::attached(link, spec)
    }

    /// Transforms the upstream value.
    #[track_caller]
    fn map<R, F>(&self, f: F) -> AltFuture<T, R>
    where
        R: Payload,
        F: FnOnce(T) -> R + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here())
            .action(Box::new(move |input| Step::Value(f(input))));
        AltFuture::attached(link, spec)
    }

    /// Passes the value on if `predicate` holds, otherwise cancels with
    /// [`CancelKind::Filtered`](crate::types::CancelKind::Filtered).
    #[track_caller]
    fn filter<F>(&self, predicate: F) -> AltFuture<T, T>
    where
        F: FnOnce(&T) -> bool + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here()).action(
            Box::new(move |input| {
                if predicate(&input) {
                    Step::Value(input)
                } else {
                    Step::Cancel(CancelReason::filtered())
                }
            }),
        );
        AltFuture::attached(link, spec)
    }

    /// Passes the value on, continuing on `thread_type`.
    #[track_caller]
    fn on(&self, thread_type: &ThreadType) -> AltFuture<T, T> {
        let spec = NodeSpec::new(thread_type.clone(), Origin::here()).action(Box::new(Step::Value));
        AltFuture::attached(self.link(), spec)
    }

    /// Passes the value on after `delay`. Holds no thread while waiting.
    #[track_caller]
    fn sleep(&self, delay: Duration) -> AltFuture<T, T> {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here())
            .delay(delay)
            .action(Box::new(Step::Value));
        AltFuture::attached(link, spec)
    }

    /// Passes the upstream value on once every one of `others` completed.
    ///
    /// Forking this node forks the members. The first member failure fails
    /// it with a `JoinFailure` naming that member; a member cancellation
    /// cancels it with the member's reason.
    #[track_caller]
    fn await_all<I>(&self, others: I) -> AltFuture<T, T>
    where
        I: IntoIterator<Item = AnyAltFuture>,
    {
        let link = self.link();
        let members: Vec<AnyAltFuture> = others.into_iter().collect();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here())
            .action(Box::new(Step::Value))
            .join(JoinGate::new(members.clone()));
        let joined = AltFuture::attached(link, spec);
        let watcher: Arc<dyn super::join::Watcher> = joined.node().clone();
        for member in &members {
            member.0.watch(Arc::clone(&watcher));
        }
        joined
    }

    /// Handles an upstream failure.
    ///
    /// `handler` runs on this chain's ThreadType. Returning true consumes
    /// the failure and cancels downstream with
    /// [`CancelKind::ErrorConsumed`](crate::types::CancelKind::ErrorConsumed);
    /// false passes the failure on. Values pass through untouched.
    #[track_caller]
    fn on_error<F>(&self, handler: F) -> AltFuture<T, T>
    where
        F: FnOnce(&Failure) -> bool + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here())
            .action(Box::new(Step::Value))
            .on_error(Box::new(handler));
        AltFuture::attached(link, spec)
    }

    /// Runs `handler` with the reason if this point of the chain is cancelled.
    #[track_caller]
    fn on_cancelled<F>(&self, handler: F) -> AltFuture<T, T>
    where
        F: FnOnce(CancelReason) + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here())
            .action(Box::new(Step::Value))
            .on_cancelled(Box::new(handler));
        AltFuture::attached(link, spec)
    }

    /// Writes the value into `target`, then passes it on.
    #[track_caller]
    fn set_target<R>(&self, target: R) -> AltFuture<T, T>
    where
        R: ReactiveTarget<T> + Send + 'static,
    {
        let link = self.link();
        let spec = NodeSpec::new(link.source.thread_type().clone(), Origin::here()).action(
            Box::new(move |input: T| {
                target.set(input.clone());
                Step::Value(input)
            }),
        );
        AltFuture::attached(link, spec)
    }

    /// Blocks until settled and returns the value.
    ///
    /// Failures return the underlying error; cancellation returns a
    /// `Cancelled` error. Calling this from the chain's own serial
    /// ThreadType before it settles is a `StateConflict`.
    fn get(&self) -> Result<T> {
        self.link().source.wait_outcome(None)?.into_result()
    }

    /// [`get`](Self::get) with a deadline; elapsing returns `Timeout`.
    fn get_timeout(&self, timeout: Duration) -> Result<T> {
        self.link().source.wait_outcome(Some(timeout))?.into_result()
    }

    /// [`get`](Self::get), logging and discarding any error.
    fn safe_get(&self) -> Option<T> {
        match self.get() {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(error = %error, "safe_get returned no value");
                None
            }
        }
    }

    /// The terminal outcome, if settled. Never blocks.
    fn outcome(&self) -> Option<Outcome<T>> {
        self.link().source.snapshot()
    }
}
