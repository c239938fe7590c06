//! The node state machine shared by every alt-future flavour.
//!
//! A node owns one state cell. The cell starts `Unforked`, may become
//! `Forked`, and settles exactly once into `Value`, `Failed` or `Cancelled`.
//! The cell and the downstream subscriber list share one mutex, so a
//! subscriber added while the node settles is either notified by the
//! settling thread or finds the terminal state and is delivered to
//! immediately. It is never missed or notified twice.
//!
//! Nothing user-supplied runs while the cell lock is held.
//!
//! # Ownership
//!
//! Upstream nodes hold their subscribers strongly until they settle and
//! drain the list; downstream nodes hold their upchain strongly. Holding the
//! tail of a chain therefore keeps the whole chain alive, and settling
//! breaks the cycle.

use super::any::{AnyAltFuture, Status};
use super::join::{JoinGate, Watch, Watcher};
use crate::error::{Error, ErrorKind, Result};
use crate::observability::{runtime_assert, state_conflict, Origin};
use crate::runtime::timer::deadline_after;
use crate::runtime::{CascadeConfig, ThreadType, TimerHandle};
use crate::types::{CancelReason, Failure, NodeId, Outcome};
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Values that can flow through a chain.
///
/// Values are cloned once per downstream subscriber and once per blocking
/// reader, so cheap clones (or `Arc`) are preferable for large payloads.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}

/// What a node's action produced.
pub(crate) enum Step<T> {
    Value(T),
    Fail(Error),
    Cancel(CancelReason),
}

pub(crate) type Action<IN, OUT> = Box<dyn FnOnce(IN) -> Step<OUT> + Send + 'static>;
pub(crate) type InputGuard<IN> = Box<dyn FnOnce(&IN) -> bool + Send + 'static>;
pub(crate) type ErrorHandler = Box<dyn FnOnce(&Failure) -> bool + Send + 'static>;
pub(crate) type CancelHandler = Box<dyn FnOnce(CancelReason) + Send + 'static>;

/// Receiving side of a chain link.
#[doc(hidden)]
pub trait Downchain<T>: Send + Sync {
    /// The upstream produced `value`.
    fn receive(&self, value: T) -> Result<()>;
    /// The upstream failed.
    fn do_on_error(&self, failure: Failure) -> Result<()>;
    /// The upstream was cancelled.
    fn do_on_cancelled(&self, reason: CancelReason) -> Result<()>;
}

/// Producing side of a chain link.
#[doc(hidden)]
pub trait Source<T>: Send + Sync {
    /// Registers a subscriber, delivering immediately if already settled.
    fn subscribe(&self, sink: Arc<dyn Downchain<T>>);
    /// ThreadType that runs this node.
    fn thread_type(&self) -> &ThreadType;
    /// Terminal outcome, if settled.
    fn snapshot(&self) -> Option<Outcome<T>>;
    /// Blocks until settled or the timeout elapses.
    fn wait_outcome(&self, timeout: Option<Duration>) -> Result<Outcome<T>>;
}

/// Type-erased node operations.
#[doc(hidden)]
pub trait Erased: Send + Sync {
    fn id(&self) -> NodeId;
    fn origin(&self) -> Origin;
    fn thread_type(&self) -> &ThreadType;
    fn status(&self) -> Status;
    fn is_forked(&self) -> bool;
    fn fork(&self) -> Result<()>;
    /// Forks unless already forked; never a conflict.
    fn ensure_forked(&self) -> Result<()>;
    fn cancel(&self, reason: CancelReason) -> bool;
    fn upchain(&self) -> Option<AnyAltFuture>;
    fn watch(&self, watcher: Arc<dyn Watcher>);
    fn wait_settled(&self, timeout: Option<Duration>) -> bool;
}

/// Operations a compound future forwards to its head.
#[doc(hidden)]
pub trait Head<IN>: Downchain<IN> + Erased {
    fn guard_input(&self, guard: InputGuard<IN>) -> Result<()>;
    fn set_upchain(&self, link: Link<IN>) -> Result<()>;
}

/// A typed, erased reference to a node that produces `T`.
#[doc(hidden)]
pub struct Link<T> {
    pub(crate) source: Arc<dyn Source<T>>,
    pub(crate) node: AnyAltFuture,
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            node: self.node.clone(),
        }
    }
}

enum State<T> {
    Unforked,
    Forked,
    Value(T),
    Failed(Failure),
    Cancelled(CancelReason),
}

impl<T: Clone> State<T> {
    const fn is_settled(&self) -> bool {
        matches!(self, Self::Value(_) | Self::Failed(_) | Self::Cancelled(_))
    }

    fn outcome(&self) -> Option<Outcome<T>> {
        match self {
            Self::Unforked | Self::Forked => None,
            Self::Value(v) => Some(Outcome::Ok(v.clone())),
            Self::Failed(f) => Some(Outcome::Err(f.clone())),
            Self::Cancelled(r) => Some(Outcome::Cancelled(r.clone())),
        }
    }

    const fn status(&self) -> Status {
        match self {
            Self::Unforked => Status::Unforked,
            Self::Forked => Status::Forked,
            Self::Value(_) => Status::Completed,
            Self::Failed(_) => Status::Failed,
            Self::Cancelled(_) => Status::Cancelled,
        }
    }
}

type Subscribers<T> = SmallVec<[Arc<dyn Downchain<T>>; 2]>;

struct Cell<T> {
    state: State<T>,
    downchain: Subscribers<T>,
}

/// Everything a node needs at construction time.
pub(crate) struct NodeSpec<IN, OUT> {
    thread_type: ThreadType,
    origin: Origin,
    action: Option<Action<IN, OUT>>,
    seed: Option<IN>,
    delay: Option<Duration>,
    on_error: Option<ErrorHandler>,
    on_cancelled: Option<CancelHandler>,
    join: Option<JoinGate>,
}

impl<IN: Payload, OUT: Payload> NodeSpec<IN, OUT> {
    pub(crate) fn new(thread_type: ThreadType, origin: Origin) -> Self {
        Self {
            thread_type,
            origin,
            action: None,
            seed: None,
            delay: None,
            on_error: None,
            on_cancelled: None,
            join: None,
        }
    }

    pub(crate) fn action(mut self, action: Action<IN, OUT>) -> Self {
        self.action = Some(action);
        self
    }

    pub(crate) fn seed(mut self, seed: IN) -> Self {
        self.seed = Some(seed);
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub(crate) fn on_cancelled(mut self, handler: CancelHandler) -> Self {
        self.on_cancelled = Some(handler);
        self
    }

    pub(crate) fn join(mut self, gate: JoinGate) -> Self {
        self.join = Some(gate);
        self
    }

    pub(crate) fn build(self) -> Arc<Node<IN, OUT>> {
        let id = NodeId::next();
        tracing::trace!(
            node = %id,
            origin = %self.origin,
            thread_type = %self.thread_type,
            "node created"
        );
        Arc::new_cyclic(|me| Node {
            id,
            origin: self.origin,
            me: me.clone(),
            thread_type: self.thread_type,
            cell: Mutex::new(Cell {
                state: State::Unforked,
                downchain: SmallVec::new(),
            }),
            settled: Condvar::new(),
            forked: AtomicBool::new(false),
            scheduled: AtomicBool::new(false),
            upchain: Mutex::new(None),
            input: Mutex::new(self.seed),
            action: Mutex::new(self.action),
            guard: Mutex::new(None),
            delay: self.delay,
            pending_timer: Mutex::new(None),
            on_error: Mutex::new(self.on_error),
            on_cancelled: Mutex::new(self.on_cancelled),
            join: self.join,
        })
    }
}

pub(crate) struct Node<IN, OUT> {
    id: NodeId,
    origin: Origin,
    me: Weak<Node<IN, OUT>>,
    thread_type: ThreadType,
    cell: Mutex<Cell<OUT>>,
    settled: Condvar,
    forked: AtomicBool,
    scheduled: AtomicBool,
    upchain: Mutex<Option<Link<IN>>>,
    /// Seed for head nodes, delivered value otherwise.
    input: Mutex<Option<IN>>,
    action: Mutex<Option<Action<IN, OUT>>>,
    guard: Mutex<Option<InputGuard<IN>>>,
    delay: Option<Duration>,
    pending_timer: Mutex<Option<TimerHandle>>,
    on_error: Mutex<Option<ErrorHandler>>,
    on_cancelled: Mutex<Option<CancelHandler>>,
    join: Option<JoinGate>,
}

impl<IN: Payload, OUT: Payload> Node<IN, OUT> {
    pub(crate) const fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) const fn origin(&self) -> Origin {
        self.origin
    }

    fn config(&self) -> &CascadeConfig {
        self.thread_type.config()
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.cell.lock().state.is_settled()
    }

    pub(crate) fn join_members(&self) -> &[AnyAltFuture] {
        self.join.as_ref().map_or(&[], JoinGate::members)
    }

    /// Links this node below `link` and subscribes to it.
    pub(crate) fn attach(&self, link: Link<IN>) -> Result<()> {
        let Some(me) = self.me.upgrade() else {
            return Err(Error::internal("node dropped while attaching"));
        };
        {
            let mut upchain = self.upchain.lock();
            if upchain.is_some() {
                return Err(Error::state_conflict(format!(
                    "node {} created at {} already has an upchain",
                    self.id, self.origin
                )));
            }
            *upchain = Some(link.clone());
        }
        link.source.subscribe(me);
        if self.forked.load(Ordering::Acquire) {
            link.node.ensure_forked()?;
        }
        Ok(())
    }

    /// Records the fork. Returns `Ok(true)` for the first fork.
    fn mark_forked(&self, lenient: bool) -> Result<bool> {
        let config = self.config();
        if !self.forked.swap(true, Ordering::AcqRel) {
            if config.strict_fork_checking {
                let mut cell = self.cell.lock();
                if matches!(cell.state, State::Unforked) {
                    cell.state = State::Forked;
                }
            }
            tracing::trace!(node = %self.id, origin = %self.origin, "forked");
            return Ok(true);
        }
        if lenient || !config.strict_fork_checking || config.idempotent_fork {
            return Ok(false);
        }
        state_conflict(config, self.origin, "fork() called on an already forked node")?;
        Ok(false)
    }

    fn fork_with(&self, lenient: bool) -> Result<()> {
        if self.mark_forked(lenient)? {
            self.activate()
        } else {
            Ok(())
        }
    }

    /// Makes a freshly forked node eligible to run.
    fn activate(&self) -> Result<()> {
        self.fork_members();
        let upchain = self.upchain.lock().clone();
        match upchain {
            Some(link) => link.node.ensure_forked(),
            None if self.input.lock().is_some() => self.schedule(),
            None => Ok(()),
        }
    }

    fn fork_members(&self) {
        for member in self.join_members() {
            if let Err(error) = member.ensure_forked() {
                tracing::warn!(node = %self.id, member = %member.id(), error = %error, "could not fork awaited node");
            }
        }
    }

    /// Queues the action once, honouring any delay.
    fn schedule(&self) -> Result<()> {
        if self.scheduled.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let Some(me) = self.me.upgrade() else {
            return Ok(());
        };
        let Some(delay) = self.delay else {
            return me.submit_run();
        };

        let handle = self.thread_type.timer().schedule(delay, move || {
            if let Err(error) = me.submit_run() {
                tracing::warn!(node = %me.id, error = %error, "delayed node could not be scheduled");
            }
        });
        *self.pending_timer.lock() = Some(handle);
        // A cancellation that raced with the store above must still stop the timer.
        if self.is_settled() {
            if let Some(handle) = self.pending_timer.lock().take() {
                handle.cancel();
            }
        }
        Ok(())
    }

    fn submit_run(self: &Arc<Self>) -> Result<()> {
        let me = Arc::clone(self);
        match self.thread_type.submit(move || me.run()) {
            Ok(_) => Ok(()),
            Err(error) => {
                self.settle(Step::Fail(error.clone()));
                Err(error)
            }
        }
    }

    fn run(&self) {
        if self.is_settled() {
            tracing::trace!(node = %self.id, origin = %self.origin, "node settled before running; action skipped");
            return;
        }
        let Some(input) = self.input.lock().take() else {
            self.settle(Step::Fail(Error::internal("node ran without an input value")));
            return;
        };
        let action = self.action.lock().take();
        let guard = self.guard.lock().take();

        let step = catch_unwind(AssertUnwindSafe(move || {
            if let Some(guard) = guard {
                if !guard(&input) {
                    return Step::Cancel(CancelReason::filtered());
                }
            }
            match action {
                Some(action) => action(input),
                None => Step::Fail(Error::internal("node has no action")),
            }
        }))
        .unwrap_or_else(|payload| Step::Fail(Error::panicked(payload.as_ref())));

        self.settle(step);
    }

    fn settle(&self, step: Step<OUT>) {
        let result = match step {
            Step::Value(value) => self.complete(value),
            Step::Fail(error) => self.fail(Failure::new(error, self.id, self.origin)),
            Step::Cancel(reason) => self.cancel_with(reason).1,
        };
        if let Err(error) = result {
            tracing::warn!(node = %self.id, origin = %self.origin, error = %error, "downstream notification failed");
        }
    }

    /// Settles with a value and hands it to every subscriber.
    pub(crate) fn complete(&self, value: OUT) -> Result<()> {
        self.try_complete(value).1
    }

    /// Like [`complete`](Self::complete), also reporting whether this call
    /// won the transition.
    pub(crate) fn try_complete(&self, value: OUT) -> (bool, Result<()>) {
        let subscribers = {
            let mut cell = self.cell.lock();
            if cell.state.is_settled() {
                drop(cell);
                tracing::debug!(node = %self.id, origin = %self.origin, "result discarded; node already settled");
                return (false, Ok(()));
            }
            cell.state = State::Value(value.clone());
            std::mem::take(&mut cell.downchain)
        };
        self.settled.notify_all();
        self.release_work();
        tracing::trace!(node = %self.id, origin = %self.origin, downstream = subscribers.len(), "completed");
        (true, forward(subscribers.as_slice(), |sink| sink.receive(value.clone())))
    }

    /// Settles with a failure and hands it to every subscriber.
    pub(crate) fn fail(&self, failure: Failure) -> Result<()> {
        self.try_fail(failure).1
    }

    /// Like [`fail`](Self::fail), also reporting whether this call won the
    /// transition.
    pub(crate) fn try_fail(&self, failure: Failure) -> (bool, Result<()>) {
        let subscribers = {
            let mut cell = self.cell.lock();
            if cell.state.is_settled() {
                drop(cell);
                tracing::debug!(node = %self.id, origin = %self.origin, "failure discarded; node already settled");
                return (false, Ok(()));
            }
            cell.state = State::Failed(failure.clone());
            std::mem::take(&mut cell.downchain)
        };
        self.settled.notify_all();
        self.release_work();

        if subscribers.is_empty() && self.config().log_uncaught_failures {
            tracing::error!(
                node = %self.id,
                origin = %self.origin,
                error = %failure.error(),
                raised_by = %failure.node(),
                raised_at = %failure.origin(),
                "uncaught failure at end of chain"
            );
        } else {
            tracing::debug!(node = %self.id, origin = %self.origin, error = %failure.error(), "failed");
        }
        (true, forward(subscribers.as_slice(), |sink| sink.do_on_error(failure.clone())))
    }

    /// Settles as cancelled. Returns whether this call won the transition
    /// and the first downstream error.
    pub(crate) fn cancel_with(&self, reason: CancelReason) -> (bool, Result<()>) {
        let subscribers = {
            let mut cell = self.cell.lock();
            if cell.state.is_settled() {
                drop(cell);
                tracing::debug!(node = %self.id, origin = %self.origin, reason = %reason, "cancellation lost; node already settled");
                return (false, Ok(()));
            }
            cell.state = State::Cancelled(reason.clone());
            std::mem::take(&mut cell.downchain)
        };
        self.settled.notify_all();
        if let Some(timer) = self.pending_timer.lock().take() {
            timer.cancel();
        }
        self.input.lock().take();
        self.action.lock().take();
        self.guard.lock().take();
        self.on_error.lock().take();

        if let Some(handler) = self.on_cancelled.lock().take() {
            let handler_reason = reason.clone();
            if let Err(error) = self.thread_type.submit(move || handler(handler_reason)) {
                tracing::warn!(node = %self.id, error = %error, "on_cancelled handler could not be scheduled");
            }
        }

        tracing::debug!(node = %self.id, origin = %self.origin, reason = %reason, downstream = subscribers.len(), "cancelled");
        let result = forward(subscribers.as_slice(), |sink| sink.do_on_cancelled(reason.clone()));
        (true, result)
    }

    /// Drops closures that can no longer run.
    fn release_work(&self) {
        self.input.lock().take();
        self.action.lock().take();
        self.guard.lock().take();
        self.on_error.lock().take();
        self.on_cancelled.lock().take();
        if let Some(timer) = self.pending_timer.lock().take() {
            timer.cancel();
        }
    }

    fn handle_error(&self, failure: Failure) -> Result<()> {
        if self.is_settled() {
            tracing::debug!(node = %self.id, origin = %self.origin, "failure arrived after node settled; ignored");
            return Ok(());
        }
        let Some(handler) = self.on_error.lock().take() else {
            return self.fail(failure);
        };
        let Some(me) = self.me.upgrade() else {
            return Ok(());
        };
        self.mark_forked(true)?;

        let fallback = failure.clone();
        let submitted = self.thread_type.submit(move || {
            let consumed = catch_unwind(AssertUnwindSafe(|| handler(&failure)));
            let result = match consumed {
                Ok(true) => me.cancel_with(CancelReason::error_consumed(failure.error())).1,
                Ok(false) => me.fail(failure),
                Err(payload) => me.fail(Failure::new(
                    Error::panicked(payload.as_ref()),
                    me.id,
                    me.origin,
                )),
            };
            if let Err(error) = result {
                tracing::warn!(node = %me.id, error = %error, "downstream notification failed");
            }
        });
        match submitted {
            Ok(_) => Ok(()),
            Err(error) => {
                self.fail(fallback)?;
                Err(error)
            }
        }
    }
}

impl<IN: Payload, OUT: Payload> Downchain<IN> for Node<IN, OUT> {
    fn receive(&self, value: IN) -> Result<()> {
        if self.is_settled() {
            tracing::debug!(node = %self.id, origin = %self.origin, "value arrived after node settled; dropped");
            return Ok(());
        }
        if self.mark_forked(true)? {
            self.fork_members();
        }
        *self.input.lock() = Some(value);
        match &self.join {
            Some(gate) if !gate.arrive() => Ok(()),
            _ => self.schedule(),
        }
    }

    fn do_on_error(&self, failure: Failure) -> Result<()> {
        self.handle_error(failure)
    }

    fn do_on_cancelled(&self, reason: CancelReason) -> Result<()> {
        self.cancel_with(reason).1
    }
}

impl<IN: Payload, OUT: Payload> Source<OUT> for Node<IN, OUT> {
    fn subscribe(&self, sink: Arc<dyn Downchain<OUT>>) {
        let settled = {
            let mut cell = self.cell.lock();
            let outcome = cell.state.outcome();
            if outcome.is_none() {
                cell.downchain.push(sink);
                return;
            }
            outcome
        };

        tracing::trace!(node = %self.id, origin = %self.origin, "subscriber attached after settle; delivering now");
        let result = match settled {
            Some(Outcome::Ok(value)) => sink.receive(value),
            Some(Outcome::Err(failure)) => sink.do_on_error(failure),
            Some(Outcome::Cancelled(reason)) => sink.do_on_cancelled(reason),
            None => Ok(()),
        };
        if let Err(error) = result {
            tracing::warn!(node = %self.id, error = %error, "late subscriber notification failed");
        }
    }

    fn thread_type(&self) -> &ThreadType {
        &self.thread_type
    }

    fn snapshot(&self) -> Option<Outcome<OUT>> {
        self.cell.lock().state.outcome()
    }

    fn wait_outcome(&self, timeout: Option<Duration>) -> Result<Outcome<OUT>> {
        if let Some(outcome) = self.snapshot() {
            return Ok(outcome);
        }
        if self.thread_type.is_serial() && self.thread_type.is_current_thread() {
            runtime_assert(
                self.config(),
                false,
                "get() on an unsettled node from its own serial thread",
            )?;
            return Err(Error::state_conflict(format!(
                "get() on node {} from its own serial thread type {} would deadlock",
                self.id, self.thread_type
            )));
        }

        // An unrepresentable deadline waits without one.
        let deadline = timeout.and_then(deadline_after);
        let mut cell = self.cell.lock();
        loop {
            if let Some(outcome) = cell.state.outcome() {
                return Ok(outcome);
            }
            match deadline {
                Some(deadline) => {
                    if self.settled.wait_until(&mut cell, deadline).timed_out() {
                        return cell.state.outcome().ok_or_else(|| {
                            Error::new(ErrorKind::Timeout)
                                .with_message(format!("node {} did not settle in time", self.id))
                        });
                    }
                }
                None => self.settled.wait(&mut cell),
            }
        }
    }
}

impl<IN: Payload, OUT: Payload> Erased for Node<IN, OUT> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn origin(&self) -> Origin {
        self.origin
    }

    fn thread_type(&self) -> &ThreadType {
        &self.thread_type
    }

    fn status(&self) -> Status {
        self.cell.lock().state.status()
    }

    fn is_forked(&self) -> bool {
        self.forked.load(Ordering::Acquire)
    }

    fn fork(&self) -> Result<()> {
        self.fork_with(false)
    }

    fn ensure_forked(&self) -> Result<()> {
        self.fork_with(true)
    }

    fn cancel(&self, reason: CancelReason) -> bool {
        let (won, result) = self.cancel_with(reason);
        if let Err(error) = result {
            tracing::warn!(node = %self.id, origin = %self.origin, error = %error, "cancellation fan-out reported an error");
        }
        won
    }

    fn upchain(&self) -> Option<AnyAltFuture> {
        self.upchain.lock().as_ref().map(|link| link.node.clone())
    }

    fn watch(&self, watcher: Arc<dyn Watcher>) {
        self.subscribe(Arc::new(Watch::new(self.id, self.origin, watcher)));
    }

    fn wait_settled(&self, timeout: Option<Duration>) -> bool {
        self.wait_outcome(timeout).is_ok()
    }
}

impl<IN: Payload, OUT: Payload> Head<IN> for Node<IN, OUT> {
    fn guard_input(&self, guard: InputGuard<IN>) -> Result<()> {
        if self.scheduled.load(Ordering::Acquire) || self.is_settled() {
            return Err(Error::state_conflict(format!(
                "node {} created at {} already started; its input can no longer be filtered",
                self.id, self.origin
            )));
        }
        let mut slot = self.guard.lock();
        if slot.is_some() {
            return Err(Error::state_conflict(format!(
                "node {} already has an input filter",
                self.id
            )));
        }
        *slot = Some(guard);
        Ok(())
    }

    fn set_upchain(&self, link: Link<IN>) -> Result<()> {
        self.attach(link)
    }
}

impl<IN: Payload, OUT: Payload> Watcher for Node<IN, OUT> {
    fn member_settled(&self, member: NodeId, origin: Origin, outcome: Outcome<()>) {
        let Some(gate) = &self.join else {
            return;
        };
        let result = match outcome {
            Outcome::Ok(()) => {
                if gate.arrive() {
                    self.schedule()
                } else {
                    Ok(())
                }
            }
            Outcome::Err(failure) => {
                let error = Error::new(ErrorKind::JoinFailure)
                    .with_message(format!("awaited node {member} failed: {}", failure.error()))
                    .with_source(failure.into_error());
                self.fail(Failure::new(error, member, origin))
            }
            Outcome::Cancelled(reason) => self.cancel_with(reason).1,
        };
        if let Err(error) = result {
            tracing::warn!(node = %self.id, member = %member, error = %error, "join notification failed");
        }
    }
}

/// Notifies every subscriber, returning the first error.
///
/// Later errors are logged; every subscriber is notified regardless.
fn forward<T>(
    subscribers: &[Arc<dyn Downchain<T>>],
    mut notify: impl FnMut(&dyn Downchain<T>) -> Result<()>,
) -> Result<()> {
    let mut first: Option<Error> = None;
    for sink in subscribers {
        if let Err(error) = notify(sink.as_ref()) {
            if first.is_none() {
                first = Some(error);
            } else {
                tracing::warn!(error = %error, "additional downstream notification failed");
            }
        }
    }
    first.map_or(Ok(()), Err)
}
