//! Worker pool backing a [`ThreadType`](super::ThreadType).
//!
//! Each ThreadType owns one pool of OS threads fed by a FIFO queue. The pool
//! supports:
//!
//! - **Capacity management**: `min..=max` threads with lazy scaling
//! - **Ordering**: FIFO admission; a one-thread pool executes strictly FIFO
//! - **In-flight accounting**: every submission is counted until it finishes,
//!   is skipped, or panics, and callers can wait for quiescence
//! - **Double queue**: a pool may name a fallback pool whose queue its
//!   threads drain whenever their own queue is empty
//! - **Shutdown**: new work is rejected, queued work still drains
//!
//! # Design
//!
//! Threads are spawned lazily up to `max_threads` when queued work
//! outnumbers idle threads. Threads above `min_threads` retire after the idle timeout. Jobs are
//! run under `catch_unwind`, so a panicking action never takes a worker
//! down with it.
//!
//! A thread-local records which ThreadType the current thread is working
//! for. It is set per job, so a serial thread helping its fallback pool
//! reports the fallback's ThreadType while it runs the borrowed job.

use crate::error::{Error, Result};
use crate::types::ThreadTypeId;
use crossbeam_queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{fence, AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle as ThreadJoinHandle};
use std::time::{Duration, Instant};

use super::config::{DEFAULT_IDLE_TIMEOUT, DEFAULT_THREAD_NAME_PREFIX};
use super::timer::deadline_after;

/// How often a double-queue thread re-checks its fallback queue while idle.
const FALLBACK_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How often `shutdown_and_wait` re-checks for exited threads.
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(5);

thread_local! {
    static CURRENT_THREAD_TYPE: Cell<Option<ThreadTypeId>> = const { Cell::new(None) };
}

/// Returns the ThreadType the calling thread is currently working for.
#[must_use]
pub(crate) fn current_thread_type() -> Option<ThreadTypeId> {
    CURRENT_THREAD_TYPE.with(Cell::get)
}

/// A cloneable handle to a worker pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.inner.name)
            .field("min_threads", &self.inner.min_threads)
            .field("max_threads", &self.inner.max_threads)
            .field(
                "active_threads",
                &self.inner.active_threads.load(Ordering::Relaxed),
            )
            .field("pending", &self.inner.pending_count.load(Ordering::Relaxed))
            .field("in_flight", &self.inner.in_flight.load(Ordering::Relaxed))
            .field("double_queue", &self.inner.fallback.is_some())
            .finish()
    }
}

struct PoolInner {
    /// ThreadType this pool works for.
    owner: ThreadTypeId,
    /// ThreadType name, used in thread names and logs.
    name: String,
    min_threads: usize,
    max_threads: usize,
    /// Live threads.
    active_threads: AtomicUsize,
    /// Threads currently running a job.
    busy_threads: AtomicUsize,
    /// Jobs sitting in the queue.
    pending_count: AtomicUsize,
    /// Jobs submitted and not yet finished.
    in_flight: AtomicUsize,
    next_task_id: AtomicU64,
    next_thread_index: AtomicUsize,
    queue: SegQueue<Job>,
    /// Queue drained when our own queue is empty.
    fallback: Option<Arc<PoolInner>>,
    shutdown: AtomicBool,
    /// Signals new work and shutdown to parked threads.
    condvar: Condvar,
    /// Signals `in_flight` reaching zero.
    quiescent: Condvar,
    mutex: Mutex<()>,
    idle_timeout: Duration,
    thread_name_prefix: String,
    on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
    thread_handles: Mutex<Vec<ThreadJoinHandle<()>>>,
}

struct Job {
    id: u64,
    work: Box<dyn FnOnce() + Send + 'static>,
    cancelled: Arc<AtomicBool>,
    completion: Arc<Completion>,
}

/// Completion tracking for a submitted job.
struct Completion {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl Completion {
    fn new() -> Self {
        Self {
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn signal_done(&self) {
        let mut done = self.done.lock();
        *done = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.condvar.wait(&mut done);
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = deadline_after(timeout) else {
            self.wait();
            return true;
        };
        let mut done = self.done.lock();
        while !*done {
            if self.condvar.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }

    fn is_done(&self) -> bool {
        *self.done.lock()
    }
}

/// Handle for a submitted job.
///
/// Provides cancellation of queued work and completion waiting.
pub struct TaskHandle {
    task_id: u64,
    cancelled: Arc<AtomicBool>,
    completion: Arc<Completion>,
}

impl TaskHandle {
    /// Cancel this job.
    ///
    /// A job still in the queue is skipped when dequeued. A job that is
    /// already running runs to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if the job has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Check if the job has finished (ran, panicked, or was skipped).
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.completion.is_done()
    }

    /// Block until the job finishes.
    pub fn wait(&self) {
        self.completion.wait();
    }

    /// Wait for the job to finish with a timeout.
    ///
    /// Returns `true` if the job finished, `false` if the timeout elapsed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.completion.wait_timeout(timeout)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task_id", &self.task_id)
            .field("cancelled", &self.is_cancelled())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Configuration options for a worker pool.
#[derive(Clone)]
pub struct PoolOptions {
    /// Idle timeout before retiring excess threads.
    pub idle_timeout: Duration,
    /// Thread name prefix.
    pub thread_name_prefix: String,
    /// Pool whose queue is drained when our own queue is empty.
    pub fallback: Option<WorkerPool>,
    /// Callback when a thread starts.
    pub on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    /// Callback when a thread stops.
    pub on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            fallback: None,
            on_thread_start: None,
            on_thread_stop: None,
        }
    }
}

impl fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolOptions")
            .field("idle_timeout", &self.idle_timeout)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("fallback", &self.fallback.as_ref().map(WorkerPool::name))
            .field("on_thread_start", &self.on_thread_start.is_some())
            .field("on_thread_stop", &self.on_thread_stop.is_some())
            .finish()
    }
}

impl WorkerPool {
    /// Creates a pool working for `owner`.
    ///
    /// `max_threads` is raised to `min_threads` and to at least one.
    #[must_use]
    pub fn new(
        owner: ThreadTypeId,
        name: impl Into<String>,
        min_threads: usize,
        max_threads: usize,
        options: PoolOptions,
    ) -> Self {
        let max_threads = max_threads.max(min_threads).max(1);

        let inner = Arc::new(PoolInner {
            owner,
            name: name.into(),
            min_threads,
            max_threads,
            active_threads: AtomicUsize::new(0),
            busy_threads: AtomicUsize::new(0),
            pending_count: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            next_task_id: AtomicU64::new(1),
            next_thread_index: AtomicUsize::new(0),
            queue: SegQueue::new(),
            fallback: options.fallback.map(|pool| pool.inner),
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            quiescent: Condvar::new(),
            mutex: Mutex::new(()),
            idle_timeout: options.idle_timeout,
            thread_name_prefix: options.thread_name_prefix,
            on_thread_start: options.on_thread_start,
            on_thread_stop: options.on_thread_stop,
            thread_handles: Mutex::new(Vec::with_capacity(max_threads)),
        });

        for _ in 0..min_threads {
            inner.active_threads.fetch_add(1, Ordering::SeqCst);
            spawn_thread_on_inner(&inner);
        }

        Self { inner }
    }

    /// Returns the owning ThreadType's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Submits a job.
    ///
    /// Never blocks. Fails with `RejectedExecution` after shutdown.
    pub fn submit<F>(&self, f: F) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(Error::rejected(&self.inner.name));
        }

        let task_id = self.inner.next_task_id.fetch_add(1, Ordering::Relaxed);
        let cancelled = Arc::new(AtomicBool::new(false));
        let completion = Arc::new(Completion::new());

        self.inner.in_flight.fetch_add(1, Ordering::AcqRel);
        self.inner.pending_count.fetch_add(1, Ordering::AcqRel);
        self.inner.queue.push(Job {
            id: task_id,
            work: Box::new(f),
            cancelled: Arc::clone(&cancelled),
            completion: Arc::clone(&completion),
        });
        // Pairs with the fence in `worker_loop` after a retirement: either
        // the retiring worker sees this job or we see its slot released.
        fence(Ordering::SeqCst);

        maybe_spawn_thread_on_inner(&self.inner);
        {
            let _guard = self.inner.mutex.lock();
            self.inner.condvar.notify_one();
        }

        Ok(TaskHandle {
            task_id,
            cancelled,
            completion,
        })
    }

    /// Jobs submitted and not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::Acquire)
    }

    /// Jobs waiting in the queue.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count.load(Ordering::Relaxed)
    }

    /// Live threads.
    #[must_use]
    pub fn active_threads(&self) -> usize {
        self.inner.active_threads.load(Ordering::Relaxed)
    }

    /// Threads currently running a job.
    #[must_use]
    pub fn busy_threads(&self) -> usize {
        self.inner.busy_threads.load(Ordering::Relaxed)
    }

    /// Maximum number of threads.
    #[must_use]
    pub fn max_threads(&self) -> usize {
        self.inner.max_threads
    }

    /// Returns `true` if the pool is shut down.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::Acquire)
    }

    /// Blocks until no job is in flight.
    ///
    /// Returns `false` if the timeout elapsed first.
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        let deadline = deadline_after(timeout);
        let mut guard = self.inner.mutex.lock();
        while self.inner.in_flight.load(Ordering::Acquire) > 0 {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .quiescent
                        .wait_until(&mut guard, deadline)
                        .timed_out()
                    {
                        return self.inner.in_flight.load(Ordering::Acquire) == 0;
                    }
                }
                None => self.inner.quiescent.wait(&mut guard),
            }
        }
        true
    }

    /// Initiates shutdown.
    ///
    /// No new jobs are accepted. Queued jobs still execute.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        let _guard = self.inner.mutex.lock();
        self.inner.condvar.notify_all();
    }

    /// Shuts down and waits for all threads to exit.
    ///
    /// Returns `true` if all threads exited, `false` if the timeout elapsed.
    /// Calling this from one of the pool's own threads always times out.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.shutdown();

        let deadline = deadline_after(timeout);
        while self.inner.active_threads.load(Ordering::Acquire) > 0 {
            let remaining =
                deadline.map_or(Duration::MAX, |d| d.saturating_duration_since(Instant::now()));
            if remaining.is_zero() {
                return false;
            }
            {
                let _guard = self.inner.mutex.lock();
                self.inner.condvar.notify_all();
            }
            thread::sleep(SHUTDOWN_POLL_INTERVAL.min(remaining));
        }

        let handles: Vec<_> = self.inner.thread_handles.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!(thread_type = %self.inner.name, "pool thread exited by panic");
            }
        }
        true
    }
}

enum Exit {
    Shutdown,
    Retired,
}

/// Spawns a worker into a slot already counted in `active_threads`.
fn spawn_thread_on_inner(inner: &Arc<PoolInner>) {
    let inner_clone = Arc::clone(inner);
    let index = inner.next_thread_index.fetch_add(1, Ordering::Relaxed);
    let name = format!("{}-{}-{}", inner.thread_name_prefix, inner.name, index);

    let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
        CURRENT_THREAD_TYPE.with(|c| c.set(Some(inner_clone.owner)));
        if let Some(ref callback) = inner_clone.on_thread_start {
            callback();
        }

        let exit = worker_loop(&inner_clone);

        if let Some(ref callback) = inner_clone.on_thread_stop {
            callback();
        }
        if matches!(exit, Exit::Shutdown) {
            inner_clone.active_threads.fetch_sub(1, Ordering::SeqCst);
        }
    });

    match spawned {
        Ok(handle) => {
            let mut handles = inner.thread_handles.lock();
            reap_finished(&inner.name, &mut handles);
            handles.push(handle);
        }
        Err(e) => {
            inner.active_threads.fetch_sub(1, Ordering::SeqCst);
            tracing::error!(thread = %name, error = %e, "failed to spawn pool thread");
        }
    }
}

/// Joins handles of threads that already exited, such as retired idlers.
fn reap_finished(pool: &str, handles: &mut Vec<ThreadJoinHandle<()>>) {
    let (finished, live): (Vec<_>, Vec<_>) =
        std::mem::take(handles).into_iter().partition(ThreadJoinHandle::is_finished);
    *handles = live;
    for handle in finished {
        if handle.join().is_err() {
            tracing::warn!(thread_type = %pool, "pool thread exited by panic");
        }
    }
}

/// Claims one thread slot below `max_threads` if `wanted` accepts the
/// current count. The check and the increment are one atomic step.
fn reserve_thread_slot(inner: &PoolInner, wanted: impl Fn(usize) -> bool) -> bool {
    inner
        .active_threads
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
            (active < inner.max_threads && wanted(active)).then_some(active + 1)
        })
        .is_ok()
}

/// Spawn another thread when queued work outnumbers idle threads.
fn maybe_spawn_thread_on_inner(inner: &Arc<PoolInner>) {
    let busy = inner.busy_threads.load(Ordering::Acquire);
    let pending = inner.pending_count.load(Ordering::Acquire);

    if reserve_thread_slot(inner, |active| pending > active.saturating_sub(busy)) {
        spawn_thread_on_inner(inner);
    }
}

fn worker_loop(inner: &PoolInner) -> Exit {
    loop {
        if let Some(job) = inner.queue.pop() {
            execute(inner, job);
            continue;
        }
        if let Some(fallback) = &inner.fallback {
            if let Some(job) = fallback.queue.pop() {
                execute(fallback, job);
                continue;
            }
        }

        if inner.shutdown.load(Ordering::Acquire) {
            return Exit::Shutdown;
        }

        let mut guard = inner.mutex.lock();
        // Re-check under the lock; submitters notify while holding it.
        if !inner.queue.is_empty() || inner.shutdown.load(Ordering::Acquire) {
            continue;
        }

        if inner.fallback.is_some() {
            inner.condvar.wait_for(&mut guard, FALLBACK_POLL_INTERVAL);
            continue;
        }

        if inner.active_threads.load(Ordering::Acquire) > inner.min_threads {
            let timed_out = inner
                .condvar
                .wait_for(&mut guard, inner.idle_timeout)
                .timed_out();
            if timed_out && inner.queue.is_empty() && try_retire(inner) {
                fence(Ordering::SeqCst);
                // A job pushed while we retired may have seen our slot as
                // still taken and skipped spawning; take a slot back for it.
                if !inner.queue.is_empty() && reserve_thread_slot(inner, |_| true) {
                    continue;
                }
                tracing::trace!(thread_type = %inner.name, "idle pool thread retired");
                return Exit::Retired;
            }
        } else {
            inner.condvar.wait(&mut guard);
        }
    }
}

/// Claims one retirement slot without dropping below `min_threads`.
fn try_retire(inner: &PoolInner) -> bool {
    inner
        .active_threads
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
            (active > inner.min_threads).then(|| active - 1)
        })
        .is_ok()
}

/// Runs one job on behalf of `owner`, which may be a fallback pool.
fn execute(owner: &PoolInner, job: Job) {
    owner.pending_count.fetch_sub(1, Ordering::AcqRel);

    if job.cancelled.load(Ordering::Acquire) {
        tracing::trace!(thread_type = %owner.name, task_id = job.id, "skipping cancelled job");
        job.completion.signal_done();
        finish_one(owner);
        return;
    }

    owner.busy_threads.fetch_add(1, Ordering::AcqRel);
    let previous = CURRENT_THREAD_TYPE.with(|c| c.replace(Some(owner.owner)));
    let result = catch_unwind(AssertUnwindSafe(job.work));
    CURRENT_THREAD_TYPE.with(|c| c.set(previous));
    owner.busy_threads.fetch_sub(1, Ordering::AcqRel);

    if let Err(payload) = result {
        let error = Error::panicked(payload.as_ref());
        tracing::error!(
            thread_type = %owner.name,
            task_id = job.id,
            error = %error,
            "job panicked; worker continues"
        );
    }

    job.completion.signal_done();
    finish_one(owner);
}

fn finish_one(owner: &PoolInner) {
    if owner.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
        let _guard = owner.mutex.lock();
        owner.quiescent.notify_all();
    }
}
