//! ThreadType: a named execution resource.
//!
//! A ThreadType wraps one [`WorkerPool`] plus the configuration and delay
//! timer that nodes created on it share. Chains start here:
//!
//! ```ignore
//! let worker = ThreadType::pool("worker", 4);
//! let twelve = worker.from(5).map(|n| n + 1).map(|n| n * 2);
//! twelve.fork()?;
//! assert_eq!(twelve.get()?, 12);
//! ```
//!
//! Handles are cheap to clone and compare by identity. Dropping the last
//! handle shuts the pool down without waiting; queued work still drains.

use super::config::CascadeConfig;
use super::pool::{current_thread_type, PoolOptions, TaskHandle, WorkerPool};
use super::timer::Timer;
use crate::altfuture::node::{NodeSpec, Step};
use crate::altfuture::{AltFuture, Payload, SettableAltFuture};
use crate::error::{ActionResult, Error, Result};
use crate::observability::Origin;
use crate::types::ThreadTypeId;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

struct ThreadTypeInner {
    id: ThreadTypeId,
    name: String,
    pool: WorkerPool,
    config: Arc<CascadeConfig>,
    timer: Timer,
    serial: bool,
}

impl Drop for ThreadTypeInner {
    fn drop(&mut self) {
        self.pool.shutdown();
    }
}

/// A named pool of threads that runs node actions.
#[derive(Clone)]
pub struct ThreadType {
    inner: Arc<ThreadTypeInner>,
}

impl ThreadType {
    /// Starts a builder for a ThreadType called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ThreadTypeBuilder {
        ThreadTypeBuilder::new(name)
    }

    /// A single-threaded ThreadType with default configuration.
    #[must_use]
    pub fn serial(name: impl Into<String>) -> Self {
        Self::builder(name).serial().build()
    }

    /// A ThreadType with `threads` concurrent threads.
    #[must_use]
    pub fn pool(name: impl Into<String>, threads: usize) -> Self {
        Self::builder(name).threads(1, threads).build()
    }

    /// Unique identity of this ThreadType.
    #[must_use]
    pub fn id(&self) -> ThreadTypeId {
        self.inner.id
    }

    /// Name used in thread names and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True when at most one action runs at a time.
    #[must_use]
    pub fn is_serial(&self) -> bool {
        self.inner.serial
    }

    /// Configuration shared by nodes on this ThreadType.
    #[must_use]
    pub fn config(&self) -> &CascadeConfig {
        &self.inner.config
    }

    /// Timer used for `sleep` nodes.
    #[must_use]
    pub fn timer(&self) -> &Timer {
        &self.inner.timer
    }

    /// The underlying pool.
    #[must_use]
    pub fn worker_pool(&self) -> &WorkerPool {
        &self.inner.pool
    }

    /// Queues `f`. Fails with `RejectedExecution` after shutdown.
    pub fn submit<F>(&self, f: F) -> Result<TaskHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.pool.submit(f)
    }

    /// True when called from a job running on this ThreadType.
    #[must_use]
    pub fn is_current_thread(&self) -> bool {
        current_thread_type() == Some(self.inner.id)
    }

    /// Jobs submitted and not yet finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.pool.in_flight()
    }

    /// Blocks until no jobs are in flight. Returns false on timeout.
    #[must_use]
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        self.inner.pool.wait_quiescent(timeout)
    }

    /// True once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.inner.pool.is_shutdown()
    }

    /// Rejects new work; queued work still drains.
    pub fn shutdown(&self) {
        tracing::debug!(thread_type = %self.inner.name, "shutting down");
        self.inner.pool.shutdown();
    }

    /// Shuts down and waits for queued work to drain.
    #[must_use]
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.inner.pool.shutdown_and_wait(timeout)
    }

    /// A head node that runs `f` once forked.
    #[track_caller]
    pub fn then<R, F>(&self, f: F) -> AltFuture<(), R>
    where
        R: Payload,
        F: FnOnce() -> ActionResult<R> + Send + 'static,
    {
        let spec = NodeSpec::new(self.clone(), Origin::here())
            .seed(())
            .action(Box::new(move |()| match f() {
                Ok(value) => Step::Value(value),
                Err(source) => Step::Fail(Error::action(source)),
            }));
        AltFuture::from_node(spec.build())
    }

    /// A head node that produces `value` once forked.
    #[track_caller]
    pub fn from<T: Payload>(&self, value: T) -> AltFuture<T, T> {
        let spec = NodeSpec::new(self.clone(), Origin::here())
            .seed(value)
            .action(Box::new(Step::Value));
        AltFuture::from_node(spec.build())
    }

    /// A node with neither input nor upchain.
    ///
    /// It runs once an upchain is attached with
    /// [`AltFuture::set_upchain`] or a value is pushed with
    /// [`AltFuture::receive`]. Typically used as the head of a
    /// [`CompoundAltFuture`](crate::altfuture::CompoundAltFuture).
    #[track_caller]
    pub fn detached<IN, OUT, F>(&self, f: F) -> AltFuture<IN, OUT>
    where
        IN: Payload,
        OUT: Payload,
        F: FnOnce(IN) -> ActionResult<OUT> + Send + 'static,
    {
        let spec = NodeSpec::new(self.clone(), Origin::here()).action(Box::new(move |input| {
            match f(input) {
                Ok(value) => Step::Value(value),
                Err(source) => Step::Fail(Error::action(source)),
            }
        }));
        AltFuture::from_node(spec.build())
    }

    /// A node settled from outside with [`SettableAltFuture::set`].
    #[track_caller]
    pub fn settable<T: Payload>(&self) -> SettableAltFuture<T> {
        SettableAltFuture::new(self.clone(), Origin::here())
    }
}

impl PartialEq for ThreadType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ThreadType {}

impl fmt::Display for ThreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

impl fmt::Debug for ThreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadType")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("serial", &self.inner.serial)
            .field("pool", &self.inner.pool)
            .finish()
    }
}

/// Builder for [`ThreadType`].
///
/// Unset options fall back to the configuration's values.
#[must_use = "builders do nothing unless `build` is called"]
pub struct ThreadTypeBuilder {
    name: String,
    min_threads: usize,
    max_threads: usize,
    serial: bool,
    fallback: Option<ThreadType>,
    idle_timeout: Option<Duration>,
    thread_name_prefix: Option<String>,
    config: Option<Arc<CascadeConfig>>,
    timer: Option<Timer>,
    on_thread_start: Option<Arc<dyn Fn() + Send + Sync>>,
    on_thread_stop: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ThreadTypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_threads: 1,
            max_threads: 1,
            serial: false,
            fallback: None,
            idle_timeout: None,
            thread_name_prefix: None,
            config: None,
            timer: None,
            on_thread_start: None,
            on_thread_stop: None,
        }
    }

    /// Thread range. `max` is raised to `min` and to at least one.
    pub fn threads(mut self, min: usize, max: usize) -> Self {
        self.min_threads = min;
        self.max_threads = max.max(min).max(1);
        self.serial = self.max_threads == 1;
        self
    }

    /// Exactly one thread.
    pub fn serial(mut self) -> Self {
        self.min_threads = 1;
        self.max_threads = 1;
        self.serial = true;
        self
    }

    /// Drain `fallback`'s queue whenever our own is empty.
    pub fn double_queue(mut self, fallback: &ThreadType) -> Self {
        self.fallback = Some(fallback.clone());
        self
    }

    /// Idle time before threads above the minimum retire.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Prefix for thread names.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    /// Configuration shared with other ThreadTypes.
    pub fn config(mut self, config: Arc<CascadeConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a delay timer instead of creating one.
    pub fn timer(mut self, timer: Timer) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Called on each new thread before it takes work.
    pub fn on_thread_start<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_thread_start = Some(Arc::new(f));
        self
    }

    /// Called on each thread as it exits.
    pub fn on_thread_stop<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_thread_stop = Some(Arc::new(f));
        self
    }

    /// Builds the ThreadType and starts its minimum threads.
    #[must_use]
    pub fn build(self) -> ThreadType {
        let config = self
            .config
            .unwrap_or_else(|| Arc::new(CascadeConfig::default()));
        let id = ThreadTypeId::next();
        let options = PoolOptions {
            idle_timeout: self.idle_timeout.unwrap_or(config.idle_timeout),
            thread_name_prefix: self
                .thread_name_prefix
                .unwrap_or_else(|| config.thread_name_prefix.clone()),
            fallback: self.fallback.map(|tt| tt.inner.pool.clone()),
            on_thread_start: self.on_thread_start,
            on_thread_stop: self.on_thread_stop,
        };
        let pool = WorkerPool::new(
            id,
            self.name.clone(),
            self.min_threads,
            self.max_threads,
            options,
        );
        let timer = self.timer.unwrap_or_else(|| Timer::new(&self.name));

        tracing::debug!(
            thread_type = %self.name,
            id = %id,
            min_threads = self.min_threads,
            max_threads = self.max_threads,
            serial = self.serial,
            "thread type created"
        );

        ThreadType {
            inner: Arc::new(ThreadTypeInner {
                id,
                name: self.name,
                pool,
                config,
                timer,
                serial: self.serial,
            }),
        }
    }
}

impl fmt::Debug for ThreadTypeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadTypeBuilder")
            .field("name", &self.name)
            .field("min_threads", &self.min_threads)
            .field("max_threads", &self.max_threads)
            .field("serial", &self.serial)
            .field("fallback", &self.fallback.as_ref().map(ThreadType::name))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::altfuture::Chain;
    use crate::test_utils::init_test;
    use std::sync::mpsc;

    #[test]
    fn identity_equality() {
        init_test("identity_equality");
        let a = ThreadType::serial("a");
        let b = ThreadType::serial("a");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.to_string(), "a");
        crate::test_complete!("identity_equality");
    }

    #[test]
    fn builder_sizes_pool() {
        init_test("builder_sizes_pool");
        let tt = ThreadType::builder("sized").threads(2, 5).build();
        assert_eq!(tt.worker_pool().max_threads(), 5);
        assert!(!tt.is_serial());
        let one = ThreadType::builder("one").threads(0, 0).build();
        assert!(one.is_serial());
        crate::test_complete!("builder_sizes_pool");
    }

    #[test]
    fn current_thread_detection() {
        init_test("current_thread_detection");
        let tt = ThreadType::serial("detect");
        assert!(!tt.is_current_thread());
        let (tx, rx) = mpsc::channel();
        let probe = tt.clone();
        tt.submit(move || {
            let _ = tx.send(probe.is_current_thread());
        })
        .unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
        crate::test_complete!("current_thread_detection");
    }

    #[test]
    fn then_head_runs_once_forked() {
        init_test("then_head_runs_once_forked");
        let tt = ThreadType::serial("then");
        let head = tt.then(|| Ok("ran".to_string()));
        assert!(head.outcome().is_none());
        head.fork().unwrap();
        assert_eq!(head.get_timeout(Duration::from_secs(2)).unwrap(), "ran");
        crate::test_complete!("then_head_runs_once_forked");
    }

    #[test]
    fn submit_after_shutdown_rejected() {
        init_test("submit_after_shutdown_rejected");
        let tt = ThreadType::serial("closed");
        tt.shutdown();
        assert!(tt.is_shutdown());
        let err = tt.submit(|| {}).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::RejectedExecution);
        crate::test_complete!("submit_after_shutdown_rejected");
    }
}
