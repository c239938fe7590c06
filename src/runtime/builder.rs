//! Context builder and the default ThreadType layout.
//!
//! [`CascadeBuilder`] resolves a [`CascadeConfig`] and builds a [`Cascade`]:
//! the six standard ThreadTypes sharing one configuration and one delay
//! timer. Builder calls override environment variables, which override the
//! optional TOML file, which overrides the defaults.
//!
//! | Slot | Threads |
//! |------|---------|
//! | `ui` | 1 |
//! | `worker` | `1..=worker_threads` |
//! | `serial_worker` | 1, drains `worker` when idle |
//! | `file` | 1 |
//! | `net_read` | `1..=net_read_threads` |
//! | `net_write` | 1 |

use super::config::CascadeConfig;
use super::env_config::apply_env_overrides;
use super::thread_type::ThreadType;
use super::timer::Timer;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`Cascade`] context.
#[derive(Debug, Clone)]
#[must_use = "builders do nothing unless `build` is called"]
pub struct CascadeBuilder {
    config: CascadeConfig,
    single_threaded_worker: bool,
    ui: Option<ThreadType>,
    worker: Option<ThreadType>,
    serial_worker: Option<ThreadType>,
    file: Option<ThreadType>,
    net_read: Option<ThreadType>,
    net_write: Option<ThreadType>,
}

impl CascadeBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::with_config(CascadeConfig::default())
    }

    /// Start from an explicit configuration.
    pub const fn with_config(config: CascadeConfig) -> Self {
        Self {
            config,
            single_threaded_worker: false,
            ui: None,
            worker: None,
            serial_worker: None,
            file: None,
            net_read: None,
            net_write: None,
        }
    }

    /// Defaults with `CASCADE_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = CascadeConfig::default();
        apply_env_overrides(&mut config)?;
        Ok(Self::with_config(config))
    }

    /// Defaults, then the TOML file at `path`, then environment overrides.
    #[cfg(feature = "config-file")]
    pub fn from_config_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let toml = super::env_config::parse_toml_file(path.as_ref())?;
        let mut config = CascadeConfig::default();
        super::env_config::apply_toml_config(&mut config, &toml);
        apply_env_overrides(&mut config)?;
        Ok(Self::with_config(config))
    }

    /// Track the `Forked` state and detect repeated forks.
    pub fn strict_fork_checking(mut self, enable: bool) -> Self {
        self.config.strict_fork_checking = enable;
        self
    }

    /// Treat repeated forks as no-ops.
    pub fn idempotent_fork(mut self, enable: bool) -> Self {
        self.config.idempotent_fork = enable;
        self
    }

    /// Return state conflicts as errors instead of logging them.
    pub fn fail_fast(mut self, enable: bool) -> Self {
        self.config.fail_fast = enable;
        self
    }

    /// Evaluate runtime assertions.
    pub fn runtime_assertions(mut self, enable: bool) -> Self {
        self.config.runtime_assertions = enable;
        self
    }

    /// Log failures that reach the end of a chain unhandled.
    pub fn log_uncaught_failures(mut self, enable: bool) -> Self {
        self.config.log_uncaught_failures = enable;
        self
    }

    /// Maximum threads in the `worker` ThreadType.
    pub fn worker_threads(mut self, n: usize) -> Self {
        self.config.worker_threads = n;
        self
    }

    /// Maximum threads in the `net_read` ThreadType.
    pub fn net_read_threads(mut self, n: usize) -> Self {
        self.config.net_read_threads = n;
        self
    }

    /// Set the thread name prefix.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Idle time before extra pool threads retire.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Run `worker` on a single thread, making it FIFO.
    pub fn single_threaded_worker(mut self) -> Self {
        self.single_threaded_worker = true;
        self
    }

    /// Replace the `ui` ThreadType.
    pub fn with_ui(mut self, thread_type: ThreadType) -> Self {
        self.ui = Some(thread_type);
        self
    }

    /// Replace the `worker` ThreadType.
    pub fn with_worker(mut self, thread_type: ThreadType) -> Self {
        self.worker = Some(thread_type);
        self
    }

    /// Replace the `serial_worker` ThreadType.
    pub fn with_serial_worker(mut self, thread_type: ThreadType) -> Self {
        self.serial_worker = Some(thread_type);
        self
    }

    /// Replace the `file` ThreadType.
    pub fn with_file(mut self, thread_type: ThreadType) -> Self {
        self.file = Some(thread_type);
        self
    }

    /// Replace the `net_read` ThreadType.
    pub fn with_net_read(mut self, thread_type: ThreadType) -> Self {
        self.net_read = Some(thread_type);
        self
    }

    /// Replace the `net_write` ThreadType.
    pub fn with_net_write(mut self, thread_type: ThreadType) -> Self {
        self.net_write = Some(thread_type);
        self
    }

    /// The configuration as currently resolved.
    #[must_use]
    pub const fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Builds the context, starting one thread per ThreadType.
    #[must_use]
    pub fn build(self) -> Cascade {
        let mut config = self.config;
        config.normalize();
        let config = Arc::new(config);
        let timer = Timer::new(config.thread_name_prefix.clone());

        let make = |name: &str, max: usize| {
            ThreadType::builder(name)
                .threads(1, max)
                .config(Arc::clone(&config))
                .timer(timer.clone())
                .build()
        };

        let worker_threads = if self.single_threaded_worker {
            1
        } else {
            config.worker_threads
        };
        let worker = self.worker.unwrap_or_else(|| make("worker", worker_threads));
        let serial_worker = self.serial_worker.unwrap_or_else(|| {
            ThreadType::builder("serial_worker")
                .serial()
                .double_queue(&worker)
                .config(Arc::clone(&config))
                .timer(timer.clone())
                .build()
        });
        let ui = self.ui.unwrap_or_else(|| make("ui", 1));
        let file = self.file.unwrap_or_else(|| make("file", 1));
        let net_read = self
            .net_read
            .unwrap_or_else(|| make("net_read", config.net_read_threads));
        let net_write = self.net_write.unwrap_or_else(|| make("net_write", 1));

        tracing::info!(
            worker_threads,
            net_read_threads = config.net_read_threads,
            strict_fork_checking = config.strict_fork_checking,
            fail_fast = config.fail_fast,
            "cascade context built"
        );

        Cascade {
            config,
            timer,
            ui,
            worker,
            serial_worker,
            file,
            net_read,
            net_write,
        }
    }
}

impl Default for CascadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The standard ThreadTypes plus their shared configuration.
///
/// Cloning shares the ThreadTypes.
#[derive(Debug, Clone)]
pub struct Cascade {
    config: Arc<CascadeConfig>,
    timer: Timer,
    ui: ThreadType,
    worker: ThreadType,
    serial_worker: ThreadType,
    file: ThreadType,
    net_read: ThreadType,
    net_write: ThreadType,
}

impl Cascade {
    /// A builder with default configuration.
    pub fn builder() -> CascadeBuilder {
        CascadeBuilder::new()
    }

    /// Continuations that must run on the UI thread.
    #[must_use]
    pub const fn ui(&self) -> &ThreadType {
        &self.ui
    }

    /// General-purpose concurrent work.
    #[must_use]
    pub const fn worker(&self) -> &ThreadType {
        &self.worker
    }

    /// FIFO work; helps `worker` when idle.
    #[must_use]
    pub const fn serial_worker(&self) -> &ThreadType {
        &self.serial_worker
    }

    /// Blocking file I/O.
    #[must_use]
    pub const fn file(&self) -> &ThreadType {
        &self.file
    }

    /// Concurrent network reads.
    #[must_use]
    pub const fn net_read(&self) -> &ThreadType {
        &self.net_read
    }

    /// Ordered network writes.
    #[must_use]
    pub const fn net_write(&self) -> &ThreadType {
        &self.net_write
    }

    /// Resolved configuration.
    #[must_use]
    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Timer shared by the standard ThreadTypes.
    #[must_use]
    pub const fn timer(&self) -> &Timer {
        &self.timer
    }

    /// All six ThreadTypes.
    #[must_use]
    pub fn thread_types(&self) -> [&ThreadType; 6] {
        [
            &self.ui,
            &self.worker,
            &self.serial_worker,
            &self.file,
            &self.net_read,
            &self.net_write,
        ]
    }

    /// Rejects new work everywhere and stops the timer.
    pub fn shutdown(&self) {
        for thread_type in self.thread_types() {
            thread_type.shutdown();
        }
        self.timer.shutdown();
    }

    /// Shuts down and waits for every ThreadType to drain.
    ///
    /// Returns false if any did not drain within `timeout`.
    #[must_use]
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        self.timer.shutdown();
        let mut drained = true;
        for thread_type in self.thread_types() {
            drained &= thread_type.shutdown_and_wait(timeout);
        }
        drained
    }
}
