//! Cascade configuration types.
//!
//! These values drive thread-type sizing and the strictness of the node
//! state machine. In most cases you should use
//! [`CascadeBuilder`](super::builder::CascadeBuilder) rather than creating a
//! [`CascadeConfig`] directly.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `strict_fork_checking` | on in debug builds |
//! | `idempotent_fork` | false |
//! | `fail_fast` | on in debug builds |
//! | `runtime_assertions` | on in debug builds |
//! | `log_uncaught_failures` | true |
//! | `worker_threads` | available CPU parallelism |
//! | `net_read_threads` | 4 |
//! | `thread_name_prefix` | `"cascade"` |
//! | `idle_timeout` | 10 s |

use std::time::Duration;

/// Default number of concurrent network reads.
pub const DEFAULT_NET_READ_THREADS: usize = 4;

/// Default idle timeout before retiring excess pool threads.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default thread name prefix.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "cascade";

/// Cascade configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeConfig {
    /// Track the visible `Forked` state and detect repeated forks.
    pub strict_fork_checking: bool,
    /// Treat a repeated fork as a silent no-op.
    pub idempotent_fork: bool,
    /// Return state conflicts as errors instead of logging them.
    pub fail_fast: bool,
    /// Evaluate runtime assertions such as the `get()` deadlock guard.
    pub runtime_assertions: bool,
    /// Log failures that reach the end of a chain with no handler.
    pub log_uncaught_failures: bool,
    /// Threads in the shared worker ThreadType.
    pub worker_threads: usize,
    /// Maximum threads in the network-read ThreadType.
    pub net_read_threads: usize,
    /// Prefix for pool thread names.
    pub thread_name_prefix: String,
    /// Idle time before threads above the minimum retire.
    pub idle_timeout: Duration,
}

impl CascadeConfig {
    /// Normalize configuration values to safe defaults.
    pub fn normalize(&mut self) {
        if self.worker_threads == 0 {
            self.worker_threads = 1;
        }
        if self.net_read_threads == 0 {
            self.net_read_threads = 1;
        }
        if self.thread_name_prefix.is_empty() {
            self.thread_name_prefix = DEFAULT_THREAD_NAME_PREFIX.to_string();
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = DEFAULT_IDLE_TIMEOUT;
        }
    }

    /// Number of worker threads to use by default.
    #[must_use]
    pub fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        let debug = cfg!(debug_assertions);
        Self {
            strict_fork_checking: debug,
            idempotent_fork: false,
            fail_fast: debug,
            runtime_assertions: debug,
            log_uncaught_failures: true,
            worker_threads: Self::default_worker_threads(),
            net_read_threads: DEFAULT_NET_READ_THREADS,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_build_profile() {
        let config = CascadeConfig::default();
        assert_eq!(config.strict_fork_checking, cfg!(debug_assertions));
        assert_eq!(config.fail_fast, cfg!(debug_assertions));
        assert!(!config.idempotent_fork);
        assert!(config.log_uncaught_failures);
        assert!(config.worker_threads >= 1);
        assert_eq!(config.net_read_threads, DEFAULT_NET_READ_THREADS);
    }

    #[test]
    fn normalize_repairs_zero_values() {
        let mut config = CascadeConfig {
            worker_threads: 0,
            net_read_threads: 0,
            thread_name_prefix: String::new(),
            idle_timeout: Duration::ZERO,
            ..CascadeConfig::default()
        };
        config.normalize();
        assert_eq!(config.worker_threads, 1);
        assert_eq!(config.net_read_threads, 1);
        assert_eq!(config.thread_name_prefix, DEFAULT_THREAD_NAME_PREFIX);
        assert_eq!(config.idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }
}
