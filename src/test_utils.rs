//! Shared helpers for cascade's unit tests.
//!
//! Chains hop between pool threads, so the subscriber installed here prints
//! thread names on every line. Verbosity comes from `CASCADE_TEST_LOG`
//! (an `EnvFilter` directive such as `cascade::altfuture=debug`) and defaults
//! to tracing everything the crate emits.
//!
//! ```ignore
//! use cascade::test_utils::init_test;
//!
//! #[test]
//! fn chain_runs() {
//!     init_test("chain_runs");
//!     // ...
//!     cascade::test_complete!("chain_runs");
//! }
//! ```

use parking_lot::{const_mutex, Mutex, MutexGuard};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the test log filter.
pub const TEST_LOG_ENV: &str = "CASCADE_TEST_LOG";

const DEFAULT_TEST_FILTER: &str = "cascade=trace";

static SUBSCRIBER: OnceLock<()> = OnceLock::new();
static ENV_GUARD: Mutex<()> = const_mutex(());

fn test_filter() -> EnvFilter {
    std::env::var(TEST_LOG_ENV)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_TEST_FILTER))
}

/// Install the test subscriber once per process.
pub fn init_test_logging() {
    SUBSCRIBER.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(test_filter())
            .with_test_writer()
            .with_thread_names(true)
            .with_target(true)
            .with_line_number(true)
            .with_ansi(false)
            .compact()
            .try_init();
    });
}

/// Install logging and mark the start of `name`.
pub fn init_test(name: &str) {
    init_test_logging();
    crate::test_phase!(name);
}

/// Serialises tests that set or clear `CASCADE_*` variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_GUARD.lock()
}

/// Marks the start of a test or a major step in one.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(
            phase = %$name,
            thread = ?::std::thread::current().name(),
            ">>> {}",
            $name
        );
    };
}

/// Marks a smaller step inside a phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "  - {}", $name);
    };
}

/// Marks the end of a test, optionally with extra fields.
#[macro_export]
macro_rules! test_complete {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(test = %$name, $($key = %$value,)* "<<< {} passed", $name);
    };
}

/// Asserts `$cond`, logging the expected and observed values first.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let (expected, actual) = (&$expected, &$actual);
        tracing::debug!(?expected, ?actual, check = %$msg);
        assert!($cond, "{}: wanted {:?}, saw {:?}", $msg, expected, actual);
    }};
}

/// Asserts that a settled node's `outcome()` holds `$expected`.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Ok(value)) => assert_eq!(value, $expected),
            other => panic!("node should hold {:?}, holds {:?}", $expected, other),
        }
    };
}

/// Asserts that a node was cancelled, optionally for a given `CancelKind`.
#[macro_export]
macro_rules! assert_outcome_cancelled {
    ($outcome:expr) => {
        assert!(
            matches!($outcome, Some($crate::types::Outcome::Cancelled(_))),
            "node should be cancelled"
        )
    };
    ($outcome:expr, $kind:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Cancelled(reason)) => assert_eq!(reason.kind(), $kind),
            other => panic!("node should be cancelled with {:?}, holds {:?}", $kind, other),
        }
    };
}

/// Asserts that a node failed, and that `node = id` is where it started.
#[macro_export]
macro_rules! assert_outcome_err {
    ($outcome:expr, node = $node:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Err(failure)) => assert_eq!(failure.node(), $node),
            other => panic!("node should have failed at {:?}, holds {:?}", $node, other),
        }
    };
    ($outcome:expr, $kind:expr) => {
        match $outcome {
            Some($crate::types::Outcome::Err(failure)) => {
                assert_eq!(failure.error().kind(), $kind)
            }
            other => panic!("node should have failed with {:?}, holds {:?}", $kind, other),
        }
    };
}
