#![allow(dead_code)]
#![allow(unused_imports)]
//! Fixtures shared by the integration suites.
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use cascade::{Cascade, CascadeBuilder, CascadeConfig, ThreadType};
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Generous bound for anything that should finish promptly.
pub const WAIT: Duration = Duration::from_secs(5);

/// Seed pinned for property runs on CI.
pub const CI_PROPTEST_SEED: u64 = 0xCA5C_ADE0;

const SEED_ENV: &str = "CASCADE_PROPTEST_SEED";
const SHRINK_ENV: &str = "CASCADE_PROPTEST_MAX_SHRINK_ITERS";
const LOG_ENV: &str = "CASCADE_TEST_LOG";

static SUBSCRIBER: OnceLock<()> = OnceLock::new();

fn env_number<N: std::str::FromStr>(var: &str) -> Option<N> {
    std::env::var(var).ok()?.trim().parse().ok()
}

/// Case count, seed and shrink budget for one `proptest!` block.
///
/// An explicit `PROPTEST_RNG_SEED` always wins. Otherwise
/// `CASCADE_PROPTEST_SEED` is used, and CI runs fall back to
/// [`CI_PROPTEST_SEED`] so failures reproduce.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    pub cases: u32,
    pub seed: Option<u64>,
    pub max_shrink_iters: Option<u32>,
}

impl PropertyTestConfig {
    #[must_use]
    pub fn new(cases: u32) -> Self {
        let ci_seed = std::env::var_os("CI").map(|_| CI_PROPTEST_SEED);
        Self {
            cases,
            seed: env_number(SEED_ENV).or(ci_seed),
            max_shrink_iters: env_number(SHRINK_ENV),
        }
    }
}

impl From<PropertyTestConfig> for ProptestConfig {
    fn from(settings: PropertyTestConfig) -> Self {
        let mut config = Self::with_cases(settings.cases);
        match settings.seed {
            Some(seed) if matches!(config.rng_seed, RngSeed::Random) => {
                config.rng_seed = RngSeed::Fixed(seed);
            }
            _ => {}
        }
        if let Some(iters) = settings.max_shrink_iters {
            config.max_shrink_iters = iters;
        }
        config
    }
}

/// `ProptestConfig` for `cases` runs, seeded as [`PropertyTestConfig`] describes.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).into()
}

/// Install the test subscriber once; `CASCADE_TEST_LOG` overrides the filter.
pub fn init_test_logging() {
    SUBSCRIBER.get_or_init(|| {
        let filter = std::env::var(LOG_ENV)
            .ok()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new("cascade=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
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

/// A config with the three fork toggles spelled out and assertions on,
/// whatever the build profile defaults to.
#[must_use]
pub fn config(strict: bool, idempotent: bool, fail_fast: bool) -> Arc<CascadeConfig> {
    Arc::new(CascadeConfig {
        strict_fork_checking: strict,
        idempotent_fork: idempotent,
        fail_fast,
        runtime_assertions: true,
        ..CascadeConfig::default()
    })
}

/// One-thread ThreadType named `name` running under `config`.
#[must_use]
pub fn serial_with(name: &str, config: Arc<CascadeConfig>) -> ThreadType {
    ThreadType::builder(name).serial().config(config).build()
}

/// Two worker threads, strict fork checking, fail-fast.
#[must_use]
pub fn strict_cascade() -> Cascade {
    CascadeBuilder::new()
        .strict_fork_checking(true)
        .fail_fast(true)
        .runtime_assertions(true)
        .worker_threads(2)
        .build()
}

#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, ">>> {}", $name);
    };
}

#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "  - {}", $name);
    };
}

#[macro_export]
macro_rules! test_complete {
    ($name:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(test = %$name, $($key = %$value,)* "<<< {} passed", $name);
    };
}

#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let (expected, actual) = (&$expected, &$actual);
        tracing::debug!(?expected, ?actual, check = %$msg);
        assert!($cond, "{}: wanted {:?}, saw {:?}", $msg, expected, actual);
    }};
}
