//! Environment variable and config file support for [`CascadeBuilder`](super::builder::CascadeBuilder).
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`worker_threads(4)`)
//! 2. **Environment variables**: values from `CASCADE_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`CascadeConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `CASCADE_STRICT_FORK_CHECKING` | `bool` | `strict_fork_checking` |
//! | `CASCADE_IDEMPOTENT_FORK` | `bool` | `idempotent_fork` |
//! | `CASCADE_FAIL_FAST` | `bool` | `fail_fast` |
//! | `CASCADE_RUNTIME_ASSERTIONS` | `bool` | `runtime_assertions` |
//! | `CASCADE_LOG_UNCAUGHT_FAILURES` | `bool` | `log_uncaught_failures` |
//! | `CASCADE_WORKER_THREADS` | `usize` | `worker_threads` |
//! | `CASCADE_NET_READ_THREADS` | `usize` | `net_read_threads` |
//! | `CASCADE_THREAD_NAME_PREFIX` | `String` | `thread_name_prefix` |
//! | `CASCADE_IDLE_TIMEOUT_MS` | `u64` | `idle_timeout` |

use crate::runtime::config::CascadeConfig;
use std::time::Duration;

/// Environment variable name for strict fork checking.
pub const ENV_STRICT_FORK_CHECKING: &str = "CASCADE_STRICT_FORK_CHECKING";
/// Environment variable name for idempotent fork.
pub const ENV_IDEMPOTENT_FORK: &str = "CASCADE_IDEMPOTENT_FORK";
/// Environment variable name for fail-fast conflict handling.
pub const ENV_FAIL_FAST: &str = "CASCADE_FAIL_FAST";
/// Environment variable name for runtime assertions.
pub const ENV_RUNTIME_ASSERTIONS: &str = "CASCADE_RUNTIME_ASSERTIONS";
/// Environment variable name for uncaught failure logging.
pub const ENV_LOG_UNCAUGHT_FAILURES: &str = "CASCADE_LOG_UNCAUGHT_FAILURES";
/// Environment variable name for worker thread count.
pub const ENV_WORKER_THREADS: &str = "CASCADE_WORKER_THREADS";
/// Environment variable name for the network-read thread limit.
pub const ENV_NET_READ_THREADS: &str = "CASCADE_NET_READ_THREADS";
/// Environment variable name for the thread name prefix.
pub const ENV_THREAD_NAME_PREFIX: &str = "CASCADE_THREAD_NAME_PREFIX";
/// Environment variable name for the pool idle timeout in milliseconds.
pub const ENV_IDLE_TIMEOUT_MS: &str = "CASCADE_IDLE_TIMEOUT_MS";

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable or key held an unparseable value.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidValue {
        /// Variable or key name.
        var: String,
        /// Human-readable expected type.
        expected: &'static str,
        /// The rejected raw value.
        value: String,
    },

    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse TOML config: {0}")]
    Toml(String),
}

/// Apply environment variable overrides to a [`CascadeConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut CascadeConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_STRICT_FORK_CHECKING) {
        config.strict_fork_checking = parse_bool(ENV_STRICT_FORK_CHECKING, &val)?;
    }
    if let Some(val) = read_env(ENV_IDEMPOTENT_FORK) {
        config.idempotent_fork = parse_bool(ENV_IDEMPOTENT_FORK, &val)?;
    }
    if let Some(val) = read_env(ENV_FAIL_FAST) {
        config.fail_fast = parse_bool(ENV_FAIL_FAST, &val)?;
    }
    if let Some(val) = read_env(ENV_RUNTIME_ASSERTIONS) {
        config.runtime_assertions = parse_bool(ENV_RUNTIME_ASSERTIONS, &val)?;
    }
    if let Some(val) = read_env(ENV_LOG_UNCAUGHT_FAILURES) {
        config.log_uncaught_failures = parse_bool(ENV_LOG_UNCAUGHT_FAILURES, &val)?;
    }
    if let Some(val) = read_env(ENV_WORKER_THREADS) {
        config.worker_threads = parse_usize(ENV_WORKER_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_NET_READ_THREADS) {
        config.net_read_threads = parse_usize(ENV_NET_READ_THREADS, &val)?;
    }
    if let Some(val) = read_env(ENV_THREAD_NAME_PREFIX) {
        config.thread_name_prefix = val;
    }
    if let Some(val) = read_env(ENV_IDLE_TIMEOUT_MS) {
        config.idle_timeout = Duration::from_millis(parse_u64(ENV_IDLE_TIMEOUT_MS, &val)?);
    }
    Ok(())
}

/// Read an environment variable, returning `None` if unset.
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn invalid(var_name: &str, expected: &'static str, val: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var_name.to_string(),
        expected,
        value: val.to_string(),
    }
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| invalid(var_name, "unsigned integer", val))
}

fn parse_u64(var_name: &str, val: &str) -> Result<u64, ConfigError> {
    val.trim()
        .parse::<u64>()
        .map_err(|_| invalid(var_name, "u64", val))
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(var_name, "bool (true/false/1/0/yes/no)", val)),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable cascade configuration.
///
/// ```toml
/// [chain]
/// strict_fork_checking = true
/// idempotent_fork = false
/// fail_fast = false
/// runtime_assertions = true
/// log_uncaught_failures = true
///
/// [threads]
/// worker_threads = 4
/// net_read_threads = 4
/// thread_name_prefix = "myapp"
/// idle_timeout_ms = 10000
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct CascadeTomlConfig {
    /// Chain state-machine settings.
    #[serde(default)]
    pub chain: ChainToml,
    /// Thread pool settings.
    #[serde(default)]
    pub threads: ThreadsToml,
}

/// Chain section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ChainToml {
    /// Track `Forked` and detect repeated forks.
    pub strict_fork_checking: Option<bool>,
    /// Treat a repeated fork as a no-op.
    pub idempotent_fork: Option<bool>,
    /// Return conflicts as errors.
    pub fail_fast: Option<bool>,
    /// Evaluate runtime assertions.
    pub runtime_assertions: Option<bool>,
    /// Log failures with no handler.
    pub log_uncaught_failures: Option<bool>,
}

/// Threads section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct ThreadsToml {
    /// Worker thread count.
    pub worker_threads: Option<usize>,
    /// Maximum network-read threads.
    pub net_read_threads: Option<usize>,
    /// Thread name prefix.
    pub thread_name_prefix: Option<String>,
    /// Idle timeout in milliseconds.
    pub idle_timeout_ms: Option<u64>,
}

/// Apply a parsed TOML config to a [`CascadeConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut CascadeConfig, toml: &CascadeTomlConfig) {
    if let Some(v) = toml.chain.strict_fork_checking {
        config.strict_fork_checking = v;
    }
    if let Some(v) = toml.chain.idempotent_fork {
        config.idempotent_fork = v;
    }
    if let Some(v) = toml.chain.fail_fast {
        config.fail_fast = v;
    }
    if let Some(v) = toml.chain.runtime_assertions {
        config.runtime_assertions = v;
    }
    if let Some(v) = toml.chain.log_uncaught_failures {
        config.log_uncaught_failures = v;
    }
    if let Some(v) = toml.threads.worker_threads {
        config.worker_threads = v;
    }
    if let Some(v) = toml.threads.net_read_threads {
        config.net_read_threads = v;
    }
    if let Some(ref v) = toml.threads.thread_name_prefix {
        config.thread_name_prefix.clone_from(v);
    }
    if let Some(v) = toml.threads.idle_timeout_ms {
        config.idle_timeout = Duration::from_millis(v);
    }
}

/// Parse a TOML string into a [`CascadeTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<CascadeTomlConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::Toml(e.to_string()))
}

/// Read and parse a TOML file into a [`CascadeTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<CascadeTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_toml_str(&content)
}
