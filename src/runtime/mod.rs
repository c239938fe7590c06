//! Execution resources: ThreadTypes, their pools, the delay timer and the
//! context that ties them together.
//!
//! - [`config`]: configuration types and defaults
//! - [`env_config`]: `CASCADE_*` environment overrides and the TOML file
//! - [`pool`]: the worker pool behind each ThreadType
//! - [`timer`]: the delay timer behind `sleep`
//! - [`thread_type`]: [`ThreadType`] and its builder
//! - [`builder`]: [`CascadeBuilder`] and the [`Cascade`] context
//!
//! # Process default
//!
//! Most programs build one [`Cascade`] at startup. [`init`] installs it as
//! the process default; [`global`] returns it, building one from the
//! environment on first use if `init` was never called.
//!
//! ```ignore
//! use cascade::runtime::{self, CascadeBuilder};
//!
//! runtime::init(CascadeBuilder::from_env()?.worker_threads(4).build())?;
//! let worker = runtime::global().worker();
//! ```

pub mod builder;
pub mod config;
pub mod env_config;
pub mod pool;
pub mod thread_type;
pub mod timer;

pub use builder::{Cascade, CascadeBuilder};
pub use config::CascadeConfig;
pub use env_config::ConfigError;
pub use pool::{TaskHandle, WorkerPool};
pub use thread_type::{ThreadType, ThreadTypeBuilder};
pub use timer::{Timer, TimerHandle};

use crate::error::{Error, Result};
use std::sync::OnceLock;

static GLOBAL: OnceLock<Cascade> = OnceLock::new();

/// Installs `cascade` as the process default.
///
/// Fails with `StateConflict` if a default already exists, including one
/// created implicitly by [`global`].
pub fn init(cascade: Cascade) -> Result<&'static Cascade> {
    GLOBAL.set(cascade).map_err(|_| {
        Error::state_conflict("the process default cascade context is already initialized")
    })?;
    tracing::debug!("process default cascade context installed");
    global_if_initialized()
        .ok_or_else(|| Error::internal("default context missing right after init"))
}

/// The process default context, built from the environment on first use.
///
/// An unparseable environment is logged and the defaults are used.
pub fn global() -> &'static Cascade {
    GLOBAL.get_or_init(|| {
        let builder = CascadeBuilder::from_env().unwrap_or_else(|error| {
            tracing::warn!(error = %error, "ignoring invalid CASCADE_* environment");
            CascadeBuilder::new()
        });
        builder.build()
    })
}

/// The process default context, if one exists.
#[must_use]
pub fn global_if_initialized() -> Option<&'static Cascade> {
    GLOBAL.get()
}
