//! Cascade: chains of actions on named thread pools.
//!
//! # Overview
//!
//! Cascade runs work as chains of *alt-futures*. Each node of a chain runs
//! one action on a named execution resource, a [`ThreadType`], and hands
//! its result to the nodes attached below it. Failures and cancellations
//! travel down the same links as values, so every node ends in exactly one
//! of three terminal states and every downstream node learns which.
//!
//! ```ignore
//! use cascade::{Chain, ThreadType};
//!
//! let worker = ThreadType::pool("worker", 4);
//! let ui = ThreadType::serial("ui");
//!
//! let label = worker
//!     .from(5)
//!     .map(|n| n + 1)
//!     .map(|n| n * 2)
//!     .on(&ui)
//!     .map(|n| format!("total: {n}"));
//! label.fork()?;
//! assert_eq!(label.get()?, "total: 12");
//! ```
//!
//! # Core Guarantees
//!
//! - **Exactly-once settlement**: a node settles once and never changes afterwards
//! - **No inline execution**: actions always run on a thread of their ThreadType
//! - **FIFO serial ThreadTypes**: a one-thread ThreadType runs actions in submission order
//! - **No lost notifications**: a node attached after its upstream settled still hears the outcome
//! - **No unwinding across threads**: panics and errors become `Failed` states
//!
//! # Module Structure
//!
//! - [`altfuture`]: nodes, the [`Chain`] combinators, compound and settable futures
//! - [`runtime`]: ThreadTypes, worker pools, the delay timer and the [`Cascade`] context
//! - [`reactive`]: change-notifying values bridging chains to consumers
//! - [`types`]: identifiers, outcomes and cancellation reasons
//! - [`error`]: error types
//! - [`observability`]: node origins and runtime assertions

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod altfuture;
pub mod error;
pub mod observability;
pub mod reactive;
pub mod runtime;
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;
pub mod types;

// Re-exports for convenient access to core types
pub use altfuture::{
    AltFuture, AnyAltFuture, Chain, CompoundAltFuture, Payload, SettableAltFuture, Status,
};
pub use error::{
    ActionResult, BoxError, Error, ErrorCategory, ErrorKind, Recoverability, Result, ResultExt,
};
pub use observability::Origin;
pub use reactive::{ReactiveTarget, ReactiveValue};
pub use runtime::{
    global, init, Cascade, CascadeBuilder, CascadeConfig, ConfigError, TaskHandle, ThreadType,
};
pub use types::{CancelKind, CancelReason, Failure, NodeId, Outcome, SubscriptionId, ThreadTypeId};
