//! Core types: identifiers, cancellation reasons and outcomes.

pub mod cancel;
pub mod id;
pub mod outcome;

pub use cancel::{CancelKind, CancelReason};
pub use id::{NodeId, SubscriptionId, ThreadTypeId};
pub use outcome::{Failure, Outcome};
