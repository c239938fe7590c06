//! Diagnostics for alt-future chains.
//!
//! Chains fail far away from where they were built. Every node records the
//! call site that created it as an [`Origin`], and every log event and
//! [`Failure`](crate::types::Failure) carries that origin.
//!
//! State-machine violations go through [`runtime_assert`] and
//! [`state_conflict`], which honour the `fail_fast` and
//! `runtime_assertions` toggles of [`CascadeConfig`](crate::runtime::CascadeConfig):
//! with fail-fast on the violation is returned as an error, otherwise it is
//! logged and execution continues.

pub mod assertions;
pub mod origin;

pub use assertions::{runtime_assert, state_conflict};
pub use origin::Origin;
