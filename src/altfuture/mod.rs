//! Alt-futures: chains of actions run on ThreadTypes.
//!
//! An alt-future is one node of a chain. It receives a value from its
//! upchain, runs an action on its ThreadType and hands the result to every
//! downstream node. Failures and cancellations travel the same path as
//! values.
//!
//! # Lifecycle
//!
//! ```text
//! Unforked ──fork──▶ Forked ──action──▶ Value
//!     │                 │       └─────▶ Failed
//!     └────cancel───────┴─────────────▶ Cancelled
//! ```
//!
//! Settling happens exactly once; later attempts are logged and ignored.
//! With strict fork checking off the visible `Forked` state is skipped.
//!
//! # Flavours
//!
//! - [`AltFuture`]: a single node, built from a [`ThreadType`] entry point
//!   or a [`Chain`] combinator
//! - [`SettableAltFuture`]: a head settled from outside
//! - [`CompoundAltFuture`]: a subchain presented as one node
//! - [`AnyAltFuture`]: a type-erased node handle
//!
//! [`ThreadType`]: crate::runtime::ThreadType

mod any;
mod chain;
mod compound;
mod future;
mod join;
pub(crate) mod node;
mod settable;

pub use any::{AnyAltFuture, Status};
pub use chain::Chain;
pub use compound::CompoundAltFuture;
pub use future::AltFuture;
pub use node::Payload;
pub use settable::SettableAltFuture;
