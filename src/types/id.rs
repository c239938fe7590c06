//! Identifier types for cascade entities.
//!
//! Nodes, thread types and reactive subscriptions are identified by
//! process-unique counters. Identity, not structural equality, decides
//! whether two handles refer to the same entity.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NODE_COUNTER: AtomicU64 = AtomicU64::new(1);
static THREAD_TYPE_COUNTER: AtomicU64 = AtomicU64::new(1);
static SUBSCRIPTION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for an alt-future node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Allocates a fresh node id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(NODE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A unique identifier for a ThreadType.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadTypeId(u64);

impl ThreadTypeId {
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(THREAD_TYPE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for ThreadTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ThreadTypeId({})", self.0)
    }
}

impl fmt::Display for ThreadTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Identifies one subscription on a reactive value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(SUBSCRIPTION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = NodeId::next();
        let b = NodeId::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(format!("{a}"), format!("N{}", a.as_u64()));
    }

    #[test]
    fn counters_are_independent_per_kind() {
        let t1 = ThreadTypeId::next();
        let t2 = ThreadTypeId::next();
        assert_ne!(t1, t2);
        assert_ne!(SubscriptionId::next(), SubscriptionId::next());
    }
}
