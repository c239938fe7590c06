//! Join bookkeeping for `await_all`.
//!
//! A join node waits for its upstream value plus one settlement per
//! awaited member. The gate counts arrivals; the last arrival schedules
//! the node. A member failure or cancellation settles the join at once.

use super::any::AnyAltFuture;
use super::node::Downchain;
use crate::error::Result;
use crate::observability::Origin;
use crate::types::{CancelReason, Failure, NodeId, Outcome};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts outstanding arrivals for a join node.
pub(crate) struct JoinGate {
    remaining: AtomicUsize,
    members: Vec<AnyAltFuture>,
}

impl JoinGate {
    /// A gate expecting the upstream value and every member.
    pub(crate) fn new(members: Vec<AnyAltFuture>) -> Self {
        Self {
            remaining: AtomicUsize::new(members.len() + 1),
            members,
        }
    }

    pub(crate) fn members(&self) -> &[AnyAltFuture] {
        &self.members
    }

    /// Records one arrival. Returns true for the last one.
    pub(crate) fn arrive(&self) -> bool {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .unwrap_or(0);
        previous == 1
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }
}

/// Receives the settlement of an awaited member.
#[doc(hidden)]
pub trait Watcher: Send + Sync {
    /// `member` settled; its value, if any, is erased.
    fn member_settled(&self, member: NodeId, origin: Origin, outcome: Outcome<()>);
}

/// Subscribes a [`Watcher`] to a member of any output type.
pub(crate) struct Watch {
    member: NodeId,
    origin: Origin,
    watcher: Arc<dyn Watcher>,
}

impl Watch {
    pub(crate) fn new(member: NodeId, origin: Origin, watcher: Arc<dyn Watcher>) -> Self {
        Self {
            member,
            origin,
            watcher,
        }
    }
}

impl<T> Downchain<T> for Watch {
    fn receive(&self, _value: T) -> Result<()> {
        self.watcher
            .member_settled(self.member, self.origin, Outcome::Ok(()));
        Ok(())
    }

    fn do_on_error(&self, failure: Failure) -> Result<()> {
        self.watcher
            .member_settled(self.member, self.origin, Outcome::Err(failure));
        Ok(())
    }

    fn do_on_cancelled(&self, reason: CancelReason) -> Result<()> {
        self.watcher
            .member_settled(self.member, self.origin, Outcome::Cancelled(reason));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test;

    #[test]
    fn gate_opens_on_last_arrival() {
        init_test("gate_opens_on_last_arrival");
        let gate = JoinGate::new(Vec::new());
        assert_eq!(gate.remaining(), 1);
        assert!(gate.arrive());
        // Extra arrivals never reopen the gate.
        assert!(!gate.arrive());
        assert_eq!(gate.remaining(), 0);
        crate::test_complete!("gate_opens_on_last_arrival");
    }
}
