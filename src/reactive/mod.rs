//! Reactive values: the bridge from chains to change-driven consumers.
//!
//! A [`ReactiveValue`] holds the latest value and notifies subscribers on
//! their own ThreadTypes when it changes. Chains write into reactive
//! values with [`Chain::set_target`](crate::altfuture::Chain::set_target),
//! and [`ReactiveValue::next`] turns the next change into a chain head.

mod value;

pub use value::ReactiveValue;

/// Something a chain can write its values into.
pub trait ReactiveTarget<T> {
    /// Stores `value`. Returns whether the target changed.
    fn set(&self, value: T) -> bool;
}
