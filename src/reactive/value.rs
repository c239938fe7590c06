//! A shared value that notifies subscribers on change.

use super::ReactiveTarget;
use crate::altfuture::SettableAltFuture;
use crate::altfuture::Payload;
use crate::runtime::ThreadType;
use crate::types::SubscriptionId;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

type Callback<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

struct Subscriber<T> {
    id: SubscriptionId,
    thread_type: ThreadType,
    callback: Callback<T>,
    once: bool,
}

struct Inner<T> {
    name: String,
    value: RwLock<T>,
    subscribers: Mutex<Vec<Subscriber<T>>>,
}

/// A shared mutable cell with ordered, ThreadType-tagged subscribers.
///
/// Writes update the value synchronously, then submit one notification per
/// subscriber to that subscriber's ThreadType, in registration order.
/// Notifications are submitted while the write lock is held, so two
/// racing writes reach a serial ThreadType in the order they committed.
///
/// Cloning shares the cell.
pub struct ReactiveValue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ReactiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Payload + PartialEq + Sync> ReactiveValue<T> {
    /// A new cell holding `initial`.
    #[must_use]
    pub fn new(name: impl Into<String>, initial: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                value: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The latest committed value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Stores `value`. Subscribers are notified only if it changed.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.inner.value.write();
        if *current == value {
            tracing::trace!(reactive = %self.inner.name, "set to an equal value; not dispatched");
            return false;
        }
        *current = value.clone();
        self.dispatch(value);
        true
    }

    /// Stores `value` only if the current value equals `expected`.
    pub fn compare_and_set(&self, expected: &T, value: T) -> bool {
        let mut current = self.inner.value.write();
        if *current != *expected {
            return false;
        }
        if *current != value {
            *current = value.clone();
            self.dispatch(value);
        }
        true
    }

    /// Notifies every subscriber of the current value, changed or not.
    pub fn fire(&self) {
        let current = self.inner.value.write();
        self.dispatch(current.clone());
    }

    /// Runs `callback` on `thread_type` after each change.
    pub fn subscribe<F>(&self, thread_type: &ThreadType, callback: F) -> SubscriptionId
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.add(thread_type, Arc::new(callback), false)
    }

    /// Removes a subscription. Returns false if it was not registered.
    ///
    /// Notifications already submitted still run.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != before;
        drop(subscribers);
        tracing::trace!(reactive = %self.inner.name, subscription = ?id, removed, "unsubscribe");
        removed
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// A settable node completed with the next changed value.
    ///
    /// The node runs on `thread_type`; chains attached to it continue from
    /// there.
    #[track_caller]
    pub fn next(&self, thread_type: &ThreadType) -> SettableAltFuture<T> {
        let settable = thread_type.settable::<T>();
        let target = settable.clone();
        let name = self.inner.name.clone();
        self.add(
            thread_type,
            Arc::new(move |value| {
                if let Err(error) = target.set(value) {
                    tracing::warn!(reactive = %name, error = %error, "next() value could not be delivered");
                }
            }),
            true,
        );
        settable
    }

    fn add(&self, thread_type: &ThreadType, callback: Callback<T>, once: bool) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.inner.subscribers.lock().push(Subscriber {
            id,
            thread_type: thread_type.clone(),
            callback,
            once,
        });
        tracing::trace!(reactive = %self.inner.name, subscription = ?id, thread_type = %thread_type, once, "subscribe");
        id
    }

    /// Submits `value` to each subscriber. Called with the write lock held.
    fn dispatch(&self, value: T) {
        let mut subscribers = self.inner.subscribers.lock();
        for subscriber in subscribers.iter() {
            let callback = Arc::clone(&subscriber.callback);
            let v = value.clone();
            if let Err(error) = subscriber.thread_type.submit(move || callback(v)) {
                tracing::warn!(
                    reactive = %self.inner.name,
                    subscription = ?subscriber.id,
                    thread_type = %subscriber.thread_type,
                    error = %error,
                    "subscriber notification rejected"
                );
            }
        }
        subscribers.retain(|s| !s.once);
        tracing::debug!(reactive = %self.inner.name, subscribers = subscribers.len(), "dispatched");
    }
}

impl<T: Payload + PartialEq + Sync> ReactiveTarget<T> for ReactiveValue<T> {
    fn set(&self, value: T) -> bool {
        Self::set(self, value)
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveValue")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.read())
            .field("subscribers", &self.inner.subscribers.lock().len())
            .finish()
    }
}
