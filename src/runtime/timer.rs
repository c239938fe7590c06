//! Delay timer backing `sleep`.
//!
//! A min-heap of pending callbacks ordered by deadline, served by a single
//! background thread. The thread is spawned on first use and holds only a
//! weak reference, so dropping the last [`Timer`] handle lets it exit.
//!
//! Callbacks run on the timer thread and must be short; the ones cascade
//! installs only submit work to a ThreadType.

use parking_lot::{Condvar, Mutex};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Longest time the timer thread parks before re-checking for shutdown.
const MAX_PARK: Duration = Duration::from_millis(50);

/// A pending callback. Entries order by `(deadline, generation)`; the heap
/// wraps them in [`Reverse`] so the earliest one sits on top.
struct TimerEntry {
    deadline: Instant,
    /// Keeps equal deadlines in scheduling order.
    generation: u64,
    cancelled: Arc<AtomicBool>,
    fire: Box<dyn FnOnce() + Send + 'static>,
}

impl TimerEntry {
    const fn key(&self) -> (Instant, u64) {
        (self.deadline, self.generation)
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Reverse<TimerEntry>>,
    next_generation: u64,
    thread_started: bool,
    shutdown: bool,
}

struct TimerInner {
    name: String,
    state: Mutex<TimerState>,
    condvar: Condvar,
}

/// A cloneable handle to a delay timer.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Timer")
            .field("name", &self.inner.name)
            .field("pending", &state.heap.len())
            .field("thread_started", &state.thread_started)
            .finish()
    }
}

/// `now + timeout`, or `None` when that is past what [`Instant`] can hold.
///
/// Callers treat `None` as "never": an untimed wait, or a callback that
/// never fires.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Handle for one scheduled callback.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Prevents the callback from running if it has not fired yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, AtomicOrdering::Release);
    }

    /// Returns true if [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(AtomicOrdering::Acquire)
    }
}

impl Timer {
    /// Creates a timer; its thread is named `{name}-timer`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                name: name.into(),
                state: Mutex::new(TimerState::default()),
                condvar: Condvar::new(),
            }),
        }
    }

    /// Runs `fire` on the timer thread once `delay` has elapsed.
    ///
    /// A delay too long to express as an [`Instant`] never elapses; `fire`
    /// is dropped without running.
    pub fn schedule<F>(&self, delay: Duration, fire: F) -> TimerHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let Some(deadline) = deadline_after(delay) else {
            tracing::debug!(timer = %self.inner.name, ?delay, "delay never elapses; callback dropped");
            return TimerHandle { cancelled };
        };
        let mut state = self.inner.state.lock();
        let generation = state.next_generation;
        state.next_generation += 1;
        state.heap.push(Reverse(TimerEntry {
            deadline,
            generation,
            cancelled: Arc::clone(&cancelled),
            fire: Box::new(fire),
        }));
        if !state.thread_started && !state.shutdown {
            state.thread_started = self.spawn_thread();
        }
        drop(state);
        self.inner.condvar.notify_one();
        TimerHandle { cancelled }
    }

    /// Number of callbacks waiting in the heap, including cancelled ones.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.state.lock().heap.len()
    }

    /// Stops the timer thread and drops all pending callbacks.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        state.shutdown = true;
        state.heap.clear();
        drop(state);
        self.inner.condvar.notify_all();
    }

    fn spawn_thread(&self) -> bool {
        let weak = Arc::downgrade(&self.inner);
        let name = format!("{}-timer", self.inner.name);
        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || timer_loop(&weak))
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(thread = %name, error = %e, "failed to spawn timer thread");
                false
            }
        }
    }
}

fn timer_loop(weak: &Weak<TimerInner>) {
    loop {
        let Some(inner) = weak.upgrade() else {
            return;
        };

        let due = {
            let mut state = inner.state.lock();
            if state.shutdown {
                return;
            }
            let now = Instant::now();
            let mut due = Vec::new();
            while state.heap.peek().is_some_and(|Reverse(e)| e.deadline <= now) {
                if let Some(Reverse(entry)) = state.heap.pop() {
                    due.push(entry);
                }
            }
            if due.is_empty() {
                let park = state
                    .heap
                    .peek()
                    .map_or(MAX_PARK, |Reverse(e)| e.deadline.saturating_duration_since(now))
                    .min(MAX_PARK);
                inner.condvar.wait_for(&mut state, park);
            }
            due
        };
        drop(inner);

        for entry in due {
            if entry.cancelled.load(AtomicOrdering::Acquire) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(entry.fire)).is_err() {
                tracing::error!("timer callback panicked");
            }
        }
    }
}
