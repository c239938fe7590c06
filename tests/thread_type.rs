//! ThreadType pools: sizing, double queues, accounting and shutdown.

mod common;

use cascade::{CascadeBuilder, Chain, ErrorKind, ThreadType};
use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn serial_double_queue_helps_a_busy_pool() {
    init_test("serial_double_queue_helps_a_busy_pool");
    let worker = ThreadType::builder("dq-worker").threads(1, 1).build();
    let helper = ThreadType::builder("dq-helper")
        .serial()
        .double_queue(&worker)
        .build();

    // Both jobs meet at the barrier, so they must run on different threads
    // even though the worker owns only one.
    let barrier = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();
    for _ in 0..2 {
        let tx = tx.clone();
        let barrier = Arc::clone(&barrier);
        let probe = worker.clone();
        worker
            .submit(move || {
                let name = thread::current().name().map(str::to_owned);
                let _ = tx.send((name.unwrap_or_default(), probe.is_current_thread()));
                barrier.wait();
            })
            .expect("submit");
    }
    drop(tx);

    let mut ran: Vec<_> = rx.iter().take(2).collect();
    ran.sort();
    assert_eq!(ran.len(), 2);
    assert!(ran[0].0.contains("dq-helper"), "{ran:?}");
    assert!(ran[1].0.contains("dq-worker"), "{ran:?}");
    assert!(
        ran.iter().all(|(_, as_worker)| *as_worker),
        "borrowed job reports the worker's ThreadType"
    );

    assert!(worker.wait_quiescent(WAIT));
    assert!(helper.wait_quiescent(WAIT));
    test_complete!("serial_double_queue_helps_a_busy_pool");
}

#[test]
fn serial_worker_in_a_context_borrows_worker_jobs() {
    init_test("serial_worker_in_a_context_borrows_worker_jobs");
    let cascade = CascadeBuilder::new().worker_threads(1).build();
    let barrier = Arc::new(Barrier::new(2));

    // The lone worker thread waits for a job that only the serial worker
    // can pick up.
    let b = Arc::clone(&barrier);
    cascade
        .worker()
        .submit(move || {
            b.wait();
        })
        .expect("first");
    let b = Arc::clone(&barrier);
    cascade
        .worker()
        .submit(move || {
            b.wait();
        })
        .expect("second");

    assert!(cascade.worker().wait_quiescent(WAIT));
    test_complete!("serial_worker_in_a_context_borrows_worker_jobs");
}

#[test]
fn in_flight_counts_until_quiescent() {
    init_test("in_flight_counts_until_quiescent");
    let tt = ThreadType::serial("in-flight");
    let (release_tx, release_rx) = mpsc::channel::<()>();
    tt.submit(move || {
        let _ = release_rx.recv_timeout(WAIT);
    })
    .expect("blocker");
    for _ in 0..3 {
        tt.submit(|| {}).expect("queued");
    }

    assert_eq!(tt.in_flight(), 4);
    assert!(!tt.wait_quiescent(Duration::from_millis(20)));
    release_tx.send(()).expect("release");
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(tt.in_flight(), 0);
    test_complete!("in_flight_counts_until_quiescent");
}

#[test]
fn pool_grows_to_its_maximum_under_load() {
    init_test("pool_grows_to_its_maximum_under_load");
    let tt = ThreadType::pool("grow", 3);
    let barrier = Arc::new(Barrier::new(4));
    for _ in 0..3 {
        let barrier = Arc::clone(&barrier);
        tt.submit(move || {
            barrier.wait();
        })
        .expect("submit");
    }

    // Only completes if all three jobs run at once.
    barrier.wait();
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(tt.worker_pool().max_threads(), 3);
    test_complete!("pool_grows_to_its_maximum_under_load");
}

#[test]
fn thread_hooks_and_names_follow_the_builder() {
    init_test("thread_hooks_and_names_follow_the_builder");
    let started = Arc::new(AtomicUsize::new(0));
    let stopped = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&started);
    let t = Arc::clone(&stopped);
    let tt = ThreadType::builder("hooks")
        .serial()
        .thread_name_prefix("probe")
        .on_thread_start(move || {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .on_thread_stop(move || {
            t.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    let head = tt.then(|| Ok(thread::current().name().map(str::to_owned)));
    head.fork().expect("fork");
    let name = head.get_timeout(WAIT).expect("value");
    assert_eq!(name.as_deref(), Some("probe-hooks-0"));
    assert_eq!(started.load(Ordering::SeqCst), 1);

    assert!(tt.shutdown_and_wait(WAIT));
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    test_complete!("thread_hooks_and_names_follow_the_builder");
}

#[test]
fn chains_on_a_shut_down_thread_type_fail_with_rejection() {
    init_test("chains_on_a_shut_down_thread_type_fail_with_rejection");
    let tt = ThreadType::serial("closed");
    tt.shutdown();
    assert!(tt.is_shutdown());

    let head = tt.from(1);
    let error = head.fork().expect_err("fork submits the head");
    assert_eq!(error.kind(), ErrorKind::RejectedExecution);
    let failed = head.get_timeout(WAIT).expect_err("head failed");
    assert_eq!(failed.kind(), ErrorKind::RejectedExecution);
    test_complete!("chains_on_a_shut_down_thread_type_fail_with_rejection");
}
