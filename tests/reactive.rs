//! Reactive values as chain targets and notification sources.

mod common;

use cascade::{Chain, ReactiveValue, ThreadType};
use common::*;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;

#[test]
fn serial_subscriber_sees_writes_in_commit_order() {
    init_test("serial_subscriber_sees_writes_in_commit_order");
    let tt = ThreadType::serial("reactive-order");
    let value = ReactiveValue::new("counter", 0_u32);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    value.subscribe(&tt, move |n| sink.lock().push(n));

    for n in 1..=50 {
        assert!(value.set(n));
    }
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(*seen.lock(), (1..=50).collect::<Vec<_>>());
    test_complete!("serial_subscriber_sees_writes_in_commit_order", writes = 50);
}

#[test]
fn unchanged_writes_notify_nobody() {
    init_test("unchanged_writes_notify_nobody");
    let tt = ThreadType::serial("reactive-same");
    let value = ReactiveValue::new("flag", true);
    let (tx, rx) = mpsc::channel();
    value.subscribe(&tt, move |v| {
        let _ = tx.send(v);
    });

    assert!(!value.set(true));
    assert!(value.set(false));
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![false]);
    test_complete!("unchanged_writes_notify_nobody");
}

#[test]
fn chain_writes_through_set_target() {
    init_test("chain_writes_through_set_target");
    let worker = ThreadType::pool("reactive-worker", 2);
    let ui = ThreadType::serial("reactive-ui");
    let label = ReactiveValue::new("label", String::new());

    let (tx, rx) = mpsc::channel();
    let probe = ui.clone();
    label.subscribe(&ui, move |text| {
        let _ = tx.send((text, probe.is_current_thread()));
    });

    let tail = worker
        .from(6)
        .map(|n: i32| format!("total: {}", n * 7))
        .set_target(label.clone());
    tail.fork().expect("fork");

    assert_eq!(tail.get_timeout(WAIT).expect("tail"), "total: 42");
    assert_eq!(label.get(), "total: 42");
    let (text, on_ui) = rx.recv_timeout(WAIT).expect("notification");
    assert_eq!(text, "total: 42");
    assert!(on_ui, "subscriber runs on its own ThreadType");
    test_complete!("chain_writes_through_set_target");
}

#[test]
fn subscribers_on_different_thread_types_each_hear_the_change() {
    init_test("subscribers_on_different_thread_types_each_hear_the_change");
    let a = ThreadType::serial("reactive-a");
    let b = ThreadType::pool("reactive-b", 2);
    let value = ReactiveValue::new("shared", 0_i64);

    let (tx, rx) = mpsc::channel();
    for (tag, tt) in [("a", &a), ("b", &b)] {
        let tx = tx.clone();
        let probe = tt.clone();
        value.subscribe(tt, move |v| {
            let _ = tx.send((tag, v, probe.is_current_thread()));
        });
    }
    drop(tx);
    assert_eq!(value.subscriber_count(), 2);

    value.set(99);
    let mut got: Vec<_> = rx.iter().take(2).collect();
    got.sort_unstable();
    assert_eq!(got, vec![("a", 99, true), ("b", 99, true)]);
    test_complete!("subscribers_on_different_thread_types_each_hear_the_change");
}

#[test]
fn next_feeds_a_chain_once() {
    init_test("next_feeds_a_chain_once");
    let tt = ThreadType::serial("reactive-next");
    let value = ReactiveValue::new("temperature", 20);

    let doubled = value.next(&tt).map(|t: i32| t * 2);
    doubled.fork().expect("fork");
    assert_eq!(value.subscriber_count(), 1);

    value.set(21);
    assert_eq!(doubled.get_timeout(WAIT).expect("doubled"), 42);
    assert_eq!(value.subscriber_count(), 0);

    // A later change does not reach the settled chain.
    value.set(22);
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(doubled.safe_get(), Some(42));
    test_complete!("next_feeds_a_chain_once");
}

#[test]
fn unsubscribed_callbacks_stop_receiving() {
    init_test("unsubscribed_callbacks_stop_receiving");
    let tt = ThreadType::serial("reactive-unsub");
    let value = ReactiveValue::new("level", 1_u8);
    let (tx, rx) = mpsc::channel();
    let id = value.subscribe(&tt, move |v| {
        let _ = tx.send(v);
    });

    value.set(2);
    assert!(tt.wait_quiescent(WAIT));
    assert!(value.unsubscribe(id));
    assert!(!value.unsubscribe(id));
    value.set(3);
    assert!(tt.wait_quiescent(WAIT));
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![2]);
    test_complete!("unsubscribed_callbacks_stop_receiving");
}
