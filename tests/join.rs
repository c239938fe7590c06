//! `await_all` joins across independent chains.

mod common;

use cascade::{CancelKind, CancelReason, Chain, Error, ErrorKind, Outcome, Status, ThreadType};
use common::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn join_waits_for_every_member() {
    init_test("join_waits_for_every_member");
    let tt = ThreadType::pool("join", 4);
    let slow = tt.from(1).sleep(Duration::from_millis(150)).map(|n: i32| n * 10);
    let fast = tt.from("quick".to_string());

    let joined = tt
        .from(7)
        .await_all([slow.erased(), fast.erased()])
        .map(|n: i32| n + 1);
    joined.fork().expect("fork");

    assert_eq!(joined.get_timeout(WAIT).expect("joined"), 8);
    assert!(slow.is_done(), "slow member settled before the join ran");
    assert!(fast.is_done());
    assert_eq!(slow.safe_get(), Some(10));
    test_complete!("join_waits_for_every_member");
}

#[test]
fn join_holds_until_a_settable_member_is_set() {
    init_test("join_holds_until_a_settable_member_is_set");
    let tt = ThreadType::serial("join-settable");
    let gate = tt.settable::<()>();
    let joined = tt.from(3).await_all([gate.erased()]);
    joined.fork().expect("fork");

    std::thread::sleep(Duration::from_millis(50));
    assert_with_log!(!joined.is_done(), "join still open", false, joined.is_done());

    gate.set(()).expect("set");
    assert_eq!(joined.get_timeout(WAIT).expect("joined"), 3);
    test_complete!("join_holds_until_a_settable_member_is_set");
}

#[test]
fn member_failure_fails_the_join_naming_the_member() {
    init_test("member_failure_fails_the_join_naming_the_member");
    let tt = ThreadType::pool("join-fail", 2);
    let member = tt.settable::<i32>();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);

    let joined = tt.from(1).await_all([member.erased()]).map(move |n: i32| {
        flag.store(true, Ordering::SeqCst);
        n
    });
    joined.fork().expect("fork");
    member
        .set_error(Error::new(ErrorKind::ActionFailure).with_message("no route"))
        .expect("set_error");

    let error = joined.get_timeout(WAIT).expect_err("join must fail");
    assert_eq!(error.kind(), ErrorKind::JoinFailure);
    assert!(error.to_string().contains("no route"), "{error}");
    match joined.outcome() {
        Some(Outcome::Err(failure)) => assert_eq!(failure.node(), member.id()),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!ran.load(Ordering::SeqCst));
    test_complete!("member_failure_fails_the_join_naming_the_member");
}

#[test]
fn member_cancellation_cancels_the_join() {
    init_test("member_cancellation_cancels_the_join");
    let tt = ThreadType::serial("join-cancel");
    let member = tt.settable::<i32>();
    let joined = tt.from(1).await_all([member.erased()]);
    joined.fork().expect("fork");

    assert!(member.cancel(CancelReason::user("member gone")));
    assert!(joined.erased().wait(WAIT));
    match joined.outcome() {
        Some(Outcome::Cancelled(reason)) => {
            assert_eq!(reason.kind(), CancelKind::User);
            assert_eq!(reason.message(), Some("member gone"));
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
    test_complete!("member_cancellation_cancels_the_join");
}

#[test]
fn forking_the_join_forks_its_members() {
    init_test("forking_the_join_forks_its_members");
    let tt = ThreadType::pool("join-fork", 2);
    let a = tt.from(1).map(|n: i32| n + 1);
    let b = tt.from(2).map(|n: i32| n + 2);
    assert_eq!(a.status(), Status::Unforked);

    let joined = tt.from(0).await_all([a.erased(), b.erased()]);
    joined.fork().expect("fork");

    assert!(joined.erased().wait(WAIT));
    assert!(a.is_forked());
    assert!(b.is_forked());
    assert_eq!(a.get_timeout(WAIT).expect("a"), 2);
    assert_eq!(b.get_timeout(WAIT).expect("b"), 4);
    test_complete!("forking_the_join_forks_its_members");
}

#[test]
fn join_without_members_behaves_like_a_pass_through() {
    init_test("join_without_members_behaves_like_a_pass_through");
    let tt = ThreadType::serial("join-empty");
    let joined = tt.from(42).await_all(std::iter::empty());
    joined.fork().expect("fork");
    assert_eq!(joined.get_timeout(WAIT).expect("joined"), 42);
    test_complete!("join_without_members_behaves_like_a_pass_through");
}
