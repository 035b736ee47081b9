//! Activator window: server pushes after the exchange.

use std::cell::RefCell;
use std::rc::Rc;

use brickos::app::events::BrickEvent;
use brickos::app::ports::Method;
use brickos::config::OsConfig;
use brickos::features::FeatureRegistry;
use brickos::net::activator::ActivatorWindow;
use brickos::persist::DurableRegions;
use serde_json::Value;

use super::mock_hw::*;

const POLL_MS: u32 = 1000;

fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn push_is_dispatched_and_closes_the_window_early() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(2, Method::Post, "/", r#"{"d":30}"#);
    let mut b = brick(p, 10);
    b.run_cycle();

    assert_eq!(b.activator().statuses(), vec![200]);
    assert_eq!(b.activator().answered[0].1.body, r#"{"s":0}"#);
    assert_eq!(b.clock().waits_of(POLL_MS), 2, "closed on the poll that took the push");
    assert!(!b.activator().is_open());
    assert!(b.events().has(&BrickEvent::ActivatorClosed {
        pushed: true,
        rejected: 0
    }));
    assert_eq!(b.durable().get("delay", "d"), Some(&Value::from(30)));
    assert!(count(&t, |c| *c == Call::StorageWrite) >= 1, "push feedback persisted");
}

#[test]
fn wrong_path_keeps_the_window_open() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(0, Method::Post, "/status", "{}");
    let mut b = brick(p, 5);
    b.run_cycle();

    let (_, reply) = &b.activator().answered[0];
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, r#"{"s":1,"m":"wrong url"}"#);
    assert_eq!(b.clock().waits_of(POLL_MS), 5, "window ran its full length");
    assert!(b.events().has(&BrickEvent::ActivatorClosed {
        pushed: false,
        rejected: 1
    }));
}

#[test]
fn wrong_method_and_malformed_body_are_rejected() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(0, Method::Get, "/", "");
    p.activator.schedule(1, Method::Post, "/", "not json");
    p.activator.schedule(1, Method::Post, "/", "[1,2]");
    let mut b = brick(p, 3);
    b.run_cycle();

    assert_eq!(b.activator().statuses(), vec![405, 400, 400]);
    assert_eq!(
        b.activator().answered[1].1.body,
        r#"{"s":4,"m":"malformed body"}"#
    );
    assert_eq!(b.clock().waits_of(POLL_MS), 3);
}

#[test]
fn second_push_in_the_same_batch_is_refused() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(1, Method::Post, "/", r#"{"d":7}"#);
    p.activator.schedule(1, Method::Post, "/", r#"{"d":9}"#);
    let mut b = brick(p, 10);
    b.run_cycle();

    assert_eq!(b.activator().statuses(), vec![200, 503]);
    assert_eq!(
        b.activator().answered[1].1.body,
        r#"{"s":3,"m":"window closed"}"#
    );
    assert_eq!(b.durable().get("delay", "d"), Some(&Value::from(7)));
}

#[test]
fn request_arriving_with_the_push_is_refused_before_close() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(0, Method::Post, "/", r#"{"d":4}"#);
    p.activator.schedule(1, Method::Post, "/", r#"{"d":8}"#);
    let mut b = brick(p, 10);
    b.run_cycle();

    // The drain after the push answers the straggler instead of dropping it.
    assert_eq!(b.activator().statuses(), vec![200, 503]);
    assert_eq!(b.activator().undelivered(), 0);
}

#[test]
fn late_push_is_never_dispatched() {
    let t = trace();
    let mut p = provisioned(&t);
    p.activator.schedule(50, Method::Post, "/", r#"{"d":99}"#);
    let mut b = brick(p, 3);
    b.run_cycle();

    assert!(b.activator().answered.is_empty());
    assert_eq!(b.activator().undelivered(), 1);
    assert_eq!(b.durable().get("delay", "d"), Some(&Value::from(3)));
    assert_eq!(count(&t, |c| *c == Call::ActivatorClose), 1);
}

#[test]
fn zero_window_never_opens_the_listener() {
    let t = trace();
    let mut b = brick(provisioned(&t), 0);
    b.run_cycle();

    assert_eq!(count(&t, |c| matches!(c, Call::ActivatorOpen(_))), 0);
    assert!(
        !b.events()
            .events
            .iter()
            .any(|e| matches!(e, BrickEvent::ActivatorClosed { .. }))
    );
}

#[test]
fn listener_opens_on_configured_port() {
    let t = trace();
    let mut b = brick(provisioned(&t), 1);
    b.run_cycle();
    let port = OsConfig::default().activator_port;
    assert!(position(&t, |c| *c == Call::ActivatorOpen(port)).is_some());
}

#[test]
fn listener_failure_skips_the_window() {
    let t = trace();
    let mut activator = MockActivator::new(&t);
    activator.fail_open = true;
    activator.schedule(0, Method::Post, "/", "{}");
    let mut clock = MockClock::default();
    let mut features = FeatureRegistry::new();
    let mut durable = DurableRegions::load(MockStorage::new(&t));

    let outcome = ActivatorWindow::new(&OsConfig::default()).run(
        &mut activator,
        &mut clock,
        5,
        &mut features,
        &mut durable,
    );

    assert!(!outcome.pushed);
    assert_eq!(outcome.polls, 0);
    assert!(clock.delays.is_empty());
}

#[test]
fn window_length_follows_server_feedback() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply(r#"{"d":4}"#);
    let mut b = brick(p, 1);
    b.run_cycle();

    assert_eq!(b.clock().waits_of(POLL_MS), 4);
}
