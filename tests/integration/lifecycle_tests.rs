//! Boot cycle: configuration gate, report contents, commands, persistence.

use std::cell::RefCell;
use std::rc::Rc;

use brickos::app::CycleEnd;
use brickos::app::events::{BrickEvent, RestartReason, SetupReason, Tier};
use brickos::error::{ConnectivityError, ExchangeError, TransportError};

use super::mock_hw::*;

fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn unconfigured_brick_enters_setup_without_touching_the_radio() {
    let t = trace();
    let mut b = brick(ports(&t), 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::EnterSetup(SetupReason::MissingSsid)
    );
    assert_eq!(count(&t, |c| *c == Call::RadioWake), 0);
    assert!(posted(&t).is_empty());
    assert!(b.events().has(&BrickEvent::SetupEntered(SetupReason::MissingSsid)));
}

#[test]
fn missing_server_url_enters_setup() {
    let t = trace();
    let mut p = ports(&t);
    let mut durable = brickos::persist::DurableRegions::load(p.storage);
    durable.set("os", "ssid", SSID);
    durable.write().unwrap();
    p.storage = durable.into_storage();

    let mut b = brick(p, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::EnterSetup(SetupReason::MissingServer)
    );
    assert_eq!(count(&t, |c| *c == Call::RadioWake), 0);
}

#[test]
fn held_setup_input_wins_over_valid_config() {
    let t = trace();
    let mut p = provisioned(&t);
    p.system.setup_held = true;
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::EnterSetup(SetupReason::PinAsserted)
    );
    assert!(posted(&t).is_empty());
}

#[test]
fn os_region_defaults_are_filled_in() {
    let t = trace();
    let mut b = brick(ports(&t), 0);
    b.run_cycle();
    for key in ["ssid", "pass", "url", "id"] {
        assert!(b.durable().contains_key("os", key), "os.{key} missing");
    }
}

#[test]
fn cold_boot_reports_identity_then_warm_boot_sends_empty_report() {
    let t = trace();
    let mut b = brick(provisioned(&t), 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(b.is_cold_boot());
    assert!(b.events().has(&BrickEvent::Booted { cold: true }));
    assert_eq!(posted(&t), vec![r#"{"id":"brick-7"}"#.to_string()]);
    assert!(b.warm().is_valid(), "cycle end must leave a valid warm region");

    let mut b = reboot(b, 0);
    b.run_cycle();
    assert!(!b.is_cold_boot());
    assert_eq!(posted(&t)[1], "{}");
}

#[test]
fn report_goes_to_configured_server() {
    let t = trace();
    let mut b = brick(provisioned(&t), 0);
    b.run_cycle();
    let url = t.borrow().iter().find_map(|c| match c {
        Call::Post { url, .. } => Some(url.clone()),
        _ => None,
    });
    assert_eq!(url.as_deref(), Some(SERVER));
}

#[test]
fn firmware_id_request_is_answered_once_on_next_report() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply(r#"{"r":[11]}"#);
    let mut b = brick(p, 0);
    b.run_cycle();
    assert!(b.events().has(&BrickEvent::CommandReceived(11)));
    assert!(b.warm().data().firmware_id_requested);

    let mut b = reboot(b, 0);
    b.run_cycle();
    assert_eq!(posted(&t)[1], format!(r#"{{"m":"{}"}}"#, TEST_FIRMWARE));
    assert!(!b.warm().data().firmware_id_requested);

    let mut b = reboot(b, 0);
    b.run_cycle();
    assert_eq!(posted(&t)[2], "{}");
}

#[test]
fn unknown_request_codes_are_ignored() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply(r#"{"r":[7,"12",99]}"#);
    let mut b = brick(p, 0);
    b.run_cycle();

    assert!(
        !b.events()
            .events
            .iter()
            .any(|e| matches!(e, BrickEvent::CommandReceived(_)))
    );
    assert!(!b.warm().data().update_requested);
}

#[test]
fn exchange_failure_is_an_empty_reply() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply_err(TransportError::Timeout);
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(b.events().has(&BrickEvent::ExchangeFailed(ExchangeError::Transport(
        TransportError::Timeout
    ))));
    assert!(b.events().has(&BrickEvent::Exchanged { ok: false }));
}

#[test]
fn non_object_reply_is_an_empty_reply() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply("[12]");
    let mut b = brick(p, 0);
    b.run_cycle();

    assert!(b.events().has(&BrickEvent::ExchangeFailed(ExchangeError::Malformed)));
    assert!(!b.warm().data().update_requested);
}

#[test]
fn radio_failure_skips_exchange_but_completes_cycle() {
    let t = trace();
    let mut p = provisioned(&t);
    p.radio.fail_wake = true;
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(posted(&t).is_empty());
    assert!(b.events().has(&BrickEvent::ConnectFailed(ConnectivityError::RadioFailed)));
}

#[test]
fn feature_feedback_is_persisted() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply(r#"{"d":2}"#);
    let mut b = brick(p, 0);
    b.run_cycle();

    assert_eq!(count(&t, |c| *c == Call::StorageWrite), 1);

    // The stored delay survives a power cycle, not just a restart.
    let mut p = b.into_ports();
    p.warm = MockWarm::new(&t);
    let b = brick(p, 0);
    assert_eq!(b.durable().get("delay", "d"), Some(&serde_json::Value::from(2)));
}

#[test]
fn durable_write_failure_is_reported_and_cycle_continues() {
    let t = trace();
    let mut p = provisioned(&t);
    p.storage.fail_writes = true;
    p.http.reply(r#"{"d":1}"#);
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(b.events().has(&BrickEvent::PersistFailed(Tier::Durable)));
}

#[test]
fn warm_region_is_written_before_the_window_opens() {
    let t = trace();
    let mut p = provisioned(&t);
    p.http.reply(r#"{"r":[12]}"#);
    let mut b = brick(p, 1);
    b.run_cycle();

    let store = position(&t, |c| *c == Call::WarmStore { valid: true }).unwrap();
    let open = position(&t, |c| matches!(c, Call::ActivatorOpen(_))).unwrap();
    assert!(store < open, "pending update must survive a crash in the window");
}
