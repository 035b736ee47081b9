//! Firmware update: requested by code 12, carried out on the next boot.

use std::cell::RefCell;
use std::rc::Rc;

use brickos::app::CycleEnd;
use brickos::app::events::{BrickEvent, RestartReason};
use brickos::error::{TransportError, UpdateError};

use super::mock_hw::*;

fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

fn image() -> Vec<u8> {
    (0..5000u32).map(|i| (i % 251) as u8).collect()
}

/// Run one cycle that receives code 12 and return the restarted brick.
fn update_requested(t: &Trace) -> brickos::app::Brick<MockPlatform> {
    let mut p = provisioned(t);
    p.http.reply(r#"{"r":[12]}"#);
    let mut b = brick(p, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(b.events().has(&BrickEvent::CommandReceived(12)));
    assert!(b.warm().data().update_requested);
    t.borrow_mut().clear();
    reboot(b, 0)
}

#[test]
fn update_runs_on_next_boot_and_flashes_the_image() {
    let t = trace();
    let mut p = update_requested(&t).into_ports();
    p.http.image = Some(image());
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::UpdateFinished)
    );
    assert_eq!(b.flash().image, image());
    assert!(b.flash().finalized);
    assert!(b.events().has(&BrickEvent::UpdateFinished { bytes: 5000 }));
    assert_eq!(
        position(&t, |c| matches!(c, Call::FirmwareOpen(_))).map(|i| t.borrow()[i].clone()),
        Some(Call::FirmwareOpen(format!("{SERVER}/ota")))
    );
    assert!(posted(&t).is_empty(), "no report during an update boot");
}

#[test]
fn request_is_cleared_before_any_network_activity() {
    let t = trace();
    let mut b = update_requested(&t);
    b.run_cycle();

    let cleared = position(&t, |c| *c == Call::WarmStore { valid: true }).unwrap();
    let wake = position(&t, |c| *c == Call::RadioWake).unwrap();
    assert!(cleared < wake);
}

#[test]
fn warm_region_is_invalidated_before_the_fetch() {
    let t = trace();
    let mut p = update_requested(&t).into_ports();
    p.http.image = Some(image());
    let mut b = brick(p, 0);
    b.run_cycle();

    let destroyed = position(&t, |c| *c == Call::WarmStore { valid: false }).unwrap();
    let fetch = position(&t, |c| matches!(c, Call::FirmwareOpen(_))).unwrap();
    assert!(destroyed < fetch);
    assert!(!b.warm().is_valid());

    // The next boot is cold and does not retry the update.
    let mut b = reboot(b, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete)
    );
    assert!(b.is_cold_boot());
    assert_eq!(posted(&t), vec![format!(r#"{{"id":"{IDENT}"}}"#)]);
}

#[test]
fn missing_image_fails_and_restarts() {
    let t = trace();
    let mut b = update_requested(&t);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::UpdateFailed)
    );
    assert!(b.events().has(&BrickEvent::UpdateFailed(UpdateError::Transport(
        TransportError::Status(404)
    ))));
    assert_eq!(count(&t, |c| matches!(c, Call::FlashBegin(_))), 0);

    let mut b = reboot(b, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::CycleComplete),
        "a failed update is not retried"
    );
}

#[test]
fn interrupted_download_aborts_the_flash() {
    let t = trace();
    let mut p = update_requested(&t).into_ports();
    p.http.image = Some(image());
    p.http.fail_after = Some(2048);
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::UpdateFailed)
    );
    assert_eq!(count(&t, |c| *c == Call::FlashAbort), 1);
    assert_eq!(count(&t, |c| *c == Call::FlashFinalize), 0);
    assert!(b.flash().image.is_empty());
}

#[test]
fn led_toggles_per_chunk() {
    let t = trace();
    let mut p = update_requested(&t).into_ports();
    p.http.image = Some(image());
    let mut b = brick(p, 0);
    b.run_cycle();
    // 5000 bytes in 1024-byte chunks.
    assert_eq!(b.led().history.len(), 5);
}

#[test]
fn unreachable_network_fails_the_update() {
    let t = trace();
    let mut p = update_requested(&t).into_ports();
    p.radio.fail_wake = true;
    let mut b = brick(p, 0);

    assert_eq!(
        b.run_cycle(),
        CycleEnd::Restart(RestartReason::UpdateFailed)
    );
    assert_eq!(count(&t, |c| matches!(c, Call::FirmwareOpen(_))), 0);
    assert!(!b.warm().data().update_requested);
}
