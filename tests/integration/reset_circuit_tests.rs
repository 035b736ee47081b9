//! Reset safety circuit in configuration mode.

use std::cell::RefCell;
use std::rc::Rc;

use brickos::adapters::console::LogConsole;
use brickos::app::CycleEnd;
use brickos::app::events::{BrickEvent, SetupReason};
use brickos::app::ports::StatusIndicator;
use brickos::config::OsConfig;
use brickos::safety::{CircuitState, EdgeOutcome, ResetCircuit, ResetCounter};

use super::mock_hw::*;

fn trace() -> Trace {
    Rc::new(RefCell::new(Vec::new()))
}

/// A provisioned brick held in configuration mode by the setup input.
fn in_setup(t: &Trace) -> brickos::app::Brick<MockPlatform> {
    let mut p = provisioned(t);
    p.system.setup_held = true;
    let mut b = brick(p, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::EnterSetup(SetupReason::PinAsserted)
    );
    b
}

#[test]
fn entering_setup_lights_led_and_arms() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let circuit = b.enter_setup(&counter);

    assert_eq!(circuit.state(), CircuitState::Armed);
    assert!(b.led().is_on());
    assert!(b.into_ports().system.edges_enabled);
}

#[test]
fn three_triggers_keep_config_and_fourth_erases_it() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    for (n, at) in [(1, 1_000), (2, 2_000), (3, 3_000)] {
        assert_eq!(b.reset_edge(&mut circuit, at), EdgeOutcome::Counted(n));
        assert_eq!(b.durable().ssid(), SSID, "config must survive trigger {n}");
    }
    assert_eq!(count(&t, |c| *c == Call::StorageWrite), 0);
    assert!(b.led().is_on(), "idle level between requests");

    let before = b.led().history.len();
    let hold = OsConfig::default().destroy_hold_ms;
    assert_eq!(b.reset_edge(&mut circuit, 4_000), EdgeOutcome::Destroyed);
    assert_eq!(
        b.led().history[before..],
        [false, true, false, true, false],
        "two blinks, then held off"
    );
    assert!(!b.led().is_on());
    assert_eq!(b.clock().delays.last(), Some(&hold));
    assert_eq!(circuit.state(), CircuitState::Destroyed);
    assert!(b.durable().ssid().is_empty());
    assert!(!b.warm().is_valid());
    assert_eq!(count(&t, |c| *c == Call::StorageWrite), 1);
    assert!(b.events().has(&BrickEvent::ResetRequest(3)));
    assert!(b.events().has(&BrickEvent::ConfigDestroyed));

    // After the restart the brick has nothing left to connect with.
    let mut p = b.into_ports();
    p.system.setup_held = false;
    let mut b = brick(p, 0);
    assert_eq!(
        b.run_cycle(),
        CycleEnd::EnterSetup(SetupReason::MissingSsid)
    );
    assert!(b.is_cold_boot());
    assert_eq!(count(&t, |c| *c == Call::RadioWake), 0);
}

#[test]
fn bounces_are_not_counted() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    assert_eq!(b.reset_edge(&mut circuit, 1_000), EdgeOutcome::Counted(1));
    assert_eq!(b.reset_edge(&mut circuit, 1_100), EdgeOutcome::Bounce);
    assert_eq!(b.reset_edge(&mut circuit, 1_399), EdgeOutcome::Bounce);
    assert_eq!(counter.count(), 1);
    assert_eq!(b.reset_edge(&mut circuit, 1_400), EdgeOutcome::Counted(2));
}

#[test]
fn accepted_trigger_blinks_twice() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    let before = b.led().history.len();
    b.reset_edge(&mut circuit, 1_000);
    assert_eq!(b.led().history[before..], [false, true, false, true]);
    assert!(b.led().is_on());

    let before = b.led().history.len();
    b.reset_edge(&mut circuit, 1_001);
    assert_eq!(b.led().history.len(), before, "bounce is not acknowledged");
}

#[test]
fn unarmed_circuit_ignores_edges() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let mut circuit = ResetCircuit::new(b.config(), &counter);

    assert_eq!(b.reset_edge(&mut circuit, 1_000), EdgeOutcome::Ignored);
    circuit.arm();
    circuit.disarm();
    assert_eq!(b.reset_edge(&mut circuit, 5_000), EdgeOutcome::Ignored);
    assert_eq!(counter.count(), 0);
}

#[test]
fn destroyed_circuit_ignores_further_edges() {
    let t = trace();
    let mut b = in_setup(&t);
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    for i in 1..=4u32 {
        b.reset_edge(&mut circuit, i * 1_000);
    }
    assert_eq!(b.reset_edge(&mut circuit, 9_000), EdgeOutcome::Ignored);
    assert_eq!(counter.count(), 4);
}

#[test]
fn erase_completes_even_if_flash_write_fails() {
    let t = trace();
    let mut p = provisioned(&t);
    p.system.setup_held = true;
    p.storage.fail_writes = true;
    let mut b = brick(p, 0);
    b.run_cycle();
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    for i in 1..=3u32 {
        b.reset_edge(&mut circuit, i * 1_000);
    }
    assert_eq!(b.reset_edge(&mut circuit, 4_000), EdgeOutcome::Destroyed);
    assert!(b.durable().ssid().is_empty());
    assert_eq!(count(&t, |c| *c == Call::WarmStore { valid: false }), 1);
}

#[test]
fn isr_edges_are_acknowledged_on_the_next_step() {
    let t = trace();
    let mut b = in_setup(&t);
    let mut console = LogConsole::new();
    let counter = ResetCounter::new();

    // Edges from before configuration mode do not count.
    assert_eq!(counter.record_edge(500), None);
    let mut circuit = b.enter_setup(&counter);
    assert_eq!(b.setup_step(&mut console, &mut circuit), EdgeOutcome::Ignored);

    assert!(counter.record_edge(10_000).is_some());
    assert_eq!(
        b.setup_step(&mut console, &mut circuit),
        EdgeOutcome::Counted(1)
    );
    assert_eq!(b.setup_step(&mut console, &mut circuit), EdgeOutcome::Ignored);
    assert!(b.events().has(&BrickEvent::ResetRequest(1)));
}

#[test]
fn presses_during_one_console_step_all_count() {
    let t = trace();
    let mut b = in_setup(&t);
    let mut console = LogConsole::new();
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    // Two presses while the console is busy.
    counter.record_edge(10_000);
    counter.record_edge(12_000);
    assert_eq!(counter.count(), 2);

    let before = b.led().history.len();
    assert_eq!(
        b.setup_step(&mut console, &mut circuit),
        EdgeOutcome::Counted(2)
    );
    assert_eq!(b.led().history.len() - before, 8, "two blinks per request");
    assert_eq!(b.setup_step(&mut console, &mut circuit), EdgeOutcome::Ignored);
    assert!(b.events().has(&BrickEvent::ResetRequest(2)));
}

#[test]
fn four_presses_during_one_console_step_erase() {
    let t = trace();
    let mut b = in_setup(&t);
    let mut console = LogConsole::new();
    let counter = ResetCounter::new();
    let mut circuit = b.enter_setup(&counter);

    for at in [10_000, 11_000, 11_100, 12_000, 13_000] {
        counter.record_edge(at);
    }
    assert_eq!(counter.count(), 4, "the bounce at 11100 is not counted");
    assert_eq!(
        b.setup_step(&mut console, &mut circuit),
        EdgeOutcome::Destroyed
    );
    assert!(b.durable().ssid().is_empty());
    assert!(!b.warm().is_valid());
    assert!(!b.led().is_on());

    // The counter is closed once the wipe is decided.
    assert_eq!(counter.record_edge(20_000), None);
    assert_eq!(b.setup_step(&mut console, &mut circuit), EdgeOutcome::Ignored);
}
