//! Reset safety circuit.
//!
//! While configuration mode is active, every falling edge on the setup
//! input counts as a request to wipe the configuration.  The fourth
//! accepted request destroys both persistence tiers and restarts the brick.
//!
//! ## Edge lifecycle
//!
//! 1. The GPIO ISR calls [`record_edge`], which runs
//!    [`ResetCounter::record_edge`] on [`RESET_COUNTER`]: debounce check,
//!    increment and threshold check inside one critical section.  Edges
//!    within the debounce interval of the last accepted edge are bounces.
//!    Nothing is counted while the counter is closed, and reaching the
//!    threshold closes it.
//! 2. The foreground loop calls [`ResetCircuit::poll`], which compares the
//!    count with the requests it already acknowledged.
//! 3. Every new request is acknowledged: debounce wait, then two blinks.
//! 4. At the threshold the durable configuration is cleared and written,
//!    the warm region is invalidated and the LED is held off before the
//!    caller restarts the chip.
//!
//! ```text
//!   Idle ──arm──▶ Armed ──threshold──▶ Destroyed
//!     ▲             │
//!     └───disarm────┘
//! ```

use core::cell::Cell;
use core::sync::atomic::{AtomicU8, Ordering};

use critical_section::{CriticalSection, Mutex};
use log::{info, warn};

use crate::app::ports::{Clock, StatusIndicator, StoragePort, WarmMemory};
use crate::config::OsConfig;
use crate::persist::{DurableRegions, WarmRegion, WarmState};

// ── Counter ───────────────────────────────────────────────────

/// Classification of one edge by [`ResetCounter::increment_and_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Within the debounce interval of the last accepted edge.
    Bounce,
    /// Accepted; carries the new count.
    Counted(u8),
    /// Accepted and the count reached the threshold.
    Threshold(u8),
}

/// Limits the interrupt side counts with while the counter is open.
#[derive(Debug, Clone, Copy)]
struct Gate {
    debounce_ms: u32,
    threshold: u8,
}

/// Count of accepted reset requests since power-up.  RAM only.
pub struct ResetCounter {
    count: AtomicU8,
    last_edge: Mutex<Cell<Option<u32>>>,
    gate: Mutex<Cell<Option<Gate>>>,
}

/// The process-wide counter the setup input feeds.
pub static RESET_COUNTER: ResetCounter = ResetCounter::new();

/// ISR entry point for a falling edge of the setup input.  No allocation,
/// no blocking: one critical section on [`RESET_COUNTER`].
pub fn record_edge(now_ms: u32) {
    let _ = RESET_COUNTER.record_edge(now_ms);
}

impl ResetCounter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU8::new(0),
            last_edge: Mutex::new(Cell::new(None)),
            gate: Mutex::new(Cell::new(None)),
        }
    }

    pub fn count(&self) -> u8 {
        self.count.load(Ordering::Acquire)
    }

    /// Start counting edges with the given limits.
    pub fn open(&self, debounce_ms: u32, threshold: u8) {
        critical_section::with(|cs| {
            self.gate.borrow(cs).set(Some(Gate {
                debounce_ms,
                threshold,
            }));
        });
    }

    /// Stop counting edges.
    pub fn close(&self) {
        critical_section::with(|cs| self.gate.borrow(cs).set(None));
    }

    pub fn is_open(&self) -> bool {
        critical_section::with(|cs| self.gate.borrow(cs).get().is_some())
    }

    /// Interrupt-side handling of one edge.  `None` while closed.
    pub fn record_edge(&self, edge_ms: u32) -> Option<Trigger> {
        critical_section::with(|cs| {
            let gate = self.gate.borrow(cs);
            let Gate {
                debounce_ms,
                threshold,
            } = gate.get()?;
            let trigger = self.count_edge(cs, edge_ms, debounce_ms, threshold);
            if let Trigger::Threshold(_) = trigger {
                gate.set(None);
            }
            Some(trigger)
        })
    }

    /// Debounce-check `edge_ms`, count it, compare with `threshold`.
    /// Runs inside a critical section.
    pub fn increment_and_check(&self, edge_ms: u32, debounce_ms: u32, threshold: u8) -> Trigger {
        critical_section::with(|cs| self.count_edge(cs, edge_ms, debounce_ms, threshold))
    }

    fn count_edge(
        &self,
        cs: CriticalSection<'_>,
        edge_ms: u32,
        debounce_ms: u32,
        threshold: u8,
    ) -> Trigger {
        let last = self.last_edge.borrow(cs);
        if let Some(prev) = last.get() {
            if edge_ms.wrapping_sub(prev) < debounce_ms {
                return Trigger::Bounce;
            }
        }
        last.set(Some(edge_ms));
        let n = self.count.load(Ordering::Relaxed).saturating_add(1);
        self.count.store(n, Ordering::Release);
        if n >= threshold {
            Trigger::Threshold(n)
        } else {
            Trigger::Counted(n)
        }
    }
}

impl Default for ResetCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Circuit ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Idle,
    Armed,
    Destroyed,
}

/// What handling an edge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// No new request, or the circuit is not armed.
    Ignored,
    Bounce,
    /// Carries the newest count.
    Counted(u8),
    /// Configuration erased; the caller must restart now.
    Destroyed,
}

pub struct ResetCircuit<'c> {
    counter: &'c ResetCounter,
    state: CircuitState,
    /// Requests already blinked back to the user.
    acked: u8,
    debounce_ms: u32,
    blink_ms: u32,
    threshold: u8,
    hold_ms: u32,
}

impl<'c> ResetCircuit<'c> {
    pub fn new(config: &OsConfig, counter: &'c ResetCounter) -> Self {
        Self {
            counter,
            state: CircuitState::Idle,
            acked: counter.count(),
            debounce_ms: config.debounce_ms,
            blink_ms: config.blink_ms,
            threshold: config.reset_threshold,
            hold_ms: config.destroy_hold_ms,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Open the counter for edges.  Edges from before arming were never
    /// counted.
    pub fn arm(&mut self) {
        if self.state == CircuitState::Idle {
            self.acked = self.counter.count();
            self.counter.open(self.debounce_ms, self.threshold);
            self.state = CircuitState::Armed;
            info!("RESET: circuit armed (count={})", self.acked);
        }
    }

    pub fn disarm(&mut self) {
        if self.state == CircuitState::Armed {
            self.counter.close();
            self.state = CircuitState::Idle;
        }
    }

    /// Acknowledge every request the ISR counted since the last poll.
    pub fn poll<S: StoragePort, M: WarmMemory>(
        &mut self,
        led: &mut impl StatusIndicator,
        clock: &mut impl Clock,
        durable: &mut DurableRegions<S>,
        warm: &mut WarmRegion<M, WarmState>,
    ) -> EdgeOutcome {
        if self.state != CircuitState::Armed {
            return EdgeOutcome::Ignored;
        }
        let count = self.counter.count();
        if count <= self.acked {
            return EdgeOutcome::Ignored;
        }
        if count >= self.threshold {
            // Nothing may re-enter the circuit once the wipe is decided.
            self.state = CircuitState::Destroyed;
        }

        while self.acked < count {
            self.acked += 1;
            clock.delay_ms(self.debounce_ms);
            for _ in 0..2 {
                clock.delay_ms(self.blink_ms);
                led.set(false);
                clock.delay_ms(self.blink_ms);
                led.set(true);
            }
        }

        if self.state != CircuitState::Destroyed {
            info!("RESET: request {}/{}", count, self.threshold);
            return EdgeOutcome::Counted(count);
        }

        warn!("RESET: threshold reached, destroying configuration");
        durable.destroy();
        if let Err(e) = durable.write() {
            warn!("RESET: durable erase not persisted ({})", e);
        }
        if let Err(e) = warm.destroy() {
            warn!("RESET: warm region not invalidated ({})", e);
        }
        clock.delay_ms(self.blink_ms);
        led.set(false);
        clock.delay_ms(self.hold_ms);
        EdgeOutcome::Destroyed
    }

    /// Count an edge at `edge_ms` the way the ISR does, then acknowledge it.
    pub fn handle_edge<S: StoragePort, M: WarmMemory>(
        &mut self,
        edge_ms: u32,
        led: &mut impl StatusIndicator,
        clock: &mut impl Clock,
        durable: &mut DurableRegions<S>,
        warm: &mut WarmRegion<M, WarmState>,
    ) -> EdgeOutcome {
        if self.state != CircuitState::Armed {
            return EdgeOutcome::Ignored;
        }
        match self.counter.record_edge(edge_ms) {
            None => EdgeOutcome::Ignored,
            Some(Trigger::Bounce) => EdgeOutcome::Bounce,
            Some(_) => self.poll(led, clock, durable, warm),
        }
    }
}
