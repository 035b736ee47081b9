//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing lifecycle events to the ESP-IDF
//! logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::BrickEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`BrickEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &BrickEvent) {
        match event {
            BrickEvent::Booted { cold } => {
                info!("BOOT | {}", if *cold { "cold" } else { "warm" });
            }
            BrickEvent::SetupEntered(reason) => {
                info!("SETUP | entered ({:?})", reason);
            }
            BrickEvent::ConnectFailed(e) => {
                warn!("NET | join failed: {}", e);
            }
            BrickEvent::FastPathAbandoned => {
                warn!("NET | fast path abandoned, rescanning");
            }
            BrickEvent::Connected { mode, polls } => {
                info!("NET | connected mode={:?} polls={}", mode, polls);
            }
            BrickEvent::Exchanged { ok } => {
                info!("PROTO | exchange {}", if *ok { "ok" } else { "empty" });
            }
            BrickEvent::ExchangeFailed(e) => {
                warn!("PROTO | exchange failed: {}", e);
            }
            BrickEvent::CommandReceived(code) => {
                info!("PROTO | request r={}", code);
            }
            BrickEvent::PersistFailed(tier) => {
                warn!("PERSIST | {:?} write failed", tier);
            }
            BrickEvent::ActivatorClosed { pushed, rejected } => {
                info!("ACTIVATOR | closed pushed={} rejected={}", pushed, rejected);
            }
            BrickEvent::UpdateStarted => {
                info!("UPDATE | started");
            }
            BrickEvent::UpdateFinished { bytes } => {
                info!("UPDATE | {} bytes flashed", bytes);
            }
            BrickEvent::UpdateFailed(e) => {
                warn!("UPDATE | failed: {}", e);
            }
            BrickEvent::ResetRequest(n) => {
                info!("RESET | request {}", n);
            }
            BrickEvent::ConfigDestroyed => {
                warn!("RESET | configuration destroyed");
            }
            BrickEvent::Restarting(reason) => {
                info!("BOOT | restarting ({:?})", reason);
            }
        }
    }
}
