//! Outbound lifecycle events.
//!
//! The orchestrator emits these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log to
//! serial, record in a test, etc.

use crate::error::{ConnectivityError, ExchangeError, UpdateError};
use crate::net::connection::JoinMode;

/// Which persistence tier an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Durable,
    Warm,
}

/// Why the configuration console was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupReason {
    PinAsserted,
    MissingSsid,
    MissingServer,
}

/// Why the brick is about to restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    CycleComplete,
    UpdateFinished,
    UpdateFailed,
    ConfigDestroyed,
}

/// Structured events emitted by the boot cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum BrickEvent {
    /// Initialisation finished; `cold` if the warm region was invalid.
    Booted { cold: bool },

    /// Configuration mode entered instead of a network cycle.
    SetupEntered(SetupReason),

    /// The radio join could not be started or completed.
    ConnectFailed(ConnectivityError),

    /// The fast path timed out and the join restarted as discovery.
    FastPathAbandoned,

    /// The link is up.
    Connected { mode: JoinMode, polls: u32 },

    /// The exchange finished.  `ok == false` means it was treated as empty.
    Exchanged { ok: bool },

    /// The exchange failed.
    ExchangeFailed(ExchangeError),

    /// An OS request arrived in `r`.
    CommandReceived(u8),

    /// A persistence write failed (not retried this cycle).
    PersistFailed(Tier),

    /// The Activator window closed.
    ActivatorClosed { pushed: bool, rejected: u32 },

    /// A firmware update is starting.
    UpdateStarted,

    /// The firmware update finished; the brick restarts next.
    UpdateFinished { bytes: u32 },

    /// The firmware update failed; the brick restarts next.
    UpdateFailed(UpdateError),

    /// The reset safety circuit counted a request.
    ResetRequest(u8),

    /// The reset safety circuit wiped the configuration.
    ConfigDestroyed,

    /// The brick restarts next.
    Restarting(RestartReason),
}
