//! Port traits: the hexagonal boundary between the Brick OS lifecycle and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Brick (orchestrator)
//! ```
//!
//! Every piece of hardware the lifecycle touches (flash, RTC memory, radio,
//! HTTP, the push listener, the OTA partition, clock, LED, setup input) sits
//! behind one of these traits.  The orchestrator consumes them through the
//! [`Platform`] bundle, so the whole boot cycle runs on the host against
//! mocks.
//!
//! All port errors are typed; callers handle every variant explicitly.

use crate::error::{ConnectivityError, TransportError};
use crate::update::ota::OtaError;

use super::events::BrickEvent;

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The lifecycle emits structured [`BrickEvent`]s through this port.
/// Adapters decide where they go (serial log, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &BrickEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (durable tier: NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic: no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Warm memory port (RTC no-init RAM)
// ───────────────────────────────────────────────────────────────

/// Raw byte region that survives a software restart but not power loss.
///
/// After power-up its contents are arbitrary; validity is decided by the
/// header the [`WarmRegion`](crate::persist::warm::WarmRegion) writes.
pub trait WarmMemory {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Copy the region into `buf` (up to `buf.len()` bytes).
    fn load(&self, buf: &mut [u8]) -> usize;

    /// Overwrite the start of the region with `data`.
    fn store(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Radio port (WiFi station)
// ───────────────────────────────────────────────────────────────

/// WiFi station credentials as configured in the durable `os` region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: heapless::String<32>,
    pub secret: heapless::String<64>,
}

/// Link parameters remembered across restarts for a fast-path join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    pub channel: u8,
    pub bssid: [u8; 6],
}

/// WiFi station driver.
///
/// `begin` only starts the join; completion is observed by polling
/// [`is_connected`](Self::is_connected).
pub trait RadioPort {
    /// Power the radio up in station mode without persisting settings.
    fn wake(&mut self) -> Result<(), ConnectivityError>;

    /// Power the radio down.
    fn sleep(&mut self);

    /// Start a join.  `fast_path` pins channel and BSSID; `None` scans.
    fn begin(
        &mut self,
        creds: &Credentials,
        fast_path: Option<LinkInfo>,
    ) -> Result<(), ConnectivityError>;

    /// Poll the association + IP state.
    fn is_connected(&mut self) -> bool;

    /// Channel and BSSID of the current association.
    fn link_info(&self) -> Option<LinkInfo>;

    /// Drop the association (the radio stays powered).
    fn disconnect(&mut self);
}

// ───────────────────────────────────────────────────────────────
// HTTP client ports
// ───────────────────────────────────────────────────────────────

/// One-shot JSON POST to the BrickServer.
pub trait HttpPort {
    /// POST `body` with `Content-Type: application/json` and return the
    /// full response body, whatever the HTTP status.
    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// Streaming GET used to download a firmware image.
pub trait FirmwareSource {
    /// Issue the request.  Returns the declared content length, if any.
    fn open(&mut self, url: &str) -> Result<Option<u32>, TransportError>;

    /// Read the next chunk of the body.  `Ok(0)` marks the end.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Activator port (inbound push listener)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Other,
}

/// A request received by the push listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

/// Reply the listener sends back, with a JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushReply {
    pub status: u16,
    pub body: String,
}

/// HTTP listener that accepts server-initiated pushes.
pub trait ActivatorPort {
    /// Start listening on `port`.
    fn open(&mut self, port: u16) -> Result<(), TransportError>;

    /// Answer every request that arrived since the last call, in arrival
    /// order, with the reply `handler` produces.
    fn service(&mut self, handler: &mut dyn FnMut(&PushRequest) -> PushReply);

    /// Stop listening.  Requests still queued are dropped.
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Firmware flash port (inactive OTA partition)
// ───────────────────────────────────────────────────────────────

/// Sequential writer into the inactive application partition.
pub trait FlashWriter {
    /// Open the inactive partition.  `size` is the image length if known.
    fn begin(&mut self, size: Option<u32>) -> Result<(), OtaError>;

    /// Append a chunk.  Returns total bytes written so far.
    fn write(&mut self, data: &[u8]) -> Result<u32, OtaError>;

    /// Verify the image and select it for the next boot.
    fn finalize(&mut self) -> Result<(), OtaError>;

    /// Discard a partially written image.
    fn abort(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Clock, LED, system
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.  Every wait in the lifecycle is a poll loop
/// against `now_ms` with `delay_ms` between polls.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn delay_ms(&mut self, ms: u32);
}

/// Single status LED.
pub trait StatusIndicator {
    fn set(&mut self, on: bool);
    fn is_on(&self) -> bool;

    fn toggle(&mut self) {
        let on = self.is_on();
        self.set(!on);
    }
}

/// Chip-level services.
pub trait SystemPort {
    /// `true` while the setup input is held low.
    fn setup_asserted(&mut self) -> bool;

    /// Enable falling-edge interrupts on the setup input.
    fn enable_setup_edges(&mut self) -> Result<(), crate::error::Error>;

    /// Factory MAC address (brick id source).
    fn mac_address(&self) -> [u8; 6];

    /// Build identifier of the running firmware.
    fn firmware_id(&self) -> &str;

    /// Reset the chip.  Never returns.
    fn restart(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Platform bundle
// ───────────────────────────────────────────────────────────────

/// Binds one concrete adapter to every port.  The device build and each
/// test harness provide their own implementation.
pub trait Platform {
    type Storage: StoragePort;
    type Warm: WarmMemory;
    type Radio: RadioPort;
    type Http: HttpPort + FirmwareSource;
    type Activator: ActivatorPort;
    type Flash: FlashWriter;
    type Clock: Clock;
    type Led: StatusIndicator;
    type System: SystemPort;
    type Events: EventSink;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] and [`WarmMemory`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition (or RTC region) is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored blob failed deserialization.
    Corrupted,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored data corrupted"),
        }
    }
}
