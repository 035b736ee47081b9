//! Unified error types for the Brick OS runtime.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! orchestrator's error handling uniform.  All variants are `Copy` so they
//! can be passed through the lifecycle and the event sink without allocation.

use core::fmt;

use crate::app::ports::StorageError;
use crate::update::ota::OtaError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the runtime funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A persistent-state region could not be read or written.
    Storage(StorageError),
    /// The radio could not be brought up or joined.
    Connectivity(ConnectivityError),
    /// The BrickServer exchange failed.
    Exchange(ExchangeError),
    /// A firmware update failed.
    Update(UpdateError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A configuration value was rejected.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Connectivity(e) => write!(f, "connectivity: {e}"),
            Self::Exchange(e) => write!(f, "exchange: {e}"),
            Self::Update(e) => write!(f, "update: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Connectivity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    RadioFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::RadioFailed => write!(f, "radio driver failed"),
        }
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

// ---------------------------------------------------------------------------
// Transport / exchange errors
// ---------------------------------------------------------------------------

/// Failure of a single HTTP request at the transport level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// TCP connect was refused or the host is unreachable.
    Connect,
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The server answered with a non-2xx status.
    Status(u16),
    /// Reading or writing the body failed mid-stream.
    Io,
    /// The response body exceeded the receive buffer.
    BodyTooLarge,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connection refused"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Io => write!(f, "body I/O failed"),
            Self::BodyTooLarge => write!(f, "response body too large"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError {
    /// No server URL configured.
    NoEndpoint,
    /// The outbound report could not be serialized.
    Encode,
    /// The request failed at the transport level.
    Transport(TransportError),
    /// The response body is not a JSON object.
    Malformed,
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEndpoint => write!(f, "no BrickServer URL configured"),
            Self::Encode => write!(f, "report encoding failed"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Malformed => write!(f, "response is not a JSON object"),
        }
    }
}

impl From<TransportError> for ExchangeError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ExchangeError> for Error {
    fn from(e: ExchangeError) -> Self {
        Self::Exchange(e)
    }
}

// ---------------------------------------------------------------------------
// Update errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// No server URL configured to derive the image path from.
    NoEndpoint,
    /// Fetching the image failed.
    Transport(TransportError),
    /// Writing the image to the OTA partition failed.
    Flash(OtaError),
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoEndpoint => write!(f, "no BrickServer URL configured"),
            Self::Transport(e) => write!(f, "fetch: {e}"),
            Self::Flash(e) => write!(f, "flash: {e}"),
        }
    }
}

impl From<TransportError> for UpdateError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<OtaError> for UpdateError {
    fn from(e: OtaError) -> Self {
        Self::Flash(e)
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
