//! Firmware flash writer, backed by the `esp-ota` crate.
//!
//! Flow: begin → N × write → finalize → restart
//!
//! The `esp-ota` crate provides a safe Rust wrapper around the ESP-IDF
//! OTA partition API.  On simulation targets the image is kept in memory.

use core::fmt;
use log::{info, warn};

use crate::app::ports::FlashWriter;

const MAX_FIRMWARE_SIZE: u32 = 4 * 1024 * 1024; // 4 MB

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    AlreadyInProgress,
    InvalidSize,
    BeginFailed,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
    IncompleteTransfer,
    NotReceiving,
    Overflow,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "OTA session already in progress"),
            Self::InvalidSize => write!(f, "firmware size out of range (max 4 MB)"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
            Self::IncompleteTransfer => write!(f, "finalize called before all bytes written"),
            Self::NotReceiving => write!(f, "operation requires active Receiving state"),
            Self::Overflow => write!(f, "chunk would exceed firmware size"),
        }
    }
}

// ── State machine ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Receiving {
        /// Declared image length; `None` for a body without Content-Length.
        expected_size: Option<u32>,
        bytes_written: u32,
    },
    Verifying,
    ReadyToReboot,
    Failed,
}

// ── Manager ───────────────────────────────────────────────────

/// OTA partition writer.
///
/// On ESP-IDF targets, uses the `esp-ota` crate for partition management.
/// On simulation targets, appends to an in-memory image.
pub struct OtaManager {
    state: OtaState,
    #[cfg(target_os = "espidf")]
    ota_update: Option<esp_ota::OtaUpdate>,
    #[cfg(not(target_os = "espidf"))]
    image: Vec<u8>,
}

impl OtaManager {
    pub fn new() -> Self {
        Self {
            state: OtaState::Idle,
            #[cfg(target_os = "espidf")]
            ota_update: None,
            #[cfg(not(target_os = "espidf"))]
            image: Vec::new(),
        }
    }

    pub fn state(&self) -> OtaState {
        self.state
    }

    /// Bytes written by the simulation backend.
    #[cfg(not(target_os = "espidf"))]
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl FlashWriter for OtaManager {
    /// Open the inactive partition.  Rejects a declared size of zero or
    /// larger than the partition.
    fn begin(&mut self, size: Option<u32>) -> Result<(), OtaError> {
        if !matches!(self.state, OtaState::Idle | OtaState::Failed) {
            return Err(OtaError::AlreadyInProgress);
        }
        if let Some(n) = size {
            if n == 0 || n > MAX_FIRMWARE_SIZE {
                return Err(OtaError::InvalidSize);
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("esp-ota begin failed: {:?}", e);
                OtaError::BeginFailed
            })?;
            self.ota_update = Some(update);
        }

        #[cfg(not(target_os = "espidf"))]
        self.image.clear();

        self.state = OtaState::Receiving {
            expected_size: size,
            bytes_written: 0,
        };
        info!("OTA: begin ({:?} bytes)", size);
        Ok(())
    }

    /// Append a chunk.  Returns total bytes written.
    fn write(&mut self, data: &[u8]) -> Result<u32, OtaError> {
        let OtaState::Receiving {
            expected_size,
            bytes_written,
        } = self.state
        else {
            return Err(OtaError::NotReceiving);
        };

        let new_written = bytes_written.saturating_add(data.len() as u32);
        if new_written > expected_size.unwrap_or(MAX_FIRMWARE_SIZE) {
            return Err(OtaError::Overflow);
        }

        #[cfg(target_os = "espidf")]
        {
            let result = match self.ota_update.as_mut() {
                Some(update) => update.write(data).map_err(|e| {
                    warn!("esp-ota write failed: {:?}", e);
                    OtaError::WriteFailed
                }),
                None => Err(OtaError::NotReceiving),
            };
            if let Err(e) = result {
                self.abort();
                return Err(e);
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.image.extend_from_slice(data);

        self.state = OtaState::Receiving {
            expected_size,
            bytes_written: new_written,
        };
        Ok(new_written)
    }

    /// Verify the image, mark the partition bootable, set ReadyToReboot.
    fn finalize(&mut self) -> Result<(), OtaError> {
        match self.state {
            OtaState::Receiving {
                expected_size: Some(n),
                bytes_written,
            } if bytes_written == n => {}
            OtaState::Receiving {
                expected_size: None,
                bytes_written,
            } if bytes_written > 0 => {}
            OtaState::Receiving { .. } => return Err(OtaError::IncompleteTransfer),
            _ => return Err(OtaError::NotReceiving),
        }

        self.state = OtaState::Verifying;

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.ota_update.take() else {
                self.state = OtaState::Failed;
                return Err(OtaError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("esp-ota finalize failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("esp-ota set_as_boot_partition failed: {:?}", e);
                self.state = OtaState::Failed;
                OtaError::BootSetFailed
            })?;
        }

        self.state = OtaState::ReadyToReboot;
        info!("OTA: finalized, ready to reboot");
        Ok(())
    }

    /// Abort the current session; resets to Idle.
    fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // esp-ota aborts automatically when OtaUpdate is dropped
            self.ota_update.take();
        }
        #[cfg(not(target_os = "espidf"))]
        self.image.clear();
        self.state = OtaState::Idle;
        warn!("OTA: aborted");
    }
}

impl Default for OtaManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Boot validation ───────────────────────────────────────────

/// Mark the running image valid so the bootloader does not roll back.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid (rollback cancelled)"),
        Err(e) => warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA rollback check (simulation): skipped");
}

// ── Tests ─────────────────────────────────────────────────────
