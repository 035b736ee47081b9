//! Firmware update trigger.
//!
//! An update is requested by the server (code `12`) and carried out on the
//! following boot, before anything else happens:
//!
//! 1. clear `update_requested` and persist the warm region, so a crash
//!    mid-update does not loop;
//! 2. join the network;
//! 3. invalidate the warm region (the new image may use another layout);
//! 4. stream `<url>/ota` into the inactive partition;
//! 5. restart, whether or not the flash succeeded.
//!
//! Steps 2, 3 and 5 need the whole platform and live in the orchestrator;
//! this module owns the request bookkeeping and the streaming.

pub mod ota;

use log::{info, warn};

use crate::app::ports::{FirmwareSource, FlashWriter, StatusIndicator, StorageError, WarmMemory};
use crate::config::{OTA_PATH, OsConfig};
use crate::error::UpdateError;
use crate::persist::{WarmRegion, WarmState};

/// URL of the firmware image for server base URL `base`.
pub fn image_url(base: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), OTA_PATH)
}

pub struct UpdateTrigger {
    chunk_len: usize,
}

impl UpdateTrigger {
    pub fn new(config: &OsConfig) -> Self {
        Self {
            chunk_len: config.ota_chunk_len.max(1),
        }
    }

    /// Clear the request flag and persist it before any network activity.
    pub fn consume_request<M: WarmMemory>(
        &self,
        warm: &mut WarmRegion<M, WarmState>,
    ) -> Result<(), StorageError> {
        warm.data_mut().update_requested = false;
        warm.write()
    }

    /// Download the image from `base` and write it to flash, toggling the
    /// LED once per chunk.  Returns the number of bytes flashed.
    pub fn flash_from_server(
        &self,
        base: &str,
        source: &mut impl FirmwareSource,
        flash: &mut impl FlashWriter,
        led: &mut impl StatusIndicator,
    ) -> Result<u32, UpdateError> {
        if base.is_empty() {
            return Err(UpdateError::NoEndpoint);
        }
        let url = image_url(base);
        info!("UPDATE: fetching {}", url);
        let len = source.open(&url)?;
        flash.begin(len)?;

        match self.stream(source, flash, led) {
            Ok(total) => {
                flash.finalize()?;
                info!("UPDATE: {} bytes flashed", total);
                Ok(total)
            }
            Err(e) => {
                warn!("UPDATE: stream failed ({})", e);
                flash.abort();
                Err(e)
            }
        }
    }

    fn stream(
        &self,
        source: &mut impl FirmwareSource,
        flash: &mut impl FlashWriter,
        led: &mut impl StatusIndicator,
    ) -> Result<u32, UpdateError> {
        let mut buf = vec![0u8; self.chunk_len];
        let mut total = 0;
        loop {
            let n = source.read(&mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            total = flash.write(&buf[..n])?;
            led.toggle();
        }
    }
}
