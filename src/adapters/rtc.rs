//! RTC no-init memory adapter.
//!
//! Implements [`WarmMemory`].
//!
//! - **`target_os = "espidf"`**: a static placed in `.rtc_noinit`, which the
//!   bootloader leaves untouched across software resets and deep sleep.
//! - **`not(target_os = "espidf")`**: a heap buffer; cloning it models a
//!   restart that keeps RTC contents.

use crate::app::ports::{StorageError, WarmMemory};

/// Size of the warm region in bytes.
pub const RTC_LEN: usize = 256;

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc_noinit")]
static mut RTC_AREA: [u8; RTC_LEN] = [0; RTC_LEN];

#[cfg_attr(not(target_os = "espidf"), derive(Clone))]
pub struct RtcMemory {
    #[cfg(not(target_os = "espidf"))]
    area: Vec<u8>,
}

impl RtcMemory {
    /// Only one instance may exist on the device; `main` creates it once.
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            area: vec![0; RTC_LEN],
        }
    }
}

impl Default for RtcMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl WarmMemory for RtcMemory {
    fn capacity(&self) -> usize {
        RTC_LEN
    }

    #[cfg(target_os = "espidf")]
    fn load(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(RTC_LEN);
        // SAFETY: single foreground task owns the RtcMemory handle; the ISR
        // never touches this region.
        unsafe {
            core::ptr::copy_nonoverlapping((&raw const RTC_AREA).cast::<u8>(), buf.as_mut_ptr(), n);
        }
        n
    }

    #[cfg(not(target_os = "espidf"))]
    fn load(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.area.len());
        buf[..n].copy_from_slice(&self.area[..n]);
        n
    }

    #[cfg(target_os = "espidf")]
    fn store(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > RTC_LEN {
            return Err(StorageError::Full);
        }
        // SAFETY: see `load`.
        unsafe {
            core::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (&raw mut RTC_AREA).cast::<u8>(),
                data.len(),
            );
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn store(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > self.area.len() {
            return Err(StorageError::Full);
        }
        self.area[..data.len()].copy_from_slice(data);
        Ok(())
    }
}
