//! Warm state: typed view over RTC no-init memory.
//!
//! The region survives a software restart but holds garbage after power-up.
//! Every write lays down a header in front of the postcard payload:
//!
//! ```text
//!  0      4      6          10            10+len
//!  ┌──────┬──────┬──────────┬───────────────┐
//!  │ BRKW │ len  │ crc32    │ payload       │
//!  └──────┴──────┴──────────┴───────────────┘
//! ```
//!
//! A region is valid only if magic, length and CRC all check out, so random
//! power-up contents read as invalid and the data falls back to `T::default()`.

use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{Serialize, de::DeserializeOwned};

use crate::app::ports::{StorageError, WarmMemory};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const MAGIC: [u8; 4] = *b"BRKW";
/// Bytes occupied by magic, length and CRC.
pub const HEADER_LEN: usize = 10;
/// Largest payload the on-stack load buffer accepts.
const MAX_PAYLOAD: usize = 256;

/// OS-owned part of the warm region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct WarmState {
    /// WiFi channel of the last successful association.
    pub channel: u8,
    /// BSSID of the access point of the last successful association.
    pub ap_mac: [u8; 6],
    /// Send the firmware build id with the next report.
    pub firmware_id_requested: bool,
    /// Flash new firmware on the next boot.
    pub update_requested: bool,
}

impl WarmState {
    /// `true` once a link has been recorded (a zero channel is never valid).
    pub fn has_link(&self) -> bool {
        self.channel != 0
    }
}

pub struct WarmRegion<M: WarmMemory, T> {
    mem: M,
    data: T,
    valid: bool,
}

impl<M, T> WarmRegion<M, T>
where
    M: WarmMemory,
    T: Serialize + DeserializeOwned + Default,
{
    /// Decode whatever the memory currently holds.
    pub fn load(mem: M) -> Self {
        let mut buf = [0u8; HEADER_LEN + MAX_PAYLOAD];
        let n = mem.load(&mut buf);
        match decode::<T>(&buf[..n]) {
            Some(data) => Self {
                mem,
                data,
                valid: true,
            },
            None => Self {
                mem,
                data: T::default(),
                valid: false,
            },
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    /// `true` if the region was written since power-up and not destroyed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Encode the current data and store it.  The region is valid afterwards.
    pub fn write(&mut self) -> Result<(), StorageError> {
        let frame = encode(&self.data)?;
        if frame.len() > self.mem.capacity() {
            return Err(StorageError::Full);
        }
        self.mem.store(&frame)?;
        self.valid = true;
        Ok(())
    }

    /// Invalidate the region and reset the data to its defaults.
    pub fn destroy(&mut self) -> Result<(), StorageError> {
        self.data = T::default();
        self.valid = false;
        self.mem.store(&[0u8; HEADER_LEN])
    }

    /// Bytes a write of the current data would occupy.
    pub fn space_used(&self) -> usize {
        postcard::to_allocvec(&self.data).map_or(HEADER_LEN, |p| HEADER_LEN + p.len())
    }

    pub fn space_total(&self) -> usize {
        self.mem.capacity()
    }

    pub fn memory(&self) -> &M {
        &self.mem
    }

    pub fn into_memory(self) -> M {
        self.mem
    }
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
    let payload = postcard::to_allocvec(data).map_err(|_| StorageError::IoError)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(StorageError::Full);
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&MAGIC);
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(&CRC32.checksum(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Option<T> {
    if raw.len() < HEADER_LEN || raw[0..4] != MAGIC {
        return None;
    }
    let len = u16::from_le_bytes([raw[4], raw[5]]) as usize;
    let crc = u32::from_le_bytes([raw[6], raw[7], raw[8], raw[9]]);
    let payload = raw.get(HEADER_LEN..HEADER_LEN + len)?;
    if CRC32.checksum(payload) != crc {
        return None;
    }
    postcard::from_bytes(payload).ok()
}
