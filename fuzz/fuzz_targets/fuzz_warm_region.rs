//! Fuzz target: `WarmRegion::load`
//!
//! Treats arbitrary bytes as RTC memory after power-up.  Loading must never
//! panic, and a region that does validate must survive a write/reload
//! unchanged.
//!
//! cargo fuzz run fuzz_warm_region

#![no_main]

use brickos::app::ports::{StorageError, WarmMemory};
use brickos::persist::{WarmRegion, WarmState};
use libfuzzer_sys::fuzz_target;

struct Rtc(Vec<u8>);

impl WarmMemory for Rtc {
    fn capacity(&self) -> usize {
        self.0.len()
    }

    fn load(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.0.len());
        buf[..n].copy_from_slice(&self.0[..n]);
        n
    }

    fn store(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > self.0.len() {
            return Err(StorageError::Full);
        }
        self.0[..data.len()].copy_from_slice(data);
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut mem = vec![0u8; 256];
    let n = data.len().min(mem.len());
    mem[..n].copy_from_slice(&data[..n]);

    let mut region: WarmRegion<Rtc, WarmState> = WarmRegion::load(Rtc(mem));
    if !region.is_valid() {
        assert_eq!(region.data(), &WarmState::default());
        return;
    }

    let before = region.data().clone();
    region.write().expect("valid region must be writable");
    let reloaded: WarmRegion<Rtc, WarmState> = WarmRegion::load(region.into_memory());
    assert!(reloaded.is_valid());
    assert_eq!(reloaded.data(), &before);
});
