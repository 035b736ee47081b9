//! Persistent state store.
//!
//! Two independent tiers with explicit validity tracking:
//!
//! | Tier      | Survives            | Backing           | Type                |
//! |-----------|---------------------|-------------------|---------------------|
//! | durable   | power loss          | NVS blob (JSON)   | [`DurableRegions`]  |
//! | warm      | software restart    | RTC no-init RAM   | [`WarmRegion`]      |

pub mod durable;
pub mod warm;

pub use durable::DurableRegions;
pub use warm::{WarmRegion, WarmState};
