//! Runtime tunables
//!
//! All timing constants and limits the Brick OS lifecycle depends on.
//! The defaults are the values every shipped brick runs with; tests build
//! shortened variants to keep the simulated clock small.

use serde::{Deserialize, Serialize};

/// Brick OS major version reported by `brick_info`.
pub const OS_VERSION: u16 = 2;
/// Copyright year printed on the configuration console.
pub const COPYRIGHT_YEAR: u16 = 2022;

/// Path appended to the server URL when fetching a firmware image.
pub const OTA_PATH: &str = "/ota";

/// Core runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsConfig {
    // --- Connection ---
    /// Interval between link-state polls (milliseconds)
    pub connect_poll_ms: u32,
    /// Number of polls the fast path may use before falling back
    pub fast_path_polls: u32,
    /// Settle delay around a radio power cycle (milliseconds)
    pub radio_settle_ms: u32,
    /// Timeout for one HTTP request (milliseconds)
    pub http_timeout_ms: u32,

    // --- Reset safety circuit ---
    /// Edges closer than this to the last accepted edge are bounces
    pub debounce_ms: u32,
    /// Half-period of the acknowledgement blink (milliseconds)
    pub blink_ms: u32,
    /// Number of accepted triggers that destroys the configuration
    pub reset_threshold: u8,
    /// LED hold time before the restart that follows a destroy
    pub destroy_hold_ms: u32,

    // --- Activator window ---
    /// Interval between listener polls while the window is open
    pub activator_poll_ms: u32,
    /// TCP port of the push listener
    pub activator_port: u16,

    // --- Limits ---
    /// Largest accepted server response or push body (bytes)
    pub max_body_len: usize,
    /// Chunk size used while streaming a firmware image
    pub ota_chunk_len: usize,
}

impl Default for OsConfig {
    fn default() -> Self {
        Self {
            // Connection
            connect_poll_ms: 10,
            fast_path_polls: 200, // 2 s
            radio_settle_ms: 10,
            http_timeout_ms: 10_000,

            // Reset circuit
            debounce_ms: 400,
            blink_ms: 50,
            reset_threshold: 4,
            destroy_hold_ms: 1500,

            // Activator
            activator_poll_ms: 1000,
            activator_port: 80,

            // Limits
            max_body_len: 2048,
            ota_chunk_len: 1024,
        }
    }
}

impl OsConfig {
    /// Total fast-path budget in milliseconds.
    pub const fn fast_path_budget_ms(&self) -> u32 {
        self.connect_poll_ms.saturating_mul(self.fast_path_polls)
    }
}
