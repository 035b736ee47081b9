//! GPIO assignments for the Brick base board.
//!
//! Single source of truth; drivers reference these rather than hard-coding
//! pin numbers.

// ---------------------------------------------------------------------------
// Setup input (active-low, external pull-up)
// ---------------------------------------------------------------------------

/// Held low at boot to enter configuration mode.  While configuration mode
/// is active, falling edges feed the reset safety circuit.
pub const SETUP_GPIO: i32 = 0;

// ---------------------------------------------------------------------------
// Status LED (single colour, active-high)
// ---------------------------------------------------------------------------

pub const STATUS_LED_GPIO: i32 = 2;
