//! Minimal configuration console.
//!
//! Implements [`SetupConsole`] by dumping the brick's identity and
//! configuration to the log once, then idling so the reset circuit keeps
//! being polled.  Interactive editing is left to richer consoles built on
//! [`SetupOps`].

use log::info;

use crate::app::ports::Platform;
use crate::setup::{SetupConsole, SetupOps};

/// Delay between console steps.
pub const IDLE_MS: u32 = 100;

#[derive(Debug, Default)]
pub struct LogConsole {
    shown: bool,
}

impl LogConsole {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SetupConsole for LogConsole {
    fn step<P: Platform>(&mut self, ops: &mut SetupOps<'_, P>) {
        if !self.shown {
            self.shown = true;
            let mut dump = String::new();
            let _ = ops.print_config(&mut dump);
            let _ = ops.print_runtime_data(&mut dump);
            info!("SETUP |\n{}", ops.brick_info());
            for line in dump.lines() {
                info!("SETUP | {}", line);
            }
        }
        ops.idle(IDLE_MS);
    }
}
