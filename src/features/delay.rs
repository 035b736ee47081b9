//! Delay feature: how long a brick idles between cycles.
//!
//! The idle time is spent inside the Activator window, so the server can
//! push to the brick while it waits.  The value lives in the durable
//! `delay` region under `d` (seconds) and the server changes it by sending
//! `{"d": <secs>}` in a reply or a push.

use serde_json::{Map, Value};

use super::Feature;
use crate::net::protocol::Document;

pub const VERSION: &str = "1.0.0";
const KEY_DELAY: &str = "d";
/// Upper bound accepted from the server (one hour).
const MAX_DELAY_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct DelayFeature {
    default_secs: u32,
    secs: u32,
}

impl DelayFeature {
    pub fn new(default_secs: u32) -> Self {
        Self {
            default_secs,
            secs: default_secs,
        }
    }

    pub fn secs(&self) -> u32 {
        self.secs
    }
}

impl Feature for DelayFeature {
    fn name(&self) -> &'static str {
        "delay"
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn begin(&mut self, region: &mut Map<String, Value>) {
        let stored = region.get(KEY_DELAY).and_then(Value::as_u64);
        match stored {
            Some(d) if d <= MAX_DELAY_SECS => self.secs = d as u32,
            _ => {
                region.insert(KEY_DELAY.into(), self.default_secs.into());
                self.secs = self.default_secs;
            }
        }
    }

    fn feedback(&mut self, doc: &Document, region: &mut Map<String, Value>) -> bool {
        let Some(d) = doc.get(KEY_DELAY).and_then(Value::as_u64) else {
            return false;
        };
        let d = d.min(MAX_DELAY_SECS) as u32;
        if d == self.secs && region.get(KEY_DELAY).and_then(Value::as_u64) == Some(d.into()) {
            return false;
        }
        self.secs = d;
        region.insert(KEY_DELAY.into(), d.into());
        true
    }

    fn activator_window_secs(&self) -> u32 {
        self.secs
    }
}
