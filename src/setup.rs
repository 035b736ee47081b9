//! Configuration mode operations.
//!
//! The brick enters configuration mode when the setup input is held at
//! boot or when the SSID or server URL is missing.  An external
//! [`SetupConsole`] drives these operations; the console's transport and
//! menu are not part of the OS.
//!
//! Every setter only touches the in-memory durable document.
//! [`SetupOps::save_config`] persists it.

use core::fmt;

use log::{info, warn};
use serde_json::Value;

use crate::adapters::device_id::{BrickIdString, brick_id};
use crate::adapters::utils::{is_printable_ascii, valid_host, valid_port, valid_secret, valid_ssid};
use crate::app::ports::{Clock, Platform, RadioPort, StorageError, SystemPort};
use crate::config::{COPYRIGHT_YEAR, OS_VERSION};
use crate::error::{ConnectivityError, Error};
use crate::features::FeatureRegistry;
use crate::net::connection::ConnectionManager;
use crate::net::protocol::{self, Document, KEY_STATUS};
use crate::persist::durable::{KEY_ID, KEY_PASS, KEY_SSID, KEY_URL, OS_REGION};
use crate::persist::{DurableRegions, WarmRegion, WarmState};

/// Interval between link checks while testing the network.
pub const TEST_POLL_MS: u32 = 500;
/// Default number of link checks for [`SetupOps::test_network`].
pub const TEST_ATTEMPTS: u32 = 20;
/// Longest brick identity the console accepts.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Drives configuration mode.  Called repeatedly until the brick restarts.
pub trait SetupConsole {
    fn step<P: Platform>(&mut self, ops: &mut SetupOps<'_, P>);
}

/// Static facts about the brick shown by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrickInfo {
    pub brick_id: BrickIdString,
    pub brick_type: Option<u16>,
    pub warm_used: usize,
    pub warm_total: usize,
    pub firmware_id: String,
    pub features: Vec<(&'static str, &'static str)>,
    pub os_version: u16,
}

impl fmt::Display for BrickInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BrickID: {}", self.brick_id)?;
        match self.brick_type {
            Some(t) => writeln!(f, "BrickType: {}", t)?,
            None => writeln!(f, "BrickType: -")?,
        }
        writeln!(f, "RTCmem: {}/{} bytes", self.warm_used, self.warm_total)?;
        writeln!(f, "Firmware: {}", self.firmware_id)?;
        writeln!(f, "Features:")?;
        for (name, version) in &self.features {
            writeln!(f, "  {} v{}", name, version)?;
        }
        write!(f, "Brick OS v{} (c) {}", self.os_version, COPYRIGHT_YEAR)
    }
}

/// Borrowed view of the brick that configuration mode works on.
pub struct SetupOps<'a, P: Platform> {
    pub(crate) durable: &'a mut DurableRegions<P::Storage>,
    pub(crate) warm: &'a mut WarmRegion<P::Warm, WarmState>,
    pub(crate) radio: &'a mut P::Radio,
    pub(crate) http: &'a mut P::Http,
    pub(crate) clock: &'a mut P::Clock,
    pub(crate) system: &'a P::System,
    pub(crate) features: &'a FeatureRegistry,
    pub(crate) connection: &'a mut ConnectionManager,
}

impl<P: Platform> SetupOps<'_, P> {
    // ── Setters ─────────────────────────────────────────────

    /// Set station credentials.  `secret` may be empty for an open network.
    pub fn set_network(&mut self, ssid: &str, secret: &str) -> Result<(), ConnectivityError> {
        if !valid_ssid(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !valid_secret(secret) {
            return Err(ConnectivityError::InvalidPassword);
        }
        self.durable.set(OS_REGION, KEY_SSID, ssid);
        self.durable.set(OS_REGION, KEY_PASS, secret);
        info!("SETUP: network set to '{}'", ssid);
        Ok(())
    }

    /// Point the brick at `http://host:port`.
    pub fn set_server(&mut self, host: &str, port: i64) -> Result<(), Error> {
        if !valid_host(host) {
            return Err(Error::Config("invalid server host"));
        }
        let port = valid_port(port).ok_or(Error::Config("invalid server port"))?;
        let url = format!("http://{}:{}", host, port);
        info!("SETUP: server set to {}", url);
        self.durable.set(OS_REGION, KEY_URL, url);
        Ok(())
    }

    /// Identity string sent on the first report after a cold boot.
    pub fn set_identity(&mut self, id: &str) -> Result<(), Error> {
        if id.len() > MAX_IDENTITY_LEN || !is_printable_ascii(id) {
            return Err(Error::Config("invalid identity"));
        }
        self.durable.set(OS_REGION, KEY_ID, id);
        Ok(())
    }

    pub fn save_config(&mut self) -> Result<(), StorageError> {
        let res = self.durable.write();
        match res {
            Ok(()) => info!("SETUP: configuration saved"),
            Err(e) => warn!("SETUP: save failed ({})", e),
        }
        res
    }

    // ── Tests ───────────────────────────────────────────────

    /// Join the configured network, checking the link up to `attempts + 1`
    /// times.  The radio is powered down again on failure.
    pub fn test_network(&mut self, attempts: u32) -> bool {
        if self.radio.is_connected() {
            self.radio.disconnect();
            self.radio.sleep();
        }
        let creds = match self.durable.credentials() {
            Ok(c) => c,
            Err(e) => {
                warn!("SETUP: network test skipped ({})", e);
                return false;
            }
        };
        if let Err(e) = self.connection.connect(
            &mut *self.radio,
            creds,
            self.warm.data(),
            self.warm.is_valid(),
        ) {
            warn!("SETUP: join failed ({})", e);
            self.radio.sleep();
            return false;
        }

        for _ in 0..=attempts {
            if self.radio.is_connected() {
                if let Some(link) = self.radio.link_info() {
                    let warm = self.warm.data_mut();
                    warm.channel = link.channel;
                    warm.ap_mac = link.bssid;
                }
                info!("SETUP: network test passed");
                return true;
            }
            self.clock.delay_ms(TEST_POLL_MS);
        }
        warn!("SETUP: network test failed");
        self.radio.sleep();
        false
    }

    /// Send a test report to the server.  Passes if the reply carries
    /// `"s": 0`.  Needs a live link (run [`test_network`](Self::test_network)
    /// first).
    pub fn test_server(&mut self) -> Result<(), Error> {
        if !self.radio.is_connected() {
            return Err(Error::Config("network not connected"));
        }
        let mut probe = Document::new();
        probe.insert("test".into(), Value::from("val"));
        let url = self.durable.server_url();
        let reply = protocol::exchange(&mut *self.http, url, &probe)?;
        match reply.get(KEY_STATUS).and_then(Value::as_u64) {
            Some(0) => {
                info!("SETUP: server test passed");
                Ok(())
            }
            _ => Err(Error::Config("server rejected test report")),
        }
    }

    // ── Views ───────────────────────────────────────────────

    pub fn brick_info(&self) -> BrickInfo {
        BrickInfo {
            brick_id: brick_id(&self.system.mac_address()),
            brick_type: self.features.brick_type(),
            warm_used: self.warm.space_used(),
            warm_total: self.warm.space_total(),
            firmware_id: self.system.firmware_id().into(),
            features: self.features.versions().collect(),
            os_version: OS_VERSION,
        }
    }

    /// Durable configuration, OS keys first.  The password is masked.
    pub fn print_config(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let pass = if self.durable.get_str(OS_REGION, KEY_PASS).is_empty() {
            ""
        } else {
            "********"
        };
        writeln!(out, "WiFi-SSID: {}", self.durable.ssid())?;
        writeln!(out, "WiFi-Pass: {}", pass)?;
        writeln!(out, "BrickServer-URL: {}", self.durable.server_url())?;
        writeln!(out, "Ident: {}", self.durable.brick_id())?;
        self.features.print_durable(&*self.durable, out)
    }

    /// Warm state: OS flags, then every feature's view.
    pub fn print_runtime_data(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let os = self.warm.data();
        writeln!(out, "valid: {}", self.warm.is_valid())?;
        writeln!(out, "os.firmware_id_requested: {}", os.firmware_id_requested)?;
        writeln!(out, "os.update_requested: {}", os.update_requested)?;
        self.features.print_warm(out)
    }

    /// Wait between console steps.
    pub fn idle(&mut self, ms: u32) {
        self.clock.delay_ms(ms);
    }
}
