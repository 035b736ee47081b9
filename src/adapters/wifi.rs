//! WiFi station-mode adapter.
//!
//! Implements [`RadioPort`], the hexagonal boundary for the station radio.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: a simulated access point for host-side runs.
//!
//! ## Fast path
//!
//! When a channel and BSSID are passed to [`RadioPort::begin`] the client
//! configuration pins both, so the driver skips the scan and associates
//! directly.  Settings are kept in RAM only; the durable configuration is
//! the single source of truth for credentials.

use log::{info, warn};

use crate::app::ports::{Credentials, LinkInfo, RadioPort};
use crate::error::ConnectivityError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Asleep,
    Idle,
    Joining,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF adapter
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    state: WifiState,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    ) -> Result<Self, ConnectivityError> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, None).map_err(|e| {
            warn!("WiFi: driver init failed ({})", e);
            ConnectivityError::RadioFailed
        })?;
        // SAFETY: plain setter on an initialised driver; keeps credentials
        // out of the driver's own NVS namespace.
        unsafe {
            esp_idf_svc::sys::esp_wifi_set_storage(esp_idf_svc::sys::wifi_storage_t_WIFI_STORAGE_RAM);
        }
        Ok(Self {
            wifi,
            state: WifiState::Asleep,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }
}

#[cfg(target_os = "espidf")]
impl RadioPort for WifiAdapter {
    fn wake(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{ClientConfiguration, Configuration};

        if self.state != WifiState::Asleep {
            return Ok(());
        }
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration::default()))
            .and_then(|_| self.wifi.start())
            .map_err(|e| {
                warn!("WiFi: start failed ({})", e);
                ConnectivityError::RadioFailed
            })?;
        self.state = WifiState::Idle;
        Ok(())
    }

    fn sleep(&mut self) {
        if let Err(e) = self.wifi.stop() {
            warn!("WiFi: stop failed ({})", e);
        }
        self.state = WifiState::Asleep;
    }

    fn begin(
        &mut self,
        creds: &Credentials,
        fast_path: Option<LinkInfo>,
    ) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let cfg = ClientConfiguration {
            ssid: creds.ssid.clone(),
            password: creds.secret.clone(),
            auth_method: if creds.secret.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            bssid: fast_path.map(|l| l.bssid),
            channel: fast_path.map(|l| l.channel),
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(cfg))
            .and_then(|_| self.wifi.connect())
            .map_err(|e| {
                warn!("WiFi: connect request failed ({})", e);
                ConnectivityError::RadioFailed
            })?;
        self.state = WifiState::Joining;
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        let up = self.wifi.is_connected().unwrap_or(false)
            && self.wifi.sta_netif().is_up().unwrap_or(false);
        if up {
            self.state = WifiState::Connected;
        }
        up
    }

    fn link_info(&self) -> Option<LinkInfo> {
        // SAFETY: zeroed is a valid bit pattern for this plain C record and
        // the call only writes into it.
        let mut ap: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap) };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            return None;
        }
        Some(LinkInfo {
            channel: ap.primary,
            bssid: ap.bssid,
        })
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed ({})", e);
        }
        if self.state != WifiState::Asleep {
            self.state = WifiState::Idle;
        }
        info!("WiFi: disconnected");
    }
}

// ───────────────────────────────────────────────────────────────
// Host simulation
// ───────────────────────────────────────────────────────────────

/// Simulated access point: associates after `join_polls` calls to
/// `is_connected`.  A fast path that names the wrong BSSID never
/// associates.
#[cfg(not(target_os = "espidf"))]
pub struct WifiAdapter {
    state: WifiState,
    ap: LinkInfo,
    join_polls: u32,
    polls: u32,
    fast_path_ok: bool,
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self::with_ap(
            LinkInfo {
                channel: 6,
                bssid: [0x02, 0x00, 0x00, 0x00, 0x00, 0x01],
            },
            3,
        )
    }

    pub fn with_ap(ap: LinkInfo, join_polls: u32) -> Self {
        Self {
            state: WifiState::Asleep,
            ap,
            join_polls,
            polls: 0,
            fast_path_ok: true,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for WifiAdapter {
    fn wake(&mut self) -> Result<(), ConnectivityError> {
        if self.state == WifiState::Asleep {
            self.state = WifiState::Idle;
        }
        Ok(())
    }

    fn sleep(&mut self) {
        self.state = WifiState::Asleep;
    }

    fn begin(
        &mut self,
        creds: &Credentials,
        fast_path: Option<LinkInfo>,
    ) -> Result<(), ConnectivityError> {
        if self.state == WifiState::Asleep {
            return Err(ConnectivityError::RadioFailed);
        }
        if creds.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        self.fast_path_ok = fast_path.is_none_or(|l| l == self.ap);
        self.polls = 0;
        self.state = WifiState::Joining;
        info!("WiFi(sim): joining '{}' fast_path={}", creds.ssid, fast_path.is_some());
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        match self.state {
            WifiState::Connected => true,
            WifiState::Joining if self.fast_path_ok => {
                self.polls += 1;
                if self.polls >= self.join_polls {
                    self.state = WifiState::Connected;
                }
                self.state == WifiState::Connected
            }
            _ => false,
        }
    }

    fn link_info(&self) -> Option<LinkInfo> {
        (self.state == WifiState::Connected).then_some(self.ap)
    }

    fn disconnect(&mut self) {
        if self.state != WifiState::Asleep {
            self.state = WifiState::Idle;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
