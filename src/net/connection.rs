//! WiFi connection manager.
//!
//! Two join strategies:
//!
//! - **Fast path**: channel + BSSID remembered in warm state from the last
//!   successful association.  Skips the scan; usually associates in well
//!   under a second.
//! - **Discovery**: a full scan.  Polled without an upper bound.
//!
//! A fast path that does not come up within its poll budget is abandoned:
//! the radio is disconnected and power-cycled, then restarted in discovery.

use log::{info, warn};

use crate::app::ports::{Clock, Credentials, LinkInfo, RadioPort};
use crate::config::OsConfig;
use crate::error::ConnectivityError;
use crate::persist::WarmState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    FastPath,
    Discovery,
}

/// Result of a completed [`ConnectionManager::await_connected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected {
    /// Mode the association finally succeeded in.
    pub mode: JoinMode,
    /// `true` if a fast path was tried and abandoned first.
    pub fell_back: bool,
    /// Polls spent before the link came up (all modes combined).
    pub polls: u32,
    pub link: Option<LinkInfo>,
}

pub struct ConnectionManager {
    poll_ms: u32,
    fast_path_polls: u32,
    settle_ms: u32,
    creds: Credentials,
    mode: Option<JoinMode>,
}

impl ConnectionManager {
    pub fn new(config: &OsConfig) -> Self {
        Self {
            poll_ms: config.connect_poll_ms,
            fast_path_polls: config.fast_path_polls,
            settle_ms: config.radio_settle_ms,
            creds: Credentials::default(),
            mode: None,
        }
    }

    /// Mode of the join in progress, if any.
    pub fn mode(&self) -> Option<JoinMode> {
        self.mode
    }

    /// Wake the radio and start a join without waiting for it.
    ///
    /// The fast path is used only if `warm` is valid and carries a link.
    pub fn connect(
        &mut self,
        radio: &mut impl RadioPort,
        creds: Credentials,
        warm: &WarmState,
        warm_valid: bool,
    ) -> Result<JoinMode, ConnectivityError> {
        radio.wake()?;
        let fast_path = (warm_valid && warm.has_link()).then_some(LinkInfo {
            channel: warm.channel,
            bssid: warm.ap_mac,
        });
        let mode = if fast_path.is_some() {
            JoinMode::FastPath
        } else {
            JoinMode::Discovery
        };
        info!("NET: join started ({:?}) ssid={}", mode, creds.ssid);
        radio.begin(&creds, fast_path)?;
        self.creds = creds;
        self.mode = Some(mode);
        Ok(mode)
    }

    /// Block until the link is up, falling back from the fast path if needed.
    ///
    /// On success the negotiated channel and BSSID are written into `warm`.
    pub fn await_connected(
        &mut self,
        radio: &mut impl RadioPort,
        clock: &mut impl Clock,
        warm: &mut WarmState,
    ) -> Result<Connected, ConnectivityError> {
        let mut mode = self.mode.ok_or(ConnectivityError::NoCredentials)?;
        let mut fell_back = false;
        let mut polls = 0u32;

        if mode == JoinMode::FastPath {
            let deadline = clock
                .now_ms()
                .saturating_add(u64::from(self.poll_ms) * u64::from(self.fast_path_polls));
            let mut up = false;
            for _ in 0..self.fast_path_polls {
                if radio.is_connected() {
                    up = true;
                    break;
                }
                if clock.now_ms() >= deadline {
                    break;
                }
                clock.delay_ms(self.poll_ms);
                polls += 1;
            }
            if !up && !radio.is_connected() {
                warn!("NET: fast path gave up after {} polls, rescanning", polls);
                self.restart_as_discovery(radio, clock)?;
                mode = JoinMode::Discovery;
                fell_back = true;
            }
        }

        if mode == JoinMode::Discovery {
            while !radio.is_connected() {
                clock.delay_ms(self.poll_ms);
                polls += 1;
            }
        }

        let link = radio.link_info();
        if let Some(l) = link {
            warm.channel = l.channel;
            warm.ap_mac = l.bssid;
        }
        self.mode = Some(mode);
        info!("NET: connected ({:?}) after {} polls", mode, polls);
        Ok(Connected {
            mode,
            fell_back,
            polls,
            link,
        })
    }

    fn restart_as_discovery(
        &mut self,
        radio: &mut impl RadioPort,
        clock: &mut impl Clock,
    ) -> Result<(), ConnectivityError> {
        radio.disconnect();
        radio.sleep();
        clock.delay_ms(self.settle_ms);
        radio.wake()?;
        clock.delay_ms(self.settle_ms);
        radio.begin(&self.creds, None)?;
        self.mode = Some(JoinMode::Discovery);
        Ok(())
    }
}
