//! Brick OS — main entry point.
//!
//! Hexagonal architecture: one boot cycle per power-up or restart.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter   RtcMemory    WifiAdapter   HttpAdapter           │
//! │  (Storage)    (Warm)       (Radio)       (Http + Firmware)     │
//! │  ActivatorAdapter   OtaManager   SystemClock   StatusLed       │
//! │  SystemAdapter      LogEventSink                               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Brick (boot orchestrator)                 │    │
//! │  │  Connection · Protocol · Activator · Reset · Update    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use brickos::adapters::activator_server::ActivatorAdapter;
use brickos::adapters::console::LogConsole;
use brickos::adapters::http::HttpAdapter;
use brickos::adapters::log_sink::LogEventSink;
use brickos::adapters::nvs::NvsAdapter;
use brickos::adapters::rtc::RtcMemory;
use brickos::adapters::system::SystemAdapter;
use brickos::adapters::time::SystemClock;
use brickos::adapters::wifi::WifiAdapter;
use brickos::app::ports::Platform;
use brickos::app::{Brick, Ports};
use brickos::config::{OS_VERSION, OsConfig};
use brickos::drivers::{hw_init, status_led::StatusLed};
use brickos::features::{BrickFeature, DelayFeature, FeatureRegistry};
use brickos::update::ota::{self, OtaManager};

/// Idle time between cycles until the server sets one.
const DEFAULT_DELAY_SECS: u32 = 60;

struct EspPlatform;

impl Platform for EspPlatform {
    type Storage = NvsAdapter;
    type Warm = RtcMemory;
    type Radio = WifiAdapter;
    type Http = HttpAdapter;
    type Activator = ActivatorAdapter;
    type Flash = OtaManager;
    type Clock = SystemClock;
    type Led = StatusLed;
    type System = SystemAdapter;
    type Events = LogEventSink;
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("Brick OS v{} (brickos {})", OS_VERSION, env!("CARGO_PKG_VERSION"));

    ota::check_rollback();
    hw_init::init_peripherals().map_err(|e| anyhow::anyhow!("HAL init failed: {}", e))?;

    // ── 2. Adapters ───────────────────────────────────────────
    let config = OsConfig::default();
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let sysloop = esp_idf_svc::eventloop::EspSystemEventLoop::take()?;

    let storage = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let radio = WifiAdapter::new(peripherals.modem, sysloop)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("WiFi init")?;

    let ports = Ports::<EspPlatform> {
        storage,
        warm: RtcMemory::new(),
        radio,
        http: HttpAdapter::new(&config),
        activator: ActivatorAdapter::new(&config),
        flash: OtaManager::new(),
        clock: SystemClock::new(),
        led: StatusLed::new(),
        system: SystemAdapter::new(),
        events: LogEventSink::new(),
    };

    // ── 3. Features ───────────────────────────────────────────
    let mut features = FeatureRegistry::new();
    if features
        .register(BrickFeature::Delay(DelayFeature::new(DEFAULT_DELAY_SECS)))
        .is_err()
    {
        warn!("feature registry full");
    }

    // ── 4. Boot cycle (never returns) ─────────────────────────
    let brick = Brick::new(config, ports, features);
    brick.run(&mut LogConsole::new())
}
