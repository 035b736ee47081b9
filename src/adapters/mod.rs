//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter            | Implements              | Connects to                 |
//! |--------------------|-------------------------|-----------------------------|
//! | `activator_server` | ActivatorPort           | ESP-IDF HTTP server         |
//! | `console`          | SetupConsole            | Serial log output           |
//! | `device_id`        | (brick id)              | eFuse MAC                   |
//! | `http`             | HttpPort                | ESP-IDF HTTP client         |
//! |                    | FirmwareSource          |                             |
//! | `log_sink`         | EventSink               | Serial log output           |
//! | `nvs`              | StoragePort             | NVS / in-memory store       |
//! | `rtc`              | WarmMemory              | RTC no-init RAM             |
//! | `system`           | SystemPort              | Setup input, restart        |
//! | `time`             | Clock                   | ESP32 system timer          |
//! | `wifi`             | RadioPort               | ESP-IDF WiFi STA            |

pub mod activator_server;
pub mod console;
pub mod device_id;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod rtc;
pub mod system;
pub mod time;
pub(crate) mod utils;
pub mod wifi;
