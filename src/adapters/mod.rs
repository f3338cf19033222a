//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements   | Connects to                     |
//! |--------------|--------------|---------------------------------|
//! | `wifi`       | LinkPort     | ESP-IDF WiFi STA                |
//! | `mqtt`       | BrokerPort   | esp-mqtt over mutual TLS        |
//! | `time`       | ClockPort    | ESP32 timer, SNTP, FreeRTOS     |
//! | `display`    | DisplayPort  | Status screen                   |
//! | `log_sink`   | EventSink    | Serial log output               |
//! | `cert_store` | —            | PEM files on SPIFFS             |
//! | `ble`        | —            | Bluedroid GAP advertising       |
//! | `system`     | —            | `esp_restart`                   |

pub mod ble;
pub mod cert_store;
pub mod display;
pub mod log_sink;
pub mod mqtt;
pub mod system;
pub mod time;
pub mod wifi;
