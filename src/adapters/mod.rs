//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to               |
//! |-------------|------------------------|---------------------------|
//! | `hardware`  | SensorPort             | ESP32 ADC, GPIO, DHT wire |
//! |             | ActuatorPort           | ESP32 LEDC, GPIO          |
//! | `hal_pins`  | SensorPort             | embedded-hal pin drivers  |
//! |             | ActuatorPort           |                           |
//! | `log_sink`  | LogSink                | Serial log output         |
//! | `nvs`       | ConfigPort             | NVS / in-memory store     |
//! |             | DeviceStore            |                           |
//! |             | StoragePort            |                           |
//! | `time`      | ClockPort              | ESP32 system timer, SNTP  |

pub mod hal_pins;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
