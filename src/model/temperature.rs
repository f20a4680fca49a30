//! Temperature controller settings and the PID catalog.

use serde::{Deserialize, Serialize};

use super::bits::Bits;
use super::text::{self, Description, DetailText};
use super::{RelayId, SensorId};

/// Settings mask bit: drive the relay on/off from the setpoint.
pub const TEMPERATURE_RELAY: usize = 0;
/// Settings mask bit: gate the timer chain from the PID output instead.
pub const TEMPERATURE_TIMERS: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Temperature {
    pub is_use_setting: bool,
    pub relay_id: RelayId,
    pub last_state: bool,
    pub sensor_id: SensorId,
    /// Whole degrees.
    pub set_temperature: i32,
    pub current_temp: f32,
    /// PID with PWM duty instead of on/off.
    pub is_smoothly: bool,
    /// Heating (`true`) or cooling.
    pub is_increase: bool,
    #[serde(rename = "collectionSettings")]
    pub settings: Bits<4>,
    pub selected_pid_index: u8,
    /// Last PID output in `[0, window]`.  Runtime only.
    #[serde(skip)]
    pub pid_output: f32,
}

impl Default for Temperature {
    fn default() -> Self {
        Self {
            is_use_setting: false,
            relay_id: 0,
            last_state: false,
            sensor_id: 0,
            set_temperature: 22,
            current_temp: 0.0,
            is_smoothly: false,
            is_increase: true,
            settings: Bits::empty(),
            selected_pid_index: 0,
            pid_output: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidProfile {
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
    #[serde(rename = "descriptionDetailed", deserialize_with = "text::truncating")]
    pub description_detailed: DetailText,
    #[serde(rename = "Kp")]
    pub kp: f32,
    #[serde(rename = "Ki")]
    pub ki: f32,
    #[serde(rename = "Kd")]
    pub kd: f32,
}

impl PidProfile {
    pub fn new(description: &str, detail: &str, kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            description: text::bounded(description),
            description_detailed: text::bounded(detail),
            kp,
            ki,
            kd,
        }
    }
}
