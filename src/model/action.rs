//! Sensor-threshold actions.

use serde::{Deserialize, Serialize};

use super::SensorId;
use super::bits::Bits;
use super::relay::OutPower;
use super::text::{self, Description};

/// Settings mask bit: enable the temperature controller on trigger.
pub const ACTION_TEMPERATURE: usize = 0;
/// Settings mask bit: apply the relay outputs on trigger.
pub const ACTION_OUTPUTS: usize = 1;
/// Settings mask bit: enable the timer chain on trigger.
pub const ACTION_TIMERS: usize = 2;
/// Settings mask bit: emit `send_msg` on trigger.
pub const ACTION_MESSAGE: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Action {
    pub is_use_setting: bool,
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
    pub target_sensor_id: SensorId,
    #[serde(rename = "triggerValueMax")]
    pub trigger_max: f32,
    #[serde(rename = "triggerValueMin")]
    pub trigger_min: f32,
    /// Compare the humidity channel instead of the primary value.
    pub is_humidity: bool,
    /// `true`: trigger at `>= trigger_max`, reset below `trigger_min`.
    /// `false`: trigger at `<= trigger_max`, reset above `trigger_min`.
    pub action_more_or_equal: bool,
    pub outputs: Vec<OutPower>,
    #[serde(rename = "collectionSettings")]
    pub settings: Bits<4>,
    #[serde(deserialize_with = "text::truncating")]
    pub send_msg: Description,
    /// Run the release effects when the reset edge fires.
    pub is_return_setting: bool,
    pub was_triggered: bool,
}

impl Action {
    pub fn should_trigger(&self, value: f32) -> bool {
        if self.action_more_or_equal {
            value >= self.trigger_max
        } else {
            value <= self.trigger_max
        }
    }

    pub fn should_reset(&self, value: f32) -> bool {
        if self.action_more_or_equal {
            value < self.trigger_min
        } else {
            value > self.trigger_min
        }
    }
}
