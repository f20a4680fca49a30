//! Relays and the command records that address them.

use serde::{Deserialize, Serialize};

use super::RelayId;
use super::text::{self, Description};

/// A physical pin, either an output the engine drives or an input a sensor
/// reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relay {
    pub id: RelayId,
    pub pin: u8,
    /// Under direct user control: automation must not write `state_pin`.
    pub manual_mode: bool,
    pub is_output: bool,
    pub is_digital: bool,
    /// Target level for the output.
    pub state_pin: bool,
    pub is_pwm: bool,
    pub pwm: u8,
    /// Value saved by the output arbiter for a later restore.
    pub last_state: bool,
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
}

impl Relay {
    pub fn output(id: RelayId, pin: u8, description: &str) -> Self {
        Self {
            id,
            pin,
            is_output: true,
            is_digital: true,
            description: text::bounded(description),
            ..Self::default()
        }
    }

    pub fn input(id: RelayId, pin: u8, digital: bool, description: &str) -> Self {
        Self {
            id,
            pin,
            is_output: false,
            is_digital: digital,
            description: text::bounded(description),
            ..Self::default()
        }
    }
}

/// A relay command: "drive relay `relay_id` to `state_pin`".
///
/// Timers, schedule scenarios, and actions address relays only through these
/// records, never by position, because the relay list can be edited while
/// the engine runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutPower {
    /// Whether this command is active at all.
    pub is_use_setting: bool,
    pub relay_id: RelayId,
    pub state_pin: bool,
    pub last_state: bool,
    pub is_pwm: bool,
    pub pwm: u8,
    /// Releasing the owning automation restores the relay.
    pub is_return: bool,
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
}

impl OutPower {
    pub fn command(relay_id: RelayId, state_pin: bool, description: &str) -> Self {
        Self {
            is_use_setting: true,
            relay_id,
            state_pin,
            description: text::bounded(description),
            ..Self::default()
        }
    }

    /// Same command, inactive.
    pub fn disabled(mut self) -> Self {
        self.is_use_setting = false;
        self
    }

    pub fn returning(mut self) -> Self {
        self.is_return = true;
        self
    }
}
