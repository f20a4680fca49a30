//! Device model — the aggregate every automation subsystem reads and writes.
//!
//! A [`Device`] owns its relays, sensors, timers, schedule scenarios,
//! actions, temperature settings, and PID catalog.  Cross-references between
//! them are plain ids resolved on every use; nothing here holds a reference
//! into another collection, so relays and sensors can be edited at runtime
//! without invalidating anything.
//!
//! Field names on the wire follow the web UI's document format.

pub mod action;
pub mod bits;
pub mod provision;
pub mod registry;
pub mod relay;
pub mod schedule;
pub mod sensor;
pub mod temperature;
pub mod text;
pub mod timer;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::RangeError;

pub use action::Action;
pub use bits::Bits;
pub use relay::{OutPower, Relay};
pub use schedule::{ScheduleScenario, TimeWindow};
pub use sensor::{Sensor, SensorKind};
pub use temperature::{PidProfile, Temperature};
pub use text::Description;
pub use timer::{Timer, TimerInfo};

pub type RelayId = u8;
pub type SensorId = u8;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Device {
    #[serde(rename = "nameDevice", deserialize_with = "text::truncating")]
    pub name: Description,
    pub is_selected: bool,
    pub relays: Vec<Relay>,
    /// Physical pins inputs may be attached to.
    pub pins: Vec<u8>,
    pub sensors: Vec<Sensor>,
    pub actions: Vec<Action>,
    pub schedule_scenarios: Vec<ScheduleScenario>,
    pub temperature: Temperature,
    pub pids: Vec<PidProfile>,
    pub timers: Vec<Timer>,
    pub is_timers_enabled: bool,
    /// Timer chain restarts from the first timer after the last one.
    pub is_encyclate_timers: bool,
    pub is_schedule_enabled: bool,
    pub is_action_enabled: bool,
}

impl Device {
    pub fn relay(&self, id: RelayId) -> Option<&Relay> {
        self.relays.iter().find(|r| r.id == id)
    }

    pub fn relay_mut(&mut self, id: RelayId) -> Option<&mut Relay> {
        self.relays.iter_mut().find(|r| r.id == id)
    }

    pub fn sensor(&self, id: SensorId) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.sensor_id == id)
    }

    pub fn sensor_mut(&mut self, id: SensorId) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.sensor_id == id)
    }

    pub fn output_relays(&self) -> impl Iterator<Item = &Relay> {
        self.relays.iter().filter(|r| r.is_output)
    }

    /// Rewrite relay ids that point nowhere to the first relay's id.
    ///
    /// Covers the temperature relay and every timer and scenario command.
    /// Returns the clamps performed.  A device without relays is left as is.
    pub fn validate_relay_ids(&mut self) -> heapless::Vec<RangeError, 16> {
        let mut clamped = heapless::Vec::new();
        let Some(first) = self.relays.first().map(|r| r.id) else {
            return clamped;
        };
        let known: heapless::Vec<RelayId, 64> = self.relays.iter().map(|r| r.id).take(64).collect();

        let mut fix = |id: &mut RelayId| {
            if !known.contains(id) {
                let err = RangeError::RelayIdClamped { from: *id, to: first };
                warn!("Device: {}", err);
                let _ = clamped.push(err);
                *id = first;
            }
        };

        fix(&mut self.temperature.relay_id);
        for timer in &mut self.timers {
            fix(&mut timer.initial_state_relay.relay_id);
            fix(&mut timer.end_state_relay.relay_id);
        }
        for scenario in &mut self.schedule_scenarios {
            fix(&mut scenario.initial_state_relay.relay_id);
            fix(&mut scenario.end_state_relay.relay_id);
        }
        clamped
    }

    /// Drop every piece of runtime-only state: timer progress, scenario
    /// latches, action latches, the PID output.
    pub fn clear_runtime_state(&mut self) {
        for timer in &mut self.timers {
            timer.reset_progress();
        }
        for scenario in &mut self.schedule_scenarios {
            scenario.guards = schedule::ScenarioGuards::default();
        }
        for action in &mut self.actions {
            action.was_triggered = false;
        }
        self.temperature.pid_output = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_with_relays(ids: &[RelayId]) -> Device {
        Device {
            relays: ids.iter().map(|&id| Relay::output(id, id + 10, "r")).collect(),
            ..Device::default()
        }
    }

    #[test]
    fn lookups_go_by_id_not_position() {
        let d = device_with_relays(&[5, 2, 9]);
        assert_eq!(d.relay(9).map(|r| r.pin), Some(19));
        assert!(d.relay(0).is_none());
    }

    #[test]
    fn dangling_relay_ids_clamp_to_first_relay() {
        let mut d = device_with_relays(&[5, 2]);
        d.temperature.relay_id = 40;
        d.timers.push(Timer {
            initial_state_relay: OutPower::command(2, true, "on"),
            end_state_relay: OutPower::command(77, false, "off"),
            ..Timer::default()
        });
        let clamped = d.validate_relay_ids();
        assert_eq!(clamped.len(), 2);
        assert_eq!(d.temperature.relay_id, 5);
        assert_eq!(d.timers[0].initial_state_relay.relay_id, 2);
        assert_eq!(d.timers[0].end_state_relay.relay_id, 5);
    }

    #[test]
    fn validation_without_relays_is_a_no_op() {
        let mut d = Device::default();
        d.temperature.relay_id = 3;
        assert!(d.validate_relay_ids().is_empty());
        assert_eq!(d.temperature.relay_id, 3);
    }

}
