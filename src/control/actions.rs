//! Action trigger engine.
//!
//! Each enabled action watches one sensor value against a hysteresis band
//! (see [`Action::should_trigger`] and [`Action::should_reset`]).  The
//! trigger edge fires the action's effects once; the reset edge releases
//! them when the action asks for it.

use log::debug;

use super::flags::{FeatureFlags, FlagSource};
use super::{arbiter, settle};
use crate::app::ports::{LogSink, Severity};
use crate::model::action::{ACTION_MESSAGE, ACTION_OUTPUTS, ACTION_TEMPERATURE, ACTION_TIMERS};
use crate::model::sensor::is_valid_reading;
use crate::model::{Action, Device};
use crate::report;

#[derive(Debug, Clone, Default)]
pub struct ActionEngine {
    first_run_done: bool,
    prev_enabled: bool,
}

impl ActionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything (device switch).  The next pass repeats the
    /// first-run save.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn evaluate(&mut self, device: &mut Device, flags: &mut FeatureFlags, sink: &mut dyn LogSink) {
        if !self.first_run_done {
            self.first_run(device, sink);
        }

        if self.prev_enabled && !device.is_action_enabled {
            report!(sink, Severity::Info, "Actions disabled, resetting all triggers");
            for idx in 0..device.actions.len() {
                device.actions[idx].was_triggered = false;
                release(device, flags, idx, sink);
            }
        }
        self.prev_enabled = device.is_action_enabled;
        if !device.is_action_enabled {
            return;
        }

        for idx in 0..device.actions.len() {
            let action = &device.actions[idx];
            if !action.is_use_setting {
                device.actions[idx].was_triggered = false;
                continue;
            }

            let Some(sensor) = device.sensor(action.target_sensor_id) else {
                debug!("Action '{}': sensor {} not found", action.description, action.target_sensor_id);
                continue;
            };
            if !is_valid_reading(sensor.current_value) {
                continue;
            }
            let value = sensor.value(action.is_humidity);
            if !value.is_finite() {
                continue;
            }

            if action.should_trigger(value) && !action.was_triggered {
                report!(sink, Severity::Info, "Action TRIGGERED: {}", action.description);
                fire(device, flags, idx, sink);
                device.actions[idx].was_triggered = true;
            } else if action.should_reset(value) && action.was_triggered {
                report!(sink, Severity::Info, "Action RESET: {}", action.description);
                if action.is_return_setting {
                    release(device, flags, idx, sink);
                }
                device.actions[idx].was_triggered = false;
            }
        }
    }

    /// Save every relay an action may drive, so a restore is meaningful
    /// even if the action fires on the very first pass.
    fn first_run(&mut self, device: &mut Device, sink: &mut dyn LogSink) {
        for a in 0..device.actions.len() {
            device.actions[a].was_triggered = false;
            if !device.actions[a].settings.get(ACTION_OUTPUTS) {
                continue;
            }
            for o in 0..device.actions[a].outputs.len() {
                let output = &device.actions[a].outputs[o];
                if output.is_use_setting {
                    let id = output.relay_id;
                    settle(sink, "Action save", arbiter::save(device, id));
                }
            }
        }
        self.first_run_done = true;
        debug!("Actions: first run, all triggers reset");
    }
}

fn fire(device: &mut Device, flags: &mut FeatureFlags, idx: usize, sink: &mut dyn LogSink) {
    let settings = device.actions[idx].settings;

    if settings.get(ACTION_TEMPERATURE) {
        flags.set_temperature(device, true, FlagSource::Action);
    }
    if settings.get(ACTION_OUTPUTS) {
        for o in 0..device.actions[idx].outputs.len() {
            let command = device.actions[idx].outputs[o].clone();
            settle(sink, "Action output", arbiter::apply(device, &command));
        }
    }
    if settings.get(ACTION_TIMERS) {
        flags.set_timers(device, true, FlagSource::Action);
    }
    let action: &Action = &device.actions[idx];
    if settings.get(ACTION_MESSAGE) && !action.send_msg.is_empty() {
        report!(sink, Severity::Notify, "{}", action.send_msg);
    }
}

/// Undo an action's effects: timers and temperature off, `isReturn`
/// outputs restored.
fn release(device: &mut Device, flags: &mut FeatureFlags, idx: usize, sink: &mut dyn LogSink) {
    let settings = device.actions[idx].settings;

    if settings.get(ACTION_TIMERS) {
        flags.set_timers(device, false, FlagSource::Action);
    }
    if settings.get(ACTION_TEMPERATURE) {
        flags.set_temperature(device, false, FlagSource::Action);
    }
    if settings.get(ACTION_OUTPUTS) {
        for o in 0..device.actions[idx].outputs.len() {
            let output = &device.actions[idx].outputs[o];
            if !output.is_use_setting || !output.is_return {
                continue;
            }
            let id = output.relay_id;
            settle(sink, "Action restore", arbiter::restore(device, id));
            report!(sink, Severity::Info, "Relay {} restored to previous state", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bits, OutPower, Relay, Sensor, SensorKind};

    #[derive(Default)]
    struct Capture(Vec<(Severity, String)>);

    impl LogSink for Capture {
        fn record(&mut self, severity: Severity, message: &str) {
            self.0.push((severity, message.to_owned()));
        }
    }

    fn band_action() -> Action {
        Action {
            is_use_setting: true,
            target_sensor_id: 6,
            trigger_max: 30.0,
            trigger_min: 25.0,
            action_more_or_equal: true,
            outputs: vec![OutPower::command(0, true, "fan").returning()],
            settings: Bits::empty().with(ACTION_OUTPUTS),
            is_return_setting: true,
            ..Action::default()
        }
    }

    fn device(action: Action) -> Device {
        Device {
            relays: vec![Relay::output(0, 3, "fan"), Relay::input(4, 23, true, "dht")],
            sensors: vec![Sensor::new(6, 4, SensorKind::Dht11, "room")],
            actions: vec![action],
            is_action_enabled: true,
            ..Device::default()
        }
    }

    fn feed(device: &mut Device, engine: &mut ActionEngine, value: f32, sink: &mut Capture) {
        device.sensors[0].current_value = value;
        engine.evaluate(device, &mut FeatureFlags::new(), sink);
    }

    #[test]
    fn hysteresis_triggers_and_resets_once() {
        let mut d = device(band_action());
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        let mut edges = Vec::new();
        for v in [20.0, 32.0, 28.0, 24.0] {
            let before = d.actions[0].was_triggered;
            feed(&mut d, &mut engine, v, &mut sink);
            if before != d.actions[0].was_triggered {
                edges.push((v, d.actions[0].was_triggered));
            }
        }
        assert_eq!(edges, vec![(32.0, true), (24.0, false)]);
    }

    #[test]
    fn trigger_applies_and_reset_restores_outputs() {
        let mut d = device(band_action());
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, 20.0, &mut sink);
        feed(&mut d, &mut engine, 31.0, &mut sink);
        assert!(d.relays[0].state_pin);
        feed(&mut d, &mut engine, 24.0, &mut sink);
        assert!(!d.relays[0].state_pin);
    }

    #[test]
    fn first_run_saves_before_an_immediate_trigger() {
        let mut d = device(band_action());
        d.relays[0].state_pin = false;
        d.relays[0].last_state = true; // stale value from an earlier owner
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, 35.0, &mut sink);
        assert!(d.relays[0].state_pin);
        feed(&mut d, &mut engine, 10.0, &mut sink);
        assert!(!d.relays[0].state_pin);
    }

    #[test]
    fn sentinel_values_are_skipped() {
        let mut d = device(band_action());
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, -999.0, &mut sink);
        feed(&mut d, &mut engine, f32::NAN, &mut sink);
        assert!(!d.actions[0].was_triggered);
    }

    #[test]
    fn message_goes_out_as_notify() {
        let mut a = band_action();
        a.settings = a.settings.with(ACTION_MESSAGE);
        a.send_msg = crate::model::text::bounded("Too hot");
        let mut d = device(a);
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, 30.0, &mut sink);
        assert!(sink.0.contains(&(Severity::Notify, "Too hot".to_owned())));
    }

    #[test]
    fn humidity_channel_is_selectable() {
        let mut a = band_action();
        a.is_humidity = true;
        let mut d = device(a);
        d.sensors[0].humidity_value = 90.0;
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, 20.0, &mut sink);
        assert!(d.actions[0].was_triggered);
    }

    #[test]
    fn disabling_feature_releases_every_action() {
        let mut a = band_action();
        a.settings = a.settings.with(ACTION_TIMERS);
        let mut d = device(a);
        let mut engine = ActionEngine::new();
        let mut flags = FeatureFlags::new();
        let mut sink = Capture::default();
        d.sensors[0].current_value = 40.0;
        engine.evaluate(&mut d, &mut flags, &mut sink);
        assert!(d.is_timers_enabled);
        assert!(d.relays[0].state_pin);

        d.is_action_enabled = false;
        engine.evaluate(&mut d, &mut flags, &mut sink);
        assert!(!d.actions[0].was_triggered);
        assert!(!d.is_timers_enabled);
        assert!(!d.relays[0].state_pin);
    }

    #[test]
    fn manual_relay_is_left_alone() {
        let mut d = device(band_action());
        d.relays[0].manual_mode = true;
        let mut engine = ActionEngine::new();
        let mut sink = Capture::default();
        feed(&mut d, &mut engine, 40.0, &mut sink);
        assert!(d.actions[0].was_triggered);
        assert!(!d.relays[0].state_pin);
    }
}
