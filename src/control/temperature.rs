//! Temperature controller.
//!
//! Drives the linked output relay from the linked sensor, either on/off
//! around the setpoint or through a PID controller whose output becomes a
//! PWM duty.  The sensor and relay are resolved by id on every pass; the
//! controller only remembers which ids it bound to, so an edit of either id
//! is seen as a release of the old pair followed by a fresh activation on
//! the next pass.

use log::{debug, info, warn};

use super::flags::{FeatureFlags, FlagSource};
use super::pid::{self, Direction, PidController};
use super::{arbiter, settle};
use crate::app::ports::{LogSink, Severity};
use crate::config::ControllerConfig;
use crate::error::{ConfigurationError, Error, RangeError};
use crate::model::sensor::is_valid_reading;
use crate::model::temperature::{TEMPERATURE_RELAY, TEMPERATURE_TIMERS};
use crate::model::{Device, RelayId, SensorId};
use crate::report;

/// Ids the controller resolved on activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Binding {
    sensor_id: SensorId,
    relay_id: RelayId,
}

#[derive(Debug, Clone)]
pub struct TemperatureController {
    binding: Option<Binding>,
    pid: Option<PidController>,
    window: f32,
    sample_ms: u32,
    log_interval_ms: u32,
    last_pid_log_ms: Option<u64>,
}

impl TemperatureController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            binding: None,
            pid: None,
            window: config.pid_window,
            sample_ms: config.pid_sample_ms,
            log_interval_ms: config.pid_log_interval_ms,
            last_pid_log_ms: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.binding.is_some()
    }

    pub fn has_pid(&self) -> bool {
        self.pid.is_some()
    }

    /// Drop the binding and PID without touching the device (device
    /// switch: the old device's relays are no longer ours to restore).
    pub fn reset(&mut self) {
        self.binding = None;
        self.pid = None;
        self.last_pid_log_ms = None;
    }

    pub fn update(&mut self, device: &mut Device, flags: &mut FeatureFlags, now_ms: u64, sink: &mut dyn LogSink) {
        let temp = &device.temperature;

        if !temp.is_use_setting {
            if self.binding.is_some() {
                self.deactivate(device, sink);
            }
            return;
        }

        if let Some(bound) = self.binding {
            if bound.sensor_id != temp.sensor_id || bound.relay_id != temp.relay_id {
                info!(
                    "Temperature: link changed (sensor {}→{}, relay {}→{})",
                    bound.sensor_id, temp.sensor_id, bound.relay_id, temp.relay_id
                );
                self.deactivate(device, sink);
                return;
            }
        } else if let Err(e) = self.activate(device) {
            report!(sink, Severity::Error, "Temperature control error: {}", e);
            flags.set_temperature(device, false, FlagSource::Temperature);
            return;
        } else {
            report!(sink, Severity::Info, "Temperature control activated");
        }

        self.control(device, flags, now_ms, sink);
    }

    fn activate(&mut self, device: &mut Device) -> Result<(), Error> {
        let temp = &device.temperature;
        let binding = Binding {
            sensor_id: temp.sensor_id,
            relay_id: temp.relay_id,
        };
        let relay = device
            .relay(binding.relay_id)
            .ok_or(ConfigurationError::RelayNotFound(binding.relay_id))?;
        if !relay.is_output {
            return Err(ConfigurationError::RelayNotOutput(binding.relay_id).into());
        }
        let sensor = device
            .sensor(binding.sensor_id)
            .ok_or(ConfigurationError::SensorNotFound(binding.sensor_id))?;

        self.pid = None;
        if temp.is_smoothly {
            let index = temp.selected_pid_index;
            let profile = device
                .pids
                .get(index as usize)
                .ok_or(RangeError::PidProfile(index));
            match profile {
                Ok(profile) => {
                    let mut pid = PidController::from_profile(
                        profile,
                        Direction::from_increase(temp.is_increase),
                        self.sample_ms,
                    );
                    pid.set_limits(0.0, self.window);
                    let start = if is_valid_reading(sensor.current_value) {
                        sensor.current_value
                    } else {
                        temp.set_temperature as f32
                    };
                    pid.initialize(start);
                    self.pid = Some(pid);
                }
                Err(e) => warn!("Temperature: {}, falling back to on/off", e),
            }
        }

        arbiter::save(device, binding.relay_id)?;
        self.binding = Some(binding);
        self.last_pid_log_ms = None;
        Ok(())
    }

    fn deactivate(&mut self, device: &mut Device, sink: &mut dyn LogSink) {
        if let Some(bound) = self.binding.take() {
            if let Some(relay) = device.relay_mut(bound.relay_id) {
                if relay.is_output && !relay.manual_mode {
                    relay.is_pwm = false;
                    relay.pwm = 0;
                }
            }
            settle(sink, "Temperature restore", arbiter::restore(device, bound.relay_id));
        }
        self.pid = None;
        device.temperature.pid_output = 0.0;
        report!(sink, Severity::Info, "Temperature control deactivated");
    }

    fn control(&mut self, device: &mut Device, flags: &mut FeatureFlags, now_ms: u64, sink: &mut dyn LogSink) {
        let temp = &device.temperature;
        let Some(sensor) = device.sensor(temp.sensor_id) else {
            return;
        };
        let reading = sensor.current_value;
        if !is_valid_reading(reading) {
            debug!("Temperature: sensor {} has no reading, skipping", temp.sensor_id);
            return;
        }
        let relay_id = temp.relay_id;
        let setpoint = temp.set_temperature as f32;
        let is_increase = temp.is_increase;
        let settings = temp.settings;
        let smooth = temp.is_smoothly;
        device.temperature.current_temp = reading;

        let manual = device.relay(relay_id).is_some_and(|r| r.manual_mode);

        if smooth {
            if let Some(ctl) = self.pid.as_mut() {
                if let Some(out) = ctl.compute(now_ms, reading, setpoint) {
                    device.temperature.pid_output = out;
                }
                let duty = pid::duty(ctl.output(), self.window);
                if !manual {
                    if let Some(relay) = device.relay_mut(relay_id) {
                        relay.is_pwm = true;
                        relay.pwm = duty;
                    }
                }
                self.log_pid(now_ms, reading, setpoint, duty, sink);
                return;
            }
        }

        if !manual {
            if let Some(relay) = device.relay_mut(relay_id) {
                relay.is_pwm = false;
            }
        }

        if settings.get(TEMPERATURE_RELAY) {
            let want = if is_increase { reading < setpoint } else { reading > setpoint };
            settle(sink, "Temperature", arbiter::drive(device, relay_id, want));
        } else if settings.get(TEMPERATURE_TIMERS) {
            let output = device.temperature.pid_output;
            let run = if is_increase { output > 0.0 } else { output < self.window * 0.5 };
            flags.set_timers(device, run, FlagSource::Temperature);
        }
    }

    fn log_pid(&mut self, now_ms: u64, reading: f32, setpoint: f32, duty: u8, sink: &mut dyn LogSink) {
        let due = self
            .last_pid_log_ms
            .is_none_or(|last| now_ms.saturating_sub(last) > u64::from(self.log_interval_ms));
        if due {
            report!(
                sink,
                Severity::Info,
                "PID: Temp={:.1}°C, Set={:.0}°C, PWM={}%",
                reading,
                setpoint,
                u32::from(duty) * 100 / 255
            );
            self.last_pid_log_ms = Some(now_ms);
        }
    }
}
