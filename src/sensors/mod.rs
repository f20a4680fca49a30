//! Sensor subsystem — conversions, touch debounce, and the [`SensorSampler`]
//! that refreshes every enabled sensor of the selected device.
//!
//! Fast probes (NTC, touch, analog) are sampled every 200 ms, DHT probes
//! every second.  A sensor reads through its linked input relay's pin; if
//! that relay is missing or is an output, the sensor yields no reading.
//! Individual failures keep the previous value where one exists — a single
//! flaky probe must not stall the control loop.

pub mod ntc;
pub mod touch;

use log::debug;

use crate::app::ports::SensorPort;
use crate::config::ControllerConfig;
use crate::error::SensorError;
use crate::model::sensor::NO_READING;
use crate::model::{Device, Sensor, SensorKind};
use ntc::NtcParams;
use touch::TouchInputs;

/// Value reported by an analog sensor whose input is unusable.
pub const ANALOG_UNAVAILABLE: f32 = -1.0;

#[derive(Debug, Clone)]
pub struct SensorSampler {
    fast_interval_ms: u32,
    dht_interval_ms: u32,
    last_fast_ms: Option<u64>,
    last_dht_ms: Option<u64>,
    ntc_beta: f32,
    ntc_offset_c: f32,
    touch: TouchInputs,
}

impl SensorSampler {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            fast_interval_ms: config.fast_sensor_interval_ms,
            dht_interval_ms: config.dht_interval_ms,
            last_fast_ms: None,
            last_dht_ms: None,
            ntc_beta: config.ntc_beta,
            ntc_offset_c: config.ntc_offset_c,
            touch: TouchInputs::new(config.touch_debounce_ms),
        }
    }

    /// Debounce slots for touch inputs (filled in by pin setup).
    pub fn touch_mut(&mut self) -> &mut TouchInputs {
        &mut self.touch
    }

    /// Forget sampling history and touch state (device switch).
    pub fn reset(&mut self) {
        self.last_fast_ms = None;
        self.last_dht_ms = None;
        self.touch.clear();
    }

    /// Refresh every enabled sensor whose cadence is due.
    pub fn sample(&mut self, device: &mut Device, hw: &mut impl SensorPort, now_ms: u64) {
        let fast_due = due(self.last_fast_ms, self.fast_interval_ms, now_ms);
        let dht_due = due(self.last_dht_ms, self.dht_interval_ms, now_ms);
        if !fast_due && !dht_due {
            return;
        }

        for idx in 0..device.sensors.len() {
            let sensor = &device.sensors[idx];
            if !sensor.is_use_setting {
                continue;
            }
            let run = if sensor.kind.is_dht() { dht_due } else { fast_due };
            if !run {
                continue;
            }

            let pin = input_pin(device, sensor);
            let sensor = &mut device.sensors[idx];
            match pin {
                Ok(pin) => self.read_one(sensor, pin, hw, now_ms),
                Err(e) => {
                    debug!("Sensor {}: {}", sensor.sensor_id, e);
                    match sensor.kind {
                        SensorKind::Ntc => sensor.current_value = NO_READING,
                        SensorKind::Analog => sensor.current_value = ANALOG_UNAVAILABLE,
                        _ => {}
                    }
                }
            }
        }

        if fast_due {
            self.last_fast_ms = Some(now_ms);
        }
        if dht_due {
            self.last_dht_ms = Some(now_ms);
        }
    }

    fn read_one(&mut self, sensor: &mut Sensor, pin: u8, hw: &mut impl SensorPort, now_ms: u64) {
        match sensor.kind {
            SensorKind::Dht11 | SensorKind::Dht22 => {
                let reading = hw.read_climate(pin, sensor.kind);
                if reading.temperature.is_nan() {
                    debug!("Sensor {}: {}", sensor.sensor_id, SensorError::NotANumber);
                } else {
                    sensor.current_value = reading.temperature;
                }
                if !reading.humidity.is_nan() {
                    sensor.humidity_value = reading.humidity;
                }
            }
            SensorKind::Ntc => {
                let params = NtcParams {
                    series_ohms: f32::from(sensor.series_resistance),
                    nominal_ohms: f32::from(sensor.thermistor_resistance),
                    beta: self.ntc_beta,
                    offset_c: self.ntc_offset_c,
                };
                sensor.current_value = ntc::celsius(hw.read_analog(pin), &params);
            }
            SensorKind::Touch => {
                let level = hw.read_digital(pin);
                let pressed = self.touch.sample(pin, level, now_ms);
                sensor.current_value = if pressed { 1.0 } else { 0.0 };
            }
            SensorKind::Analog => {
                sensor.current_value = ntc::analog_level(hw.read_analog(pin));
            }
        }
    }
}

fn due(last: Option<u64>, interval_ms: u32, now_ms: u64) -> bool {
    last.is_none_or(|t| now_ms.saturating_sub(t) >= u64::from(interval_ms))
}

/// Pin of the input relay a sensor is wired to.
fn input_pin(device: &Device, sensor: &Sensor) -> Result<u8, SensorError> {
    match device.relay(sensor.relay_id) {
        Some(relay) if !relay.is_output => Ok(relay.pin),
        _ => Err(SensorError::Disconnected),
    }
}
