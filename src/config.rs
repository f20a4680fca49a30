//! Controller configuration parameters
//!
//! Tick cadences, debounce and PID timing, change-detection intervals, and
//! probe constants.  Values can be overridden via NVS.

use serde::{Deserialize, Serialize};

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Sensor sampling ---
    /// NTC, touch, and analog probes (milliseconds)
    pub fast_sensor_interval_ms: u32,
    /// DHT probes (milliseconds)
    pub dht_interval_ms: u32,
    /// Cadence of the "sensors were just read" mark other stages pace on
    pub sensor_mark_interval_ms: u32,

    // --- Tick cadences and soft ordering ---
    pub pin_apply_interval_ms: u32,
    /// Pin writes wait this long after a sensor mark on an earlier tick
    pub pin_apply_after_sensors_ms: u32,
    pub schedule_interval_ms: u32,
    pub timer_interval_ms: u32,
    /// Timer advance waits this long after a schedule pass on an earlier tick
    pub timer_after_schedule_ms: u32,
    pub temperature_interval_ms: u32,
    /// Temperature control waits this long after a timer pass on an earlier tick
    pub temperature_after_timers_ms: u32,
    pub action_interval_ms: u32,
    /// The first action pass waits this long after the engine's first tick
    pub action_phase_ms: u32,

    // --- Touch inputs ---
    pub touch_debounce_ms: u32,

    // --- PID ---
    /// Upper bound of the PID output (lower bound is 0)
    pub pid_window: f32,
    pub pid_sample_ms: u32,
    /// Period of the PID status line in the log
    pub pid_log_interval_ms: u32,

    // --- Change detection ---
    pub relay_check_interval_ms: u32,
    pub sensor_check_interval_ms: u32,
    pub timer_check_interval_ms: u32,

    // --- NTC probes ---
    /// Beta coefficient of the thermistors
    pub ntc_beta: f32,
    /// Calibration offset added to every NTC reading (°C)
    pub ntc_offset_c: f32,

    // --- Persistence ---
    /// Delay between the last device edit and its save
    pub autosave_delay_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Sensors
            fast_sensor_interval_ms: 200,
            dht_interval_ms: 1000, // DHT11 cannot be polled faster than 1 Hz
            sensor_mark_interval_ms: 500,

            // Cadences
            pin_apply_interval_ms: 250,
            pin_apply_after_sensors_ms: 100,
            schedule_interval_ms: 1000,
            timer_interval_ms: 1000,
            timer_after_schedule_ms: 250,
            temperature_interval_ms: 2000,
            temperature_after_timers_ms: 500,
            action_interval_ms: 1000,
            action_phase_ms: 750,

            // Touch
            touch_debounce_ms: 20,

            // PID
            pid_window: 255.0,
            pid_sample_ms: 1000,
            pid_log_interval_ms: 30_000,

            // Change detection
            relay_check_interval_ms: 500,
            sensor_check_interval_ms: 200,
            timer_check_interval_ms: 500,

            // NTC
            ntc_beta: 3950.0,
            ntc_offset_c: -1.0,

            // Persistence
            autosave_delay_ms: 5000,
        }
    }
}

impl ControllerConfig {
    /// Every stage runs on every call.  Intended for simulations and tests
    /// that drive the engine with coarse time steps.
    pub fn unpaced() -> Self {
        Self {
            fast_sensor_interval_ms: 0,
            dht_interval_ms: 0,
            sensor_mark_interval_ms: 0,
            pin_apply_interval_ms: 0,
            pin_apply_after_sensors_ms: 0,
            schedule_interval_ms: 0,
            timer_interval_ms: 0,
            timer_after_schedule_ms: 0,
            temperature_interval_ms: 0,
            temperature_after_timers_ms: 0,
            action_interval_ms: 0,
            action_phase_ms: 0,
            relay_check_interval_ms: 0,
            sensor_check_interval_ms: 0,
            timer_check_interval_ms: 0,
            ..Self::default()
        }
    }
}
