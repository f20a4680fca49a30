//! PID controller for time-proportioned heating/cooling.
//!
//! Fixed sample interval, derivative on measurement, integral clamped to
//! the output range (anti-windup).  Output lives in `[0, window]` and is
//! mapped linearly onto an 8-bit PWM duty.

use crate::model::PidProfile;

/// Which way the output pushes the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// More output raises the measurement (heating).
    Direct,
    /// More output lowers the measurement (cooling).
    Reverse,
}

impl Direction {
    pub fn from_increase(is_increase: bool) -> Self {
        if is_increase { Self::Direct } else { Self::Reverse }
    }
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    kp: f32,
    ki: f32,
    kd: f32,
    direction: Direction,
    sample_ms: u32,
    output_sum: f32,
    last_input: f32,
    last_time_ms: Option<u64>,
    output: f32,
    output_min: f32,
    output_max: f32,
}

impl PidController {
    pub fn new(kp: f32, ki: f32, kd: f32, direction: Direction, sample_ms: u32) -> Self {
        let mut pid = Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            direction,
            sample_ms: sample_ms.max(1),
            output_sum: 0.0,
            last_input: 0.0,
            last_time_ms: None,
            output: 0.0,
            output_min: 0.0,
            output_max: 255.0,
        };
        pid.set_tunings(kp, ki, kd);
        pid
    }

    pub fn from_profile(profile: &PidProfile, direction: Direction, sample_ms: u32) -> Self {
        Self::new(profile.kp, profile.ki, profile.kd, direction, sample_ms)
    }

    /// Gains are per second; they are rescaled to the sample interval.
    pub fn set_tunings(&mut self, kp: f32, ki: f32, kd: f32) {
        if kp < 0.0 || ki < 0.0 || kd < 0.0 {
            return;
        }
        let sample_s = self.sample_ms as f32 / 1000.0;
        let sign = match self.direction {
            Direction::Direct => 1.0,
            Direction::Reverse => -1.0,
        };
        self.kp = sign * kp;
        self.ki = sign * ki * sample_s;
        self.kd = sign * kd / sample_s;
    }

    /// Set output limits
    pub fn set_limits(&mut self, min: f32, max: f32) {
        if min >= max {
            return;
        }
        self.output_min = min;
        self.output_max = max;
        self.output = self.output.clamp(min, max);
        self.output_sum = self.output_sum.clamp(min, max);
    }

    /// Bumpless start from the current measurement.
    pub fn initialize(&mut self, input: f32) {
        self.last_input = input;
        self.output_sum = self.output.clamp(self.output_min, self.output_max);
        self.last_time_ms = None;
    }

    /// Run one step if a full sample interval has passed since the last
    /// one.  Returns the new output, or `None` when it is too early.
    pub fn compute(&mut self, now_ms: u64, input: f32, setpoint: f32) -> Option<f32> {
        if let Some(last) = self.last_time_ms {
            if now_ms.saturating_sub(last) < u64::from(self.sample_ms) {
                return None;
            }
        }

        let error = setpoint - input;
        let d_input = input - self.last_input;

        self.output_sum = (self.output_sum + self.ki * error).clamp(self.output_min, self.output_max);
        self.output =
            (self.kp * error + self.output_sum - self.kd * d_input).clamp(self.output_min, self.output_max);

        self.last_input = input;
        self.last_time_ms = Some(now_ms);
        Some(self.output)
    }

    /// Last computed output.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Reset controller state
    pub fn reset(&mut self) {
        self.output_sum = 0.0;
        self.output = 0.0;
        self.last_time_ms = None;
    }
}

/// Map an output in `[0, window]` onto an 8-bit duty.
pub fn duty(output: f32, window: f32) -> u8 {
    if window <= 0.0 || !output.is_finite() {
        return 0;
    }
    (output.clamp(0.0, window) * 255.0 / window) as u8
}
