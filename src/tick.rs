//! Tick scheduler.
//!
//! Decides which subsystems run on a given call of the engine's tick.  Each
//! stage has a minimum interval; some additionally hold back while another
//! stage ran too recently on an earlier call, so expensive work (relay
//! writes, logging) does not pile up.  The ordering is advisory pacing
//! only: a held-back stage runs anyway once it is a full interval overdue.
//!
//! ```text
//!   sensors ─ every call (internal 200/1000 ms), mark every 500 ms
//!   pins    ─ 250 ms, > 100 ms after the sensor mark
//!   schedule─ 1000 ms
//!   timers  ─ 1000 ms, > 250 ms after the schedule pass
//!   temp    ─ 2000 ms, > 500 ms after the timer pass
//!   actions ─ 1000 ms, first pass 750 ms after the first call
//! ```

use crate::config::ControllerConfig;

/// A minimum-interval gate.
#[derive(Debug, Clone, Copy, Default)]
struct Gate {
    interval_ms: u32,
    last_ms: Option<u64>,
}

impl Gate {
    fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            last_ms: None,
        }
    }

    fn is_due(&self, now_ms: u64) -> bool {
        self.last_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= u64::from(self.interval_ms))
    }

    /// Held back for a whole extra interval.
    fn is_overdue(&self, now_ms: u64) -> bool {
        self.last_ms
            .is_some_and(|last| now_ms.saturating_sub(last) >= 2 * u64::from(self.interval_ms))
    }

    /// Whether more than `gap_ms` has passed since this gate last fired.
    fn quiet_for(&self, now_ms: u64, gap_ms: u32) -> bool {
        gap_ms == 0
            || self
                .last_ms
                .is_none_or(|last| now_ms.saturating_sub(last) > u64::from(gap_ms))
    }

    /// Due, and either clear of `after` (as it stood before this call) or
    /// overdue.
    fn may_fire(&self, now_ms: u64, after: &Gate, gap_ms: u32) -> bool {
        self.is_due(now_ms) && (after.quiet_for(now_ms, gap_ms) || self.is_overdue(now_ms))
    }

    fn fire(&mut self, now_ms: u64) {
        self.last_ms = Some(now_ms);
    }
}

/// Stages selected for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickPlan {
    pub pins: bool,
    pub schedule: bool,
    pub timers: bool,
    pub temperature: bool,
    pub actions: bool,
}

#[derive(Debug, Clone)]
pub struct TickScheduler {
    sensor_mark: Gate,
    pins: Gate,
    schedule: Gate,
    timers: Gate,
    temperature: Gate,
    actions: Gate,
    pins_after_sensors_ms: u32,
    timers_after_schedule_ms: u32,
    temperature_after_timers_ms: u32,
    action_phase_ms: u32,
    /// First call since construction or reset.
    started_ms: Option<u64>,
}

impl TickScheduler {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            sensor_mark: Gate::new(config.sensor_mark_interval_ms),
            pins: Gate::new(config.pin_apply_interval_ms),
            schedule: Gate::new(config.schedule_interval_ms),
            timers: Gate::new(config.timer_interval_ms),
            temperature: Gate::new(config.temperature_interval_ms),
            actions: Gate::new(config.action_interval_ms),
            pins_after_sensors_ms: config.pin_apply_after_sensors_ms,
            timers_after_schedule_ms: config.timer_after_schedule_ms,
            temperature_after_timers_ms: config.temperature_after_timers_ms,
            action_phase_ms: config.action_phase_ms,
            started_ms: None,
        }
    }

    /// Pick the stages for `now_ms` and record them as run.  Sensors are
    /// sampled on every call and are not part of the plan.
    pub fn plan(&mut self, now_ms: u64) -> TickPlan {
        let mut plan = TickPlan::default();
        let started = *self.started_ms.get_or_insert(now_ms);

        // Gaps are measured against the previous calls only; a stage firing
        // earlier in this call never holds back the next one.
        let sensor_mark = self.sensor_mark;
        let schedule = self.schedule;
        let timers = self.timers;

        if self.sensor_mark.is_due(now_ms) {
            self.sensor_mark.fire(now_ms);
        }

        if self.pins.may_fire(now_ms, &sensor_mark, self.pins_after_sensors_ms) {
            self.pins.fire(now_ms);
            plan.pins = true;
        }

        if self.schedule.is_due(now_ms) {
            self.schedule.fire(now_ms);
            plan.schedule = true;
        }

        if self.timers.may_fire(now_ms, &schedule, self.timers_after_schedule_ms) {
            self.timers.fire(now_ms);
            plan.timers = true;
        }

        if self
            .temperature
            .may_fire(now_ms, &timers, self.temperature_after_timers_ms)
        {
            self.temperature.fire(now_ms);
            plan.temperature = true;
        }

        let phase_reached = now_ms.saturating_sub(started) >= u64::from(self.action_phase_ms);
        if self.actions.is_due(now_ms) && phase_reached {
            self.actions.fire(now_ms);
            plan.actions = true;
        }

        plan
    }

    /// Every stage becomes due again (device switch).
    pub fn reset(&mut self) {
        for gate in [
            &mut self.sensor_mark,
            &mut self.pins,
            &mut self.schedule,
            &mut self.timers,
            &mut self.temperature,
            &mut self.actions,
        ] {
            gate.last_ms = None;
        }
        self.started_ms = None;
    }
}
