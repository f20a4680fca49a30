//! Timer sequencer.
//!
//! Runs the device's timers one at a time, in order:
//!
//! ```text
//!   Idle ──start──▶ Running ──elapsed ≥ duration──▶ Completed ──▶ next timer
//!                     │
//!                     └──isUseSetting cleared──▶ Stopped (chain back to 0)
//! ```
//!
//! Disabled timers are skipped.  Past the last timer the chain either wraps
//! to the first enabled timer (`isEncyclateTimers`) or halts until the
//! feature is toggled.
//!
//! Switching `isTimersEnabled` on saves every relay the enabled timers
//! address and the temperature enable flag; switching it off puts all of
//! them back.

use heapless::Vec;
use log::debug;

use super::flags::{FeatureFlags, FlagSource};
use super::{arbiter, settle};
use crate::app::ports::{LogSink, Severity};
use crate::model::timer::{TIMER_END_RELAY, TIMER_TEMPERATURE};
use crate::model::{Device, RelayId, TimerInfo};
use crate::report;

/// Distinct relay ids a timer chain may address.
const MAX_TIMER_RELAYS: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct TimerSequencer {
    index: usize,
    completed: bool,
    prev_enabled: bool,
    /// Relays were saved on the last off→on edge and await restore.
    restore_armed: bool,
    temperature_before: bool,
    /// The previously finished timer toggled temperature control on.
    prev_had_temp_control: bool,
}

impl TimerSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the current (or next) timer in the chain.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// The chain ran to its end and is not cyclic.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Forget everything (device switch).
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Handle enable/disable edges, then advance the chain by one step.
    pub fn advance(&mut self, device: &mut Device, flags: &mut FeatureFlags, now_ms: u64, sink: &mut dyn LogSink) {
        let enabled = device.is_timers_enabled;
        if enabled != self.prev_enabled {
            if enabled {
                self.capture_restore_point(device, sink);
            } else if self.restore_armed {
                self.replay_restore_point(device, flags, sink);
            }
            self.prev_enabled = enabled;
        }
        self.step(device, flags, now_ms, sink);
    }

    fn capture_restore_point(&mut self, device: &mut Device, sink: &mut dyn LogSink) {
        report!(sink, Severity::Info, "Timers: saving relay states");
        self.temperature_before = device.temperature.is_use_setting;
        for timer in &mut device.timers {
            timer.reset_progress();
        }
        for id in referenced_relays(device) {
            // Inputs are never driven by timers; nothing to save.
            if device.relay(id).is_some_and(|r| r.is_output) {
                settle(sink, "Timers save", arbiter::save(device, id));
            }
        }
        self.index = 0;
        self.completed = false;
        self.restore_armed = true;
    }

    fn replay_restore_point(&mut self, device: &mut Device, flags: &mut FeatureFlags, sink: &mut dyn LogSink) {
        report!(sink, Severity::Info, "Timers: restoring relay states");
        flags.set_temperature(device, self.temperature_before, FlagSource::Restore);
        for id in referenced_relays(device) {
            if device.relay(id).is_some_and(|r| r.is_output) {
                settle(sink, "Timers restore", arbiter::restore(device, id));
            }
        }
        self.restore_armed = false;
    }

    fn step(&mut self, device: &mut Device, flags: &mut FeatureFlags, now_ms: u64, sink: &mut dyn LogSink) {
        if !device.is_timers_enabled || device.timers.is_empty() {
            for timer in &mut device.timers {
                timer.reset_progress();
            }
            self.index = 0;
            self.completed = false;
            return;
        }

        if self.completed && !device.is_encyclate_timers {
            return;
        }

        if self.index >= device.timers.len() {
            self.index = 0;
        }

        if !device.timers[self.index].progress.is_running {
            let Some(next) = self.next_enabled(device, self.index) else {
                if !self.completed {
                    self.completed = true;
                    report!(sink, Severity::Info, "Timers: chain completed");
                }
                return;
            };
            self.start(device, next, now_ms, sink);
            return;
        }

        let index = self.index;
        let timer = &mut device.timers[index];
        if !timer.is_use_setting {
            timer.progress.is_running = false;
            timer.progress.is_stopped = true;
            self.index = 0;
            self.completed = false;
            report!(sink, Severity::Warning, "Timer {} disabled while running, stopped", index);
            return;
        }

        let duration = timer.duration_ms();
        let elapsed = now_ms.saturating_sub(timer.progress.started_at_ms);
        timer.progress.elapsed_ms = elapsed;
        timer.progress.remaining_ms = duration.saturating_sub(elapsed);
        if elapsed < duration {
            return;
        }

        self.finish(device, flags, index, sink);
        match self.next_enabled(device, index + 1) {
            Some(next) => self.start(device, next, now_ms, sink),
            None => {
                self.completed = true;
                report!(sink, Severity::Info, "Timers: chain completed");
            }
        }
    }

    /// First enabled timer at or after `from`, wrapping to the front when
    /// the chain is cyclic.
    fn next_enabled(&self, device: &Device, from: usize) -> Option<usize> {
        let forward = (from..device.timers.len()).find(|&i| device.timers[i].is_use_setting);
        if forward.is_some() || !device.is_encyclate_timers {
            return forward;
        }
        (0..device.timers.len()).find(|&i| device.timers[i].is_use_setting)
    }

    fn start(&mut self, device: &mut Device, index: usize, now_ms: u64, sink: &mut dyn LogSink) {
        let timer = &mut device.timers[index];
        let duration = timer.duration_ms();
        timer.progress = TimerInfo {
            started_at_ms: now_ms,
            elapsed_ms: 0,
            remaining_ms: duration,
            is_running: true,
            is_stopped: false,
        };
        let command = timer.initial_state_relay.clone();
        self.index = index;
        self.completed = false;
        debug!("Timers: timer {} started ({} ms)", index, duration);
        settle(sink, "Timer start", arbiter::apply(device, &command));
    }

    fn finish(&mut self, device: &mut Device, flags: &mut FeatureFlags, index: usize, sink: &mut dyn LogSink) {
        let timer = &mut device.timers[index];
        timer.progress.is_running = false;
        timer.progress.is_stopped = true;
        timer.progress.remaining_ms = 0;
        let settings = timer.settings;
        let end = timer.end_state_relay.clone();

        let wants_temperature = settings.get(TIMER_TEMPERATURE);
        if wants_temperature {
            flags.set_temperature(device, true, FlagSource::Timer);
        } else if self.prev_had_temp_control {
            flags.set_temperature(device, false, FlagSource::Timer);
        }
        self.prev_had_temp_control = wants_temperature;

        if settings.get(TIMER_END_RELAY) {
            settle(sink, "Timer end", arbiter::apply(device, &end));
        }
        report!(sink, Severity::Info, "Timer {} finished", index);
    }
}

/// Distinct relay ids addressed by enabled timers, in first-seen order.
fn referenced_relays(device: &Device) -> Vec<RelayId, MAX_TIMER_RELAYS> {
    let mut ids = Vec::new();
    for timer in device.timers.iter().filter(|t| t.is_use_setting) {
        for id in [timer.initial_state_relay.relay_id, timer.end_state_relay.relay_id] {
            if !ids.contains(&id) {
                let _ = ids.push(id);
            }
        }
    }
    ids
}
