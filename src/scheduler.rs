//! Schedule evaluator.
//!
//! Decides, once per pass, whether each schedule scenario is due and drives
//! its activation and deactivation side effects exactly once per
//! transition.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Scenario is due when                     │
//! │                                                             │
//! │  start ≤ today ≤ end  ∧  month bit  ∧  weekday bit          │
//! │                 ∧  any window contains now                  │
//! │                                                             │
//! │  inactive ──due──▶ activate()   (temperature, timers,       │
//! │     ▲                            save + initial relay)      │
//! │     │                                                       │
//! │     └──not due── deactivate()   (release, restore,          │
//! │                                  end relay; once)           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Windows are minute-of-day ranges with an inclusive end; a window whose
//! end lies before its start wraps around midnight.

use core::fmt::{self, Write};

use chrono::{Datelike, NaiveDateTime, Timelike};
use heapless::String;
use log::debug;

use crate::app::ports::{LogSink, Severity};
use crate::control::flags::{FeatureFlags, FlagSource};
use crate::control::{arbiter, settle};
use crate::model::schedule::{SCENARIO_RELAY, SCENARIO_TEMPERATURE, SCENARIO_TIMERS};
use crate::model::{Bits, Device, ScheduleScenario};
use crate::report;

// ═══════════════════════════════════════════════════════════════
//  Due-ness
// ═══════════════════════════════════════════════════════════════

/// Why a scenario is not due right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotDue {
    Disabled,
    OutOfDateRange,
    MonthMasked,
    DayMasked,
    OutsideWindows,
}

impl fmt::Display for NotDue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Disabled => "disabled",
            Self::OutOfDateRange => "expired",
            Self::MonthMasked => "inactive this month",
            Self::DayMasked => "inactive today",
            Self::OutsideWindows => "time period ended",
        };
        f.write_str(reason)
    }
}

/// Whether minute-of-day `now` falls inside `[start, end]`.
pub fn window_contains(start: u16, end: u16, now: u16) -> bool {
    if end < start {
        // e.g. 22:00–02:00, wraps around midnight
        now >= start || now <= end
    } else {
        now >= start && now <= end
    }
}

/// Index of the first window containing `now`, or why none applies.
pub fn evaluate(scenario: &ScheduleScenario, now: NaiveDateTime) -> Result<usize, NotDue> {
    if !scenario.is_use_setting {
        return Err(NotDue::Disabled);
    }

    let today = now.date();
    if scenario.start_date.is_some_and(|start| today < start)
        || scenario.end_date.is_some_and(|end| today > end)
    {
        return Err(NotDue::OutOfDateRange);
    }
    if !scenario.months.get(now.month0() as usize) {
        return Err(NotDue::MonthMasked);
    }
    if !scenario.week.get(now.weekday().num_days_from_monday() as usize) {
        return Err(NotDue::DayMasked);
    }

    let minute = (now.hour() * 60 + now.minute()) as u16;
    scenario
        .windows
        .iter()
        .position(|w| w.minutes().is_some_and(|(start, end)| window_contains(start, end, minute)))
        .ok_or(NotDue::OutsideWindows)
}

// ═══════════════════════════════════════════════════════════════
//  Status strings
// ═══════════════════════════════════════════════════════════════

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn join_names<const N: usize>(bits: Bits<N>, names: &[&str]) -> String<48> {
    let mut out = String::new();
    for i in bits.iter_set() {
        if !out.is_empty() {
            let _ = out.push(',');
        }
        let _ = out.push_str(names[i]);
    }
    out
}

/// `"Mon,Wed,Fri"` for a weekday mask.
pub fn active_days(week: Bits<7>) -> String<48> {
    join_names(week, &DAY_NAMES)
}

/// `"Jan,Feb"` for a month mask.
pub fn active_months(months: Bits<12>) -> String<48> {
    join_names(months, &MONTH_NAMES)
}

// ═══════════════════════════════════════════════════════════════
//  Evaluator
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ScheduleEvaluator {
    /// `isScheduleEnabled` seen on the previous pass.
    prev_enabled: Option<bool>,
}

impl ScheduleEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous pass (device switch).
    pub fn reset(&mut self) {
        self.prev_enabled = None;
    }

    /// Run one pass over every scenario.
    pub fn tick(&mut self, device: &mut Device, flags: &mut FeatureFlags, now: NaiveDateTime, sink: &mut dyn LogSink) {
        let enabled = device.is_schedule_enabled;
        if self.prev_enabled.is_some_and(|prev| prev && !enabled) {
            for idx in 0..device.schedule_scenarios.len() {
                if device.schedule_scenarios[idx].is_active {
                    report!(sink, Severity::Info, "Deactivating all scenarios (schedule disabled)");
                    deactivate(device, flags, idx, sink);
                    device.schedule_scenarios[idx].is_active = false;
                }
            }
        }
        self.prev_enabled = Some(enabled);
        if !enabled {
            return;
        }

        for idx in 0..device.schedule_scenarios.len() {
            let scenario = &device.schedule_scenarios[idx];
            let verdict = evaluate(scenario, now);
            for window in scenario.windows.iter().filter(|w| w.minutes().is_none()) {
                report!(
                    sink,
                    Severity::Warning,
                    "Invalid time format in scenario '{}': {}-{}",
                    scenario.description,
                    window.start_time,
                    window.end_time
                );
            }

            match verdict {
                Ok(window) if !scenario.is_active => {
                    activate(device, flags, idx, window, now, sink);
                    device.schedule_scenarios[idx].is_active = true;
                }
                Err(reason) if scenario.is_active => {
                    report!(
                        sink,
                        Severity::Info,
                        "Deactivating scenario '{}' ({})",
                        scenario.description,
                        reason
                    );
                    deactivate(device, flags, idx, sink);
                    device.schedule_scenarios[idx].is_active = false;
                }
                _ => {}
            }
        }
    }
}

fn activate(
    device: &mut Device,
    flags: &mut FeatureFlags,
    idx: usize,
    window: usize,
    now: NaiveDateTime,
    sink: &mut dyn LogSink,
) {
    let scenario = &device.schedule_scenarios[idx];
    let settings = scenario.settings;
    let initial = scenario.initial_state_relay.clone();
    let mut guards = scenario.guards;

    let mut line: String<160> = String::new();
    let _ = write!(
        line,
        "Activating scenario: {} | Time: {:02}:{:02}",
        scenario.description,
        now.hour(),
        now.minute()
    );
    if let Some(w) = scenario.windows.get(window) {
        let _ = write!(line, " | Active period: {}-{}", w.start_time, w.end_time);
        if w.minutes().is_some_and(|(start, end)| end < start) {
            let _ = line.push_str(" (crosses midnight)");
        }
    }
    let _ = write!(
        line,
        " | Days: {} | Months: {}",
        active_days(scenario.week),
        active_months(scenario.months)
    );
    report!(sink, Severity::Info, "{}", line);

    guards.scenario_processed = false;

    if settings.get(SCENARIO_RELAY) {
        settle(sink, "Schedule save", arbiter::save(device, initial.relay_id));
    }
    if settings.get(SCENARIO_TEMPERATURE) && !guards.temperature_updated {
        flags.set_temperature(device, true, FlagSource::Schedule);
        guards.temperature_updated = true;
        report!(sink, Severity::Info, "Temperature control enabled (schedule)");
    }
    if settings.get(SCENARIO_TIMERS) && !guards.timers_executed {
        flags.set_timers(device, true, FlagSource::Schedule);
        guards.timers_executed = true;
        report!(sink, Severity::Info, "Timers enabled (schedule)");
    }
    if settings.get(SCENARIO_RELAY) && !guards.initial_state_applied {
        settle(sink, "Schedule initial", arbiter::apply(device, &initial));
        guards.initial_state_applied = true;
        report!(sink, Severity::Info, "Initial relay state applied (schedule)");
    }

    device.schedule_scenarios[idx].guards = guards;
}

/// Release everything scenario `idx` claimed.  The side effects run at most
/// once per active period; repeated calls only clear the activation guards.
///
/// Returns whether the side effects ran.
pub fn deactivate(device: &mut Device, flags: &mut FeatureFlags, idx: usize, sink: &mut dyn LogSink) -> bool {
    let Some(scenario) = device.schedule_scenarios.get(idx) else {
        debug!("Schedule: no scenario {}", idx);
        return false;
    };
    let settings = scenario.settings;
    let initial_id = scenario.initial_state_relay.relay_id;
    let end = scenario.end_state_relay.clone();
    let already = scenario.guards.scenario_processed;

    if !already {
        if settings.get(SCENARIO_TEMPERATURE) {
            flags.set_temperature(device, false, FlagSource::Schedule);
            let relay = device.temperature.relay_id;
            settle(sink, "Schedule restore", arbiter::restore(device, relay));
        }
        if settings.get(SCENARIO_TIMERS) {
            flags.set_timers(device, false, FlagSource::Schedule);
            for t in 0..device.timers.len() {
                let relay = device.timers[t].initial_state_relay.relay_id;
                settle(sink, "Schedule restore", arbiter::restore(device, relay));
            }
        }
        if settings.get(SCENARIO_RELAY) {
            settle(sink, "Schedule restore", arbiter::restore(device, initial_id));
        }
        if end.is_use_setting {
            settle(sink, "Schedule end", arbiter::apply(device, &end));
            report!(sink, Severity::Info, "End relay state applied (schedule)");
        }
    }

    let guards = &mut device.schedule_scenarios[idx].guards;
    guards.scenario_processed = true;
    guards.temperature_updated = false;
    guards.timers_executed = false;
    guards.initial_state_applied = false;
    guards.end_state_applied = false;
    !already
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
