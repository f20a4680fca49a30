//! The engine under the default cadences, driven at realistic loop periods.
//!
//! Every stage must keep running at its own cadence whatever the driver's
//! period; soft ordering may delay a stage but never starve it.

use chrono::{NaiveDate, NaiveDateTime};

use relayctl::app::commands::RelayCommand;
use relayctl::app::service::AppService;
use relayctl::config::ControllerConfig;
use relayctl::model::registry::DeviceRegistry;
use relayctl::model::schedule::SCENARIO_RELAY;
use relayctl::pins;
use relayctl::tick::TickPlan;

use crate::mock_hw::{MockHardware, RecordingSink};

const RELAY0_PIN: u8 = pins::OUTPUT_GPIOS[0];

fn paced() -> (AppService, MockHardware, RecordingSink) {
    let mut app = AppService::new(ControllerConfig::default(), DeviceRegistry::with_default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.apply_manual_relay_command(0, RelayCommand::ResetAll).unwrap();
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

fn wall(now_ms: u64) -> Option<NaiveDateTime> {
    let secs = (now_ms / 1000) as u32;
    NaiveDate::from_ymd_opt(2024, 3, 4).and_then(|d| d.and_hms_opt(9, secs / 60 % 60, secs % 60))
}

fn stages(p: TickPlan) -> [bool; 5] {
    [p.pins, p.schedule, p.timers, p.temperature, p.actions]
}

/// Longest wait, first run included, of each stage over `until` ms.
fn longest_waits(app: &mut AppService, period: u64, until: u64) -> [u64; 5] {
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut last = [0u64; 5];
    let mut worst = [0u64; 5];
    let mut now = 0;
    while now < until {
        let plan = app.evaluate_tick(now, wall(now), &mut hw, &mut sink);
        for (i, ran) in stages(plan).into_iter().enumerate() {
            if ran {
                worst[i] = worst[i].max(now - last[i]);
                last[i] = now;
            }
        }
        now += period;
    }
    for (i, &l) in last.iter().enumerate() {
        worst[i] = worst[i].max(until - l);
    }
    worst
}

fn assert_paced(period: u64) {
    let config = ControllerConfig::default();
    let intervals = [
        config.pin_apply_interval_ms,
        config.schedule_interval_ms,
        config.timer_interval_ms,
        config.temperature_interval_ms,
        config.action_interval_ms,
    ];
    let names = ["pins", "schedule", "timers", "temperature", "actions"];
    let mut app = AppService::new(config, DeviceRegistry::with_default());
    let worst = longest_waits(&mut app, period, 30_000);
    for i in 0..5 {
        let bound = 2 * u64::from(intervals[i]).max(period);
        assert!(
            worst[i] <= bound,
            "{} waited {} ms with a {} ms loop (bound {})",
            names[i],
            worst[i],
            period,
            bound
        );
    }
}

#[test]
fn stages_keep_cadence_with_10ms_loop() {
    assert_paced(10);
}

#[test]
fn stages_keep_cadence_with_500ms_loop() {
    assert_paced(500);
}

#[test]
fn stages_keep_cadence_with_1s_loop() {
    assert_paced(1000);
}

#[test]
fn manual_command_reaches_the_pin_with_1s_loop() {
    let (mut app, mut hw, mut sink) = paced();
    for s in 0..3 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
    }
    let pin = pins::OUTPUT_GPIOS[1];
    app.apply_manual_relay_command(1, RelayCommand::On).unwrap();
    app.evaluate_tick(3000, None, &mut hw, &mut sink);
    assert_eq!(hw.level(pin), Some(true));
}

#[test]
fn one_shot_timer_runs_with_1s_loop() {
    let (mut app, mut hw, mut sink) = paced();
    app.edit_device(|d| {
        d.is_encyclate_timers = false;
        d.is_timers_enabled = true;
    });

    let mut went_high = None;
    let mut went_low = None;
    for s in 0..12 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
        match hw.level(RELAY0_PIN) {
            Some(true) if went_high.is_none() => went_high = Some(s),
            Some(false) if went_high.is_some() && went_low.is_none() => went_low = Some(s),
            _ => {}
        }
    }
    let high = went_high.expect("timer never switched the relay on");
    let low = went_low.expect("timer never switched the relay off");
    assert!(high <= 2, "on after {high} s");
    assert!((5..=8).contains(&(low - high)), "ran {} s", low - high);
    assert!(app.timer_status().completed);
}

#[test]
fn thermostat_reacts_with_1s_loop() {
    let (mut app, mut hw, mut sink) = paced();
    app.edit_device(|d| d.temperature.is_use_setting = true);
    hw.set_climate(pins::DHT_GPIO, 21.0, 40.0);
    for s in 0..4 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(true));

    hw.set_climate(pins::DHT_GPIO, 23.0, 40.0);
    for s in 4..9 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
}

#[test]
fn over_current_trips_with_1s_loop() {
    let (mut app, mut hw, mut sink) = paced();
    app.apply_manual_relay_command(0, RelayCommand::On).unwrap();
    app.apply_manual_relay_command(0, RelayCommand::Reset).unwrap();
    app.edit_device(|d| d.is_action_enabled = true);

    for s in 0..3 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(true));

    hw.analog_in.insert(pins::CURRENT_SENSE_GPIO, 4095);
    for s in 3..6 {
        app.evaluate_tick(s * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert!(app.device().actions[0].was_triggered);
}

#[test]
fn scenario_applies_with_500ms_loop() {
    let (mut app, mut hw, mut sink) = paced();
    app.edit_device(|d| {
        d.schedule_scenarios[0].is_use_setting = true;
        d.schedule_scenarios[0].settings.set(SCENARIO_RELAY, true);
        d.is_schedule_enabled = true;
    });
    for i in 0..6 {
        let now = i * 500;
        app.evaluate_tick(now, wall(now), &mut hw, &mut sink);
    }
    assert!(app.device().schedule_scenarios[0].is_active);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
}
