//! End-to-end tests for the automation engine.
//!
//! Each test builds an [`AppService`] around the factory device, drives it
//! through `evaluate_tick` with [`MockHardware`], and asserts on the pin
//! levels the engine produced.  Relay 0 of the factory device sits on GPIO 3.

use chrono::{NaiveDate, NaiveDateTime};

use relayctl::app::commands::RelayCommand;
use relayctl::app::ports::{PinMode, Severity};
use relayctl::app::service::AppService;
use relayctl::config::ControllerConfig;
use relayctl::model::registry::DeviceRegistry;
use relayctl::model::schedule::SCENARIO_RELAY;
use relayctl::pins;

use crate::mock_hw::{MockHardware, RecordingSink};

const RELAY0_PIN: u8 = pins::OUTPUT_GPIOS[0];

fn make_app() -> AppService {
    AppService::new(ControllerConfig::unpaced(), DeviceRegistry::with_default())
}

fn at(h: u32, m: u32) -> Option<NaiveDateTime> {
    // 2024-03-04 is a Monday.
    NaiveDate::from_ymd_opt(2024, 3, 4).and_then(|d| d.and_hms_opt(h, m, 0))
}

/// Every output off and under automation, pins configured.
fn started() -> (AppService, MockHardware, RecordingSink) {
    let mut app = make_app();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.apply_manual_relay_command(0, RelayCommand::ResetAll).unwrap();
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_configures_outputs_and_inputs() {
    let mut app = make_app();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let setup = app.start(&mut hw, &mut sink);

    assert_eq!(setup.outputs, 4);
    assert_eq!(setup.inputs, 2);
    // Factory levels: relays 0 and 2 start high.
    assert_eq!(hw.modes.get(&RELAY0_PIN), Some(&PinMode::Output(true)));
    assert_eq!(hw.modes.get(&pins::OUTPUT_GPIOS[1]), Some(&PinMode::Output(false)));
    assert_eq!(hw.modes.get(&pins::CURRENT_SENSE_GPIO), Some(&PinMode::Analog));
}

#[test]
fn idle_ticks_do_not_rewrite_pins() {
    let (mut app, mut hw, mut sink) = started();
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    let after_first = hw.writes.len();
    for t in 1..20 {
        app.evaluate_tick(t * 100, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.writes.len(), after_first);
    assert_eq!(app.tick_count(), 20);
}

// ── Manual commands ───────────────────────────────────────────

#[test]
fn manual_on_reaches_the_pin() {
    let (mut app, mut hw, mut sink) = started();
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));

    app.apply_manual_relay_command(0, RelayCommand::On).unwrap();
    app.evaluate_tick(10, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert!(app.device().relays[0].manual_mode);
}

#[test]
fn commands_on_inputs_and_unknown_relays_are_rejected() {
    let (mut app, _, _) = started();
    assert!(app.apply_manual_relay_command(4, RelayCommand::On).is_err());
    assert!(app.apply_manual_relay_command(42, RelayCommand::Off).is_err());
}

#[test]
fn reset_all_switches_everything_off() {
    let mut app = make_app();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);

    app.apply_manual_relay_command(0, RelayCommand::ResetAll).unwrap();
    app.evaluate_tick(0, None, &mut hw, &mut sink);

    for (i, &pin) in pins::OUTPUT_GPIOS.iter().enumerate() {
        assert_eq!(hw.level(pin), Some(false), "pin {pin}");
        assert!(!app.device().relays[i].manual_mode);
    }
}

// ── Temperature ───────────────────────────────────────────────

#[test]
fn thermostat_follows_the_dht_reading() {
    let (mut app, mut hw, mut sink) = started();
    app.edit_device(|d| {
        d.temperature.is_use_setting = true;
        d.temperature.set_temperature = 22;
    });

    hw.set_climate(pins::DHT_GPIO, 21.0, 40.0);
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert!(app.temperature_status().active);
    assert!(sink.contains(Severity::Info, "Temperature control activated"));

    hw.set_climate(pins::DHT_GPIO, 23.0, 40.0);
    app.evaluate_tick(2000, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert_eq!(app.temperature_status().current, 23.0);
}

#[test]
fn thermostat_leaves_a_manual_relay_alone() {
    let (mut app, mut hw, mut sink) = started();
    app.apply_manual_relay_command(0, RelayCommand::Off).unwrap();
    app.edit_device(|d| d.temperature.is_use_setting = true);

    hw.set_climate(pins::DHT_GPIO, 10.0, 40.0);
    for t in 0..5 {
        app.evaluate_tick(t * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert!(!app.device().relays[0].state_pin);
}

#[test]
fn failed_dht_read_keeps_the_last_good_value() {
    let (mut app, mut hw, mut sink) = started();
    app.edit_device(|d| d.temperature.is_use_setting = true);

    hw.set_climate(pins::DHT_GPIO, 21.0, 40.0);
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));

    hw.climate.clear();
    for t in 1..4 {
        app.evaluate_tick(t * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert_eq!(app.device().sensors[0].current_value, 21.0);
}

// ── Schedule ──────────────────────────────────────────────────

#[test]
fn scenario_drives_relay_inside_its_window() {
    let (mut app, mut hw, mut sink) = started();
    app.edit_device(|d| {
        let s = &mut d.schedule_scenarios[0];
        s.is_use_setting = true;
        s.settings.set(SCENARIO_RELAY, true);
        d.is_schedule_enabled = true;
    });

    app.evaluate_tick(0, at(7, 59), &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));

    app.evaluate_tick(1000, at(8, 0), &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert!(app.device().schedule_scenarios[0].is_active);
    assert!(sink.contains(Severity::Info, "Activating scenario"));

    // The window end is inclusive.
    app.evaluate_tick(2000, at(18, 0), &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));

    app.evaluate_tick(3000, at(18, 1), &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert!(!app.device().schedule_scenarios[0].is_active);
}

#[test]
fn schedule_waits_for_the_wall_clock() {
    let (mut app, mut hw, mut sink) = started();
    app.edit_device(|d| {
        d.schedule_scenarios[0].is_use_setting = true;
        d.schedule_scenarios[0].settings.set(SCENARIO_RELAY, true);
        d.is_schedule_enabled = true;
    });

    for t in 0..5 {
        app.evaluate_tick(t * 1000, None, &mut hw, &mut sink);
    }
    assert!(!app.device().schedule_scenarios[0].is_active);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
}

// ── Timers ────────────────────────────────────────────────────

#[test]
fn timer_chain_runs_and_restores_on_disable() {
    let (mut app, mut hw, mut sink) = started();
    app.edit_device(|d| d.is_timers_enabled = true);

    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert!(app.device().timers[0].progress.is_running);

    app.edit_device(|d| d.is_timers_enabled = false);
    app.evaluate_tick(1000, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert!(!app.timer_status().enabled);
}

#[test]
fn manual_relay_is_not_touched_by_timers() {
    let (mut app, mut hw, mut sink) = started();
    app.apply_manual_relay_command(0, RelayCommand::Off).unwrap();
    app.edit_device(|d| d.is_timers_enabled = true);

    for t in 0..12 {
        app.evaluate_tick(t * 1000, None, &mut hw, &mut sink);
    }
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
}

// ── Actions ───────────────────────────────────────────────────

#[test]
fn over_current_action_trips_and_returns() {
    let (mut app, mut hw, mut sink) = started();
    app.apply_manual_relay_command(0, RelayCommand::On).unwrap();
    app.apply_manual_relay_command(0, RelayCommand::Reset).unwrap();
    app.edit_device(|d| d.is_action_enabled = true);

    hw.analog_in.insert(pins::CURRENT_SENSE_GPIO, 0);
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));

    // Full-scale ADC maps to 255, above the 1.0 trip point.
    hw.analog_in.insert(pins::CURRENT_SENSE_GPIO, 4095);
    app.evaluate_tick(100, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(false));
    assert!(app.device().actions[0].was_triggered);
    assert!(sink.contains(Severity::Info, "Action TRIGGERED"));

    // Still above: nothing fires again.
    let writes = hw.writes_to(RELAY0_PIN);
    app.evaluate_tick(200, None, &mut hw, &mut sink);
    assert_eq!(hw.writes_to(RELAY0_PIN), writes);

    hw.analog_in.insert(pins::CURRENT_SENSE_GPIO, 0);
    app.evaluate_tick(300, None, &mut hw, &mut sink);
    assert_eq!(hw.level(RELAY0_PIN), Some(true));
    assert!(!app.device().actions[0].was_triggered);
}

// ── Device switching ──────────────────────────────────────────

#[test]
fn switching_device_reconfigures_pins() {
    let (mut app, mut hw, mut sink) = started();
    let idx = app.add_device(relayctl::model::provision::default_device("Garage", false));
    app.select_device(idx).unwrap();

    hw.modes.clear();
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert_eq!(app.registry().current_index(), idx);
    assert!(hw.modes.contains_key(&RELAY0_PIN));
    assert!(app.select_device(99).is_err());
}

// ── Status polling ────────────────────────────────────────────

#[test]
fn relay_change_is_reported_once() {
    let (mut app, mut hw, mut sink) = started();
    app.evaluate_tick(0, None, &mut hw, &mut sink);
    assert!(app.poll_changes(0).any());
    assert!(!app.poll_changes(10).relays);

    app.apply_manual_relay_command(1, RelayCommand::On).unwrap();
    assert!(app.poll_changes(20).relays);
    assert!(!app.poll_changes(30).relays);
}
