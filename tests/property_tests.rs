//! Property tests for the automation engine's core invariants.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use relayctl::app::commands::RelayCommand;
use relayctl::app::ports::{ActuatorPort, ClimateReading, LogSink, PinMode, SensorPort, Severity};
use relayctl::app::service::AppService;
use relayctl::config::ControllerConfig;
use relayctl::control::{ActionEngine, FeatureFlags};
use relayctl::model::provision::default_device;
use relayctl::model::registry::DeviceRegistry;
use relayctl::model::schedule::SCENARIO_RELAY;
use relayctl::model::text::{self, DESCRIPTION_CAP};
use relayctl::model::SensorKind;
use relayctl::pins;
use relayctl::scheduler::window_contains;
use relayctl::sensors::ntc::{self, NtcParams};

struct Quiet;

impl LogSink for Quiet {
    fn record(&mut self, _severity: Severity, _message: &str) {}
}

/// Board whose inputs are set per step.
#[derive(Default)]
struct Board {
    temperature: f32,
    current_adc: u16,
}

impl SensorPort for Board {
    fn read_digital(&mut self, _pin: u8) -> bool {
        true
    }

    fn read_analog(&mut self, _pin: u8) -> u16 {
        self.current_adc
    }

    fn read_climate(&mut self, _pin: u8, _kind: SensorKind) -> ClimateReading {
        ClimateReading {
            temperature: self.temperature,
            humidity: 50.0,
        }
    }
}

impl ActuatorPort for Board {
    fn configure(&mut self, _pin: u8, _mode: PinMode) {}
    fn write_digital(&mut self, _pin: u8, _high: bool) {}
    fn write_pwm(&mut self, _pin: u8, _duty: u8) {}
}

fn monday_at(minute_of_day: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .and_then(|d| d.and_hms_opt(minute_of_day / 60, minute_of_day % 60, 0))
}

// ── Manual override ───────────────────────────────────────────

proptest! {
    /// With every automation feature enabled and competing for relay 0, a
    /// relay under manual control keeps the level the user chose.
    #[test]
    fn manual_relay_is_never_changed_by_automation(
        manual_on in any::<bool>(),
        steps in proptest::collection::vec((10.0f32..35.0, 0u16..=4095, 0u32..1440), 1..40),
    ) {
        let mut app = AppService::new(ControllerConfig::unpaced(), DeviceRegistry::with_default());
        let command = if manual_on { RelayCommand::On } else { RelayCommand::Off };
        app.apply_manual_relay_command(0, command).unwrap();
        app.edit_device(|d| {
            d.temperature.is_use_setting = true;
            d.is_timers_enabled = true;
            d.is_action_enabled = true;
            d.is_schedule_enabled = true;
            d.schedule_scenarios[0].is_use_setting = true;
            d.schedule_scenarios[0].settings.set(SCENARIO_RELAY, true);
        });

        let mut board = Board::default();
        for (i, (temperature, adc, minute)) in steps.into_iter().enumerate() {
            board.temperature = temperature;
            board.current_adc = adc;
            app.evaluate_tick(i as u64 * 1_000, monday_at(minute), &mut board, &mut Quiet);

            let relay = &app.device().relays[0];
            prop_assert!(relay.manual_mode);
            prop_assert_eq!(relay.state_pin, manual_on);
        }
    }
}

// ── Stage pacing ──────────────────────────────────────────────

proptest! {
    /// Whatever the loop period, every stage runs again within two of its
    /// intervals (or two loop periods when the loop is slower).
    #[test]
    fn no_stage_starves_under_default_cadences(period in 10u64..=1500) {
        let config = ControllerConfig::default();
        let intervals = [
            config.pin_apply_interval_ms,
            config.schedule_interval_ms,
            config.timer_interval_ms,
            config.temperature_interval_ms,
            config.action_interval_ms,
        ];
        let mut app = AppService::new(config, DeviceRegistry::with_default());
        let mut board = Board::default();
        let mut last = [0u64; 5];
        let until = 20_000;
        let mut now = 0;
        while now < until {
            let plan = app.evaluate_tick(now, monday_at(600), &mut board, &mut Quiet);
            let ran = [plan.pins, plan.schedule, plan.timers, plan.temperature, plan.actions];
            for i in 0..5 {
                if ran[i] {
                    let bound = 2 * u64::from(intervals[i]).max(period);
                    prop_assert!(now - last[i] <= bound, "stage {} waited {} ms", i, now - last[i]);
                    last[i] = now;
                }
            }
            now += period;
        }
    }
}

// ── Action hysteresis ─────────────────────────────────────────

proptest! {
    /// The trigger edge fires once per excursion above the band; it only
    /// re-arms after the value drops below the lower bound.
    #[test]
    fn action_fires_once_per_band_crossing(
        values in proptest::collection::vec(0.0f32..2.0, 1..60),
    ) {
        let mut device = default_device("d", true);
        device.relays[0].manual_mode = false;
        device.is_action_enabled = true;
        let (max, min) = (device.actions[0].trigger_max, device.actions[0].trigger_min);
        let current = device.sensors[1].sensor_id;

        let mut engine = ActionEngine::new();
        let mut flags = FeatureFlags::new();
        let mut expected_armed = false;
        let mut expected_fires = 0;
        let mut fires = 0;

        for v in values {
            if let Some(s) = device.sensor_mut(current) {
                s.current_value = v;
            }
            let before = device.actions[0].was_triggered;
            engine.evaluate(&mut device, &mut flags, &mut Quiet);
            if !before && device.actions[0].was_triggered {
                fires += 1;
            }

            if !expected_armed && v >= max {
                expected_armed = true;
                expected_fires += 1;
            } else if expected_armed && v < min {
                expected_armed = false;
            }
            prop_assert_eq!(device.actions[0].was_triggered, expected_armed);
            // Tripped means the output is held off.
            if expected_armed {
                prop_assert!(!device.relays[0].state_pin);
            }
        }
        prop_assert_eq!(fires, expected_fires);
    }
}

// ── Schedule windows ──────────────────────────────────────────

proptest! {
    #[test]
    fn window_contains_its_endpoints(start in 0u16..1440, end in 0u16..1440) {
        prop_assert!(window_contains(start, end, start));
        prop_assert!(window_contains(start, end, end));
    }

    /// A window that crosses midnight is the complement of the open gap
    /// between its end and start.
    #[test]
    fn midnight_window_is_the_complement_of_its_gap(
        start in 0u16..1440,
        end in 0u16..1440,
        now in 0u16..1440,
    ) {
        let inside = window_contains(start, end, now);
        if start <= end {
            prop_assert_eq!(inside, start <= now && now <= end);
        } else {
            prop_assert_eq!(inside, !(end < now && now < start));
        }
    }
}

// ── Conversions ───────────────────────────────────────────────

proptest! {
    /// More ADC counts means a colder probe.
    #[test]
    fn ntc_is_monotonic(a in 4u16..4092, b in 4u16..4092) {
        let params = NtcParams {
            series_ohms: 10_000.0,
            nominal_ohms: 10_000.0,
            beta: 3950.0,
            offset_c: 0.0,
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ntc::celsius(lo, &params) >= ntc::celsius(hi, &params));
    }

    #[test]
    fn analog_level_stays_in_byte_range(adc in any::<u16>()) {
        let level = ntc::analog_level(adc);
        prop_assert!((0.0..=255.0).contains(&level));
    }

    /// Truncation never splits a code point and keeps the longest prefix
    /// that fits.
    #[test]
    fn bounded_text_is_a_char_safe_prefix(s in "\\PC{0,200}") {
        let out = text::bounded::<DESCRIPTION_CAP>(&s);
        prop_assert!(out.len() <= DESCRIPTION_CAP);
        prop_assert!(s.starts_with(out.as_str()));
        if s.len() <= DESCRIPTION_CAP {
            prop_assert_eq!(out.as_str(), s.as_str());
        } else {
            let next = s[out.len()..].chars().next().map_or(0, char::len_utf8);
            prop_assert!(out.len() + next > DESCRIPTION_CAP);
        }
    }
}

#[test]
fn board_pins_are_distinct() {
    let mut all: Vec<u8> = pins::OUTPUT_GPIOS.to_vec();
    all.push(pins::DHT_GPIO);
    all.push(pins::CURRENT_SENSE_GPIO);
    let n = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), n);
}
