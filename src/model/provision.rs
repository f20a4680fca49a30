//! Factory-default device.
//!
//! Used on first boot and whenever the stored device list cannot be read.
//! Four relay outputs, a DHT-11 and a current-sense input, one sensor per
//! input, an over-current action, a disabled office-hours scenario, a
//! five-second timer, and the PID catalog.

use chrono::NaiveDate;

use crate::pins;

use super::action::{ACTION_OUTPUTS, Action};
use super::bits::Bits;
use super::relay::{OutPower, Relay};
use super::schedule::{SCENARIO_RELAY_RESTORE, ScheduleScenario, TimeWindow};
use super::sensor::{Sensor, SensorKind};
use super::temperature::{PidProfile, TEMPERATURE_RELAY, Temperature};
use super::text;
use super::timer::{TIMER_END_RELAY, Timer};
use super::{Device, RelayId};

/// The built-in PID catalog.
pub fn pid_catalog() -> Vec<PidProfile> {
    vec![
        PidProfile::new(
            "Standard",
            "Balanced set. Good trade-off between response speed and stability; suits most systems.",
            2.0,
            0.5,
            1.0,
        ),
        PidProfile::new(
            "Fast",
            "Reacts sharply to temperature changes and may overshoot. Best for small, low-inertia systems.",
            1.5,
            0.4,
            0.9,
        ),
        PidProfile::new(
            "Smooth",
            "Approaches the setpoint slowly to minimise overshoot. Suits large, high-inertia systems such as house heating.",
            1.0,
            0.3,
            0.8,
        ),
    ]
}

pub fn default_device(name: &str, selected: bool) -> Device {
    let mut next_id: RelayId = 0;
    let mut take_id = || {
        let id = next_id;
        next_id += 1;
        id
    };

    let mut relays = Vec::with_capacity(6);
    for (i, &pin) in pins::OUTPUT_GPIOS.iter().enumerate() {
        let mut relay = Relay::output(take_id(), pin, "");
        relay.manual_mode = pins::OUTPUT_MANUAL[i];
        relay.state_pin = pins::OUTPUT_STATE[i];
        let mut label = text::Description::new();
        let _ = core::fmt::Write::write_fmt(&mut label, format_args!("Output_{}", i + 1));
        relay.description = label;
        relays.push(relay);
    }
    let dht_input = take_id();
    relays.push(Relay::input(dht_input, pins::DHT_GPIO, true, "DHT-11 input"));
    let current_input = take_id();
    relays.push(Relay::input(
        current_input,
        pins::CURRENT_SENSE_GPIO,
        false,
        "Current sense input",
    ));
    let first_output = relays[0].id;

    let mut dht = Sensor::new(take_id(), dht_input, SensorKind::Dht11, "DHT11 sensor");
    dht.series_resistance = 20_000;
    let mut current = Sensor::new(take_id(), current_input, SensorKind::Analog, "Current sensor");
    current.series_resistance = 20_000;

    let over_current = Action {
        is_use_setting: true,
        description: text::bounded("Over-current"),
        target_sensor_id: current.sensor_id,
        trigger_max: 1.0,
        trigger_min: 0.5,
        action_more_or_equal: true,
        is_return_setting: true,
        settings: Bits::empty().with(ACTION_OUTPUTS),
        outputs: vec![OutPower::command(first_output, false, "Action output").returning()],
        ..Action::default()
    };

    let office_hours = ScheduleScenario {
        description: text::bounded("My first scenario"),
        settings: Bits::empty().with(SCENARIO_RELAY_RESTORE),
        start_date: NaiveDate::from_ymd_opt(2012, 12, 12),
        end_date: NaiveDate::from_ymd_opt(2222, 12, 12),
        windows: vec![TimeWindow::new("08:00", "18:00")],
        initial_state_relay: OutPower::command(first_output, true, "Initial state"),
        end_state_relay: OutPower::command(first_output, false, "End state").disabled(),
        ..ScheduleScenario::default()
    };

    let temperature = Temperature {
        relay_id: first_output,
        sensor_id: dht.sensor_id,
        settings: Bits::empty().with(TEMPERATURE_RELAY),
        ..Temperature::default()
    };

    let timer = Timer {
        is_use_setting: true,
        time: text::bounded("00:00:05"),
        settings: Bits::empty().with(TIMER_END_RELAY),
        initial_state_relay: OutPower::command(first_output, true, "Initial timer power"),
        end_state_relay: OutPower::command(first_output, false, "End timer power"),
        ..Timer::default()
    };

    Device {
        name: text::bounded(name),
        is_selected: selected,
        relays,
        pins: pins::ALLOWED_INPUT_GPIOS.to_vec(),
        sensors: vec![dht, current],
        actions: vec![over_current],
        schedule_scenarios: vec![office_hours],
        temperature,
        pids: pid_catalog(),
        timers: vec![timer],
        is_timers_enabled: false,
        is_encyclate_timers: true,
        is_schedule_enabled: false,
        is_action_enabled: false,
    }
}
