//! Mock adapters for integration tests.
//!
//! [`MockHardware`] plays the board: tests set input levels, ADC samples,
//! and DHT readings per pin, and every pin write is recorded so assertions
//! can look at the full output history.

use relayctl::app::ports::{
    ActuatorPort, ClimateReading, ConfigError, DeviceStore, LogSink, PinMode, SensorPort, Severity,
};
use relayctl::model::{Device, SensorKind};
use std::collections::HashMap;

// ── Pin write record ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinWrite {
    Digital { pin: u8, high: bool },
    Pwm { pin: u8, duty: u8 },
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub modes: HashMap<u8, PinMode>,
    pub writes: Vec<PinWrite>,
    pub digital_in: HashMap<u8, bool>,
    pub analog_in: HashMap<u8, u16>,
    pub climate: HashMap<u8, ClimateReading>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level last driven on `pin`, counting the configure-time level.
    pub fn level(&self, pin: u8) -> Option<bool> {
        self.writes.iter().rev().find_map(|w| match *w {
            PinWrite::Digital { pin: p, high } if p == pin => Some(high),
            _ => None,
        })
    }

    pub fn duty(&self, pin: u8) -> Option<u8> {
        self.writes.iter().rev().find_map(|w| match *w {
            PinWrite::Pwm { pin: p, duty } if p == pin => Some(duty),
            _ => None,
        })
    }

    pub fn writes_to(&self, pin: u8) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(**w, PinWrite::Digital { pin: p, .. } | PinWrite::Pwm { pin: p, .. } if p == pin))
            .count()
    }

    pub fn set_climate(&mut self, pin: u8, temperature: f32, humidity: f32) {
        self.climate.insert(pin, ClimateReading { temperature, humidity });
    }
}

impl SensorPort for MockHardware {
    fn read_digital(&mut self, pin: u8) -> bool {
        self.digital_in.get(&pin).copied().unwrap_or(true)
    }

    fn read_analog(&mut self, pin: u8) -> u16 {
        self.analog_in.get(&pin).copied().unwrap_or(0)
    }

    fn read_climate(&mut self, pin: u8, _kind: SensorKind) -> ClimateReading {
        self.climate.get(&pin).copied().unwrap_or(ClimateReading::FAILED)
    }
}

impl ActuatorPort for MockHardware {
    fn configure(&mut self, pin: u8, mode: PinMode) {
        self.modes.insert(pin, mode);
        if let PinMode::Output(high) = mode {
            self.writes.push(PinWrite::Digital { pin, high });
        }
    }

    fn write_digital(&mut self, pin: u8, high: bool) {
        self.writes.push(PinWrite::Digital { pin, high });
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) {
        self.writes.push(PinWrite::Pwm { pin, duty });
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<(Severity, String)>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.lines
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn record(&mut self, severity: Severity, message: &str) {
        self.lines.push((severity, message.to_owned()));
    }
}

// ── MemStore ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub devices: Option<Vec<Device>>,
    pub saves: usize,
}

impl DeviceStore for MemStore {
    fn load_devices(&self) -> Result<Vec<Device>, ConfigError> {
        self.devices.clone().ok_or(ConfigError::NotFound)
    }

    fn save_devices(&mut self, devices: &[Device]) -> Result<(), ConfigError> {
        self.devices = Some(devices.to_vec());
        self.saves += 1;
        Ok(())
    }
}
