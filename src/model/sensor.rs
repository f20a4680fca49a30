//! Sensors and their kinds.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::bits::Bits;
use super::text::{self, Description};
use super::{RelayId, SensorId};

/// Stored in `current_value` until a sensor produces its first reading.
pub const NO_READING: f32 = -999.0;

/// Anything at or below this is treated as "no reading".
const NO_READING_THRESHOLD: f32 = -998.0;

/// Whether `value` is a real reading rather than NaN or the sentinel.
pub fn is_valid_reading(value: f32) -> bool {
    value.is_finite() && value > NO_READING_THRESHOLD
}

/// What kind of probe sits behind a sensor.
///
/// Persisted as the seven-slot `typeSensor` flag array with exactly one flag
/// set; bit order is DHT11, DHT22, NTC, touch, analog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Bits<7>", into = "Bits<7>")]
pub enum SensorKind {
    #[default]
    Dht11,
    Dht22,
    Ntc,
    Touch,
    Analog,
}

impl SensorKind {
    pub fn is_dht(self) -> bool {
        matches!(self, Self::Dht11 | Self::Dht22)
    }

    /// NTC, touch, and analog probes are sampled on the fast cadence.
    pub fn is_fast(self) -> bool {
        !self.is_dht()
    }

    /// Whether the linked input pin is read digitally.
    pub fn is_digital(self) -> bool {
        matches!(self, Self::Dht11 | Self::Dht22 | Self::Touch)
    }

    fn bit(self) -> usize {
        match self {
            Self::Dht11 => 0,
            Self::Dht22 => 1,
            Self::Ntc => 2,
            Self::Touch => 3,
            Self::Analog => 4,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dht11 => "DHT11",
            Self::Dht22 => "DHT22",
            Self::Ntc => "NTC",
            Self::Touch => "TOUCH",
            Self::Analog => "ANALOG",
        };
        f.write_str(name)
    }
}

/// Rejected `typeSensor` flag array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSensorKind(pub u16);

impl fmt::Display for InvalidSensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "typeSensor must select exactly one kind (got 0b{:07b})", self.0)
    }
}

impl TryFrom<Bits<7>> for SensorKind {
    type Error = InvalidSensorKind;

    fn try_from(bits: Bits<7>) -> Result<Self, Self::Error> {
        if bits.count() != 1 {
            return Err(InvalidSensorKind(bits.raw()));
        }
        match bits.raw() {
            0b0_0001 => Ok(Self::Dht11),
            0b0_0010 => Ok(Self::Dht22),
            0b0_0100 => Ok(Self::Ntc),
            0b0_1000 => Ok(Self::Touch),
            0b1_0000 => Ok(Self::Analog),
            other => Err(InvalidSensorKind(other)),
        }
    }
}

impl From<SensorKind> for Bits<7> {
    fn from(kind: SensorKind) -> Self {
        Bits::empty().with(kind.bit())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Sensor {
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
    pub is_use_setting: bool,
    pub sensor_id: SensorId,
    /// The input relay the probe is wired to.
    pub relay_id: RelayId,
    #[serde(rename = "typeSensor")]
    pub kind: SensorKind,
    /// NTC divider series resistance (ohms).
    #[serde(rename = "serial_r")]
    pub series_resistance: u16,
    /// NTC nominal resistance at 25 °C (ohms).
    #[serde(rename = "thermistor_r")]
    pub thermistor_resistance: u16,
    pub current_value: f32,
    pub humidity_value: f32,
}

impl Default for Sensor {
    fn default() -> Self {
        Self {
            description: Description::new(),
            is_use_setting: false,
            sensor_id: 0,
            relay_id: 0,
            kind: SensorKind::default(),
            series_resistance: 10_000,
            thermistor_resistance: 10_000,
            current_value: 0.0,
            humidity_value: 0.0,
        }
    }
}

impl Sensor {
    pub fn new(sensor_id: SensorId, relay_id: RelayId, kind: SensorKind, description: &str) -> Self {
        Self {
            description: text::bounded(description),
            is_use_setting: true,
            sensor_id,
            relay_id,
            kind,
            ..Self::default()
        }
    }

    /// The value an action compares: humidity or the primary reading.
    pub fn value(&self, humidity: bool) -> f32 {
        if humidity {
            self.humidity_value
        } else {
            self.current_value
        }
    }
}
