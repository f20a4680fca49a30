//! Unified error types for the relay controller.
//!
//! A single `Error` enum that every subsystem can convert into.  Nothing in
//! the control loop is fatal: a subsystem that hits one of these disables
//! its own feature, reports through the log sink, and returns.  All variants
//! are `Copy` so they can be handed around the tick path without allocation.

use core::fmt;

use crate::model::{RelayId, SensorId};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A referenced relay or sensor is missing or has the wrong direction.
    Config(ConfigurationError),
    /// An index or id lies outside the declared bounds.
    Range(RangeError),
    /// A sensor produced no usable reading this tick.
    Sensor(SensorError),
    /// Automation tried to claim a relay the user holds manually.
    Conflict(StateConflict),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Range(e) => write!(f, "range: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Conflict(e) => write!(f, "conflict: {e}"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    RelayNotFound(RelayId),
    SensorNotFound(SensorId),
    /// The relay exists but is an input.
    RelayNotOutput(RelayId),
    PinNotAllowed(u8),
    PinInUse(u8),
    /// The device has no output relays at all.
    NoOutputs,
    NoDevices,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelayNotFound(id) => write!(f, "relay {id} not found"),
            Self::SensorNotFound(id) => write!(f, "sensor {id} not found"),
            Self::RelayNotOutput(id) => write!(f, "relay {id} is not an output"),
            Self::PinNotAllowed(pin) => write!(f, "pin {pin} not in allowed list"),
            Self::PinInUse(pin) => write!(f, "pin {pin} already in use"),
            Self::NoOutputs => write!(f, "device has no output relays"),
            Self::NoDevices => write!(f, "no devices configured"),
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Range errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    DeviceIndex(usize),
    PidProfile(u8),
    /// A dangling relay id was rewritten to the first relay's id.
    RelayIdClamped { from: RelayId, to: RelayId },
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceIndex(i) => write!(f, "device index {i} out of range"),
            Self::PidProfile(i) => write!(f, "PID profile {i} out of range"),
            Self::RelayIdClamped { from, to } => {
                write!(f, "relay id {from} not found, clamped to {to}")
            }
        }
    }
}

impl From<RangeError> for Error {
    fn from(e: RangeError) -> Self {
        Self::Range(e)
    }
}

// ---------------------------------------------------------------------------
// Transient sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The driver returned NaN.
    NotANumber,
    /// The linked input relay is missing or not an input.
    Disconnected,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => write!(f, "reading is NaN"),
            Self::Disconnected => write!(f, "input relay unavailable"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// State conflicts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateConflict {
    /// The relay is under manual control; automation leaves it alone.
    ManualOverride(RelayId),
}

impl fmt::Display for StateConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualOverride(id) => write!(f, "relay {id} is in manual mode"),
        }
    }
}

impl From<StateConflict> for Error {
    fn from(e: StateConflict) -> Self {
        Self::Conflict(e)
    }
}
