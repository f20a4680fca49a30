//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (pins, clocks, log sinks, storage) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the automation engine never touches hardware directly.
//!
//! ## Contract notes
//!
//! - Pin reads never fail: an adapter that cannot read returns a neutral
//!   value (`false`, `0`, or NaN for climate readings) and the engine treats
//!   it as a transient sensor error.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **DeviceStore** is load-once / save-on-demand; the engine never
//!   assumes a particular document format.

use chrono::NaiveDateTime;

use crate::config::ControllerConfig;
use crate::model::{Device, SensorKind};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One temperature/humidity sample from a DHT probe.  Fields the probe
/// failed to deliver are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature: f32,
    pub humidity: f32,
}

impl ClimateReading {
    pub const FAILED: Self = Self {
        temperature: f32::NAN,
        humidity: f32::NAN,
    };
}

/// Read-side port: raw input primitives addressed by GPIO number.
pub trait SensorPort {
    /// Logic level of a digital input (`true` = HIGH).
    fn read_digital(&mut self, pin: u8) -> bool;

    /// 12-bit ADC sample (0–4095).
    fn read_analog(&mut self, pin: u8) -> u16;

    /// Sample a DHT11/DHT22 probe on `pin`.
    fn read_climate(&mut self, pin: u8, kind: SensorKind) -> ClimateReading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Electrical configuration of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output driven to the given level.
    Output(bool),
    Input,
    InputPullUp,
    /// ADC input.
    Analog,
}

/// Write-side port: output primitives addressed by GPIO number.
pub trait ActuatorPort {
    fn configure(&mut self, pin: u8, mode: PinMode);

    fn write_digital(&mut self, pin: u8, high: bool);

    /// 8-bit PWM duty (0 = off, 255 = fully on).
    fn write_pwm(&mut self, pin: u8, duty: u8);
}

// ───────────────────────────────────────────────────────────────
// Log sink port (domain → user-visible log)
// ───────────────────────────────────────────────────────────────

/// How loudly a log record should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// A message the user asked to be pushed to them (action messages).
    Notify,
}

/// The user-visible log: a ring buffer, a chat bot, a web console.
/// Receives `(severity, message)` pairs from every subsystem.
pub trait LogSink {
    fn record(&mut self, severity: Severity, message: &str);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time.
pub trait ClockPort {
    /// Milliseconds since boot; never goes backwards.
    fn now_ms(&self) -> u64;

    /// Local date and time, or `None` until the clock has been synchronised.
    fn wall_clock(&self) -> Option<NaiveDateTime>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller tuning.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Device store (driven adapter: domain ↔ persisted device list)
// ───────────────────────────────────────────────────────────────

/// Persisted device configurations.
pub trait DeviceStore {
    /// Every stored device.  [`ConfigError::NotFound`] on first boot,
    /// [`ConfigError::Corrupted`] when nothing could be decoded.
    fn load_devices(&self) -> Result<Vec<Device>, ConfigError>;

    fn save_devices(&mut self, devices: &[Device]) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic — no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Size of a stored value, if present.
    fn stored_len(&self, namespace: &str, key: &str) -> Option<usize>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.stored_len(namespace, key).is_some()
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] and [`DeviceStore`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Nothing stored yet (first boot).
    NotFound,
    /// Stored data failed to decode.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => Self::NotFound,
            StorageError::Full => Self::StorageFull,
            StorageError::IoError => Self::IoError,
        }
    }
}
