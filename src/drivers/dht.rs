//! DHT11/DHT22 single-wire climate probes.
//!
//! A transfer is 40 bits: humidity (2 bytes), temperature (2 bytes), and a
//! checksum byte equal to the low byte of the sum of the other four.  The
//! two models only differ in how the data bytes are scaled.
//!
//! The probes must not be polled faster than once every two seconds (one
//! for the DHT11); [`DhtCache`] hands back the previous result inside that
//! window.

use core::fmt;

use heapless::FnvIndexMap;

use crate::app::ports::ClimateReading;
use crate::model::SensorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtError {
    /// The probe never answered the start pulse.
    NoResponse,
    /// A bit edge did not arrive in time.
    Timeout,
    Checksum { expected: u8, got: u8 },
    /// The sensor kind is not a DHT.
    NotDht,
}

impl fmt::Display for DhtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no response"),
            Self::Timeout => write!(f, "bit timeout"),
            Self::Checksum { expected, got } => {
                write!(f, "checksum mismatch (expected {expected:#04x}, got {got:#04x})")
            }
            Self::NotDht => write!(f, "not a DHT probe"),
        }
    }
}

/// Decode a received frame.
pub fn decode_frame(frame: &[u8; 5], kind: SensorKind) -> Result<ClimateReading, DhtError> {
    let sum = frame[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != frame[4] {
        return Err(DhtError::Checksum {
            expected: sum,
            got: frame[4],
        });
    }

    match kind {
        SensorKind::Dht11 => {
            let humidity = f32::from(frame[0]) + f32::from(frame[1]) * 0.1;
            let magnitude = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) * 0.1;
            let temperature = if frame[3] & 0x80 != 0 { -magnitude } else { magnitude };
            Ok(ClimateReading { temperature, humidity })
        }
        SensorKind::Dht22 => {
            let humidity = f32::from(u16::from_be_bytes([frame[0], frame[1]])) * 0.1;
            let magnitude = f32::from(u16::from_be_bytes([frame[2] & 0x7F, frame[3]])) * 0.1;
            let temperature = if frame[2] & 0x80 != 0 { -magnitude } else { magnitude };
            Ok(ClimateReading { temperature, humidity })
        }
        _ => Err(DhtError::NotDht),
    }
}

/// Shortest polling period a probe tolerates.
pub fn min_interval_ms(kind: SensorKind) -> u64 {
    match kind {
        SensorKind::Dht22 => 2_000,
        _ => 1_000,
    }
}

#[derive(Debug, Clone, Copy)]
struct Cached {
    at_ms: u64,
    reading: ClimateReading,
}

/// Last result per data pin.
#[derive(Debug, Clone, Default)]
pub struct DhtCache {
    entries: FnvIndexMap<u8, Cached, 16>,
}

impl DhtCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached reading for `pin` if it is younger than the probe's
    /// minimum interval, otherwise run `read` and remember its result.  A
    /// failed read is cached as [`ClimateReading::FAILED`] so a dead probe is
    /// not hammered either.
    pub fn read_with(
        &mut self,
        pin: u8,
        kind: SensorKind,
        now_ms: u64,
        read: impl FnOnce() -> Result<ClimateReading, DhtError>,
    ) -> ClimateReading {
        if let Some(hit) = self.entries.get(&pin) {
            if now_ms.saturating_sub(hit.at_ms) < min_interval_ms(kind) {
                return hit.reading;
            }
        }
        let reading = match read() {
            Ok(r) => r,
            Err(e) => {
                log::debug!("DHT on GPIO{}: {}", pin, e);
                ClimateReading::FAILED
            }
        };
        let _ = self.entries.insert(pin, Cached { at_ms: now_ms, reading });
        reading
    }
}

// ── Bit-banged transfer ───────────────────────────────────────

#[cfg(target_os = "espidf")]
mod wire {
    use esp_idf_svc::sys::{esp_rom_delay_us, esp_timer_get_time};

    use super::DhtError;
    use crate::drivers::hw_init::{gpio_read, gpio_set_output, gpio_write};
    use crate::model::SensorKind;

    fn micros() -> i64 {
        // SAFETY: reads the free-running system timer.
        unsafe { esp_timer_get_time() }
    }

    fn delay_us(us: u32) {
        // SAFETY: busy-wait in ROM.
        unsafe { esp_rom_delay_us(us) }
    }

    /// Wait while the line sits at `level`; returns how long it stayed.
    fn hold_time(pin: u8, level: bool, timeout_us: i64) -> Result<i64, DhtError> {
        let start = micros();
        while gpio_read(pin) == level {
            if micros() - start > timeout_us {
                return Err(DhtError::Timeout);
            }
        }
        Ok(micros() - start)
    }

    pub fn read_frame(pin: u8, kind: SensorKind) -> Result<[u8; 5], DhtError> {
        let start_low_us = if kind == SensorKind::Dht22 { 1_100 } else { 18_000 };

        gpio_set_output(pin, true);
        gpio_write(pin, false);
        delay_us(start_low_us);
        gpio_write(pin, true);
        delay_us(30);
        gpio_set_output(pin, false);

        hold_time(pin, true, 100).map_err(|_| DhtError::NoResponse)?;
        hold_time(pin, false, 100).map_err(|_| DhtError::NoResponse)?;
        hold_time(pin, true, 100).map_err(|_| DhtError::NoResponse)?;

        let mut frame = [0u8; 5];
        for bit in 0..40 {
            hold_time(pin, false, 80)?;
            let high = hold_time(pin, true, 100)?;
            if high > 40 {
                frame[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
        Ok(frame)
    }
}

/// Run one transfer on `pin` and decode it.
#[cfg(target_os = "espidf")]
pub fn read(pin: u8, kind: SensorKind) -> Result<ClimateReading, DhtError> {
    if !kind.is_dht() {
        return Err(DhtError::NotDht);
    }
    let frame = wire::read_frame(pin, kind)?;
    decode_frame(&frame, kind)
}

#[cfg(not(target_os = "espidf"))]
pub fn read(_pin: u8, kind: SensorKind) -> Result<ClimateReading, DhtError> {
    if !kind.is_dht() {
        return Err(DhtError::NotDht);
    }
    Err(DhtError::NoResponse)
}
