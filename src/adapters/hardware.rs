//! Hardware adapter — bridges the board's peripherals to the pin ports.
//!
//! Implements [`SensorPort`] and [`ActuatorPort`] by GPIO number on top of
//! the raw helpers in [`drivers::hw_init`](crate::drivers::hw_init) and the
//! DHT driver.  This is the only module in the system that touches the
//! pins.  On non-espidf targets the helpers are simulation stubs.

use heapless::FnvIndexSet;
use log::warn;

use crate::adapters::time::uptime_ms;
use crate::app::ports::{ActuatorPort, ClimateReading, PinMode, SensorPort};
use crate::drivers::dht::{self, DhtCache};
use crate::drivers::hw_init;
use crate::model::SensorKind;

#[derive(Debug, Default)]
pub struct HardwareAdapter {
    dht: DhtCache,
    /// Pins currently routed to an LEDC channel.
    pwm_pins: FnvIndexSet<u8, 16>,
}

impl HardwareAdapter {
    /// Bring up the shared peripherals (ADC unit, LEDC timer).
    pub fn new() -> Result<Self, hw_init::HwInitError> {
        hw_init::init_peripherals()?;
        Ok(Self::default())
    }

    fn release_pwm(&mut self, pin: u8) {
        if self.pwm_pins.remove(&pin) {
            hw_init::ledc_detach(pin);
        }
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_digital(&mut self, pin: u8) -> bool {
        hw_init::gpio_read(pin)
    }

    fn read_analog(&mut self, pin: u8) -> u16 {
        hw_init::adc_read(pin)
    }

    fn read_climate(&mut self, pin: u8, kind: SensorKind) -> ClimateReading {
        self.dht
            .read_with(pin, kind, uptime_ms(), || dht::read(pin, kind))
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn configure(&mut self, pin: u8, mode: PinMode) {
        self.release_pwm(pin);
        let result = match mode {
            PinMode::Output(level) => hw_init::gpio_config_output(pin, level),
            PinMode::Input => hw_init::gpio_config_input(pin, false),
            PinMode::InputPullUp => hw_init::gpio_config_input(pin, true),
            PinMode::Analog => hw_init::adc_config_pin(pin),
        };
        if let Err(e) = result {
            warn!("Hardware: GPIO{} as {:?}: {}", pin, mode, e);
        }
    }

    fn write_digital(&mut self, pin: u8, high: bool) {
        if self.pwm_pins.contains(&pin) {
            self.release_pwm(pin);
            if let Err(e) = hw_init::gpio_config_output(pin, high) {
                warn!("Hardware: GPIO{} back to digital: {}", pin, e);
            }
        }
        hw_init::gpio_write(pin, high);
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) {
        if !self.pwm_pins.contains(&pin) && self.pwm_pins.insert(pin).is_err() {
            warn!("Hardware: no PWM slot for GPIO{}", pin);
            return;
        }
        hw_init::ledc_set(pin, duty);
    }
}
