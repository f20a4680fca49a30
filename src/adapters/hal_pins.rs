//! Pin ports over `embedded-hal` pin drivers.
//!
//! For boards where relay and input pins are claimed up front as HAL
//! drivers (e.g. `esp_idf_hal::gpio::PinDriver`, an I/O expander) rather
//! than addressed as raw GPIO numbers.  Each driver is registered under the
//! GPIO number the device model uses.  Analog and DHT reads still go
//! through the raw ADC and single-wire helpers, since `embedded-hal` 1.0 has
//! no trait for either.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::adapters::time::uptime_ms;
use crate::app::ports::{ActuatorPort, ClimateReading, PinMode, SensorPort};
use crate::drivers::dht::{self, DhtCache};
use crate::drivers::hw_init;
use crate::model::SensorKind;

pub struct HalPinBank<O, I, P>
where
    O: OutputPin,
    I: InputPin,
    P: SetDutyCycle,
{
    outputs: Vec<(u8, O)>,
    inputs: Vec<(u8, I)>,
    pwm: Vec<(u8, P)>,
    dht: DhtCache,
}

impl<O, I, P> Default for HalPinBank<O, I, P>
where
    O: OutputPin,
    I: InputPin,
    P: SetDutyCycle,
{
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            inputs: Vec::new(),
            pwm: Vec::new(),
            dht: DhtCache::new(),
        }
    }
}

impl<O, I, P> HalPinBank<O, I, P>
where
    O: OutputPin,
    I: InputPin,
    P: SetDutyCycle,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, gpio: u8, pin: O) -> Self {
        self.outputs.push((gpio, pin));
        self
    }

    pub fn with_input(mut self, gpio: u8, pin: I) -> Self {
        self.inputs.push((gpio, pin));
        self
    }

    pub fn with_pwm(mut self, gpio: u8, channel: P) -> Self {
        self.pwm.push((gpio, channel));
        self
    }

    fn output(&mut self, gpio: u8) -> Option<&mut O> {
        self.outputs.iter_mut().find(|(g, _)| *g == gpio).map(|(_, p)| p)
    }
}

impl<O, I, P> SensorPort for HalPinBank<O, I, P>
where
    O: OutputPin,
    I: InputPin,
    P: SetDutyCycle,
{
    fn read_digital(&mut self, pin: u8) -> bool {
        match self.inputs.iter_mut().find(|(g, _)| *g == pin) {
            // A pin that cannot be read looks idle (pull-up HIGH).
            Some((_, input)) => input.is_high().unwrap_or(true),
            None => {
                debug!("HalPinBank: GPIO{} has no input driver", pin);
                true
            }
        }
    }

    fn read_analog(&mut self, pin: u8) -> u16 {
        hw_init::adc_read(pin)
    }

    fn read_climate(&mut self, pin: u8, kind: SensorKind) -> ClimateReading {
        self.dht
            .read_with(pin, kind, uptime_ms(), || dht::read(pin, kind))
    }
}

impl<O, I, P> ActuatorPort for HalPinBank<O, I, P>
where
    O: OutputPin,
    I: InputPin,
    P: SetDutyCycle,
{
    fn configure(&mut self, pin: u8, mode: PinMode) {
        match mode {
            PinMode::Output(level) => self.write_digital(pin, level),
            PinMode::Analog => {
                if let Err(e) = hw_init::adc_config_pin(pin) {
                    warn!("HalPinBank: {}", e);
                }
            }
            // HAL input drivers come configured.
            PinMode::Input | PinMode::InputPullUp => {}
        }
    }

    fn write_digital(&mut self, pin: u8, high: bool) {
        let Some(out) = self.output(pin) else {
            debug!("HalPinBank: GPIO{} has no output driver", pin);
            return;
        };
        let result = if high { out.set_high() } else { out.set_low() };
        if result.is_err() {
            warn!("HalPinBank: write to GPIO{} failed", pin);
        }
    }

    fn write_pwm(&mut self, pin: u8, duty: u8) {
        if let Some((_, channel)) = self.pwm.iter_mut().find(|(g, _)| *g == pin) {
            if channel.set_duty_cycle_fraction(u16::from(duty), 255).is_err() {
                warn!("HalPinBank: PWM on GPIO{} failed", pin);
            }
            return;
        }
        // No PWM channel: anything above half duty counts as on.
        self.write_digital(pin, duty > 127);
    }
}
