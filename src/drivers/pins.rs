//! Pin setup for the selected device.
//!
//! Runs once after boot and again whenever another device is selected.
//! Outputs come up driven to their stored level.  Inputs are only accepted
//! on pins from the device's allowed list, and their read mode follows the
//! sensor wired to them.

use heapless::FnvIndexSet;
use log::{debug, info};

use crate::app::ports::{ActuatorPort, LogSink, PinMode, Severity};
use crate::error::ConfigurationError;
use crate::model::{Device, SensorKind};
use crate::report;
use crate::sensors::touch::TouchInputs;

/// Outcome of one setup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinSetup {
    pub outputs: usize,
    pub inputs: usize,
    /// Relays left unconfigured (duplicate or disallowed pin).
    pub skipped: usize,
}

/// Configure every relay pin of `device`.
///
/// Also normalises `is_digital` on input relays: DHT, touch, and unlinked
/// inputs are digital; NTC and analog inputs are not.
pub fn configure(
    device: &mut Device,
    hw: &mut impl ActuatorPort,
    touch: &mut TouchInputs,
    sink: &mut dyn LogSink,
) -> PinSetup {
    let mut setup = PinSetup::default();
    let mut seen: FnvIndexSet<u8, 64> = FnvIndexSet::new();
    touch.clear();

    for idx in 0..device.relays.len() {
        let relay = &device.relays[idx];
        let (id, pin) = (relay.id, relay.pin);

        if seen.contains(&pin) {
            debug!("Pins: relay {} shares GPIO{}, skipped", id, pin);
            report!(sink, Severity::Warning, "Relay {}: {}", id, ConfigurationError::PinInUse(pin));
            setup.skipped += 1;
            continue;
        }
        let _ = seen.insert(pin);

        if relay.is_output {
            hw.configure(pin, PinMode::Output(relay.state_pin));
            setup.outputs += 1;
            continue;
        }

        if !device.pins.contains(&pin) {
            report!(sink, Severity::Error, "Relay {}: {}", id, ConfigurationError::PinNotAllowed(pin));
            setup.skipped += 1;
            continue;
        }

        let kind = device
            .sensors
            .iter()
            .find(|s| s.relay_id == id)
            .map(|s| s.kind);
        let digital = kind.is_none_or(SensorKind::is_digital);

        let relay = &mut device.relays[idx];
        if relay.is_digital != digital {
            report!(
                sink,
                Severity::Warning,
                "Relay {}: input switched to {} for {}",
                id,
                if digital { "digital" } else { "analog" },
                kind.map_or("a generic input", |k| if k.is_digital() { "a digital probe" } else { "an analog probe" })
            );
            relay.is_digital = digital;
        }

        let mode = match kind {
            Some(SensorKind::Touch) => {
                touch.register(pin);
                PinMode::InputPullUp
            }
            Some(SensorKind::Ntc | SensorKind::Analog) => PinMode::Analog,
            _ => PinMode::Input,
        };
        hw.configure(pin, mode);
        setup.inputs += 1;
    }

    info!(
        "Pins: {} output(s), {} input(s) configured, {} skipped",
        setup.outputs, setup.inputs, setup.skipped
    );
    setup
}
