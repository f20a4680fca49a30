//! Pin-apply pass: pushes output relay targets to the hardware.
//!
//! Automation only edits `state_pin`/`pwm` in the model; this writer is the
//! one place those values reach a pin.  It remembers what it last wrote per
//! pin and skips unchanged writes.

use heapless::FnvIndexMap;
use log::{debug, warn};

use crate::app::ports::ActuatorPort;
use crate::model::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Written {
    Level(bool),
    Duty(u8),
}

#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    written: FnvIndexMap<u8, Written, 64>,
}

impl OutputWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget what was written (device switch, re-configured pins).
    pub fn clear(&mut self) {
        self.written.clear();
    }

    /// Write every output whose target differs from the last write.
    /// Returns the number of pin writes.
    pub fn apply(&mut self, device: &Device, hw: &mut impl ActuatorPort) -> usize {
        let mut writes = 0;
        for relay in device.output_relays() {
            let target = if relay.is_pwm {
                Written::Duty(relay.pwm)
            } else {
                Written::Level(relay.state_pin)
            };
            if self.written.get(&relay.pin) == Some(&target) {
                continue;
            }
            match target {
                Written::Level(high) => hw.write_digital(relay.pin, high),
                Written::Duty(duty) => hw.write_pwm(relay.pin, duty),
            }
            debug!("Outputs: GPIO{} <- {:?}", relay.pin, target);
            if self.written.insert(relay.pin, target).is_err() {
                warn!("Outputs: write cache full, GPIO{} rewritten every pass", relay.pin);
            }
            writes += 1;
        }
        writes
    }
}
