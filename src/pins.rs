//! GPIO assignments for the factory-default device on an ESP32 relay board.
//!
//! Single source of truth for provisioning: a freshly provisioned device
//! takes its relay pins and allowed input list from here.  Once a device
//! exists, its own `pins` list is authoritative.

// ---------------------------------------------------------------------------
// Outputs (relay drivers)
// ---------------------------------------------------------------------------

/// Relay outputs 1–4.
pub const OUTPUT_GPIOS: [u8; 4] = [3, 18, 19, 21];

/// Power-on manual flag per output.
pub const OUTPUT_MANUAL: [bool; 4] = [true, false, true, false];

/// Power-on level per output.
pub const OUTPUT_STATE: [bool; 4] = [true, false, true, false];

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// DHT-11 data line (digital, open-drain with pull-up).
pub const DHT_GPIO: u8 = 23;

/// Current transformer sense line (ADC1).
pub const CURRENT_SENSE_GPIO: u8 = 33;

/// Pins an input relay may be attached to.
pub const ALLOWED_INPUT_GPIOS: [u8; 22] = [
    0, 1, 2, 3, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_inputs_are_allowed() {
        assert!(ALLOWED_INPUT_GPIOS.contains(&DHT_GPIO));
        assert!(ALLOWED_INPUT_GPIOS.contains(&CURRENT_SENSE_GPIO));
    }

    #[test]
    fn outputs_do_not_collide_with_inputs() {
        for pin in OUTPUT_GPIOS {
            assert_ne!(pin, DHT_GPIO);
            assert_ne!(pin, CURRENT_SENSE_GPIO);
        }
    }
}
