//! Debounced touch/push inputs.
//!
//! Active-low pads on pull-up inputs.  Each pin keeps its own debounce
//! state: any level change restarts the debounce timer, and once the raw
//! level has been stable for the debounce window it becomes the reported
//! state (LOW = pressed).  Between those moments the last stable state is
//! reported.

use heapless::FnvIndexMap;
use log::warn;

/// Touch inputs a device can carry.
pub const MAX_TOUCH_PINS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Debounce {
    last_level: bool,
    last_change_ms: u64,
    pressed: bool,
}

impl Default for Debounce {
    fn default() -> Self {
        Self {
            // Pull-up idles HIGH.
            last_level: true,
            last_change_ms: 0,
            pressed: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TouchInputs {
    debounce_ms: u32,
    slots: FnvIndexMap<u8, Debounce, MAX_TOUCH_PINS>,
}

impl TouchInputs {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            slots: FnvIndexMap::new(),
        }
    }

    /// Give `pin` a fresh debounce slot.
    pub fn register(&mut self, pin: u8) {
        if self.slots.insert(pin, Debounce::default()).is_err() {
            warn!("Touch: no slot left for pin {}", pin);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Feed the raw level read from `pin` and return the debounced
    /// "pressed" state.  Unregistered pins get a slot on first use.
    pub fn sample(&mut self, pin: u8, level: bool, now_ms: u64) -> bool {
        if !self.slots.contains_key(&pin) {
            self.register(pin);
        }
        let Some(slot) = self.slots.get_mut(&pin) else {
            return !level;
        };

        if level != slot.last_level {
            slot.last_level = level;
            slot.last_change_ms = now_ms;
        }

        if now_ms.saturating_sub(slot.last_change_ms) >= u64::from(self.debounce_ms) {
            slot.pressed = !level;
        }
        slot.pressed
    }
}
