//! Sequential timers.

use serde::{Deserialize, Serialize};

use super::bits::Bits;
use super::relay::OutPower;
use super::text::{self, TimeText};

/// Settings mask bit: toggle the temperature controller when the timer ends.
pub const TIMER_TEMPERATURE: usize = 0;
/// Settings mask bit: apply `end_state_relay` when the timer ends.
pub const TIMER_END_RELAY: usize = 1;

/// Live progress of one timer.  Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerInfo {
    pub started_at_ms: u64,
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub is_running: bool,
    pub is_stopped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timer {
    pub is_use_setting: bool,
    /// Duration as `HH:MM:SS`.
    #[serde(deserialize_with = "text::truncating")]
    pub time: TimeText,
    #[serde(rename = "collectionSettings")]
    pub settings: Bits<4>,
    pub initial_state_relay: OutPower,
    pub end_state_relay: OutPower,
    #[serde(skip)]
    pub progress: TimerInfo,
}

impl Timer {
    /// Configured duration; malformed text counts as zero.
    pub fn duration_ms(&self) -> u64 {
        parse_hms(&self.time).map_or(0, |secs| u64::from(secs) * 1000)
    }

    pub fn reset_progress(&mut self) {
        self.progress = TimerInfo::default();
    }
}

/// Parse `HH:MM:SS` into seconds.  Minutes and seconds must be below 60;
/// hours are unbounded.
pub fn parse_hms(s: &str) -> Option<u32> {
    let mut parts = s.trim().splitn(3, ':');
    let h: u32 = parts.next()?.trim().parse().ok()?;
    let m: u32 = parts.next()?.trim().parse().ok()?;
    let sec: u32 = parts.next()?.trim().parse().ok()?;
    if m >= 60 || sec >= 60 {
        return None;
    }
    h.checked_mul(3600)?.checked_add(m * 60 + sec)
}
