//! Calendar/weekly schedule scenarios.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::bits::Bits;
use super::relay::OutPower;
use super::text::{self, Description, TimeText};

/// Settings mask bit: enable the temperature controller while active.
pub const SCENARIO_TEMPERATURE: usize = 0;
/// Settings mask bit: enable the timer chain while active.
pub const SCENARIO_TIMERS: usize = 1;
/// Settings mask bit: save the initial relay, apply the initial command,
/// and restore the relay on deactivation.
pub const SCENARIO_RELAY: usize = 2;
/// Settings mask bit: relay-restore marker carried by stored documents.
pub const SCENARIO_RELAY_RESTORE: usize = 3;

/// One `(start, end)` window in `HH:MM`.  `end < start` crosses midnight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeWindow {
    #[serde(deserialize_with = "text::truncating")]
    pub start_time: TimeText,
    #[serde(deserialize_with = "text::truncating")]
    pub end_time: TimeText,
}

impl TimeWindow {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start_time: text::bounded(start),
            end_time: text::bounded(end),
        }
    }

    /// `(start, end)` as minutes of the day, or `None` if either side is
    /// malformed.
    pub fn minutes(&self) -> Option<(u16, u16)> {
        Some((parse_hm(&self.start_time)?, parse_hm(&self.end_time)?))
    }
}

/// Parse `HH:MM` (anything after the minutes is ignored) into minutes of
/// the day.
pub fn parse_hm(s: &str) -> Option<u16> {
    let s = s.trim();
    if s.len() < 5 || s.as_bytes()[2] != b':' {
        return None;
    }
    let h: u16 = s.get(0..2)?.parse().ok()?;
    let m: u16 = s.get(3..5)?.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

/// Parse a `YYYY-MM-DD` calendar date.  Empty or malformed text is `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleScenario {
    #[serde(deserialize_with = "text::truncating")]
    pub description: Description,
    pub is_use_setting: bool,
    pub is_active: bool,
    #[serde(rename = "collectionSettings")]
    pub settings: Bits<4>,
    /// First day the scenario may run; `None` = no lower bound.
    #[serde(with = "calendar_date")]
    pub start_date: Option<NaiveDate>,
    /// Last day the scenario may run; `None` = open-ended.
    #[serde(with = "calendar_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "startEndTimes")]
    pub windows: Vec<TimeWindow>,
    /// Monday = bit 0.
    pub week: Bits<7>,
    /// January = bit 0.
    pub months: Bits<12>,
    pub initial_state_relay: OutPower,
    pub end_state_relay: OutPower,
    #[serde(skip)]
    pub guards: ScenarioGuards,
}

impl Default for ScheduleScenario {
    fn default() -> Self {
        Self {
            description: Description::new(),
            is_use_setting: false,
            is_active: false,
            settings: Bits::empty(),
            start_date: None,
            end_date: None,
            windows: Vec::new(),
            week: Bits::all(),
            months: Bits::all(),
            initial_state_relay: OutPower::default(),
            end_state_relay: OutPower::default(),
            guards: ScenarioGuards::default(),
        }
    }
}

/// One-shot latches that make activation and deactivation fire once per
/// transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScenarioGuards {
    pub temperature_updated: bool,
    pub timers_executed: bool,
    pub initial_state_applied: bool,
    pub end_state_applied: bool,
    /// Set once deactivation has run for the current active period.
    pub scenario_processed: bool,
}

mod calendar_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(super::parse_date(&raw))
    }
}
