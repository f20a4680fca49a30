//! Feature-flag mediator.
//!
//! `isTimersEnabled` and the temperature controller's `isUseSetting` are
//! both inputs and outputs of several subsystems.  Every automated write
//! goes through [`FeatureFlags`], which records who wrote last and logs
//! handovers between sources.
//!
//! Writes are last-writer-wins with no reference count: if a schedule and
//! an action both enable temperature control, the first of them to release
//! it switches it off for the other.

use core::fmt;

use log::{debug, info};

use crate::model::Device;

/// Who changed a feature flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSource {
    /// Web UI or chat bot edit.
    User,
    Schedule,
    Action,
    Timer,
    Temperature,
    /// A subsystem putting back a value it saved earlier.
    Restore,
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Schedule => "schedule",
            Self::Action => "action",
            Self::Timer => "timer",
            Self::Temperature => "temperature",
            Self::Restore => "restore",
        };
        f.write_str(name)
    }
}

/// Last writer of each mediated flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    timers_owner: Option<FlagSource>,
    temperature_owner: Option<FlagSource>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `isTimersEnabled`.  Returns whether the value changed.
    pub fn set_timers(&mut self, device: &mut Device, on: bool, source: FlagSource) -> bool {
        write_flag(
            "timers",
            &mut device.is_timers_enabled,
            &mut self.timers_owner,
            on,
            source,
        )
    }

    /// Set the temperature controller's `isUseSetting`.  Returns whether the
    /// value changed.
    pub fn set_temperature(&mut self, device: &mut Device, on: bool, source: FlagSource) -> bool {
        write_flag(
            "temperature",
            &mut device.temperature.is_use_setting,
            &mut self.temperature_owner,
            on,
            source,
        )
    }

    pub fn timers_owner(&self) -> Option<FlagSource> {
        self.timers_owner
    }

    pub fn temperature_owner(&self) -> Option<FlagSource> {
        self.temperature_owner
    }

    /// Forget every owner (device switch).
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn write_flag(
    name: &str,
    flag: &mut bool,
    owner: &mut Option<FlagSource>,
    on: bool,
    source: FlagSource,
) -> bool {
    match *owner {
        Some(prev) if prev != source && *flag != on => {
            info!("Flags: {} handed from {} to {} ({})", name, prev, source, on);
        }
        _ => {}
    }
    *owner = Some(source);
    if *flag == on {
        return false;
    }
    debug!("Flags: {} -> {} by {}", name, on, source);
    *flag = on;
    true
}
