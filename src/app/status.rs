//! Change detection for status push.
//!
//! A transport layer (web socket, chat bot) polls [`ChangeTracker`] at its
//! own pace and only pushes the groups whose checksum moved.  Each group is
//! re-hashed on its own interval; settings are hashed on every poll since
//! they are cheap and rarely change.

use crate::config::ControllerConfig;
use crate::model::Device;

/// djb2 over a byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Djb2(u32);

impl Default for Djb2 {
    fn default() -> Self {
        Self(5381)
    }
}

impl Djb2 {
    pub fn bytes(mut self, data: &[u8]) -> Self {
        for &b in data {
            self.0 = self.0.wrapping_mul(33).wrapping_add(u32::from(b));
        }
        self
    }

    pub fn flag(self, on: bool) -> Self {
        self.bytes(&[u8::from(on)])
    }

    pub fn finish(self) -> u32 {
        self.0
    }
}

/// Output relay ids, levels, modes, and duties.
pub fn relays_checksum(device: &Device) -> u32 {
    device
        .output_relays()
        .fold(Djb2::default(), |h, r| {
            h.bytes(&[r.id, r.pwm])
                .flag(r.state_pin)
                .flag(r.manual_mode)
                .flag(r.is_pwm)
        })
        .finish()
}

/// Values of enabled sensors.
pub fn sensors_checksum(device: &Device) -> u32 {
    device
        .sensors
        .iter()
        .filter(|s| s.is_use_setting)
        .fold(Djb2::default(), |h, s| {
            h.bytes(&[s.sensor_id])
                .bytes(&s.current_value.to_bits().to_le_bytes())
                .bytes(&s.humidity_value.to_bits().to_le_bytes())
        })
        .finish()
}

/// Progress of enabled timers, to the second.
pub fn timers_checksum(device: &Device) -> u32 {
    device
        .timers
        .iter()
        .filter(|t| t.is_use_setting)
        .fold(Djb2::default(), |h, t| {
            let p = &t.progress;
            h.bytes(&(p.remaining_ms / 1000).to_le_bytes())
                .flag(p.is_running)
                .flag(p.is_stopped)
        })
        .finish()
}

/// Feature flags, scenario/action states, and collection sizes.
pub fn settings_checksum(device: &Device) -> u32 {
    let sizes = [
        device.relays.len(),
        device.sensors.len(),
        device.timers.len(),
        device.schedule_scenarios.len(),
        device.actions.len(),
    ];
    let mut h = Djb2::default()
        .flag(device.is_timers_enabled)
        .flag(device.is_encyclate_timers)
        .flag(device.is_schedule_enabled)
        .flag(device.is_action_enabled)
        .flag(device.temperature.is_use_setting)
        .bytes(&device.temperature.set_temperature.to_le_bytes());
    for n in sizes {
        h = h.bytes(&(n as u32).to_le_bytes());
    }
    for s in &device.schedule_scenarios {
        h = h.flag(s.is_use_setting).flag(s.is_active);
    }
    for a in &device.actions {
        h = h.flag(a.is_use_setting).flag(a.was_triggered);
    }
    h.finish()
}

/// Groups whose checksum moved since the previous poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
    pub relays: bool,
    pub sensors: bool,
    pub timers: bool,
    pub settings: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.relays || self.sensors || self.timers || self.settings
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    interval_ms: u32,
    checked_ms: Option<u64>,
    hash: Option<u32>,
}

impl Channel {
    fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            ..Self::default()
        }
    }

    fn poll(&mut self, now_ms: u64, hash: impl FnOnce() -> u32) -> bool {
        let due = self
            .checked_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= u64::from(self.interval_ms));
        if !due {
            return false;
        }
        self.checked_ms = Some(now_ms);
        let new = hash();
        let changed = self.hash != Some(new);
        self.hash = Some(new);
        changed
    }
}

#[derive(Debug, Clone)]
pub struct ChangeTracker {
    relays: Channel,
    sensors: Channel,
    timers: Channel,
    settings: Channel,
}

impl ChangeTracker {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            relays: Channel::new(config.relay_check_interval_ms),
            sensors: Channel::new(config.sensor_check_interval_ms),
            timers: Channel::new(config.timer_check_interval_ms),
            settings: Channel::new(0),
        }
    }

    /// Re-hash the groups that are due.  The first poll reports every group
    /// as changed.
    pub fn poll(&mut self, device: &Device, now_ms: u64) -> Changes {
        Changes {
            relays: self.relays.poll(now_ms, || relays_checksum(device)),
            sensors: self.sensors.poll(now_ms, || sensors_checksum(device)),
            timers: self.timers.poll(now_ms, || timers_checksum(device)),
            settings: self.settings.poll(now_ms, || settings_checksum(device)),
        }
    }

    /// Forget every checksum so the next poll reports everything.
    pub fn reset(&mut self) {
        for ch in [
            &mut self.relays,
            &mut self.sensors,
            &mut self.timers,
            &mut self.settings,
        ] {
            ch.checked_ms = None;
            ch.hash = None;
        }
    }
}
