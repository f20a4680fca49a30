//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the device registry, the feature-flag mediator, and
//! every automation subsystem.  It exposes a hardware-agnostic API: all I/O
//! flows through port traits injected at call sites, so the whole engine
//! runs against mock adapters in tests.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ LogSink
//!                 │          AppService           │
//! ActuatorPort ◀──│ schedule · timers · temp · act│
//!                 └──────────────────────────────┘
//!                         ▲ DeviceStore (autosave)
//! ```

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::control::{ActionEngine, FeatureFlags, TemperatureController, TimerSequencer};
use crate::drivers::outputs::OutputWriter;
use crate::drivers::pins::{self, PinSetup};
use crate::error::{ConfigurationError, Error, Result};
use crate::model::registry::DeviceRegistry;
use crate::model::{Device, RelayId};
use crate::scheduler::ScheduleEvaluator;
use crate::sensors::SensorSampler;
use crate::tick::{TickPlan, TickScheduler};

use super::commands::RelayCommand;
use super::ports::{ActuatorPort, DeviceStore, LogSink, SensorPort};
use super::status::{ChangeTracker, Changes};

// ───────────────────────────────────────────────────────────────
// Status snapshots
// ───────────────────────────────────────────────────────────────

/// Temperature controller state for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureStatus {
    pub enabled: bool,
    /// The controller is bound to a sensor and relay.
    pub active: bool,
    pub current: f32,
    pub target: i32,
    pub heating: bool,
    pub smooth: bool,
    pub pid_output: f32,
}

/// Timer chain state for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerChainStatus {
    pub enabled: bool,
    pub current_index: usize,
    pub completed: bool,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: ControllerConfig,
    registry: DeviceRegistry,
    flags: FeatureFlags,
    ticks: TickScheduler,
    sensors: SensorSampler,
    outputs: OutputWriter,
    schedule: ScheduleEvaluator,
    timers: TimerSequencer,
    temperature: TemperatureController,
    actions: ActionEngine,
    changes: ChangeTracker,
    /// Pin setup must run before the next tick.
    pins_pending: bool,
    tick_count: u64,
    last_now_ms: u64,
    dirty_since_ms: Option<u64>,
}

impl AppService {
    /// Build the engine around a loaded registry.  Pins are configured on
    /// the first tick (or by [`start`](Self::start)).
    pub fn new(config: ControllerConfig, registry: DeviceRegistry) -> Self {
        Self {
            flags: FeatureFlags::new(),
            ticks: TickScheduler::new(&config),
            sensors: SensorSampler::new(&config),
            outputs: OutputWriter::new(),
            schedule: ScheduleEvaluator::new(),
            timers: TimerSequencer::new(),
            temperature: TemperatureController::new(&config),
            actions: ActionEngine::new(),
            changes: ChangeTracker::new(&config),
            config,
            registry,
            pins_pending: true,
            tick_count: 0,
            last_now_ms: 0,
            dirty_since_ms: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Configure the selected device's pins.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut dyn LogSink) -> PinSetup {
        let setup = self.setup_pins(hw, sink);
        info!(
            "AppService started on device #{} '{}'",
            self.registry.current_index(),
            self.registry.current().name
        );
        setup
    }

    fn setup_pins(&mut self, hw: &mut impl ActuatorPort, sink: &mut dyn LogSink) -> PinSetup {
        self.pins_pending = false;
        self.outputs.clear();
        let device = self.registry.current_mut();
        pins::configure(device, hw, self.sensors.touch_mut(), sink)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Advance every subsystem once.
    ///
    /// `hw` satisfies both [`SensorPort`] and [`ActuatorPort`], which keeps
    /// the port boundary explicit without a double mutable borrow.
    /// Schedule evaluation is skipped while `wall_clock` is `None`.
    pub fn evaluate_tick(
        &mut self,
        now_ms: u64,
        wall_clock: Option<NaiveDateTime>,
        hw: &mut (impl SensorPort + ActuatorPort),
        sink: &mut dyn LogSink,
    ) -> TickPlan {
        self.tick_count += 1;
        self.last_now_ms = now_ms;
        if self.pins_pending {
            self.setup_pins(hw, sink);
        }

        let device = self.registry.current_mut();
        self.sensors.sample(device, hw, now_ms);

        let plan = self.ticks.plan(now_ms);

        if plan.schedule {
            match wall_clock {
                Some(now) => self.schedule.tick(device, &mut self.flags, now, sink),
                None => debug!("Schedule: wall clock not synchronised, skipped"),
            }
        }
        if plan.timers {
            self.timers.advance(device, &mut self.flags, now_ms, sink);
        }
        if plan.temperature {
            self.temperature
                .update(device, &mut self.flags, now_ms, sink);
        }
        if plan.actions {
            self.actions.evaluate(device, &mut self.flags, sink);
        }
        if plan.pins {
            self.outputs.apply(device, hw);
        }
        plan
    }

    // ── Command handling ──────────────────────────────────────

    /// External relay command (web UI, chat bot).
    ///
    /// `On`/`Off` take manual control of an output; `Reset` hands it back to
    /// automation; `ResetAll` switches every output off and hands all of
    /// them back.  `relay_id` is ignored for `ResetAll`.
    pub fn apply_manual_relay_command(&mut self, relay_id: RelayId, command: RelayCommand) -> Result<()> {
        let device = self.registry.current_mut();
        match command {
            RelayCommand::ResetAll => {
                let mut any = false;
                for relay in device.relays.iter_mut().filter(|r| r.is_output) {
                    relay.state_pin = false;
                    relay.manual_mode = false;
                    any = true;
                }
                if !any {
                    return Err(ConfigurationError::NoOutputs.into());
                }
                info!("Manual: all outputs off, automation resumed");
            }
            RelayCommand::On | RelayCommand::Off | RelayCommand::Reset => {
                let relay = device
                    .relay_mut(relay_id)
                    .ok_or(ConfigurationError::RelayNotFound(relay_id))?;
                if !relay.is_output {
                    return Err(ConfigurationError::RelayNotOutput(relay_id).into());
                }
                match command {
                    RelayCommand::Reset => relay.manual_mode = false,
                    _ => {
                        relay.manual_mode = true;
                        relay.state_pin = command == RelayCommand::On;
                        relay.is_pwm = false;
                    }
                }
                info!(
                    "Manual: relay {} {:?} (state={}, manual={})",
                    relay_id, command, relay.state_pin, relay.manual_mode
                );
            }
        }
        self.mark_dirty();
        Ok(())
    }

    /// Switch to another stored device.  Every subsystem forgets its
    /// runtime state and pins are configured again on the next tick.
    pub fn select_device(&mut self, index: usize) -> Result<()> {
        self.registry.select(index)?;
        self.reset_runtime();
        self.mark_dirty();
        info!("AppService: switched to device #{}", index);
        Ok(())
    }

    /// Add a device to the list without selecting it.
    pub fn add_device(&mut self, device: Device) -> usize {
        let idx = self.registry.add(device);
        self.mark_dirty();
        idx
    }

    /// Edit the selected device.  Relay ids are re-validated and pins
    /// reconfigured on the next tick.
    pub fn edit_device<T>(&mut self, edit: impl FnOnce(&mut Device) -> T) -> T {
        let device = self.registry.current_mut();
        let out = edit(device);
        for clamp in device.validate_relay_ids() {
            warn!("AppService: {}", Error::from(clamp));
        }
        self.pins_pending = true;
        self.mark_dirty();
        out
    }

    fn reset_runtime(&mut self) {
        self.flags.clear();
        self.ticks.reset();
        self.sensors.reset();
        self.outputs.clear();
        self.schedule.reset();
        self.timers.reset();
        self.temperature.reset();
        self.actions.reset();
        self.changes.reset();
        self.registry.current_mut().clear_runtime_state();
        self.pins_pending = true;
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn device(&self) -> &Device {
        self.registry.current()
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Total ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn temperature_status(&self) -> TemperatureStatus {
        let t = &self.registry.current().temperature;
        TemperatureStatus {
            enabled: t.is_use_setting,
            active: self.temperature.is_active(),
            current: t.current_temp,
            target: t.set_temperature,
            heating: t.is_increase,
            smooth: self.temperature.has_pid(),
            pid_output: t.pid_output,
        }
    }

    pub fn timer_status(&self) -> TimerChainStatus {
        TimerChainStatus {
            enabled: self.registry.current().is_timers_enabled,
            current_index: self.timers.current_index(),
            completed: self.timers.is_completed(),
        }
    }

    /// Which status groups moved since the last poll.
    pub fn poll_changes(&mut self, now_ms: u64) -> Changes {
        self.changes.poll(self.registry.current(), now_ms)
    }

    // ── Device dirty-flag management ──────────────────────────

    /// Mark the device list as modified.
    pub fn mark_dirty(&mut self) {
        if self.dirty_since_ms.is_none() {
            self.dirty_since_ms = Some(self.last_now_ms);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_since_ms.is_some()
    }

    /// Save once the list has been dirty for the autosave delay.
    /// Returns `true` if the list was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, store: &mut impl DeviceStore) -> bool {
        let Some(since) = self.dirty_since_ms else {
            return false;
        };
        if now_ms.saturating_sub(since) < u64::from(self.config.autosave_delay_ms) {
            return false;
        }
        self.flush(store)
    }

    /// Save now if anything changed (before a reboot).
    pub fn force_save_if_dirty(&mut self, store: &mut impl DeviceStore) -> bool {
        self.is_dirty() && self.flush(store)
    }

    fn flush(&mut self, store: &mut impl DeviceStore) -> bool {
        match self.registry.save(store) {
            Ok(()) => {
                self.dirty_since_ms = None;
                info!("Devices auto-saved");
                true
            }
            Err(e) => {
                warn!("Device save failed: {}", e);
                false
            }
        }
    }
}
