//! RelayCtl firmware — main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   ConsoleLogSink   NvsAdapter     SystemClock │
//! │  (Sensor+Actuator) (LogSink)        (Config+Store) (Clock)     │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Schedule · Timers · Temperature/PID · Actions         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::FreeRtos;
use log::{info, warn};

use relayctl::adapters::hardware::HardwareAdapter;
use relayctl::adapters::log_sink::ConsoleLogSink;
use relayctl::adapters::nvs::NvsAdapter;
use relayctl::adapters::time::SystemClock;
use relayctl::app::ports::{ClockPort, ConfigPort};
use relayctl::app::service::AppService;
use relayctl::config::ControllerConfig;
use relayctl::model::registry::DeviceRegistry;

/// Idle time between loop passes.
const LOOP_DELAY_MS: u32 = 10;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RelayCtl v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    let mut hw = HardwareAdapter::new().map_err(|e| anyhow::anyhow!("HAL init failed: {}", e))?;

    // ── 3. Config and devices from NVS (or defaults) ──────────
    let mut nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    let config = match nvs.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            ControllerConfig::default()
        }
    };
    let registry = DeviceRegistry::load(&mut nvs);

    // ── 4. Engine ─────────────────────────────────────────────
    let clock = SystemClock::new();
    let mut log_sink = ConsoleLogSink::new();
    let mut app = AppService::new(config, registry);
    app.start(&mut hw, &mut log_sink);

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();
        app.evaluate_tick(now_ms, clock.wall_clock(), &mut hw, &mut log_sink);

        let changes = app.poll_changes(now_ms);
        if changes.any() {
            log::debug!("Status changed: {:?}", changes);
        }

        app.auto_save_if_needed(now_ms, &mut nvs);

        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
