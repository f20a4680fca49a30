//! Device list and config persistence through the host NVS simulation.

use relayctl::adapters::nvs::NvsAdapter;
use relayctl::app::commands::RelayCommand;
use relayctl::app::ports::{ConfigError, ConfigPort, DeviceStore, StoragePort};
use relayctl::app::service::AppService;
use relayctl::config::ControllerConfig;
use relayctl::model::provision::default_device;
use relayctl::model::registry::DeviceRegistry;

use crate::mock_hw::{MemStore, MockHardware, RecordingSink};

fn nvs() -> NvsAdapter {
    NvsAdapter::new().unwrap()
}

#[test]
fn first_boot_provisions_and_saves_the_default_device() {
    let mut store = nvs();
    assert!(matches!(store.load_devices(), Err(ConfigError::NotFound)));

    let registry = DeviceRegistry::load(&mut store);
    assert_eq!(registry.devices().len(), 1);
    assert!(registry.current().is_selected);

    let stored = store.load_devices().unwrap();
    assert_eq!(stored, registry.devices());
}

#[test]
fn selection_survives_a_reload() {
    let mut store = nvs();
    let mut registry = DeviceRegistry::load(&mut store);
    registry.add(default_device("Garage", false));
    registry.select(1).unwrap();
    registry.save(&mut store).unwrap();

    let reloaded = DeviceRegistry::load(&mut store);
    assert_eq!(reloaded.devices().len(), 2);
    assert_eq!(reloaded.current_index(), 1);
    assert_eq!(reloaded.current().name.as_str(), "Garage");
}

#[test]
fn corrupted_device_list_is_left_in_place() {
    let mut store = nvs();
    store.write("relayctl", "devices", b"{not json\n").unwrap();

    let registry = DeviceRegistry::load(&mut store);
    assert_eq!(registry.devices().len(), 1);

    let mut buf = [0u8; 32];
    let n = store.read("relayctl", "devices", &mut buf).unwrap();
    assert_eq!(&buf[..n], b"{not json\n");
}

#[test]
fn one_bad_line_does_not_lose_the_rest() {
    let mut store = nvs();
    let good = serde_json::to_string(&default_device("Home", true)).unwrap();
    let doc = format!("garbage\n{good}\n");
    store.write("relayctl", "devices", doc.as_bytes()).unwrap();

    let devices = store.load_devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name.as_str(), "Home");
}

#[test]
fn manual_command_is_autosaved_after_the_delay() {
    let config = ControllerConfig::unpaced();
    let delay = u64::from(config.autosave_delay_ms);
    let mut store = MemStore::default();
    let mut app = AppService::new(config, DeviceRegistry::load(&mut store));
    let saves_after_boot = store.saves;

    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    app.evaluate_tick(1_000, None, &mut hw, &mut sink);
    app.apply_manual_relay_command(1, RelayCommand::On).unwrap();
    assert!(app.is_dirty());

    assert!(!app.auto_save_if_needed(1_000 + delay - 1, &mut store));
    assert_eq!(store.saves, saves_after_boot);

    assert!(app.auto_save_if_needed(1_000 + delay, &mut store));
    assert!(!app.is_dirty());
    let saved = store.devices.as_ref().unwrap();
    assert!(saved[0].relays[1].manual_mode);
    assert!(saved[0].relays[1].state_pin);
}

#[test]
fn force_save_only_writes_when_dirty() {
    let mut store = MemStore::default();
    let mut app = AppService::new(ControllerConfig::default(), DeviceRegistry::load(&mut store));
    let saves = store.saves;

    assert!(!app.force_save_if_dirty(&mut store));
    app.edit_device(|d| d.is_schedule_enabled = true);
    assert!(app.force_save_if_dirty(&mut store));
    assert_eq!(store.saves, saves + 1);
}

#[test]
fn config_round_trips_and_rejects_bad_ranges() {
    let store = nvs();
    let mut cfg = ControllerConfig::default();
    cfg.autosave_delay_ms = 10_000;
    store.save(&cfg).unwrap();
    assert_eq!(store.load().unwrap(), cfg);

    cfg.touch_debounce_ms = 0;
    assert!(matches!(store.save(&cfg), Err(ConfigError::ValidationFailed(_))));
}
