//! The device list and which entry is selected.
//!
//! Exactly one device is selected at a time and the list is never empty:
//! when nothing can be loaded, a factory-default device takes its place.

use log::{info, warn};

use crate::app::ports::{ConfigError, DeviceStore};
use crate::error::{ConfigurationError, Error, RangeError};

use super::Device;
use super::provision::default_device;

const DEFAULT_NAME: &str = "MyDevice1";

#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    current: usize,
}

impl DeviceRegistry {
    /// Wrap an existing list.  The device flagged `is_selected` becomes
    /// current (the first one if none is).
    pub fn new(mut devices: Vec<Device>) -> Result<Self, Error> {
        if devices.is_empty() {
            return Err(ConfigurationError::NoDevices.into());
        }
        for device in &mut devices {
            device.validate_relay_ids();
        }
        let current = match devices.iter().position(|d| d.is_selected) {
            Some(i) => i,
            None => {
                warn!("DeviceRegistry: no device flagged selected, using the first");
                0
            }
        };
        let mut registry = Self { devices, current };
        registry.mark_selected();
        Ok(registry)
    }

    pub fn with_default() -> Self {
        Self {
            devices: vec![default_device(DEFAULT_NAME, true)],
            current: 0,
        }
    }

    /// Load from the store, provisioning a default device when the store is
    /// empty (saved back) or unreadable (not saved, so the bad data stays for
    /// inspection).
    pub fn load(store: &mut impl DeviceStore) -> Self {
        match store.load_devices() {
            Ok(devices) => match Self::new(devices) {
                Ok(registry) => {
                    info!(
                        "DeviceRegistry: loaded {} device(s), selected #{}",
                        registry.devices.len(),
                        registry.current
                    );
                    registry
                }
                Err(e) => {
                    warn!("DeviceRegistry: {}, using default device", e);
                    Self::with_default()
                }
            },
            Err(ConfigError::NotFound) => {
                info!("DeviceRegistry: no stored devices, provisioning default");
                let registry = Self::with_default();
                if let Err(e) = registry.save(store) {
                    warn!("DeviceRegistry: saving default device failed: {}", e);
                }
                registry
            }
            Err(e) => {
                warn!("DeviceRegistry: load failed ({}), using default device", e);
                Self::with_default()
            }
        }
    }

    pub fn save(&self, store: &mut impl DeviceStore) -> Result<(), ConfigError> {
        store.save_devices(&self.devices)
    }

    pub fn current(&self) -> &Device {
        &self.devices[self.current]
    }

    pub fn current_mut(&mut self) -> &mut Device {
        &mut self.devices[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn select(&mut self, index: usize) -> Result<(), Error> {
        if index >= self.devices.len() {
            return Err(RangeError::DeviceIndex(index).into());
        }
        self.current = index;
        self.mark_selected();
        Ok(())
    }

    /// Append a device without selecting it.  Returns its index.
    pub fn add(&mut self, mut device: Device) -> usize {
        device.is_selected = false;
        device.validate_relay_ids();
        self.devices.push(device);
        self.devices.len() - 1
    }

    fn mark_selected(&mut self) {
        let current = self.current;
        for (i, device) in self.devices.iter_mut().enumerate() {
            device.is_selected = i == current;
        }
    }
}
