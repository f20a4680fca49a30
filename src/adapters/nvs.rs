//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`StoragePort`], [`ConfigPort`], and [`DeviceStore`] on one
//! backend: the ESP-IDF NVS partition on target, a `HashMap` on host.
//!
//! - Controller tuning is a `postcard` blob, range-checked before it is
//!   written.
//! - The device list is a text blob with one JSON document per line, in the
//!   web UI's field naming.  Lines that fail to decode are skipped so one
//!   bad device does not take the others down with it.
//! - NVS commits are atomic per `nvs_commit()`.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, DeviceStore, StorageError, StoragePort};
use crate::config::ControllerConfig;
use crate::model::Device;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "relayctl";
const CONFIG_KEY: &str = "ctlcfg";
const DEVICES_KEY: &str = "devices";

/// Largest blob the adapter will read back.
const MAX_BLOB_SIZE: usize = 32_000;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.  A partition that is full or was written by a
    /// newer IDF is erased and initialised again.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // main task before any other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NVS names are at most 15 bytes plus the terminator.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let len = name.len().min(15);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        buf
    }

    /// Open an NVS namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        // SAFETY: handle was opened above.
        unsafe {
            nvs_close(handle);
        }
        result
    }

    /// Whole blob stored under `key`.
    fn get_blob(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .get(&Self::composite_key(namespace, key))
                .cloned()
                .ok_or(StorageError::NotFound)
        }

        #[cfg(target_os = "espidf")]
        {
            let name = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size: usize = 0;
                // SAFETY: size query with a null buffer.
                let ret = unsafe {
                    nvs_get_blob(handle, name.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size > MAX_BLOB_SIZE {
                    return Err(ESP_ERR_NVS_INVALID_LENGTH);
                }
                let mut buf = vec![0u8; size];
                // SAFETY: `buf` holds `size` bytes.
                let ret = unsafe {
                    nvs_get_blob(handle, name.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                buf.truncate(size);
                Ok(buf)
            });
            result.map_err(|e| {
                if e == ESP_ERR_NVS_NOT_FOUND {
                    StorageError::NotFound
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn put_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let name = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: `data` is valid for `data.len()` bytes.
                let ret = unsafe {
                    nvs_set_blob(handle, name.as_ptr().cast(), data.as_ptr().cast(), data.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                // SAFETY: commit on an open handle.
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }
}

pub fn validate_config(cfg: &ControllerConfig) -> Result<(), ConfigError> {
    if cfg.action_interval_ms > 0 && cfg.action_phase_ms >= cfg.action_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "action_phase_ms must be < action_interval_ms",
        ));
    }
    if !(1..=1000).contains(&cfg.touch_debounce_ms) {
        return Err(ConfigError::ValidationFailed(
            "touch_debounce_ms must be 1–1000",
        ));
    }
    if !(1.0..=10_000.0).contains(&cfg.pid_window) {
        return Err(ConfigError::ValidationFailed(
            "pid_window must be 1.0–10000.0",
        ));
    }
    if !(10..=60_000).contains(&cfg.pid_sample_ms) {
        return Err(ConfigError::ValidationFailed(
            "pid_sample_ms must be 10–60000",
        ));
    }
    if cfg.pid_log_interval_ms == 0 {
        return Err(ConfigError::ValidationFailed(
            "pid_log_interval_ms must be > 0",
        ));
    }
    if !(1000.0..=10_000.0).contains(&cfg.ntc_beta) {
        return Err(ConfigError::ValidationFailed(
            "ntc_beta must be 1000–10000",
        ));
    }
    if !(-20.0..=20.0).contains(&cfg.ntc_offset_c) {
        return Err(ConfigError::ValidationFailed(
            "ntc_offset_c must be -20.0–20.0",
        ));
    }
    if cfg.autosave_delay_ms > 600_000 {
        return Err(ConfigError::ValidationFailed(
            "autosave_delay_ms must be ≤ 600000",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        match self.get_blob(NAMESPACE, CONFIG_KEY) {
            Ok(bytes) => {
                let cfg: ControllerConfig =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", bytes.len());
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(ControllerConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read failed ({}), using defaults", e);
                Ok(ControllerConfig::default())
            }
        }
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.put_blob(NAMESPACE, CONFIG_KEY, &bytes)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

/// One device per line.
pub fn encode_devices(devices: &[Device]) -> Result<String, ConfigError> {
    let mut doc = String::new();
    for device in devices {
        let line = serde_json::to_string(device).map_err(|_| ConfigError::IoError)?;
        doc.push_str(&line);
        doc.push('\n');
    }
    Ok(doc)
}

/// Decode every readable line.  `NotFound` for a blank document,
/// `Corrupted` when no line decodes.
pub fn decode_devices(doc: &str) -> Result<Vec<Device>, ConfigError> {
    let mut devices = Vec::new();
    let mut lines = 0usize;
    for (n, line) in doc.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        lines += 1;
        match serde_json::from_str::<Device>(line) {
            Ok(device) => devices.push(device),
            Err(e) => warn!("NvsAdapter: device line {} skipped: {}", n + 1, e),
        }
    }
    if lines == 0 {
        return Err(ConfigError::NotFound);
    }
    if devices.is_empty() {
        return Err(ConfigError::Corrupted);
    }
    Ok(devices)
}

impl DeviceStore for NvsAdapter {
    fn load_devices(&self) -> Result<Vec<Device>, ConfigError> {
        let bytes = self.get_blob(NAMESPACE, DEVICES_KEY)?;
        let doc = core::str::from_utf8(&bytes).map_err(|_| ConfigError::Corrupted)?;
        decode_devices(doc)
    }

    fn save_devices(&mut self, devices: &[Device]) -> Result<(), ConfigError> {
        let doc = encode_devices(devices)?;
        if doc.len() > MAX_BLOB_SIZE {
            return Err(ConfigError::StorageFull);
        }
        self.put_blob(NAMESPACE, DEVICES_KEY, doc.as_bytes())?;
        info!("NvsAdapter: {} device(s) saved ({} bytes)", devices.len(), doc.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = self.get_blob(namespace, key)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    fn stored_len(&self, namespace: &str, key: &str) -> Option<usize> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .get(&Self::composite_key(namespace, key))
                .map(Vec::len)
        }

        #[cfg(target_os = "espidf")]
        {
            let name = Self::c_name(key);
            Self::with_nvs_handle(namespace, false, |handle| {
                let mut size: usize = 0;
                // SAFETY: size query with a null buffer.
                let ret = unsafe {
                    nvs_get_blob(handle, name.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            })
            .ok()
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let name = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                // SAFETY: erase on an open handle.
                let ret = unsafe { nvs_erase_key(handle, name.as_ptr().cast()) };
                if ret != ESP_OK && ret != ESP_ERR_NVS_NOT_FOUND {
                    return Err(ret);
                }
                // SAFETY: commit on an open handle.
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }
}
