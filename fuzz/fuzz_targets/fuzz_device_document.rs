//! Fuzz the stored device-list decoder.
//!
//! Arbitrary bytes must never panic the loader, and whatever decodes must
//! survive relay-id validation and re-encoding.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayctl::adapters::nvs::{decode_devices, encode_devices};
use relayctl::model::Device;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(mut devices) = decode_devices(doc) {
        for device in &mut devices {
            let _ = device.validate_relay_ids();
        }
        if let Ok(encoded) = encode_devices(&devices) {
            let again = decode_devices(&encoded).expect("re-encoded list decodes");
            assert_eq!(again.len(), devices.len());
        }
    }
    let _ = serde_json::from_slice::<Device>(data);
});
