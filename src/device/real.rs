//! Windows device enumeration.
//!
//! The HID pass comes from `hidapi`; the keyboard-class pass reads the
//! `kbdclass` service enumeration key, which lists the device-instance
//! ids of every keyboard the class driver is bound to.

use hidapi::HidApi;
use winreg::RegKey;
use winreg::enums::HKEY_LOCAL_MACHINE;

use super::{DeviceEnumerator, RawHidDevice};
use crate::error::{KbError, Result};

const KBDCLASS_ENUM_KEY: &str = r"SYSTEM\CurrentControlSet\Services\kbdclass\Enum";

/// Enumerator backed by the live OS device registries.
#[derive(Debug, Default)]
pub struct WindowsEnumerator;

impl WindowsEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceEnumerator for WindowsEnumerator {
    fn hid_devices(&self) -> Result<Vec<RawHidDevice>> {
        let api = HidApi::new().map_err(|e| KbError::Enumeration(e.to_string()))?;
        Ok(api
            .device_list()
            .map(|d| RawHidDevice {
                vendor_name: d.manufacturer_string().map(str::to_string),
                product_name: d.product_string().map(str::to_string),
                device_path: d.path().to_string_lossy().into_owned(),
            })
            .collect())
    }

    fn keyboard_class_ids(&self) -> Result<Vec<String>> {
        let key = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey(KBDCLASS_ENUM_KEY)
            .map_err(|e| KbError::Enumeration(format!("kbdclass enumeration key: {e}")))?;

        // The key holds numbered values "0".."Count-1", one device id each.
        let count: u32 = key
            .get_value("Count")
            .map_err(|e| KbError::Enumeration(format!("kbdclass Count value: {e}")))?;

        let mut ids = Vec::with_capacity(count as usize);
        for i in 0..count {
            if let Ok(id) = key.get_value::<String, _>(i.to_string()) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}
