//! Mock device enumerator for unit testing.
//!
//! Records nothing about the OS; tests inject raw HID entries and
//! keyboard-class ids, and can force either query to fail.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{DeviceEnumerator, RawHidDevice};
use crate::error::{KbError, Result};
use crate::hwid::HwId;

/// Mock enumerator with injectable device state.
#[derive(Default)]
pub struct MockEnumerator {
    hid: Mutex<Vec<RawHidDevice>>,
    keyboard_ids: Mutex<Vec<String>>,
    fail_hid: AtomicBool,
    fail_registry: AtomicBool,
}

impl MockEnumerator {
    /// Create an empty mock (no devices attached).
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a raw HID entry with resolved names.
    pub fn push_hid(&self, vendor: &str, product: &str, path: &str) {
        self.hid.lock().unwrap().push(RawHidDevice {
            vendor_name: Some(vendor.to_string()),
            product_name: Some(product.to_string()),
            device_path: path.to_string(),
        });
    }

    /// Inject a raw HID entry whose names the OS could not resolve.
    pub fn push_hid_unnamed(&self, path: &str) {
        self.hid.lock().unwrap().push(RawHidDevice {
            vendor_name: None,
            product_name: None,
            device_path: path.to_string(),
        });
    }

    /// Inject a keyboard-class device-id string.
    pub fn push_keyboard_id(&self, raw: &str) {
        self.keyboard_ids.lock().unwrap().push(raw.to_string());
    }

    /// Attach a fully confirmed keyboard: one HID entry plus the matching
    /// keyboard-class id.
    pub fn push_keyboard(&self, vendor: &str, product: &str, id: &HwId) {
        let vid = id.vid.to_lowercase();
        let pid = id.pid.to_lowercase();
        self.push_hid(
            vendor,
            product,
            &format!(r"\\?\hid#vid_{vid}&pid_{pid}&mi_00#7&0&0"),
        );
        self.push_keyboard_id(&format!(r"HID\{id}&MI_00\7&0&0"));
    }

    /// Detach everything.
    pub fn clear(&self) {
        self.hid.lock().unwrap().clear();
        self.keyboard_ids.lock().unwrap().clear();
    }

    /// Make the HID query fail.
    pub fn fail_hid(&self, fail: bool) {
        self.fail_hid.store(fail, Ordering::SeqCst);
    }

    /// Make the keyboard-class query fail.
    pub fn fail_registry(&self, fail: bool) {
        self.fail_registry.store(fail, Ordering::SeqCst);
    }
}

impl DeviceEnumerator for MockEnumerator {
    fn hid_devices(&self) -> Result<Vec<RawHidDevice>> {
        if self.fail_hid.load(Ordering::SeqCst) {
            return Err(KbError::Enumeration("injected HID failure".to_string()));
        }
        Ok(self.hid.lock().unwrap().clone())
    }

    fn keyboard_class_ids(&self) -> Result<Vec<String>> {
        if self.fail_registry.load(Ordering::SeqCst) {
            return Err(KbError::Enumeration(
                "injected registry failure".to_string(),
            ));
        }
        Ok(self.keyboard_ids.lock().unwrap().clone())
    }
}
