//! Device observation layer.
//!
//! This module provides a trait-based abstraction over the two OS device
//! sources — raw HID enumeration and the keyboard-class device registry —
//! enabling testability without hardware.

pub mod mock;
#[cfg(windows)]
mod real;

#[cfg(windows)]
pub use real::WindowsEnumerator;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::Result;
use crate::hwid::HwId;

/// A device as reported by the raw HID enumeration service.
#[derive(Debug, Clone)]
pub struct RawHidDevice {
    /// Resolved vendor name, if the OS knows one.
    pub vendor_name: Option<String>,
    /// Resolved product name, if the OS knows one.
    pub product_name: Option<String>,
    /// OS device path; carries an embedded `vid_XXXX&pid_YYYY` pair.
    pub device_path: String,
}

/// One confirmed keyboard observation for a single enumeration pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceObservation {
    /// Vendor display name.
    pub vendor_name: String,
    /// Product display name.
    pub product_name: String,
    /// Vendor id, 4 uppercase hex digits.
    pub vid: String,
    /// Product id, 4 uppercase hex digits.
    pub pid: String,
}

impl DeviceObservation {
    /// The observation's normalized identifier pair.
    pub fn hw_id(&self) -> HwId {
        HwId {
            vid: self.vid.clone(),
            pid: self.pid.clone(),
        }
    }
}

/// Access to the OS device sources.
///
/// The two queries are deliberately separate: HID enumeration over-reports
/// generic devices, and the keyboard-class registry is the ground truth
/// for what is actually a connected keyboard.
pub trait DeviceEnumerator {
    /// All attached HID devices, one pass.
    fn hid_devices(&self) -> Result<Vec<RawHidDevice>>;

    /// Raw device-id strings from the OS keyboard-class registry.
    fn keyboard_class_ids(&self) -> Result<Vec<String>>;
}

/// Shared trait object handed to the engine and the web surface.
pub type SharedEnumerator = Arc<dyn DeviceEnumerator + Send + Sync>;

/// Run one enumeration pass and normalize it into observations.
///
/// HID entries with unresolved or "unknown" vendor/product names are
/// skipped, as are entries without an embedded identifier pair.
/// Observations are deduplicated by the full tuple, and retained only
/// when a keyboard-class id string contains both hex codes. A failure of
/// either OS query yields an empty result for this cycle: the caller must
/// treat that as "no device detected", never as a fatal error.
pub fn enumerate(enumerator: &dyn DeviceEnumerator) -> Vec<DeviceObservation> {
    let hid = match enumerator.hid_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "HID enumeration failed, treating as no devices");
            return Vec::new();
        }
    };
    let keyboards: Vec<String> = match enumerator.keyboard_class_ids() {
        Ok(ids) => ids.iter().map(|id| id.to_ascii_uppercase()).collect(),
        Err(e) => {
            warn!(error = %e, "Keyboard-class query failed, treating as no devices");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for device in hid {
        let (Some(vendor), Some(product)) = (device.vendor_name, device.product_name) else {
            continue;
        };
        if vendor.to_lowercase().contains("unknown") || product.to_lowercase().contains("unknown")
        {
            continue;
        }

        let Some(id) = HwId::find_in(&device.device_path) else {
            continue;
        };

        if !seen.insert((vendor.clone(), product.clone(), id.vid.clone(), id.pid.clone())) {
            continue;
        }

        let vid_tag = format!("VID_{}", id.vid);
        let pid_tag = format!("PID_{}", id.pid);
        if keyboards
            .iter()
            .any(|k| k.contains(&vid_tag) && k.contains(&pid_tag))
        {
            trace!(vendor = %vendor, product = %product, id = %id, "Observed keyboard");
            result.push(DeviceObservation {
                vendor_name: vendor,
                product_name: product,
                vid: id.vid,
                pid: id.pid,
            });
        }
    }

    result
}
