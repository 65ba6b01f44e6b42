//! Input-layout control and synchronization.
//!
//! The OS's global input layout is read and written through the
//! [`LayoutControl`] trait; [`sync`] is the one comparison point both the
//! control loop and the config surface go through.

pub mod mock;
#[cfg(windows)]
mod real;

#[cfg(windows)]
pub use real::WindowsLayoutControl;

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;

/// Access to the OS input-layout mechanism.
pub trait LayoutControl {
    /// Current layout identifier, 8 uppercase hex digits.
    fn current_layout(&self) -> Result<String>;

    /// Load and activate the given layout, broadcasting the change.
    fn activate_layout(&self, layout: &str) -> Result<()>;
}

/// Shared trait object handed to the engine and the web surface.
pub type SharedLayoutControl = Arc<dyn LayoutControl + Send + Sync>;

/// Bring the OS layout in line with `expected`.
///
/// Idempotent: when the current layout already equals `expected` (hex
/// comparison, case-insensitive) no OS mutation is issued — switching on
/// every tick would flood the system with layout-change broadcasts.
/// An OS rejection of the layout id is an error the caller should log,
/// not propagate.
pub fn sync(control: &dyn LayoutControl, expected: &str) -> Result<()> {
    let current = control.current_layout()?;
    if current.eq_ignore_ascii_case(expected) {
        debug!(layout = %current, "Input layout already matches");
        return Ok(());
    }

    control.activate_layout(expected)?;
    info!(from = %current, to = %expected, "Input layout switched");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::mock::MockLayoutControl;
    use super::*;

    #[test]
    fn test_sync_switches_on_difference() {
        let mock = MockLayoutControl::new("0000040C");
        sync(&mock, "00000409").unwrap();
        assert_eq!(mock.activations(), vec!["00000409".to_string()]);
        assert_eq!(mock.current_layout().unwrap(), "00000409");
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mock = MockLayoutControl::new("00000409");
        sync(&mock, "00000409").unwrap();
        sync(&mock, "00000409").unwrap();
        assert!(mock.activations().is_empty(), "no OS mutation expected");
    }

    #[test]
    fn test_sync_comparison_ignores_case() {
        let mock = MockLayoutControl::new("0000040C");
        sync(&mock, "0000040c").unwrap();
        assert!(mock.activations().is_empty());
    }

    #[test]
    fn test_sync_reports_rejected_layout() {
        let mock = MockLayoutControl::new("00000409");
        mock.reject_next();
        let err = sync(&mock, "DEADBEEF").unwrap_err();
        assert!(err.to_string().contains("DEADBEEF"));
        // The current layout is unchanged after a rejection.
        assert_eq!(mock.current_layout().unwrap(), "00000409");
    }
}
