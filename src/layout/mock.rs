//! Mock layout control for unit testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::LayoutControl;
use crate::error::{KbError, Result};

/// Mock OS layout state: a current layout plus a log of activations.
pub struct MockLayoutControl {
    current: Mutex<String>,
    activations: Mutex<Vec<String>>,
    reject_next: AtomicBool,
}

impl MockLayoutControl {
    /// Create a mock whose current layout is `initial`.
    pub fn new(initial: &str) -> Self {
        Self {
            current: Mutex::new(initial.to_string()),
            activations: Mutex::new(Vec::new()),
            reject_next: AtomicBool::new(false),
        }
    }

    /// All layouts activated so far, in order.
    pub fn activations(&self) -> Vec<String> {
        self.activations.lock().unwrap().clone()
    }

    /// Reject the next activation, as the OS does for an unavailable id.
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Overwrite the current layout out-of-band (as the user switching
    /// manually would).
    pub fn set_current(&self, layout: &str) {
        *self.current.lock().unwrap() = layout.to_string();
    }
}

impl LayoutControl for MockLayoutControl {
    fn current_layout(&self) -> Result<String> {
        Ok(self.current.lock().unwrap().clone())
    }

    fn activate_layout(&self, layout: &str) -> Result<()> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(KbError::LayoutRejected {
                layout: layout.to_string(),
                reason: "injected rejection".to_string(),
            });
        }
        *self.current.lock().unwrap() = layout.to_string();
        self.activations.lock().unwrap().push(layout.to_string());
        Ok(())
    }
}
