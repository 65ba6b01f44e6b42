//! Windows input-layout control.
//!
//! Reads the active layout handle of the current thread and switches
//! layouts with `LoadKeyboardLayoutW` plus a `WM_INPUTLANGCHANGEREQUEST`
//! broadcast, so every top-level window picks up the change.

// Raw Win32 calls; the rest of the crate denies unsafe code.
#![allow(unsafe_code)]

use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetKeyboardLayout, KLF_ACTIVATE, LoadKeyboardLayoutW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    HWND_BROADCAST, PostMessageW, WM_INPUTLANGCHANGEREQUEST,
};
use windows::core::PCWSTR;

use super::LayoutControl;
use crate::error::{KbError, Result};

/// Layout control backed by the live OS.
#[derive(Debug, Default)]
pub struct WindowsLayoutControl;

impl WindowsLayoutControl {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutControl for WindowsLayoutControl {
    fn current_layout(&self) -> Result<String> {
        // Thread id 0 selects the calling thread's active layout.
        let hkl = unsafe { GetKeyboardLayout(0) };
        let lang_id = (hkl.0 as usize) & 0xFFFF;
        Ok(format!("{lang_id:08X}"))
    }

    fn activate_layout(&self, layout: &str) -> Result<()> {
        let wide: Vec<u16> = layout.encode_utf16().chain(std::iter::once(0)).collect();

        let hkl = unsafe { LoadKeyboardLayoutW(PCWSTR(wide.as_ptr()), KLF_ACTIVATE) }.map_err(
            |e| KbError::LayoutRejected {
                layout: layout.to_string(),
                reason: e.to_string(),
            },
        )?;

        unsafe {
            PostMessageW(
                Some(HWND_BROADCAST),
                WM_INPUTLANGCHANGEREQUEST,
                WPARAM(0),
                LPARAM(hkl.0 as isize),
            )
        }
        .map_err(|e| KbError::LayoutRejected {
            layout: layout.to_string(),
            reason: format!("change broadcast failed: {e}"),
        })
    }
}
