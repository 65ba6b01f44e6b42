//! kbswitch library - hardware-keyed input layout switching.
//!
//! This library exposes the core of the `kbswitch` binary for use in
//! tests and potentially other applications.
//!
//! # Modules
//!
//! - `device`: Device observation layer (HID pass + keyboard-class pass)
//! - `profile`: Profile model, validation, and safe persistence
//! - `resolver`: Active-profile resolution with collection-order tie-break
//! - `layout`: OS input-layout control and idempotent synchronization
//! - `engine`: Edge-triggered control loop and unconditional sync pass
//! - `web`: Local HTTP config surface
//! - `error`: Error taxonomy
#![deny(unsafe_code)]

pub mod cli;
pub mod device;
pub mod engine;
pub mod error;
pub mod hwid;
pub mod layout;
pub mod logging;
pub mod profile;
pub mod resolver;
pub mod web;
