//! Control loop: enumerate → resolve → synchronize on a fixed cadence.
//!
//! The loop is edge-triggered on the last active profile so a stable
//! hardware state issues no redundant OS calls. The config surface uses
//! the separate [`check_and_sync`] entry point, which deliberately
//! bypasses the edge trigger so an edited profile takes effect without
//! waiting for the hardware to change.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::device::{self, SharedEnumerator};
use crate::layout::{self, SharedLayoutControl};
use crate::profile::{self, ProfileStore};
use crate::resolver;

/// Default tick cadence of the control loop.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Shared application context: the profile store, the OS adapters, and
/// the cooperative shutdown channel. Passed to each component instead of
/// living in process-wide globals.
#[derive(Clone)]
pub struct AppContext {
    pub store: ProfileStore,
    pub enumerator: SharedEnumerator,
    pub layout: SharedLayoutControl,
    shutdown_tx: watch::Sender<bool>,
}

impl AppContext {
    pub fn new(
        store: ProfileStore,
        enumerator: SharedEnumerator,
        layout: SharedLayoutControl,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            enumerator,
            layout,
            shutdown_tx,
        }
    }

    /// Signal cooperative shutdown to the control loop and the web
    /// server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Subscribe to the shutdown signal.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

/// The edge-triggered device-to-layout engine.
pub struct Engine {
    ctx: AppContext,
    last_active: Option<String>,
    shutdown: watch::Receiver<bool>,
}

impl Engine {
    pub fn new(ctx: AppContext) -> Self {
        // Subscribe up front so a shutdown sent before `run` is polled
        // still lands.
        let shutdown = ctx.shutdown_signal();
        Self {
            ctx,
            last_active: None,
            shutdown,
        }
    }

    /// The profile the engine last switched for, if any.
    pub fn last_active(&self) -> Option<&str> {
        self.last_active.as_deref()
    }

    /// One cycle: enumerate devices, resolve the active profile, and
    /// synchronize the layout if the active profile changed.
    ///
    /// A store read failure skips the cycle; enumeration failures arrive
    /// here as an empty observation list, meaning "no device detected".
    pub fn tick(&mut self) {
        let profiles = match self.ctx.store.load() {
            Ok(profiles) => profiles,
            Err(e) => {
                error!(error = %e, "Skipping cycle, profile store unreadable");
                return;
            }
        };

        let observations = device::enumerate(self.ctx.enumerator.as_ref());
        let resolved = resolver::resolve(&observations, &profiles);

        if resolved == self.last_active {
            return;
        }

        match &resolved {
            Some(name) => {
                info!(profile = %name, "Active keyboard changed");
                if let Some(active) = profile::find_profile(&profiles, name) {
                    if let Err(e) = layout::sync(self.ctx.layout.as_ref(), &active.layout) {
                        warn!(error = %e, "Layout synchronization failed");
                    }
                }
            }
            None => info!("Active keyboard disconnected"),
        }
        self.last_active = resolved;
    }

    /// Run the loop until the shutdown signal fires.
    pub async fn run(mut self, interval: Duration) {
        info!(interval_ms = interval.as_millis() as u64, "Control loop started");

        loop {
            self.tick();
            tokio::select! {
                () = tokio::time::sleep(interval) => {}
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("Control loop stopping");
                        return;
                    }
                }
            }
        }
    }
}

/// Unconditional check-and-sync pass, independent of the engine's edge
/// trigger. Invoked by the config surface after every successful save.
pub fn check_and_sync(ctx: &AppContext) {
    let profiles = match ctx.store.load() {
        Ok(profiles) => profiles,
        Err(e) => {
            error!(error = %e, "Check-and-sync skipped, profile store unreadable");
            return;
        }
    };

    let observations = device::enumerate(ctx.enumerator.as_ref());
    if let Some(name) = resolver::resolve(&observations, &profiles) {
        if let Some(active) = profile::find_profile(&profiles, &name) {
            if let Err(e) = layout::sync(ctx.layout.as_ref(), &active.layout) {
                warn!(error = %e, "Layout synchronization failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::device::mock::MockEnumerator;
    use crate::hwid::HwId;
    use crate::layout::mock::MockLayoutControl;
    use crate::profile::KeyboardProfile;

    struct Rig {
        _dir: TempDir,
        ctx: AppContext,
        enumerator: Arc<MockEnumerator>,
        layout: Arc<MockLayoutControl>,
    }

    fn rig(initial_layout: &str, profiles: &[KeyboardProfile]) -> Rig {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("keyboard_config.json"));
        store.save(profiles).unwrap();

        let enumerator = Arc::new(MockEnumerator::new());
        let layout = Arc::new(MockLayoutControl::new(initial_layout));
        let ctx = AppContext::new(store, enumerator.clone(), layout.clone());
        Rig {
            _dir: dir,
            ctx,
            enumerator,
            layout,
        }
    }

    fn profile(name: &str, layout: &str, vid: &str, pid: &str) -> KeyboardProfile {
        KeyboardProfile {
            name: name.to_string(),
            enabled: true,
            connected: false,
            active: false,
            layout: layout.to_string(),
            product: format!("{name} product"),
            vendor: format!("{name} vendor"),
            vid_pid: vec![format!("VID_{vid}&PID_{pid}")],
        }
    }

    fn hw(vid: &str, pid: &str) -> HwId {
        HwId {
            vid: vid.to_string(),
            pid: pid.to_string(),
        }
    }

    #[test]
    fn test_tick_switches_layout_for_new_active_profile() {
        // Profile A wants 00000409 while the OS sits on 0000040C.
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx);
        engine.tick();

        assert_eq!(engine.last_active(), Some("A"));
        assert_eq!(r.layout.activations(), vec!["00000409".to_string()]);
    }

    #[test]
    fn test_tick_is_edge_triggered() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx);
        engine.tick();
        assert_eq!(r.layout.activations().len(), 1);

        // Same hardware state: no further OS calls, even if the user
        // switched the layout away by hand in the meantime.
        r.layout.set_current("0000040C");
        engine.tick();
        engine.tick();
        assert_eq!(r.layout.activations().len(), 1);
    }

    #[test]
    fn test_tick_handles_device_swap() {
        let r = rig(
            "00000409",
            &[
                profile("A", "00000409", "0001", "0001"),
                profile("B", "0000040C", "0002", "0002"),
            ],
        );
        r.enumerator.push_keyboard("Acme", "One", &hw("0001", "0001"));

        let mut engine = Engine::new(r.ctx);
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"));
        assert!(r.layout.activations().is_empty(), "already on A's layout");

        r.enumerator.clear();
        r.enumerator.push_keyboard("Bolt", "Two", &hw("0002", "0002"));
        engine.tick();
        assert_eq!(engine.last_active(), Some("B"));
        assert_eq!(r.layout.activations(), vec!["0000040C".to_string()]);
    }

    #[test]
    fn test_tick_clears_last_active_on_disconnect() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx);
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"));

        r.enumerator.clear();
        engine.tick();
        assert_eq!(engine.last_active(), None);
        assert_eq!(r.layout.activations().len(), 1, "no sync on disconnect");

        // Replugging the same keyboard is a fresh edge.
        r.layout.set_current("0000040C");
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"));
        assert_eq!(r.layout.activations().len(), 2);
    }

    #[test]
    fn test_tick_treats_enumeration_failure_as_no_device() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx);
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"));

        r.enumerator.fail_hid(true);
        engine.tick();
        assert_eq!(engine.last_active(), None, "failure reads as no device");
        assert_eq!(r.layout.activations().len(), 1);
    }

    #[test]
    fn test_tick_skips_cycle_on_unreadable_store() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx.clone());
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"));

        fs::write(r.ctx.store.path(), "{broken").unwrap();
        engine.tick();
        assert_eq!(engine.last_active(), Some("A"), "state kept across bad cycle");
        assert_eq!(r.layout.activations().len(), 1);
    }

    #[test]
    fn test_check_and_sync_bypasses_edge_trigger() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        r.enumerator.push_keyboard("Acme", "Model 1", &hw("19F5", "3247"));

        let mut engine = Engine::new(r.ctx.clone());
        engine.tick();
        assert_eq!(r.layout.activations().len(), 1);

        // The user flips the layout by hand; the edge-triggered loop
        // ignores it, the unconditional pass does not.
        r.layout.set_current("0000040C");
        engine.tick();
        assert_eq!(r.layout.activations().len(), 1);

        check_and_sync(&r.ctx);
        assert_eq!(r.layout.activations().len(), 2);
    }

    #[test]
    fn test_check_and_sync_without_match_is_a_no_op() {
        let r = rig("0000040C", &[profile("A", "00000409", "19F5", "3247")]);
        check_and_sync(&r.ctx);
        assert!(r.layout.activations().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let r = rig("00000409", &[]);
        let engine = Engine::new(r.ctx.clone());
        let handle = tokio::spawn(engine.run(Duration::from_millis(10)));

        r.ctx.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should stop promptly")
            .unwrap();
    }
}
