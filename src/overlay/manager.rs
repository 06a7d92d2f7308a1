// Overlay lifecycle orchestrator.
//
// Owns the live window set and keeps it consistent with display topology and
// the persisted configuration database. All mutation happens here, on the
// single event-loop thread; the only awaited suspension is window close
// completion, which arrives as `OverlayEvent::Closed` per window. A reset is
// atomic from the caller's perspective: `get_all` observes either the
// complete old set, an empty set while closes are in flight, or the complete
// new set — never a mix of topology generations.

use crate::config::{Settings, SettingsStore};
use crate::display::{DisplayEnumerator, DisplayId, HotplugEvent};
use crate::overlay::configuration::{ConfigurationError, ConfigurationUpdate, OverlayConfiguration};
use crate::overlay::surface::SurfaceFactory;
use crate::overlay::window::OverlayWindow;
use crate::overlay::OverlayEvent;
use std::sync::mpsc::Sender;
use std::time::Instant;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Initializing,
    Ready,
    Resetting,
    Terminating,
}

/// Point-in-time view of one live overlay window, for the controller UI.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub display_id: DisplayId,
    pub configuration: OverlayConfiguration,
}

pub struct OverlayManager {
    state: ManagerState,
    windows: Vec<OverlayWindow>,
    /// Outstanding asynchronous closes during a reset. Count-based: windows
    /// may close in any order.
    pending_close: usize,
    /// Rebuild the window set once the last close completes.
    rebuild_after_close: bool,
    /// A remove/reset request arrived mid-reset; re-issued once the
    /// in-flight closes settle. Holds the rebuild flag of the most recent
    /// request, so the final window set matches the last thing asked for
    /// (a hotplug storm coalesces, a disable request is not lost).
    pending_removal: Option<bool>,
    enumerator: Box<dyn DisplayEnumerator>,
    factory: Box<dyn SurfaceFactory>,
    store: Box<dyn SettingsStore>,
    events: Sender<OverlayEvent>,
    inspect: bool,
}

impl OverlayManager {
    pub fn new(
        enumerator: Box<dyn DisplayEnumerator>,
        factory: Box<dyn SurfaceFactory>,
        store: Box<dyn SettingsStore>,
        events: Sender<OverlayEvent>,
        inspect: bool,
    ) -> Self {
        Self {
            state: ManagerState::Uninitialized,
            windows: Vec::new(),
            pending_close: 0,
            rebuild_after_close: false,
            pending_removal: None,
            enumerator,
            factory,
            store,
            events,
            inspect,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// App-ready: build the initial window set and apply persisted
    /// configuration.
    pub fn init(&mut self) {
        if self.state != ManagerState::Uninitialized {
            warn!(state = ?self.state, "init called twice, ignoring");
            return;
        }
        debug!("init");
        self.state = ManagerState::Initializing;
        self.create_all();
        self.retrieve_configurations();
        self.state = ManagerState::Ready;
    }

    /// Construct one overlay window per currently enumerated display.
    /// Duplicate ids are skipped, so a double call cannot double-create.
    /// An empty enumeration yields the zero-overlay state, not an error.
    pub fn create_all(&mut self) {
        let displays = self.enumerator.displays();
        debug!(count = displays.len(), "create_all");

        for display in displays {
            if self.windows.iter().any(|w| w.display_id() == &display.id) {
                let id = &display.id;
                warn!(display = %id, "window already exists, skipping create");
                continue;
            }
            match OverlayWindow::new(
                display,
                self.factory.as_mut(),
                self.inspect,
                self.events.clone(),
            ) {
                Ok(window) => self.windows.push(window),
                Err(err) => warn!(error = %err, "overlay window creation failed, skipping display"),
            }
        }
    }

    /// Apply the persisted configuration snapshot to every live window that
    /// has one. Windows without a snapshot stay at constructed defaults.
    pub fn retrieve_configurations(&mut self) {
        debug!("retrieve_configurations");
        let settings = self.load_settings();
        let now = Instant::now();

        for window in &mut self.windows {
            if let Some(configuration) = settings.overlay_configurations.get(window.display_id()) {
                window.restore_configuration(configuration.clone(), now);
            }
        }
    }

    /// Write every live window's configuration into the persisted database,
    /// keyed by display id (last-write-wins). Stale entries for unplugged
    /// displays are deliberately left in place. Best-effort: a store failure
    /// is logged and never blocks the caller.
    pub fn store_configurations(&mut self) {
        debug!("store_configurations");
        let mut settings = self.load_settings();

        for window in &self.windows {
            settings
                .overlay_configurations
                .insert(window.display_id().clone(), window.configuration().clone());
        }

        if let Err(err) = self.store.save(&settings) {
            warn!(error = %err, "configuration store failed, edits kept in memory only");
        }
    }

    /// Persist configuration, then close every window. Closing is
    /// asynchronous; when `rebuild` is set the new window set is created
    /// only after the *last* close completes, so two generations never
    /// address the same display.
    pub fn remove_all(&mut self, rebuild: bool) {
        if self.state == ManagerState::Resetting {
            // Last request wins once the in-flight closes settle.
            self.pending_removal = Some(rebuild);
            return;
        }
        debug!(rebuild, "remove_all");

        self.state = ManagerState::Resetting;
        self.rebuild_after_close = rebuild;
        self.store_configurations();

        let windows = std::mem::take(&mut self.windows);
        self.pending_close = windows.len();

        if windows.is_empty() {
            self.finish_reset();
            return;
        }
        for mut window in windows {
            window.close();
        }
    }

    /// Tear down and rebuild the full overlay set against fresh topology.
    pub fn reset_all(&mut self) {
        debug!("reset_all");
        self.remove_all(true);
    }

    /// App quit: persist synchronously before the process is allowed to
    /// exit. Window destruction is left to process teardown.
    pub fn terminate(&mut self) {
        debug!("terminate");
        self.store_configurations();
        self.state = ManagerState::Terminating;
    }

    /// Route an event-loop event. Hotplug triggers a reset; surface events
    /// drive the reset/restore sequencing.
    pub fn handle_event(&mut self, event: OverlayEvent) {
        match event {
            OverlayEvent::ContentReady(id) => self.handle_content_ready(&id),
            OverlayEvent::Closed(id) => self.handle_window_closed(&id),
            OverlayEvent::Hotplug(hotplug) => self.handle_hotplug(hotplug),
            // Derived-state observers (tray icon) consume this one.
            OverlayEvent::ConfigurationChanged(_) => {}
        }
    }

    pub fn handle_hotplug(&mut self, event: HotplugEvent) {
        debug!(?event, "display hotplug");
        self.reset_all();
    }

    /// Forward a controller edit to the addressed window. Returns whether
    /// anything changed; edits addressed to a window that no longer exists
    /// (e.g. mid-reset) are dropped.
    pub fn set_configuration(
        &mut self,
        id: &DisplayId,
        update: &ConfigurationUpdate,
        now: Instant,
    ) -> Result<bool, ConfigurationError> {
        match self.windows.iter_mut().find(|w| w.display_id() == id) {
            Some(window) => window.set_configuration(update, now),
            None => {
                debug!(display = %id, "edit for unknown window dropped");
                Ok(false)
            }
        }
    }

    /// Snapshot of the live window set at call time. Not a live view.
    pub fn get_all(&self) -> Vec<OverlaySnapshot> {
        self.windows
            .iter()
            .map(|window| OverlaySnapshot {
                display_id: window.display_id().clone(),
                configuration: window.configuration().clone(),
            })
            .collect()
    }

    /// True if at least one live overlay is visible. Drives the tray icon
    /// state; the manager only exposes the predicate.
    pub fn is_visible(&self) -> bool {
        self.windows
            .iter()
            .any(|window| window.configuration().visibility)
    }

    /// Deliver due debounced render pushes for all windows.
    pub fn pump(&mut self, now: Instant) {
        for window in &mut self.windows {
            window.pump(now);
        }
    }

    fn handle_content_ready(&mut self, id: &DisplayId) {
        let persisted = {
            let settings = self.load_settings();
            settings.overlay_configurations.get(id).cloned()
        };
        let now = Instant::now();
        match self.windows.iter_mut().find(|w| w.display_id() == id) {
            Some(window) => window.handle_content_ready(persisted, now),
            // A surface of the previous generation reporting late; its
            // window is already gone.
            None => debug!(display = %id, "content-ready for unknown window"),
        }
    }

    fn handle_window_closed(&mut self, id: &DisplayId) {
        debug!(display = %id, remaining = self.pending_close, "window closed");
        if self.pending_close == 0 {
            warn!(display = %id, "unexpected close event");
            return;
        }
        self.pending_close -= 1;
        if self.pending_close == 0 && self.state == ManagerState::Resetting {
            self.finish_reset();
        }
    }

    fn finish_reset(&mut self) {
        if self.rebuild_after_close {
            // The global switch may have been turned off while closes were
            // in flight; a disabled app keeps zero overlay windows.
            if self.load_settings().is_enabled {
                self.create_all();
                self.retrieve_configurations();
            } else {
                debug!("overlays disabled, skipping rebuild");
            }
        }
        self.state = ManagerState::Ready;
        debug!(windows = self.windows.len(), "reset complete");

        if let Some(rebuild) = self.pending_removal.take() {
            self.remove_all(rebuild);
        }
    }

    fn load_settings(&self) -> Settings {
        match self.store.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(error = %err, "settings load failed, using in-memory defaults");
                Settings::default()
            }
        }
    }
}
