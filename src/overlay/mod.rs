// Overlay lifecycle core: configuration values, per-window debounce, the
// surface seam towards the platform, and the manager that keeps the live
// window set consistent with display topology and persisted settings.

pub mod configuration;
pub mod debounce;
pub mod manager;
pub mod surface;
pub mod window;

pub use configuration::{Color, ConfigurationError, ConfigurationUpdate, OverlayConfiguration};
pub use manager::{ManagerState, OverlayManager, OverlaySnapshot};
pub use surface::{OverlayError, OverlaySurface, RenderUpdate, SurfaceFactory, SurfaceOptions};
pub use window::OverlayWindow;

use crate::display::{DisplayId, HotplugEvent};

/// Events flowing through the single-threaded app loop. Surfaces report
/// readiness and close completion; windows report configuration edits (the
/// tray icon derives its state from those); the platform reports hotplug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    /// The surface can accept render pushes; persisted configuration is
    /// restored before the window is shown.
    ContentReady(DisplayId),
    /// Asynchronous close finished for this window's surface.
    Closed(DisplayId),
    /// An overlay's configuration changed; observers re-derive state
    /// (tray icon) instead of polling.
    ConfigurationChanged(DisplayId),
    /// Display topology changed; triggers a full overlay rebuild.
    Hotplug(HotplugEvent),
}
