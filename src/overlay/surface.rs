// Rendering-surface seam.
//
// An overlay window never talks to the OS directly; it drives a surface
// handle created by an injected factory. Surfaces are asynchronous on the
// far side: configuration pushes are fire-and-forget and close completion
// comes back as an event, never as a return value.

use crate::display::{Bounds, DisplayDescriptor, DisplayId};
use crate::overlay::configuration::{Color, OverlayConfiguration};
use crate::overlay::OverlayEvent;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("malformed bounds for display {id}: {width}x{height}")]
    MalformedBounds {
        id: DisplayId,
        width: i32,
        height: i32,
    },
    #[error("surface creation failed for display {id}: {reason}")]
    SurfaceCreation { id: DisplayId, reason: String },
}

/// Canonical full-object render message (the `update-overlay` shape).
/// The consumer applies alpha and color to its background fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderUpdate {
    pub alpha: f32,
    pub color: Color,
    pub visibility: bool,
}

impl From<&OverlayConfiguration> for RenderUpdate {
    fn from(configuration: &OverlayConfiguration) -> Self {
        Self {
            alpha: configuration.alpha,
            color: configuration.color,
            visibility: configuration.visibility,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Screen-saver layer when set; inspection mode drops it so the overlay
    /// can be examined without locking the user out of the screen.
    pub always_on_top: bool,
}

/// Platform window handle owned by one overlay window.
pub trait OverlaySurface {
    /// Move/resize the surface. Synchronous within the event-loop turn.
    fn set_frame(&mut self, frame: Bounds);

    /// One-way render push; no reply expected, delivery of intermediate
    /// values is not guaranteed.
    fn push_update(&mut self, update: &RenderUpdate);

    /// Make the surface visible. Called once persisted configuration has
    /// been applied, so the default state never flashes.
    fn show(&mut self);

    /// Begin asynchronous teardown; completion arrives as
    /// `OverlayEvent::Closed` on the event channel.
    fn close(&mut self);
}

/// Injected platform capability for creating overlay surfaces.
pub trait SurfaceFactory {
    /// Create a hidden surface covering `display`. The surface reports
    /// `ContentReady` on the channel once it can accept render pushes, and
    /// `Closed` after `close()` finishes.
    fn create(
        &mut self,
        display: &DisplayDescriptor,
        options: SurfaceOptions,
        events: Sender<OverlayEvent>,
    ) -> Result<Box<dyn OverlaySurface>, OverlayError>;
}
