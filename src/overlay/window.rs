// One overlay window per connected display.
//
// The window is a plain record: a display assignment fixed at construction,
// the live configuration value, a surface handle from the injected factory
// and a debouncer for render pushes. Visibility is a geometry change (full
// display bounds vs. a 1x1 rectangle), never a destroy/recreate, so window
// identity survives toggling.

use crate::display::{Bounds, DisplayDescriptor, DisplayId};
use crate::overlay::configuration::{ConfigurationError, ConfigurationUpdate, OverlayConfiguration};
use crate::overlay::debounce::{Debouncer, RENDER_QUIET_WINDOW};
use crate::overlay::surface::{OverlayError, OverlaySurface, RenderUpdate, SurfaceFactory, SurfaceOptions};
use crate::overlay::OverlayEvent;
use std::sync::mpsc::Sender;
use std::time::Instant;
use tracing::debug;

pub struct OverlayWindow {
    display: DisplayDescriptor,
    configuration: OverlayConfiguration,
    surface: Box<dyn OverlaySurface>,
    debounce: Debouncer<RenderUpdate>,
    /// Inspection mode: quarter-size window, not forced on top, so the
    /// overlay can be examined without losing access to the screen.
    inspect: bool,
    content_ready: bool,
    events: Sender<OverlayEvent>,
}

impl OverlayWindow {
    /// Create a hidden overlay covering `display`. Fails fast on malformed
    /// bounds — that is an OS-integration bug, not a runtime condition.
    pub fn new(
        display: DisplayDescriptor,
        factory: &mut dyn SurfaceFactory,
        inspect: bool,
        events: Sender<OverlayEvent>,
    ) -> Result<Self, OverlayError> {
        if !display.bounds.is_well_formed() {
            return Err(OverlayError::MalformedBounds {
                id: display.id.clone(),
                width: display.bounds.width,
                height: display.bounds.height,
            });
        }

        let id = &display.id;
        debug!(display = %id, "creating overlay window");
        let surface = factory.create(
            &display,
            SurfaceOptions {
                always_on_top: !inspect,
            },
            events.clone(),
        )?;

        Ok(Self {
            display,
            configuration: OverlayConfiguration::default(),
            surface,
            debounce: Debouncer::new(RENDER_QUIET_WINDOW),
            inspect,
            content_ready: false,
            events,
        })
    }

    pub fn display_id(&self) -> &DisplayId {
        &self.display.id
    }

    pub fn configuration(&self) -> &OverlayConfiguration {
        &self.configuration
    }

    /// Merge a partial edit into the configuration and re-apply all facets.
    /// Idempotent: an update that changes nothing produces no frame change,
    /// no render push and no change notification. Returns whether anything
    /// changed.
    pub fn set_configuration(
        &mut self,
        update: &ConfigurationUpdate,
        now: Instant,
    ) -> Result<bool, ConfigurationError> {
        if update.is_empty() {
            return Ok(false);
        }
        let merged = self.configuration.merged(update)?;
        if merged == self.configuration {
            return Ok(false);
        }

        debug!(display = %self.display.id, ?update, "configuration changed");
        self.configuration = merged;

        // Geometry applies immediately; the render push is debounced so a
        // slider drag coalesces to one message carrying the final value.
        self.surface.set_frame(self.frame());
        self.debounce
            .request(RenderUpdate::from(&self.configuration), now);

        let _ = self
            .events
            .send(OverlayEvent::ConfigurationChanged(self.display.id.clone()));
        Ok(true)
    }

    /// Adopt a persisted snapshot wholesale (restore path, already validated
    /// on deserialization). Applies geometry and queues a render push.
    pub fn restore_configuration(&mut self, configuration: OverlayConfiguration, now: Instant) {
        if configuration == self.configuration {
            return;
        }
        debug!(display = %self.display.id, "restoring persisted configuration");
        self.configuration = configuration;
        self.surface.set_frame(self.frame());
        self.debounce
            .request(RenderUpdate::from(&self.configuration), now);
    }

    /// The surface can now accept render pushes. Persisted state is applied
    /// before `show()` so the default black/zero-alpha state never flashes.
    pub fn handle_content_ready(&mut self, persisted: Option<OverlayConfiguration>, _now: Instant) {
        debug!(display = %self.display.id, "content ready");
        self.content_ready = true;

        if let Some(configuration) = persisted {
            self.configuration = configuration;
        }

        // Direct push: restore must not wait out a debounce window, and any
        // queued update is superseded by the configuration pushed here.
        self.debounce.flush();
        self.surface
            .push_update(&RenderUpdate::from(&self.configuration));
        self.surface.set_frame(self.frame());
        self.surface.show();
    }

    /// Deliver a due debounced render push, if any.
    pub fn pump(&mut self, now: Instant) {
        if !self.content_ready {
            return;
        }
        if let Some(update) = self.debounce.take_due(now) {
            self.surface.push_update(&update);
        }
    }

    /// Begin asynchronous teardown. The pending render value is flushed
    /// first so the final edit is never dropped; completion arrives as
    /// `OverlayEvent::Closed`.
    pub fn close(&mut self) {
        debug!(display = %self.display.id, "closing overlay window");
        if let Some(update) = self.debounce.flush() {
            if self.content_ready {
                self.surface.push_update(&update);
            }
        }
        self.surface.close();
    }

    /// Window geometry for the current configuration. Visible overlays cover
    /// the display padded by one unit to avoid seams at fractional scaling
    /// boundaries; hidden overlays park at a 1x1 rectangle.
    fn frame(&self) -> Bounds {
        let bounds = self.display.bounds;
        if !self.configuration.visibility {
            return Bounds::new(0, 0, 1, 1);
        }
        if self.inspect {
            Bounds::new(bounds.x, bounds.y, bounds.width / 4, bounds.height / 4)
        } else {
            Bounds::new(bounds.x, bounds.y, bounds.width + 1, bounds.height + 1)
        }
    }
}
