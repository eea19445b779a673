//! Per-document sync instance: one thumbnail frame and slider bound to one
//! document view.
//!
//! Lifecycle:
//!   Uninitialized → Active → (ModeTransition → Active)* → Destroyed
//!
//! The instance never holds a surface reference. Every operation looks the
//! surface up through the host and returns early when it, the overlay or the
//! active scroller is missing, so work resumed after a timed yield cannot
//! touch nodes that were removed in the meantime.
//!
//! Timed yields are returned as [`Wait`]s for the engine to schedule; the
//! engine calls [`SyncInstance::settle`] / [`SyncInstance::capture`] when
//! they come due.

use log::{debug, info, trace};

use crate::coords::{max_scroll, scroll_top_from_drag, slider_height, slider_offset};
use crate::host::{DocId, FrameStyle, Host, Listener, Mode, SliderStyle};
use crate::mirror::{self, FORCE_RENDER_STYLE};
use crate::settings::Settings;

/// Layout settle time between a resize signal and measuring.
pub const SETTLE_DELAY_MS: u64 = 300;
/// Yield between forcing a full render of the live surface and cloning it.
pub const CAPTURE_YIELD_MS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Active,
    ModeTransition,
    Destroyed,
}

/// A timed yield requested by an instance operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Measure slider and frame heights once layout has settled.
    Settle,
    /// Clone the live surface once the forced render had time to run.
    Capture,
}

impl Wait {
    pub fn delay_ms(self) -> u64 {
        match self {
            Wait::Settle => SETTLE_DELAY_MS,
            Wait::Capture => CAPTURE_YIELD_MS,
        }
    }
}

#[derive(Debug)]
pub struct SyncInstance {
    doc: DocId,
    shadow: Option<DocId>,
    phase: Phase,
    mode: Mode,
    /// Mode whose scroller currently carries our scroll listener.
    scroll_bound: Option<Mode>,
    scale: f64,
    minimap_opacity: f64,
    top_offset: f64,
    frame: FrameStyle,
    slider: SliderStyle,
    /// Pointer offset from the slider's top edge while dragging.
    drag_offset: Option<f64>,
    settle_pending: bool,
    /// Sizer currently carrying the forced-render style.
    forced_sizer: Option<Mode>,
}

impl SyncInstance {
    /// Mount the overlay on `doc`, bind listeners and run the first render.
    ///
    /// Returns `None` for views lacking either structural region.
    pub fn create(
        host: &mut dyn Host,
        doc: DocId,
        settings: &Settings,
        shadow: Option<DocId>,
    ) -> Option<(Self, Vec<Wait>)> {
        let surface = host.surface_mut(doc)?;
        if !mirror::is_trackable(&*surface) {
            debug!("instance: {doc} lacks edit/preview regions, not tracking");
            return None;
        }
        let mode = mirror::surface_mode(&*surface);
        surface.mount_overlay();

        let mut inst = Self {
            doc,
            shadow,
            phase: Phase::Uninitialized,
            mode,
            scroll_bound: None,
            scale: settings.scale,
            minimap_opacity: settings.minimap_opacity,
            top_offset: f64::from(settings.top_offset),
            frame: FrameStyle::default(),
            slider: SliderStyle::default(),
            drag_offset: None,
            settle_pending: false,
            forced_sizer: None,
        };
        inst.bind_scroll(host);
        host.bind(doc, Listener::DragStart);
        inst.phase = Phase::Active;
        let waits = inst.update_settings(host, settings);
        info!("instance: created for {doc} ({mode:?})");
        Some((inst, waits))
    }

    pub fn doc(&self) -> DocId {
        self.doc
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn shadow(&self) -> Option<DocId> {
        self.shadow
    }

    pub fn set_shadow(&mut self, shadow: Option<DocId>) {
        self.shadow = shadow;
    }

    pub fn frame(&self) -> &FrameStyle {
        &self.frame
    }

    pub fn slider(&self) -> &SliderStyle {
        &self.slider
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_offset.is_some()
    }

    /// Re-apply scale, opacity and offset, then recompute everything that
    /// depends on them: heights, thumbnail content and slider position.
    pub fn update_settings(&mut self, host: &mut dyn Host, settings: &Settings) -> Vec<Wait> {
        self.scale = settings.scale;
        self.minimap_opacity = settings.minimap_opacity;
        self.top_offset = f64::from(settings.top_offset);
        self.frame.scale = self.scale;
        self.frame.top_px = self.top_offset;
        self.slider.scale = self.scale;
        self.slider.opacity = settings.slider_opacity;

        if self.phase != Phase::Active {
            return Vec::new();
        }
        self.push_styles(host);
        let mut waits: Vec<Wait> = self.on_resize().into_iter().collect();
        waits.extend(self.refresh_content(host));
        self.update_slider(host);
        waits
    }

    /// Request a re-measure after layout settles. At most one is in flight.
    pub fn on_resize(&mut self) -> Option<Wait> {
        if self.phase != Phase::Active || self.settle_pending {
            return None;
        }
        self.settle_pending = true;
        Some(Wait::Settle)
    }

    /// Measure slider height (`visible * scale`) and the frame height (full
    /// sizer height, unscaled; the frame shrinks through CSS).
    pub fn settle(&mut self, host: &mut dyn Host) {
        self.settle_pending = false;
        if self.phase != Phase::Active {
            return;
        }
        let Some(surface) = host.surface(self.doc) else {
            debug!("instance: {} gone before settle", self.doc);
            return;
        };
        if !surface.has_overlay() {
            return;
        }
        let Some(metrics) = surface.scroll_metrics(self.mode) else {
            debug!("instance: {} has no {:?} scroller yet", self.doc, self.mode);
            return;
        };
        self.slider.height_px = Some(slider_height(metrics.visible_height, self.scale));
        if let Some(h) = surface.sizer_height(self.mode) {
            self.frame.height_px = Some(h);
        }
        self.bind_scroll_if_missing(host);
        self.update_slider(host);
    }

    /// Replace the thumbnail content.
    ///
    /// Clones the shadow view when one is available. Otherwise the live
    /// sizer is forced into a full render and the clone is taken by
    /// [`SyncInstance::capture`] after a short yield.
    pub fn refresh_content(&mut self, host: &mut dyn Host) -> Option<Wait> {
        if self.phase != Phase::Active {
            return None;
        }
        let live_mode = mirror::surface_mode(host.surface(self.doc)?);
        self.bind_scroll_if_missing(host);

        if let Some(shadow) = self.shadow
            && let Some(source) = host.surface(shadow)
        {
            let theme = host.theme();
            let html = mirror::render_surface(source, live_mode, &theme, self.minimap_opacity);
            trace!("instance: {} rendered from shadow {shadow}", self.doc);
            self.load_frame(host, html);
            return None;
        }

        if self.forced_sizer.is_some() {
            // A capture is already on its way and will read fresh content.
            return None;
        }
        let surface = host.surface_mut(self.doc)?;
        surface.set_sizer_style(self.mode, Some(FORCE_RENDER_STYLE));
        surface.reflow();
        self.forced_sizer = Some(self.mode);
        Some(Wait::Capture)
    }

    /// Second half of the forced-render fallback.
    pub fn capture(&mut self, host: &mut dyn Host) {
        let Some(forced) = self.forced_sizer.take() else {
            return;
        };
        if self.phase != Phase::Active {
            return;
        }
        let Some(surface) = host.surface_mut(self.doc) else {
            debug!("instance: {} gone before capture", self.doc);
            return;
        };
        let mut content = surface.clone_content();
        surface.set_sizer_style(forced, None);
        let live_mode = mirror::surface_mode(&*surface);

        mirror::prune_content(&mut content);
        let theme = host.theme();
        let html = mirror::render(&content, live_mode, &theme, self.minimap_opacity);
        self.load_frame(host, html);
    }

    /// Swap the scroll listener to the scroller of the now-visible mode and
    /// recompute geometry and content.
    pub fn mode_change(&mut self, host: &mut dyn Host) -> Vec<Wait> {
        if self.phase != Phase::Active {
            return Vec::new();
        }
        let Some(new_mode) = host.surface(self.doc).map(mirror::surface_mode) else {
            return Vec::new();
        };
        self.phase = Phase::ModeTransition;
        self.unbind_scroll(host);
        let old_mode = std::mem::replace(&mut self.mode, new_mode);
        self.bind_scroll(host);
        self.phase = Phase::Active;
        debug!("instance: {} mode {old_mode:?} → {new_mode:?}", self.doc);

        let mut waits: Vec<Wait> = self.on_resize().into_iter().collect();
        waits.extend(self.refresh_content(host));
        self.update_slider(host);
        waits
    }

    /// Move the slider to match the active scroller.
    pub fn update_slider(&mut self, host: &mut dyn Host) {
        let Some(metrics) = host
            .surface(self.doc)
            .and_then(|s| s.scroll_metrics(self.mode))
        else {
            return;
        };
        self.slider.top_px = slider_offset(metrics.scroll_top, self.scale, self.top_offset);
        trace!(
            "instance: {} slider top={:.1} (scroll_top={:.1})",
            self.doc, self.slider.top_px, metrics.scroll_top
        );
        self.push_styles(host);
    }

    /// Pointer down on the slider at `pointer_y`.
    pub fn drag_start(&mut self, host: &mut dyn Host, pointer_y: f64) {
        if self.phase != Phase::Active {
            return;
        }
        let Some(surface) = host.surface(self.doc) else {
            return;
        };
        let slider_top = surface.origin_top() + self.slider.top_px;
        self.drag_offset = Some(pointer_y - slider_top);
        // Track the whole window so the drag continues outside the thumbnail.
        host.bind(self.doc, Listener::PointerMove);
        host.bind(self.doc, Listener::PointerUp);
        self.slider.dragging = true;
        self.push_styles(host);
    }

    /// Pointer moved to `pointer_y` during a drag: scroll the document.
    pub fn drag_move(&mut self, host: &mut dyn Host, pointer_y: f64) {
        let Some(drag_offset) = self.drag_offset else {
            return;
        };
        if self.phase != Phase::Active {
            return;
        }
        let Some(surface) = host.surface_mut(self.doc) else {
            return;
        };
        let Some(metrics) = surface.scroll_metrics(self.mode) else {
            return;
        };
        let drag_y = pointer_y - surface.origin_top() - drag_offset;
        let limit = max_scroll(metrics.scroll_height, metrics.client_height);
        let target = scroll_top_from_drag(drag_y, self.scale, self.top_offset, limit);
        surface.set_scroll_top(self.mode, target);
        self.update_slider(host);
    }

    pub fn drag_end(&mut self, host: &mut dyn Host) {
        self.drag_offset = None;
        host.unbind(self.doc, Listener::PointerMove);
        host.unbind(self.doc, Listener::PointerUp);
        self.slider.dragging = false;
        self.push_styles(host);
    }

    /// Unbind every listener, undo a pending forced render and remove the
    /// overlay. Safe to call twice and in the middle of a drag.
    pub fn destroy(&mut self, host: &mut dyn Host) {
        if self.phase == Phase::Destroyed {
            return;
        }
        self.unbind_scroll(host);
        host.unbind(self.doc, Listener::DragStart);
        host.unbind(self.doc, Listener::PointerMove);
        host.unbind(self.doc, Listener::PointerUp);
        self.drag_offset = None;
        self.settle_pending = false;

        let forced = self.forced_sizer.take();
        if let Some(surface) = host.surface_mut(self.doc) {
            if let Some(mode) = forced {
                surface.set_sizer_style(mode, None);
            }
            surface.unmount_overlay();
        }
        self.phase = Phase::Destroyed;
        info!("instance: destroyed {}", self.doc);
    }

    fn bind_scroll(&mut self, host: &mut dyn Host) {
        let has_scroller = host
            .surface(self.doc)
            .and_then(|s| s.scroll_metrics(self.mode))
            .is_some();
        if has_scroller {
            host.bind(self.doc, Listener::Scroll(self.mode));
            self.scroll_bound = Some(self.mode);
        }
    }

    /// The scroller may not have been laid out when the instance was
    /// created; pick it up on a later pass.
    fn bind_scroll_if_missing(&mut self, host: &mut dyn Host) {
        if self.scroll_bound.is_none() {
            self.bind_scroll(host);
            if self.scroll_bound.is_some() {
                debug!("instance: {} scroller appeared, listening", self.doc);
            }
        }
    }

    fn unbind_scroll(&mut self, host: &mut dyn Host) {
        if let Some(mode) = self.scroll_bound.take() {
            host.unbind(self.doc, Listener::Scroll(mode));
        }
    }

    fn push_styles(&self, host: &mut dyn Host) {
        if let Some(surface) = host.surface_mut(self.doc)
            && surface.has_overlay()
        {
            surface.style_frame(&self.frame);
            surface.style_slider(&self.slider);
        }
    }

    fn load_frame(&self, host: &mut dyn Host, html: String) {
        if let Some(surface) = host.surface_mut(self.doc)
            && surface.has_overlay()
        {
            surface.load_frame(html);
        }
    }
}
