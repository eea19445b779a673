//! Capabilities the engine needs from the host application.
//!
//! The host owns every document view and its rendered surface; the engine
//! only holds [`DocId`]s and looks surfaces up again on every operation, so
//! a document closing between two events never leaves a dangling reference.

use std::fmt;

use crate::markup::Element;
use crate::mirror::ThemeSnapshot;

/// Stable identity of one open document view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(pub u64);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Which sub-surface of a document view is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Editing,
    Reading,
}

/// The two structural regions every tracked document view has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Source editor; its scroller and sizer serve [`Mode::Editing`].
    Edit,
    /// Rendered preview; its scroller and sizer serve [`Mode::Reading`].
    Preview,
}

/// Scroll geometry of the scroller that is active for a mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
    /// Rendered (bounding box) height of the scroller.
    pub visible_height: f64,
}

/// Host-side view state copied from an original document into its shadow.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Persisted identity of the displayed content (e.g. backing file path).
    pub file: Option<String>,
    pub mode: Mode,
}

/// DOM listeners the engine binds on a document's behalf.
///
/// The host forwards the matching input events to the engine
/// (`on_scroll`, `on_pointer_down`, ...) only while a listener is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    /// Scroll events of the scroller for the given mode.
    Scroll(Mode),
    /// Pointer down on the slider.
    DragStart,
    /// Pointer move anywhere on the window.
    PointerMove,
    /// Pointer up anywhere on the window.
    PointerUp,
}

/// Presentation of the thumbnail frame node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStyle {
    /// `--scale` custom property; horizontal shrink is done by CSS.
    pub scale: f64,
    pub top_px: f64,
    /// Full unscaled content height, once measured.
    pub height_px: Option<f64>,
}

/// Presentation of the slider node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SliderStyle {
    pub scale: f64,
    pub opacity: f64,
    pub top_px: f64,
    /// Viewport height times scale, once measured.
    pub height_px: Option<f64>,
    pub dragging: bool,
}

/// One document view's rendered surface.
pub trait Surface {
    fn has_region(&self, region: Region) -> bool;

    /// Rendered height of the edit region; zero while reading.
    fn edit_region_height(&self) -> f64;

    /// Scroller for `mode`, or `None` if it is not laid out yet.
    fn scroll_metrics(&self, mode: Mode) -> Option<ScrollMetrics>;

    fn set_scroll_top(&mut self, mode: Mode, scroll_top: f64);

    /// Rendered height of the sizer (full content box) for `mode`.
    fn sizer_height(&self, mode: Mode) -> Option<f64>;

    /// Top edge of the surface in pointer coordinates.
    fn origin_top(&self) -> f64;

    /// Set or clear the inline style of the sizer for `mode`.
    fn set_sizer_style(&mut self, mode: Mode, style: Option<&str>);

    /// Force a synchronous layout pass.
    fn reflow(&mut self);

    /// Deep copy of the surface content, including any mounted overlay.
    fn clone_content(&self) -> Element;

    /// Create the overlay container with a frame and a slider, replacing
    /// any overlay nodes already present.
    fn mount_overlay(&mut self);

    /// Remove the overlay nodes. No-op when none are mounted.
    fn unmount_overlay(&mut self);

    fn has_overlay(&self) -> bool;

    fn style_frame(&mut self, style: &FrameStyle);

    fn style_slider(&mut self, style: &SliderStyle);

    /// Replace the frame's document wholesale.
    fn load_frame(&mut self, document: String);
}

/// The host workspace.
pub trait Host {
    /// Open document views of the tracked kind, shadows included.
    fn open_documents(&self) -> Vec<DocId>;

    fn active_document(&self) -> Option<DocId>;

    fn contains(&self, doc: DocId) -> bool;

    fn surface(&self, doc: DocId) -> Option<&dyn Surface>;

    fn surface_mut(&mut self, doc: DocId) -> Option<&mut dyn Surface>;

    fn view_state(&self, doc: DocId) -> Option<ViewState>;

    fn set_view_state(&mut self, doc: DocId, state: ViewState);

    /// Full content representation of a document.
    fn view_data(&self, doc: DocId) -> Option<String>;

    fn clear_view(&mut self, doc: DocId);

    fn set_view_data(&mut self, doc: DocId, data: String);

    /// Open an empty view in an off-screen slot.
    fn open_side_slot(&mut self) -> Option<DocId>;

    /// Close a view the engine opened.
    fn detach(&mut self, doc: DocId);

    /// Theme class, computed custom properties and stylesheets of the
    /// active visual root.
    fn theme(&self) -> ThemeSnapshot;

    fn bind(&mut self, doc: DocId, listener: Listener);

    /// No-op when the listener is not bound.
    fn unbind(&mut self, doc: DocId, listener: Listener);
}
