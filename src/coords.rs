//! Scroll position ↔ thumbnail position mapping.
//!
//! Pure functions, no state. The thumbnail is the document scaled by `scale`
//! and shifted down by `top_offset` pixels; the slider marks the visible
//! window inside it.

/// Largest scroll position a scroller can reach. Zero when nothing overflows.
pub fn max_scroll(scroll_height: f64, client_height: f64) -> f64 {
    (scroll_height - client_height).max(0.0)
}

/// Slider top edge (thumbnail pixels) for a given scroll position.
pub fn slider_offset(scroll_top: f64, scale: f64, top_offset: f64) -> f64 {
    scroll_top * scale + top_offset
}

/// Scroll position for a slider dragged to `drag_y` (thumbnail pixels).
///
/// The offset is clamped in thumbnail space to `[0, max_scroll * scale]`
/// first, so the slider never leaves the thumbnail track, and only then
/// divided back into document space.
pub fn scroll_top_from_drag(drag_y: f64, scale: f64, top_offset: f64, max_scroll: f64) -> f64 {
    if scale <= 0.0 {
        return 0.0;
    }
    let max_offset = max_scroll.max(0.0) * scale;
    let offset = (drag_y - top_offset).clamp(0.0, max_offset);
    offset / scale
}

/// Slider height for a viewport of `visible_height` pixels.
pub fn slider_height(visible_height: f64, scale: f64) -> f64 {
    visible_height * scale
}
