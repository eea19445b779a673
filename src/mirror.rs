//! Render mirror: turn a surface copy into a standalone thumbnail document.
//!
//! Output layout:
//!   `<head>`  : cloned stylesheets + a synthesized `:root` block holding the
//!               resolved custom properties (no live style nodes are shared)
//!   `<body>`  : background variable overridden with the configured alpha,
//!               theme class, then the pruned surface content
//!
//! The frame document is replaced wholesale on every refresh.

use std::fmt::Write as _;

use log::trace;

use crate::color::to_rgba;
use crate::host::{Mode, Region, Surface};
use crate::markup::{Element, Node, escape_into};

/// Class of the edit region (source editor).
pub const EDIT_REGION_CLASS: &str = "markdown-source-view";
/// Class of the preview region; also its scroller.
pub const PREVIEW_REGION_CLASS: &str = "markdown-preview-view";
/// The editor body inside the edit region. Siblings are injected chrome.
pub const EDITOR_BODY_CLASS: &str = "cm-editor";
pub const SIZER_CLASSES: &[&str] = &["markdown-preview-sizer", "cm-sizer"];
/// Nodes the engine itself mounts; never mirrored.
pub const ARTIFACT_CLASSES: &[&str] = &["minimap-container", "minimap-frame", "minimap-slider"];

/// Background custom property overridden with the thumbnail opacity.
pub const BACKGROUND_VAR: &str = "--color-base-00";

/// Inline sizer style that coaxes a virtualized view into laying out
/// everything at once.
pub const FORCE_RENDER_STYLE: &str = "transform-origin: top right; scale: .1;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeClass {
    Dark,
    Light,
}

impl ThemeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeClass::Dark => "theme-dark",
            ThemeClass::Light => "theme-light",
        }
    }
}

/// Read-only copy of the host's styling at refresh time.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSnapshot {
    pub class: ThemeClass,
    /// Computed custom properties (`--name`, value) of the visual root.
    pub properties: Vec<(String, String)>,
    /// Outer HTML of every active `<style>` / stylesheet `<link>`.
    pub stylesheets: Vec<String>,
}

impl ThemeSnapshot {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
    }
}

/// Reading mode is active iff the edit region has no rendered height.
pub fn detect_mode(edit_region_height: f64) -> Mode {
    if edit_region_height == 0.0 {
        Mode::Reading
    } else {
        Mode::Editing
    }
}

pub fn surface_mode(surface: &dyn Surface) -> Mode {
    detect_mode(surface.edit_region_height())
}

/// Only views with both an edit and a preview region are tracked.
pub fn is_trackable(surface: &dyn Surface) -> bool {
    surface.has_region(Region::Edit) && surface.has_region(Region::Preview)
}

/// Strip a cloned surface down to what the thumbnail should show.
///
/// - previous overlay nodes (a clone of a mirrored surface would otherwise
///   nest thumbnails inside thumbnails)
/// - inline sizer styles left over from a forced render
/// - edit-region children other than the editor body
pub fn prune_content(root: &mut Element) {
    let artifacts = root.remove_descendants(&|e| e.has_any_class(ARTIFACT_CLASSES));
    root.for_each_descendant_mut(&mut |e| {
        if e.has_any_class(SIZER_CLASSES) {
            e.remove_attr("style");
        }
        if e.has_class(EDIT_REGION_CLASS) {
            e.children.retain(|n| match n {
                Node::Element(c) => c.has_class(EDITOR_BODY_CLASS),
                Node::Text(_) => true,
            });
        }
    });
    trace!("mirror: pruned {artifacts} overlay subtree(s)");
}

/// Serialize pruned content into a standalone thumbnail document.
pub fn render(content: &Element, mode: Mode, theme: &ThemeSnapshot, opacity: f64) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>");
    for sheet in &theme.stylesheets {
        html.push_str(sheet);
        html.push('\n');
    }
    html.push_str("<style>:root {\n");
    for (name, value) in &theme.properties {
        if name.starts_with("--") {
            let _ = writeln!(html, "  {name}: {};", value.trim());
        }
    }
    // No scrollbar inside the thumbnail.
    html.push_str("}::-webkit-scrollbar {display: none;}</style></head>\n<body");

    if let Some(base) = theme.property(BACKGROUND_VAR) {
        let _ = write!(html, " style=\"{BACKGROUND_VAR}: ");
        escape_into(&mut html, &to_rgba(base, opacity), true);
        html.push_str(";\"");
    }

    let mut classes = vec![theme.class.as_str()];
    if mode == Mode::Editing {
        // Editor content still needs the preview typography rules.
        classes.push(PREVIEW_REGION_CLASS);
    }
    classes.push("show-inline-title");
    let _ = write!(html, " class=\"{}\">", classes.join(" "));

    html.push_str(&content.inner_html());
    html.push_str("</body>\n</html>\n");
    html
}

/// Clone, prune and render a surface in one go.
pub fn render_surface(
    source: &dyn Surface,
    mode: Mode,
    theme: &ThemeSnapshot,
    opacity: f64,
) -> String {
    let mut content = source.clone_content();
    prune_content(&mut content);
    render(&content, mode, theme, opacity)
}
