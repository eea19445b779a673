//! In-memory host used by the integration tests.
//!
//! Surfaces behave like a virtualized viewer: unless a sizer carries an
//! inline style (the forced-render trick), a clone only contains the first
//! line of the document.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};

use notemap::engine::Engine;
use notemap::host::{
    DocId, FrameStyle, Host, Listener, Mode, Region, ScrollMetrics, SliderStyle, Surface,
    ViewState,
};
use notemap::markup::Element;
use notemap::mirror::{ThemeClass, ThemeSnapshot};

pub const VIEWPORT: f64 = 1000.0;
pub const CONTENT_HEIGHT: f64 = 5000.0;

#[derive(Debug, Clone, Default)]
pub struct Overlay {
    pub frame: FrameStyle,
    pub slider: SliderStyle,
    pub document: Option<String>,
    pub loads: usize,
}

#[derive(Debug, Clone)]
pub struct FakeSurface {
    pub edit_region: bool,
    pub preview_region: bool,
    pub edit_height: f64,
    pub editor: Option<ScrollMetrics>,
    pub preview: Option<ScrollMetrics>,
    pub sizer_height: f64,
    pub origin_top: f64,
    pub sizer_styles: HashMap<Mode, String>,
    pub reflows: usize,
    pub body: String,
    pub overlay: Option<Overlay>,
    pub overlay_mounts: usize,
}

fn metrics() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 0.0,
        scroll_height: CONTENT_HEIGHT,
        client_height: VIEWPORT,
        visible_height: VIEWPORT,
    }
}

impl FakeSurface {
    pub fn new(body: &str) -> Self {
        Self {
            edit_region: true,
            preview_region: true,
            edit_height: VIEWPORT,
            editor: Some(metrics()),
            preview: Some(metrics()),
            sizer_height: CONTENT_HEIGHT,
            origin_top: 40.0,
            sizer_styles: HashMap::new(),
            reflows: 0,
            body: body.to_string(),
            overlay: None,
            overlay_mounts: 0,
        }
    }

    fn rendered_body(&self, mode: Mode) -> String {
        if self.sizer_styles.contains_key(&mode) {
            self.body.clone()
        } else {
            self.body.lines().next().unwrap_or_default().to_string()
        }
    }

    fn sizer(&self, class: &str, mode: Mode) -> Element {
        let mut sizer = Element::new("div")
            .with_class(class)
            .with_text(self.rendered_body(mode));
        if let Some(style) = self.sizer_styles.get(&mode) {
            sizer.set_attr("style", style.clone());
        }
        sizer
    }

    pub fn metrics_mut(&mut self, mode: Mode) -> &mut ScrollMetrics {
        match mode {
            Mode::Editing => self.editor.as_mut().unwrap(),
            Mode::Reading => self.preview.as_mut().unwrap(),
        }
    }

    pub fn frame_document(&self) -> &str {
        self.overlay
            .as_ref()
            .and_then(|o| o.document.as_deref())
            .unwrap_or_default()
    }
}

impl Surface for FakeSurface {
    fn has_region(&self, region: Region) -> bool {
        match region {
            Region::Edit => self.edit_region,
            Region::Preview => self.preview_region,
        }
    }

    fn edit_region_height(&self) -> f64 {
        self.edit_height
    }

    fn scroll_metrics(&self, mode: Mode) -> Option<ScrollMetrics> {
        match mode {
            Mode::Editing => self.editor,
            Mode::Reading => self.preview,
        }
    }

    fn set_scroll_top(&mut self, mode: Mode, scroll_top: f64) {
        let m = match mode {
            Mode::Editing => self.editor.as_mut(),
            Mode::Reading => self.preview.as_mut(),
        };
        if let Some(m) = m {
            m.scroll_top = scroll_top;
        }
    }

    fn sizer_height(&self, _mode: Mode) -> Option<f64> {
        Some(self.sizer_height)
    }

    fn origin_top(&self) -> f64 {
        self.origin_top
    }

    fn set_sizer_style(&mut self, mode: Mode, style: Option<&str>) {
        match style {
            Some(s) => {
                self.sizer_styles.insert(mode, s.to_string());
            }
            None => {
                self.sizer_styles.remove(&mode);
            }
        }
    }

    fn reflow(&mut self) {
        self.reflows += 1;
    }

    fn clone_content(&self) -> Element {
        let mut root = Element::new("div").with_class("view-content");
        if self.overlay.is_some() {
            root = root.with_child(
                Element::new("div")
                    .with_class("minimap-container")
                    .with_child(Element::new("iframe").with_class("minimap-frame"))
                    .with_child(Element::new("div").with_class("minimap-slider")),
            );
        }
        if self.edit_region {
            root = root.with_child(
                Element::new("div")
                    .with_class("markdown-source-view")
                    .with_child(Element::new("div").with_class("toolbar-plugin"))
                    .with_child(
                        Element::new("div")
                            .with_class("cm-editor")
                            .with_child(self.sizer("cm-sizer", Mode::Editing)),
                    ),
            );
        }
        if self.preview_region {
            root = root.with_child(
                Element::new("div")
                    .with_class("markdown-preview-view")
                    .with_child(self.sizer("markdown-preview-sizer", Mode::Reading)),
            );
        }
        root
    }

    fn mount_overlay(&mut self) {
        self.overlay = Some(Overlay::default());
        self.overlay_mounts += 1;
    }

    fn unmount_overlay(&mut self) {
        self.overlay = None;
    }

    fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    fn style_frame(&mut self, style: &FrameStyle) {
        if let Some(o) = self.overlay.as_mut() {
            o.frame = *style;
        }
    }

    fn style_slider(&mut self, style: &SliderStyle) {
        if let Some(o) = self.overlay.as_mut() {
            o.slider = *style;
        }
    }

    fn load_frame(&mut self, document: String) {
        if let Some(o) = self.overlay.as_mut() {
            o.document = Some(document);
            o.loads += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeDoc {
    pub surface: FakeSurface,
    pub state: ViewState,
    pub data: String,
}

pub struct FakeHost {
    pub docs: BTreeMap<DocId, FakeDoc>,
    pub active: Option<DocId>,
    pub next_id: u64,
    pub theme: ThemeSnapshot,
    pub bound: HashSet<(DocId, Listener)>,
    /// Backing files: path → content.
    pub files: HashMap<String, String>,
    pub side_slots: Vec<DocId>,
    pub detached: Vec<DocId>,
    pub cleared: Vec<DocId>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeHost {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            docs: BTreeMap::new(),
            active: None,
            next_id: 1,
            theme: ThemeSnapshot {
                class: ThemeClass::Dark,
                properties: vec![
                    ("--color-base-00".into(), "#ffffff".into()),
                    ("--text-normal".into(), "#222".into()),
                ],
                stylesheets: vec!["<style>.cm-line{color:var(--text-normal)}</style>".into()],
            },
            bound: HashSet::new(),
            files: HashMap::new(),
            side_slots: Vec::new(),
            detached: Vec::new(),
            cleared: Vec::new(),
        }
    }

    /// Open a document backed by `file` and make it active.
    pub fn open(&mut self, file: &str, content: &str) -> DocId {
        self.files.insert(file.to_string(), content.to_string());
        let id = self.insert(FakeDoc {
            surface: FakeSurface::new(content),
            state: ViewState {
                file: Some(file.to_string()),
                mode: Mode::Editing,
            },
            data: content.to_string(),
        });
        self.active = Some(id);
        id
    }

    /// Open an unsaved document with no backing file.
    pub fn open_untitled(&mut self, content: &str) -> DocId {
        self.insert(FakeDoc {
            surface: FakeSurface::new(content),
            state: ViewState {
                file: None,
                mode: Mode::Editing,
            },
            data: content.to_string(),
        })
    }

    fn insert(&mut self, doc: FakeDoc) -> DocId {
        let id = DocId(self.next_id);
        self.next_id += 1;
        self.docs.insert(id, doc);
        id
    }

    pub fn close(&mut self, doc: DocId) {
        self.docs.remove(&doc);
        if self.active == Some(doc) {
            self.active = None;
        }
    }

    pub fn doc(&self, id: DocId) -> &FakeDoc {
        &self.docs[&id]
    }

    pub fn doc_mut(&mut self, id: DocId) -> &mut FakeDoc {
        self.docs.get_mut(&id).unwrap()
    }

    pub fn fake(&self, id: DocId) -> &FakeSurface {
        &self.doc(id).surface
    }

    pub fn fake_mut(&mut self, id: DocId) -> &mut FakeSurface {
        &mut self.doc_mut(id).surface
    }

    pub fn is_bound(&self, doc: DocId, listener: Listener) -> bool {
        self.bound.contains(&(doc, listener))
    }

    pub fn bound_for(&self, doc: DocId) -> Vec<Listener> {
        self.bound
            .iter()
            .filter(|(d, _)| *d == doc)
            .map(|(_, l)| *l)
            .collect()
    }

    /// Hide the edit region, as the host does when switching to reading.
    pub fn switch_to_reading(&mut self, doc: DocId) {
        self.fake_mut(doc).edit_height = 0.0;
        self.doc_mut(doc).state.mode = Mode::Reading;
    }

    pub fn switch_to_editing(&mut self, doc: DocId) {
        self.fake_mut(doc).edit_height = VIEWPORT;
        self.doc_mut(doc).state.mode = Mode::Editing;
    }
}

impl Host for FakeHost {
    fn open_documents(&self) -> Vec<DocId> {
        self.docs.keys().copied().collect()
    }

    fn active_document(&self) -> Option<DocId> {
        self.active
    }

    fn contains(&self, doc: DocId) -> bool {
        self.docs.contains_key(&doc)
    }

    fn surface(&self, doc: DocId) -> Option<&dyn Surface> {
        self.docs.get(&doc).map(|d| &d.surface as &dyn Surface)
    }

    fn surface_mut(&mut self, doc: DocId) -> Option<&mut dyn Surface> {
        self.docs
            .get_mut(&doc)
            .map(|d| &mut d.surface as &mut dyn Surface)
    }

    fn view_state(&self, doc: DocId) -> Option<ViewState> {
        self.docs.get(&doc).map(|d| d.state.clone())
    }

    fn set_view_state(&mut self, doc: DocId, state: ViewState) {
        let content = state.file.as_ref().and_then(|f| self.files.get(f)).cloned();
        if let Some(d) = self.docs.get_mut(&doc) {
            d.surface.edit_height = match state.mode {
                Mode::Editing => VIEWPORT,
                Mode::Reading => 0.0,
            };
            d.state = state;
            if let Some(content) = content {
                d.surface.body = content.clone();
                d.data = content;
            }
        }
    }

    fn view_data(&self, doc: DocId) -> Option<String> {
        self.docs.get(&doc).map(|d| d.data.clone())
    }

    fn clear_view(&mut self, doc: DocId) {
        if let Some(d) = self.docs.get_mut(&doc) {
            d.data.clear();
            d.surface.body.clear();
            self.cleared.push(doc);
        }
    }

    fn set_view_data(&mut self, doc: DocId, data: String) {
        if let Some(d) = self.docs.get_mut(&doc) {
            d.surface.body = data.clone();
            d.data = data;
        }
    }

    fn open_side_slot(&mut self) -> Option<DocId> {
        let id = self.insert(FakeDoc {
            surface: FakeSurface::new(""),
            state: ViewState {
                file: None,
                mode: Mode::Editing,
            },
            data: String::new(),
        });
        self.side_slots.push(id);
        Some(id)
    }

    fn detach(&mut self, doc: DocId) {
        self.docs.remove(&doc);
        self.bound.retain(|(d, _)| *d != doc);
        self.detached.push(doc);
    }

    fn theme(&self) -> ThemeSnapshot {
        self.theme.clone()
    }

    fn bind(&mut self, doc: DocId, listener: Listener) {
        self.bound.insert((doc, listener));
    }

    fn unbind(&mut self, doc: DocId, listener: Listener) {
        self.bound.remove(&(doc, listener));
    }
}

/// Tick the engine at every deadline up to and including `until_ms`.
pub fn run_until(engine: &mut Engine, host: &mut FakeHost, until_ms: u64) {
    while let Some(deadline) = engine.next_deadline() {
        if deadline > until_ms {
            break;
        }
        engine.tick(host, deadline);
    }
}
