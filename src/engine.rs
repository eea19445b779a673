//! Registry of sync instances and routing of host events.
//!
//! The registry (`DocId → SyncInstance`) is the single source of truth for
//! "is this document tracked". Every create/destroy goes through it so a
//! document never carries two instances, and every removal also unregisters
//! the document from both shared observers and cancels its pending tasks.
//!
//! Event sources and their coalescing:
//!   content changed  → 700ms trailing debounce → update active document
//!   layout changed   → stale instances/shadows closed at once,
//!                      shadow sync behind a 500ms trailing throttle
//!   size changed     → 1000ms trailing throttle (see `observe`)
//!   any update       → runs 100ms after the request so a freshly opened
//!                      shadow has time to load
//!
//! The host must call [`Engine::tick`] from its event loop;
//! [`Engine::next_deadline`] says when the next call is useful.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::host::{DocId, Host};
use crate::instance::{SyncInstance, Wait};
use crate::observe::{ModeObserver, ModeSignal, SizeObserver};
use crate::schedule::{Debounce, Throttle, TimerQueue};
use crate::settings::Settings;
use crate::shadow::{RELOAD_YIELD_MS, ShadowReload, ShadowViews};

pub const CONTENT_DEBOUNCE_MS: u64 = 700;
pub const LAYOUT_THROTTLE_MS: u64 = 500;
pub const UPDATE_DELAY_MS: u64 = 100;

#[derive(Debug)]
enum Task {
    /// Update one document, or the active one when `None`.
    Update(Option<DocId>),
    Settle(DocId),
    Capture(DocId),
    ShadowReload(ShadowReload),
}

impl Task {
    /// Tasks that touch an instance's nodes and die with it.
    fn belongs_to(&self, doc: DocId) -> bool {
        matches!(self, Task::Settle(d) | Task::Capture(d) if *d == doc)
    }
}

pub struct Engine {
    settings: Settings,
    instances: HashMap<DocId, SyncInstance>,
    /// Per-document toggle, seeded from `enabled_by_default` on first sight.
    enabled: HashMap<DocId, bool>,
    shadows: ShadowViews,
    size_observer: SizeObserver,
    mode_observer: ModeObserver,
    content_debounce: Debounce,
    layout_throttle: Throttle,
    tasks: TimerQueue<Task>,
    active: Option<DocId>,
    shut_down: bool,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            instances: HashMap::new(),
            enabled: HashMap::new(),
            shadows: ShadowViews::new(),
            size_observer: SizeObserver::new(),
            mode_observer: ModeObserver::new(),
            content_debounce: Debounce::new(CONTENT_DEBOUNCE_MS),
            layout_throttle: Throttle::new(LAYOUT_THROTTLE_MS),
            tasks: TimerQueue::new(),
            active: None,
            shut_down: false,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_tracked(&self, doc: DocId) -> bool {
        self.instances.contains_key(&doc)
    }

    pub fn instance(&self, doc: DocId) -> Option<&SyncInstance> {
        self.instances.get(&doc)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn shadows(&self) -> &ShadowViews {
        &self.shadows
    }

    pub fn size_observer(&self) -> &SizeObserver {
        &self.size_observer
    }

    pub fn mode_observer(&self) -> &ModeObserver {
        &self.mode_observer
    }

    pub fn active(&self) -> Option<DocId> {
        self.active
    }

    pub fn is_enabled(&self, doc: DocId) -> bool {
        self.enabled
            .get(&doc)
            .copied()
            .unwrap_or(self.settings.enabled_by_default)
    }

    /// Earliest time at which [`Engine::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.content_debounce.deadline(),
            self.layout_throttle.deadline(),
            self.size_observer.deadline(),
            self.tasks.next_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    // -----------------------------------------------------------------------
    // Host lifecycle notifications
    // -----------------------------------------------------------------------

    /// Host layout is ready: attach to every open document.
    pub fn start(&mut self, host: &mut dyn Host, now_ms: u64) {
        if self.shut_down {
            return;
        }
        self.active = host.active_document();
        let docs = host.open_documents();
        info!("engine: starting with {} open document(s)", docs.len());
        for doc in docs {
            if self.shadows.is_shadow(doc) {
                continue;
            }
            self.seed(doc);
            if self.settings.better_rendering {
                self.ensure_shadow(host, doc, now_ms);
            }
            self.request_update(Some(doc), now_ms);
        }
    }

    pub fn on_active_changed(&mut self, host: &mut dyn Host, new: Option<DocId>, now_ms: u64) {
        if self.shut_down {
            return;
        }
        if let Some(old) = self.active {
            self.request_update(Some(old), now_ms);
        }
        self.active = new;
        debug!("engine: active document is now {new:?}");
        let Some(doc) = new else {
            return;
        };
        if self.shadows.is_shadow(doc) {
            return;
        }
        self.seed(doc);
        if self.settings.better_rendering {
            self.ensure_shadow(host, doc, now_ms);
        }
        self.request_update(Some(doc), now_ms);
    }

    /// Editor content changed somewhere; refresh once typing pauses.
    pub fn on_content_changed(&mut self, now_ms: u64) {
        if self.shut_down {
            return;
        }
        self.content_debounce.trigger(now_ms);
    }

    /// Documents may have opened, closed or moved.
    ///
    /// The host's document list is the only authority on existence: any
    /// instance or shadow whose document is not listed is torn down here.
    pub fn on_layout_changed(&mut self, host: &mut dyn Host, now_ms: u64) {
        if self.shut_down {
            return;
        }
        let live = host.open_documents();
        if !self.shadows.is_empty() {
            self.shadows.reconcile(host, &live);
        }
        if self.settings.better_rendering {
            self.layout_throttle.trigger(now_ms);
        }
        let live: HashSet<DocId> = live.into_iter().collect();
        let closed: Vec<DocId> = self
            .instances
            .keys()
            .filter(|d| !live.contains(*d))
            .copied()
            .collect();
        for doc in closed {
            debug!("engine: {doc} closed");
            self.destroy_instance(host, doc);
        }
        self.enabled.retain(|d, _| live.contains(d));
        if self.active.is_some_and(|d| !live.contains(&d)) {
            self.active = None;
        }
    }

    /// Raw size-change notice for the given documents.
    pub fn on_resize(&mut self, docs: &[DocId], now_ms: u64) {
        self.size_observer.notify(docs, now_ms);
    }

    /// Attribute `attribute` changed on `doc`'s edit region.
    pub fn on_attribute_changed(
        &mut self,
        host: &mut dyn Host,
        doc: DocId,
        attribute: &str,
        now_ms: u64,
    ) {
        let Some(signal) = self.mode_observer.notify(doc, attribute) else {
            return;
        };
        if signal == ModeSignal::ModeChanged
            && let Some(inst) = self.instances.get_mut(&doc)
        {
            let waits = inst.mode_change(host);
            Self::schedule_waits(&mut self.tasks, doc, waits, now_ms);
        }
        self.request_update(None, now_ms);
    }

    // -----------------------------------------------------------------------
    // Input events (delivered only while the matching listener is bound)
    // -----------------------------------------------------------------------

    pub fn on_scroll(&mut self, host: &mut dyn Host, doc: DocId) {
        if let Some(inst) = self.instances.get_mut(&doc) {
            inst.update_slider(host);
        }
    }

    pub fn on_pointer_down(&mut self, host: &mut dyn Host, doc: DocId, pointer_y: f64) {
        if let Some(inst) = self.instances.get_mut(&doc) {
            inst.drag_start(host, pointer_y);
        }
    }

    pub fn on_pointer_move(&mut self, host: &mut dyn Host, doc: DocId, pointer_y: f64) {
        if let Some(inst) = self.instances.get_mut(&doc) {
            inst.drag_move(host, pointer_y);
        }
    }

    pub fn on_pointer_up(&mut self, host: &mut dyn Host, doc: DocId) {
        if let Some(inst) = self.instances.get_mut(&doc) {
            inst.drag_end(host);
        }
    }

    // -----------------------------------------------------------------------
    // User-facing controls
    // -----------------------------------------------------------------------

    /// Flip the per-document toggle. Returns the new state.
    pub fn toggle(&mut self, doc: DocId, now_ms: u64) -> bool {
        let enabled = !self.is_enabled(doc);
        self.set_enabled(doc, enabled, now_ms);
        enabled
    }

    /// Enable or disable the thumbnail of one document. The change takes
    /// effect with the next update of that document.
    pub fn set_enabled(&mut self, doc: DocId, enabled: bool, now_ms: u64) {
        if self.shut_down {
            return;
        }
        self.enabled.insert(doc, enabled);
        debug!("engine: {doc} enabled={enabled}");
        self.request_update(Some(doc), now_ms);
    }

    /// Apply new settings to every live instance in place.
    ///
    /// Turning better rendering off detaches every shadow; turning it on
    /// opens shadows for the open documents and refreshes them once loaded.
    pub fn update_settings(&mut self, host: &mut dyn Host, settings: Settings, now_ms: u64) {
        let was_better = self.settings.better_rendering;
        self.settings = settings;
        if was_better && !settings.better_rendering {
            info!(
                "engine: better rendering off, detaching {} shadow(s)",
                self.shadows.len()
            );
            self.shadows.teardown_all(host);
            self.tasks.cancel_where(|t| matches!(t, Task::ShadowReload(_)));
        }
        for (&doc, inst) in self.instances.iter_mut() {
            if !settings.better_rendering {
                inst.set_shadow(None);
            }
            let waits = inst.update_settings(host, &self.settings);
            Self::schedule_waits(&mut self.tasks, doc, waits, now_ms);
        }
        if !was_better && settings.better_rendering && !self.shut_down {
            for doc in host.open_documents() {
                if self.shadows.is_shadow(doc) || !self.instances.contains_key(&doc) {
                    continue;
                }
                self.ensure_shadow(host, doc, now_ms);
                self.request_update(Some(doc), now_ms);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    /// Run everything due at `now_ms`.
    pub fn tick(&mut self, host: &mut dyn Host, now_ms: u64) {
        if self.shut_down {
            return;
        }
        if self.content_debounce.poll(now_ms) {
            self.request_update(None, now_ms);
        }
        if self.layout_throttle.poll(now_ms) {
            self.sync_shadows(host, now_ms);
            self.request_update(None, now_ms);
        }
        for doc in self.size_observer.poll(now_ms) {
            if let Some(wait) = self.instances.get_mut(&doc).and_then(|i| i.on_resize()) {
                Self::schedule_waits(&mut self.tasks, doc, vec![wait], now_ms);
            }
        }
        for task in self.tasks.take_due(now_ms) {
            self.run_task(host, task, now_ms);
        }
    }

    /// Tear everything down. Later calls are no-ops.
    pub fn shutdown(&mut self, host: &mut dyn Host) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.content_debounce.cancel();
        self.layout_throttle.cancel();
        self.tasks.clear();
        for (_, mut inst) in self.instances.drain() {
            inst.destroy(host);
        }
        self.size_observer.disconnect();
        self.mode_observer.disconnect();
        self.shadows.teardown_all(host);
        info!("engine: shut down");
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn seed(&mut self, doc: DocId) {
        let default = self.settings.enabled_by_default;
        self.enabled.entry(doc).or_insert(default);
    }

    fn request_update(&mut self, doc: Option<DocId>, now_ms: u64) {
        self.tasks.schedule(now_ms + UPDATE_DELAY_MS, Task::Update(doc));
    }

    fn schedule_waits(tasks: &mut TimerQueue<Task>, doc: DocId, waits: Vec<Wait>, now_ms: u64) {
        for wait in waits {
            let task = match wait {
                Wait::Settle => Task::Settle(doc),
                Wait::Capture => Task::Capture(doc),
            };
            tasks.schedule(now_ms + wait.delay_ms(), task);
        }
    }

    /// Shadow to clone `doc` from, only while better rendering is on.
    fn source_shadow(&self, doc: DocId) -> Option<DocId> {
        if self.settings.better_rendering {
            self.shadows.shadow_of(doc)
        } else {
            None
        }
    }

    fn ensure_shadow(&mut self, host: &mut dyn Host, doc: DocId, now_ms: u64) {
        if let Some(reload) = self.shadows.ensure(host, doc) {
            self.tasks
                .schedule(now_ms + RELOAD_YIELD_MS, Task::ShadowReload(reload));
        }
    }

    fn sync_shadows(&mut self, host: &mut dyn Host, now_ms: u64) {
        for doc in host.open_documents() {
            if let Some(reload) = self.shadows.sync(host, doc) {
                self.tasks
                    .schedule(now_ms + RELOAD_YIELD_MS, Task::ShadowReload(reload));
            }
        }
    }

    fn run_task(&mut self, host: &mut dyn Host, task: Task, now_ms: u64) {
        match task {
            Task::Update(doc) => self.update_document(host, doc, now_ms),
            Task::Settle(doc) => {
                if let Some(inst) = self.instances.get_mut(&doc) {
                    inst.settle(host);
                }
            }
            Task::Capture(doc) => {
                if let Some(inst) = self.instances.get_mut(&doc) {
                    inst.capture(host);
                }
            }
            Task::ShadowReload(reload) => self.shadows.finish_reload(host, reload),
        }
    }

    /// Create, refresh or remove the instance for `target` (or the active
    /// document) depending on its toggle and structure.
    fn update_document(&mut self, host: &mut dyn Host, target: Option<DocId>, now_ms: u64) {
        let Some(doc) = target.or(self.active) else {
            return;
        };
        if self.shadows.is_shadow(doc) {
            return;
        }
        let Some(surface) = host.surface(doc) else {
            debug!("engine: {doc} is not open, skipping update");
            return;
        };
        if !crate::mirror::is_trackable(surface) {
            return;
        }

        if !self.is_enabled(doc) {
            if self.instances.contains_key(&doc) {
                self.destroy_instance(host, doc);
            }
            return;
        }

        let shadow = self.source_shadow(doc);
        if let Some(inst) = self.instances.get_mut(&doc) {
            inst.set_shadow(shadow);
            let waits: Vec<Wait> = inst.refresh_content(host).into_iter().collect();
            Self::schedule_waits(&mut self.tasks, doc, waits, now_ms);
            return;
        }

        let Some((inst, waits)) = SyncInstance::create(host, doc, &self.settings, shadow) else {
            debug!("engine: could not attach to {doc}");
            return;
        };
        self.instances.insert(doc, inst);
        self.size_observer.observe(doc);
        self.mode_observer.observe(doc);
        Self::schedule_waits(&mut self.tasks, doc, waits, now_ms);
    }

    fn destroy_instance(&mut self, host: &mut dyn Host, doc: DocId) {
        let Some(mut inst) = self.instances.remove(&doc) else {
            return;
        };
        inst.destroy(host);
        self.size_observer.unobserve(doc);
        self.mode_observer.unobserve(doc);
        let cancelled = self.tasks.cancel_where(|t| t.belongs_to(doc));
        debug!("engine: removed {doc}, cancelled {cancelled} pending task(s)");
    }
}
