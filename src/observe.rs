//! Process-wide observers shared by every sync instance.
//!
//! The host reports raw size and attribute changes; these filter them down to
//! documents an instance is registered for. Resize notices are batched behind
//! a trailing throttle because they arrive at pointer-move rate while a pane
//! is being dragged.

use std::collections::{BTreeSet, HashSet};

use log::{debug, info};

use crate::host::DocId;
use crate::schedule::Throttle;

/// Resize notices are flushed at most once per this window.
pub const RESIZE_COALESCE_MS: u64 = 1000;

/// Attribute whose change signals an edit/read mode switch.
pub const MODE_ATTRIBUTE: &str = "style";

/// Registration set shared by the two observers.
#[derive(Debug)]
struct Targets {
    name: &'static str,
    observed: HashSet<DocId>,
    connected: bool,
}

impl Targets {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            observed: HashSet::new(),
            connected: true,
        }
    }

    fn observe(&mut self, doc: DocId) {
        if !self.connected {
            debug!("{}: disconnected, not observing {doc}", self.name);
            return;
        }
        self.observed.insert(doc);
    }

    fn unobserve(&mut self, doc: DocId) {
        self.observed.remove(&doc);
    }

    fn is_observing(&self, doc: DocId) -> bool {
        self.observed.contains(&doc)
    }

    fn disconnect(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.connected = false;
        self.observed.clear();
        info!("{}: disconnected", self.name);
        true
    }
}

/// Watches document sizes; hands back coalesced batches.
#[derive(Debug)]
pub struct SizeObserver {
    targets: Targets,
    resized: BTreeSet<DocId>,
    throttle: Throttle,
}

impl Default for SizeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeObserver {
    pub fn new() -> Self {
        Self {
            targets: Targets::new("size observer"),
            resized: BTreeSet::new(),
            throttle: Throttle::new(RESIZE_COALESCE_MS),
        }
    }

    pub fn observe(&mut self, doc: DocId) {
        self.targets.observe(doc);
    }

    pub fn unobserve(&mut self, doc: DocId) {
        self.targets.unobserve(doc);
        self.resized.remove(&doc);
    }

    pub fn is_observing(&self, doc: DocId) -> bool {
        self.targets.is_observing(doc)
    }

    /// Record size changes. Unobserved documents are ignored.
    pub fn notify(&mut self, docs: &[DocId], now_ms: u64) {
        let mut any = false;
        for &doc in docs {
            if self.targets.is_observing(doc) {
                self.resized.insert(doc);
                any = true;
            }
        }
        if any {
            self.throttle.trigger(now_ms);
        }
    }

    /// Documents whose resize batch is due, in id order.
    pub fn poll(&mut self, now_ms: u64) -> Vec<DocId> {
        if !self.throttle.poll(now_ms) {
            return Vec::new();
        }
        let batch: Vec<DocId> = std::mem::take(&mut self.resized)
            .into_iter()
            .filter(|d| self.targets.is_observing(*d))
            .collect();
        debug!("size observer: flushing {} resized document(s)", batch.len());
        batch
    }

    pub fn deadline(&self) -> Option<u64> {
        self.throttle.deadline()
    }

    /// Returns false if already disconnected.
    pub fn disconnect(&mut self) -> bool {
        self.throttle.cancel();
        self.resized.clear();
        self.targets.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.targets.connected
    }
}

/// What an attribute change on an observed edit region means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSignal {
    /// The edit region's style changed: the visible sub-surface may differ.
    ModeChanged,
    /// Some other attribute changed; content may still need a refresh.
    Touched,
}

/// Watches attributes of each tracked document's edit region.
#[derive(Debug)]
pub struct ModeObserver {
    targets: Targets,
}

impl Default for ModeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeObserver {
    pub fn new() -> Self {
        Self {
            targets: Targets::new("mode observer"),
        }
    }

    pub fn observe(&mut self, doc: DocId) {
        self.targets.observe(doc);
    }

    pub fn unobserve(&mut self, doc: DocId) {
        self.targets.unobserve(doc);
    }

    pub fn is_observing(&self, doc: DocId) -> bool {
        self.targets.is_observing(doc)
    }

    pub fn notify(&self, doc: DocId, attribute: &str) -> Option<ModeSignal> {
        if !self.targets.is_observing(doc) {
            return None;
        }
        if attribute == MODE_ATTRIBUTE {
            Some(ModeSignal::ModeChanged)
        } else {
            Some(ModeSignal::Touched)
        }
    }

    pub fn disconnect(&mut self) -> bool {
        self.targets.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.targets.connected
    }
}
