//! Shadow views: off-screen full copies of tracked documents.
//!
//! A virtualized view only materializes what is on screen, so a clone of it
//! is mostly empty. With better rendering enabled each original gets a
//! shadow opened in a host side slot; the shadow mirrors the original's view
//! state and is the source the thumbnail is cloned from.
//!
//! Mapping invariant: keys (originals) and values (shadows) never overlap.
//! A shadow is never given a shadow of its own.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::host::{DocId, Host, Mode};
use crate::mirror::FORCE_RENDER_STYLE;

/// Pause between clearing a shadow and restoring its content.
pub const RELOAD_YIELD_MS: u64 = 100;

/// Second half of a forced re-render, due after [`RELOAD_YIELD_MS`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowReload {
    pub shadow: DocId,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct ShadowViews {
    /// original → shadow
    map: HashMap<DocId, DocId>,
}

impl ShadowViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shadow_of(&self, original: DocId) -> Option<DocId> {
        self.map.get(&original).copied()
    }

    pub fn is_shadow(&self, doc: DocId) -> bool {
        self.map.values().any(|&s| s == doc)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Open a shadow for `original` unless it already has one, is a shadow
    /// itself, or has no persisted identity to load.
    pub fn ensure(&mut self, host: &mut dyn Host, original: DocId) -> Option<ShadowReload> {
        if let Some(shadow) = self.shadow_of(original) {
            if host.contains(shadow) {
                return None;
            }
            debug!("shadow: {shadow} for {original} was closed, reopening");
            self.map.remove(&original);
        }
        if self.is_shadow(original) {
            return None;
        }
        if host.view_state(original).and_then(|s| s.file).is_none() {
            debug!("shadow: {original} has no backing file, skipping");
            return None;
        }
        let Some(shadow) = host.open_side_slot() else {
            debug!("shadow: host refused a side slot for {original}");
            return None;
        };
        self.map.insert(original, shadow);
        info!("shadow: opened {shadow} for {original}");
        self.sync(host, original)
    }

    /// Copy the original's view state into its shadow.
    ///
    /// When the shadow ends up showing different content than before, its
    /// content is cleared and a [`ShadowReload`] is returned; the caller must
    /// hand it to [`ShadowViews::finish_reload`] after [`RELOAD_YIELD_MS`].
    /// The host's viewer otherwise leaves parts of a swapped document
    /// unrendered.
    pub fn sync(&mut self, host: &mut dyn Host, original: DocId) -> Option<ShadowReload> {
        let shadow = self.shadow_of(original)?;
        if !host.contains(shadow) {
            debug!("shadow: {shadow} for {original} is gone");
            return None;
        }
        let new_state = host.view_state(original)?;
        let old_file = host.view_state(shadow).and_then(|s| s.file);
        let changed = old_file != new_state.file;
        host.set_view_state(shadow, new_state);
        if !changed {
            return None;
        }

        debug!("shadow: {shadow} switched content, forcing full render");
        if let Some(surface) = host.surface_mut(shadow) {
            surface.set_sizer_style(Mode::Editing, Some(FORCE_RENDER_STYLE));
            surface.set_sizer_style(Mode::Reading, Some(FORCE_RENDER_STYLE));
        }
        let data = host.view_data(shadow)?;
        host.clear_view(shadow);
        Some(ShadowReload { shadow, data })
    }

    /// Restore content cleared by [`ShadowViews::sync`].
    pub fn finish_reload(&self, host: &mut dyn Host, reload: ShadowReload) {
        if !host.contains(reload.shadow) {
            debug!("shadow: {} closed before reload", reload.shadow);
            return;
        }
        host.set_view_data(reload.shadow, reload.data);
    }

    /// Detach shadows whose original is no longer open, and forget shadows
    /// the host closed on its own.
    pub fn reconcile(&mut self, host: &mut dyn Host, live: &[DocId]) -> usize {
        let live: HashSet<DocId> = live.iter().copied().collect();
        self.map.retain(|original, shadow| {
            let open = live.contains(shadow);
            if !open {
                debug!("shadow: {shadow} for {original} closed by host");
            }
            open
        });
        let stale: Vec<(DocId, DocId)> = self
            .map
            .iter()
            .filter(|(original, _)| !live.contains(*original))
            .map(|(&o, &s)| (o, s))
            .collect();
        for &(original, shadow) in &stale {
            if host.contains(shadow) {
                host.detach(shadow);
            }
            self.map.remove(&original);
            info!("shadow: detached {shadow}, {original} closed");
        }
        stale.len()
    }

    /// Detach every shadow.
    pub fn teardown_all(&mut self, host: &mut dyn Host) {
        for (_, shadow) in self.map.drain() {
            if host.contains(shadow) {
                host.detach(shadow);
            }
        }
    }
}
