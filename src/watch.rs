//! Settings file watcher: reports edits to the settings file via notify.
//!
//! notify::RecommendedWatcher runs callbacks on an internal thread.
//! SettingsWatcher bridges change notifications to the UI thread via
//! mpsc::channel; the host polls it and re-applies settings on change.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::Result;
use log::debug;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

pub struct SettingsWatcher {
    path: PathBuf,
    rx: mpsc::Receiver<()>,
    _watcher: RecommendedWatcher, // Drop stops watching
}

impl SettingsWatcher {
    /// Watch the settings file at `path`. The file itself may not exist yet.
    ///
    /// Atomic saves replace the file by rename, which loses an inotify watch
    /// on the file itself, so the parent directory is watched (NonRecursive)
    /// and events are filtered by file name.
    pub fn new(path: &Path) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot watch root path"))?;
        std::fs::create_dir_all(parent)?;
        let parent = parent.canonicalize()?;
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("settings path has no file name"))?
            .to_owned();
        let target = parent.join(&file_name);
        let (tx, rx) = mpsc::channel();

        let filter = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res {
                    let ours = event.paths.iter().any(|p| p == &filter);
                    if ours && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(());
                    }
                }
            },
            notify::Config::default(),
        )?;
        watcher.watch(&parent, RecursiveMode::NonRecursive)?;
        debug!("watch: watching {}", target.display());

        Ok(Self {
            path: target,
            rx,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return true if the file has changed since last check (non-blocking).
    /// Multiple queued notifications are collapsed into a single true.
    pub fn has_changed(&self) -> bool {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        changed
    }
}
