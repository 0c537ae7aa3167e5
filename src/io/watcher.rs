use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

/// Signals from the watcher thread to the interactive loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// The watched file was created, written, or removed
    Changed,
}

/// Watches a single todo file.
///
/// The parent directory is watched rather than the file itself so that
/// atomic saves (write temp + rename) keep being observed after the inode
/// changes.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl FileWatcher {
    pub fn start(file: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let target: PathBuf = file.file_name().map(PathBuf::from).unwrap_or_default();
        let dir = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let Ok(event) = result else { return };
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|n| n == target.as_os_str()));
                if ours {
                    let _ = tx.send(FileEvent::Changed);
                }
            },
            Config::default(),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(dir = %dir.display(), "watching for external changes");
        Ok(FileWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Drain queued events; true if anything touched the file since the
    /// last poll
    pub fn poll(&self) -> bool {
        let mut changed = false;
        while let Ok(FileEvent::Changed) = self.rx.try_recv() {
            changed = true;
        }
        changed
    }
}
