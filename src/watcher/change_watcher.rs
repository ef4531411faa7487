//! The change watcher task: OS notifications in, relative paths out.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::broadcast::Broadcaster;

use super::error::WatchError;
use super::processor::{EventProcessor, WatchAction};

/// Buffered raw events between the OS callback thread and the watcher task.
const EVENT_BUFFER: usize = 100;

/// How often stale debounce records are evicted.
const PRUNE_INTERVAL: Duration = Duration::from_secs(1);

/// What to watch. Immutable once the watcher is built.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory whose changes are published, relative to itself.
    pub root: PathBuf,
    /// Regular expression matched against the base name of changed files.
    pub pattern: String,
    /// Register subdirectories, including ones created later.
    pub recursive: bool,
    /// Duplicate suppression window.
    pub debounce: Duration,
}

/// Watches a directory tree and publishes relevant changes.
///
/// Owns the OS watch handle; dropping the watcher releases it.
pub struct ChangeWatcher {
    processor: EventProcessor,
    broadcaster: Broadcaster,
    /// Channel for receiving raw events from the notify callback.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying OS watcher.
    watcher: notify::RecommendedWatcher,
}

impl ChangeWatcher {
    /// Create the OS watcher and register the root (and its subtree when
    /// recursive).
    ///
    /// Any failure to set up the root is returned before events flow.
    /// Events occurring after this returns are buffered until [`run`](Self::run).
    pub fn new(config: &WatchConfig, broadcaster: Broadcaster) -> Result<Self, WatchError> {
        let processor = EventProcessor::new(config)?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let mut change_watcher = Self {
            processor,
            broadcaster,
            event_rx: rx,
            watcher,
        };

        let root = change_watcher.processor.root().to_path_buf();
        change_watcher
            .watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: root.clone(),
                reason: e.to_string(),
            })?;
        change_watcher
            .processor
            .dirs_mut()
            .mark_watched(root.clone());

        change_watcher.watch_tree(&root);

        crate::log_event!(
            "watcher",
            "monitoring",
            "{} ({} directories, pattern {})",
            root.display(),
            change_watcher.watched_dirs(),
            config.pattern
        );

        Ok(change_watcher)
    }

    /// Canonical watch root.
    pub fn root(&self) -> &Path {
        self.processor.root()
    }

    /// Number of directories registered with the OS facility.
    pub fn watched_dirs(&self) -> usize {
        self.processor.dirs().watched_count()
    }

    /// Run the event loop until cancelled or the event channel closes.
    pub async fn run(mut self, ct: CancellationToken) {
        crate::log_event!("watcher", "started");

        let mut prune = tokio::time::interval(PRUNE_INTERVAL);
        prune.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ct.cancelled() => {
                    crate::log_event!("watcher", "stopped");
                    break;
                }

                res = self.event_rx.recv() => {
                    match res {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => {
                            tracing::error!("[watcher] file watch error: {e}");
                        }
                        None => {
                            crate::log_event!("watcher", "event channel closed");
                            break;
                        }
                    }
                }

                _ = prune.tick() => {
                    let evicted = self.processor.prune(Instant::now());
                    if evicted > 0 {
                        crate::debug_event!("watcher", "pruned", "{evicted} debounce records");
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        let now = Instant::now();
        for path in &event.paths {
            match self.processor.process(path, &event.kind, now) {
                WatchAction::Publish { path } => {
                    crate::log_event!("watcher", "changed", "{path}");
                    self.broadcaster.publish(&path);
                }
                WatchAction::WatchDirectory { path } => {
                    let added = self.watch_tree(&path);
                    crate::debug_event!(
                        "watcher",
                        "new directory",
                        "{} ({added} registered)",
                        path.display()
                    );
                }
                WatchAction::Ignore(reason) => {
                    crate::debug_event!(
                        "watcher",
                        "ignored",
                        "{:?} {} ({reason:?})",
                        event.kind,
                        path.display()
                    );
                }
            }
        }
    }

    /// Register `dir` and, in recursive mode, every subdirectory not yet
    /// watched. Failures are logged and skipped. Returns how many
    /// directories were registered.
    fn watch_tree(&mut self, dir: &Path) -> usize {
        let recursive = self.processor.recursive();
        let found = self.processor.dirs_mut().discover(dir, recursive);

        let mut added = 0;
        for path in found {
            match self.watcher.watch(&path, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    if self.processor.dirs_mut().mark_watched(path) {
                        added += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("[watcher] failed to watch {}: {e}", path.display());
                }
            }
        }
        added
    }
}
