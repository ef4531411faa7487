//! Duplicate suppression for file change events.
//!
//! A single save often produces a burst of identical notifications. The
//! first event for a `(path, operation)` pair passes; repeats inside the
//! window are dropped. Suppressed events do not extend the window.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::event::ChangeOp;

/// Entries older than this many windows are evicted by [`Debouncer::prune`].
pub const PRUNE_AFTER_WINDOWS: u32 = 10;

/// Suppresses repeated `(path, operation)` events within a time window.
#[derive(Debug)]
pub struct Debouncer {
    /// Last accepted occurrence per key.
    seen: HashMap<(PathBuf, ChangeOp), Instant>,
    /// Duplicate suppression window.
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            window,
        }
    }

    /// Record an event at `now` and report whether it should be processed.
    ///
    /// Returns `false` when the same key was accepted less than one window
    /// ago. In that case nothing is recorded.
    pub fn accept(&mut self, path: &Path, op: ChangeOp, now: Instant) -> bool {
        let key = (path.to_path_buf(), op);
        if let Some(last) = self.seen.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        self.seen.insert(key, now);
        true
    }

    /// Evict entries older than [`PRUNE_AFTER_WINDOWS`] windows.
    ///
    /// Returns the number of evicted entries.
    pub fn prune(&mut self, now: Instant) -> usize {
        let max_age = self.window * PRUNE_AFTER_WINDOWS;
        let before = self.seen.len();
        self.seen
            .retain(|_, last| now.saturating_duration_since(*last) < max_age);
        before - self.seen.len()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
